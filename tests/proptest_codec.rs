//! Property tests for the cell codecs

use proptest::prelude::*;

use ncurses_cell::codec::{NarrowCodec, Utf16Codec, Utf32Codec};
use ncurses_cell::pool::Pools;
use ncurses_cell::profile::GenericCharWidth;
use ncurses_cell::{Attr, EncodingError, WideCodec, EMPTY_CHAR};

fn attrs() -> impl Strategy<Value = Attr> {
    any::<u32>().prop_map(Attr::from_bits_truncate)
}

fn codecs() -> Vec<Box<dyn WideCodec>> {
    let mut codecs: Vec<Box<dyn WideCodec>> = Vec::new();
    for width in [GenericCharWidth::Bits32, GenericCharWidth::Bits64] {
        codecs.push(Box::new(Utf16Codec::new(width)));
        codecs.push(Box::new(Utf32Codec::new(width)));
    }
    codecs
}

proptest! {
    #[test]
    fn char_round_trip(ch in any::<char>().prop_filter("non-NUL", |&c| c != '\0'),
                       attrs in attrs(),
                       pair in proptest::option::of(1u16..)) {
        for codec in codecs() {
            let cell = codec.encode_one(ch, attrs, pair).unwrap();
            let decoded = codec.decode_full(&cell);
            prop_assert_eq!(decoded.ch, ch);
            prop_assert_eq!(decoded.attrs, attrs);
            prop_assert_eq!(decoded.color_pair, pair.unwrap_or(0));
        }
    }

    #[test]
    fn string_round_trip(text in "[^\\x00]{0,64}") {
        let pools = Pools::default();
        for codec in codecs() {
            let encoded = codec.encode_string(&pools, &text, Attr::empty(), None, true).unwrap();
            prop_assert_eq!(encoded.decode(), text.clone());
        }
        let stats = pools.stats();
        prop_assert_eq!(stats.acquired, stats.released);
    }

    #[test]
    fn utf16_cells_match_code_units(text in "[^\\x00]{0,32}") {
        let pools = Pools::default();
        let encoded = Utf16Codec::default().encode_string(&pools, &text, Attr::empty(), None, false).unwrap();
        prop_assert_eq!(encoded.output_len(), text.encode_utf16().count());
        prop_assert_eq!(encoded.intermediate_len(), (text.encode_utf16().count() + 1) * 2);
    }

    #[test]
    fn utf32_cells_match_code_points(text in "[^\\x00]{0,32}") {
        let pools = Pools::default();
        let encoded = Utf32Codec::default().encode_string(&pools, &text, Attr::empty(), None, false).unwrap();
        prop_assert_eq!(encoded.output_len(), text.chars().count());
        prop_assert_eq!(encoded.intermediate_len(), text.len() + 1);
    }

    #[test]
    fn narrow_ascii_round_trip(ch in proptest::char::range('\u{1}', '\u{7f}'), attrs in attrs(), pair in 0u16..=255) {
        for width in [GenericCharWidth::Bits32, GenericCharWidth::Bits64] {
            let codec = NarrowCodec::new(width);
            let encoded = codec.encode_one(ch, attrs, Some(pair)).unwrap();
            let decoded = encoded.decode();
            prop_assert_eq!(decoded.ch, ch);
            prop_assert_eq!(decoded.attrs, attrs);
            prop_assert_eq!(decoded.color_pair, pair);
        }
    }

    #[test]
    fn arbitrary_payload_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..=24)) {
        for codec in codecs() {
            match codec.cell(&bytes, 0, 0) {
                Ok(cell) => {
                    prop_assert!(bytes.len() <= codec.payload_len());
                    let ch = codec.decode_one(&cell);
                    if cell.is_blank() {
                        prop_assert_eq!(ch, EMPTY_CHAR);
                    }
                },
                Err(reason) => {
                    prop_assert!(bytes.len() > codec.payload_len());
                    prop_assert_eq!(
                        reason,
                        EncodingError::PayloadOverflow { needed: bytes.len(), available: codec.payload_len() }
                    );
                },
            }
        }
    }

    #[test]
    fn attribute_word_fits_or_fails(high in 1u64..=u64::from(u32::MAX)) {
        let word = high << 32;
        for codec in codecs() {
            let result = codec.cell(&[], word, 0);
            match codec.attr_width() {
                GenericCharWidth::Bits32 => prop_assert!(result.is_err()),
                GenericCharWidth::Bits64 => prop_assert_eq!(result.map(|cell| cell.attr()), Ok(word)),
            }
        }
    }
}
