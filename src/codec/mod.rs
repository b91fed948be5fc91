//! Character Codec
//!
//! Converts logical characters into native cells and back. The wide text
//! encoding is a property of the host, so it is chosen once per profile:
//! [`select`] hands out one of exactly two [`WideCodec`] strategies, and no
//! conversion call branches on the platform again. [`NarrowCodec`] covers the
//! single-byte `chtype` cells.
//!
//! Payload code units are always written in native byte order.

mod narrow;
mod string;
mod utf16;
mod utf32;

use std::ffi::c_void;
use std::fmt;

use serde::Serialize;
use unicode_width::UnicodeWidthChar;

pub use narrow::{NarrowCharacter, NarrowCodec};
pub use string::{decode_string, CellSlice, EncodedString, NarrowString};
pub use utf16::Utf16Codec;
pub use utf32::Utf32Codec;

use crate::attr::{fold_color, unfold_color, Attr, A_CHARTEXT};
use crate::error::{EncodingError, Error, Result};
use crate::layout::{AttrWord, CCharUtf16, CCharUtf32, LayoutKind, MAX_CELL_CODEPOINTS};
use crate::pool::Pools;
use crate::profile::{GenericCharWidth, HostProfile, WideCharWidth};

/// Character returned when a cell holds no valid code point
pub const EMPTY_CHAR: char = '\0';

/// Largest payload of any wide cell shape
const MAX_PAYLOAD: usize = 4 * MAX_CELL_CODEPOINTS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TextEncoding {
    Ascii,
    Utf8,
    Utf16,
    Utf32,
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TextEncoding::Ascii => "ASCII",
            TextEncoding::Utf8 => "UTF-8",
            TextEncoding::Utf16 => "UTF-16",
            TextEncoding::Utf32 => "UTF-32",
        };
        f.write_str(name)
    }
}

/// One native wide cell, in whichever shape the host uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncodedCharacter {
    Utf16(CCharUtf16),
    Utf32(CCharUtf32),
    /// 2-byte `wchar_t` with a 64-bit `attr_t`
    Utf16Long(CCharUtf16<u64>),
    /// 4-byte `wchar_t` with a 64-bit `attr_t`
    Utf32Long(CCharUtf32<u64>),
}

/// Run `$body` with `$cell` bound to the record of any shape
macro_rules! with_cell {
    ($value:expr, $cell:ident => $body:expr) => {
        match $value {
            EncodedCharacter::Utf16($cell) => $body,
            EncodedCharacter::Utf32($cell) => $body,
            EncodedCharacter::Utf16Long($cell) => $body,
            EncodedCharacter::Utf32Long($cell) => $body,
        }
    };
}

impl EncodedCharacter {
    pub fn kind(&self) -> LayoutKind {
        match self {
            EncodedCharacter::Utf16(_) => LayoutKind::WideUtf16,
            EncodedCharacter::Utf32(_) => LayoutKind::WideUtf32,
            EncodedCharacter::Utf16Long(_) => LayoutKind::WideUtf16Long,
            EncodedCharacter::Utf32Long(_) => LayoutKind::WideUtf32Long,
        }
    }

    /// Raw attribute word, color bits included
    pub fn attr(&self) -> u64 {
        with_cell!(self, cell => cell.attr.word())
    }

    pub fn ext_color(&self) -> i32 {
        with_cell!(self, cell => cell.ext_color)
    }

    pub fn payload(&self) -> &[u8] {
        with_cell!(self, cell => cell.payload())
    }

    pub fn is_blank(&self) -> bool {
        with_cell!(self, cell => cell.is_blank())
    }

    /// Pointer to the native record, valid while `self` is
    pub fn as_ptr(&self) -> *const c_void {
        with_cell!(self, cell => cell.as_ptr())
    }

    pub fn as_utf16(&self) -> Option<&CCharUtf16> {
        match self {
            EncodedCharacter::Utf16(cell) => Some(cell),
            _ => None,
        }
    }

    pub fn as_utf32(&self) -> Option<&CCharUtf32> {
        match self {
            EncodedCharacter::Utf32(cell) => Some(cell),
            _ => None,
        }
    }

    /// First character of the cell, or [`EMPTY_CHAR`] for a blank or corrupt cell
    pub fn decode_one(&self) -> char {
        match self {
            EncodedCharacter::Utf16(cell) => utf16::first_char(cell),
            EncodedCharacter::Utf32(cell) => utf32::first_char(cell),
            EncodedCharacter::Utf16Long(cell) => utf16::first_char(cell),
            EncodedCharacter::Utf32Long(cell) => utf32::first_char(cell),
        }
    }

    /// Full cell text: the base character and its combining marks
    pub fn decode_cluster(&self) -> String {
        match self {
            EncodedCharacter::Utf16(cell) => utf16::cell_text(cell),
            EncodedCharacter::Utf32(cell) => utf32::cell_text(cell),
            EncodedCharacter::Utf16Long(cell) => utf16::cell_text(cell),
            EncodedCharacter::Utf32Long(cell) => utf32::cell_text(cell),
        }
    }

    /// Character, rendition flags and color pair.
    ///
    /// Every rendition flag lives in the low 32 bits; higher bits of a 64-bit
    /// word stay available through [`attr`](Self::attr).
    pub fn decode(&self) -> DecodedChar {
        let (attrs, color_pair) = unfold_color(self.attr() as u32, self.ext_color());
        DecodedChar {
            ch: self.decode_one(),
            attrs,
            color_pair,
        }
    }
}

macro_rules! encoded_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for EncodedCharacter {
                fn from(cell: $ty) -> Self {
                    EncodedCharacter::$variant(cell)
                }
            }
        )*
    };
}

encoded_from! {
    CCharUtf16 => Utf16,
    CCharUtf32 => Utf32,
    CCharUtf16<u64> => Utf16Long,
    CCharUtf32<u64> => Utf32Long,
}

/// A decoded cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedChar {
    pub ch: char,
    /// Rendition flags with the color field cleared
    pub attrs: Attr,
    pub color_pair: u16,
}

/// Wide text strategy for one `wchar_t` width.
///
/// Implementors supply the payload transcoding and the string layout; the
/// character construction paths are shared.
pub trait WideCodec: Send + Sync + fmt::Debug {
    fn kind(&self) -> LayoutKind;

    /// Encoding of the cell payload
    fn encoding(&self) -> TextEncoding;

    /// Encoding of the first-stage buffer of a string conversion
    fn intermediate_encoding(&self) -> TextEncoding;

    fn payload_len(&self) -> usize;

    /// Write the code units of `cluster` into a zeroed payload
    fn write_payload(&self, cluster: &str, payload: &mut [u8]) -> std::result::Result<(), EncodingError>;

    /// Width of the `attr` field of this codec's cells
    fn attr_width(&self) -> GenericCharWidth;

    /// Wrap raw payload bytes into this codec's cell shape.
    ///
    /// Fails when the payload is longer than the cell's or the attribute
    /// word has bits set beyond the cell's `attr_t`.
    fn cell(&self, payload: &[u8], attr: u64, ext_color: i32) -> std::result::Result<EncodedCharacter, EncodingError>;

    /// Transcode a string and lay it out one cell per logical unit
    fn encode_string<'p>(
        &self,
        pools: &'p Pools,
        text: &str,
        attrs: Attr,
        color_pair: Option<u16>,
        terminated: bool,
    ) -> Result<EncodedString<'p>>;

    fn encode_one(&self, ch: char, attrs: Attr, color_pair: Option<u16>) -> Result<EncodedCharacter> {
        let mut buf = [0u8; 4];
        self.encode_cluster(ch.encode_utf8(&mut buf), attrs, color_pair)
    }

    /// Encode a base character plus up to four non-spacing marks into one cell
    fn encode_cluster(&self, cluster: &str, attrs: Attr, color_pair: Option<u16>) -> Result<EncodedCharacter> {
        validate_cluster(cluster).map_err(|reason| Error::encoding(cluster, self.encoding(), reason))?;

        let mut payload = [0u8; MAX_PAYLOAD];
        let payload = &mut payload[..self.payload_len()];
        self.write_payload(cluster, payload)
            .map_err(|reason| Error::encoding(cluster, self.encoding(), reason))?;

        let (word, ext_color) = fold_color(attrs, color_pair);
        self.cell(payload, u64::from(word), ext_color)
            .map_err(|reason| Error::encoding(cluster, self.encoding(), reason))
    }

    /// Build a wide cell from a raw generic character.
    ///
    /// The text comes from `A_CHARTEXT`; every attribute and color bit of
    /// `raw` is kept and `attrs` is added to them. Bits beyond a 32-bit
    /// `attr_t` are an encoding failure.
    fn encode_generic(&self, raw: u64, attrs: Attr) -> Result<EncodedCharacter> {
        let failure = |reason| Error::encoding(format!("{:#x}", raw), TextEncoding::Ascii, reason);

        let text = (raw & u64::from(A_CHARTEXT)) as u8;
        if !text.is_ascii() {
            return Err(failure(EncodingError::Unrepresentable(char::from(text))));
        }
        let mut payload = [0u8; MAX_PAYLOAD];
        let payload = &mut payload[..self.payload_len()];
        self.write_payload(char::from(text).encode_utf8(&mut [0u8; 4]), payload)
            .map_err(failure)?;

        let word = (raw & !u64::from(A_CHARTEXT)) | u64::from(attrs.bits());
        self.cell(payload, word, 0).map_err(failure)
    }

    fn decode_one(&self, cell: &EncodedCharacter) -> char {
        cell.decode_one()
    }

    fn decode_cluster(&self, cell: &EncodedCharacter) -> String {
        cell.decode_cluster()
    }

    fn decode_full(&self, cell: &EncodedCharacter) -> DecodedChar {
        cell.decode()
    }
}

static UTF16: Utf16Codec = Utf16Codec::new(GenericCharWidth::Bits32);
static UTF32: Utf32Codec = Utf32Codec::new(GenericCharWidth::Bits32);
static UTF16_LONG: Utf16Codec = Utf16Codec::new(GenericCharWidth::Bits64);
static UTF32_LONG: Utf32Codec = Utf32Codec::new(GenericCharWidth::Bits64);

/// Pick the wide codec for a profile.
///
/// The text encoding follows the `wchar_t` width and the `attr` field the
/// `chtype` width, so cells always match the layout the synthesizer builds
/// for the same profile. Every resolved Windows profile has a 2-byte
/// `wchar_t`.
pub fn select(profile: &HostProfile) -> &'static dyn WideCodec {
    let two_byte = profile.wide_char_width == WideCharWidth::Two;
    if two_byte != profile.is_windows_family {
        tracing::warn!(
            library = %profile.library_base_name,
            wchar = profile.wide_char_width.bytes(),
            windows = profile.is_windows_family,
            "wchar_t width is unusual for this OS family"
        );
    }
    match (two_byte, profile.generic_char_width) {
        (true, GenericCharWidth::Bits32) => &UTF16,
        (false, GenericCharWidth::Bits32) => &UTF32,
        (true, GenericCharWidth::Bits64) => &UTF16_LONG,
        (false, GenericCharWidth::Bits64) => &UTF32_LONG,
    }
}

/// Check that `cluster` fits the cell model: one to five code points, all
/// but the first of zero display width.
pub(crate) fn validate_cluster(cluster: &str) -> std::result::Result<usize, EncodingError> {
    let mut count = 0;
    for (i, ch) in cluster.chars().enumerate() {
        if i > 0 && ch.width() != Some(0) {
            return Err(EncodingError::SpacingMark(ch));
        }
        count += 1;
    }
    match count {
        0 => Err(EncodingError::Empty),
        n if n > MAX_CELL_CODEPOINTS => Err(EncodingError::TooManyCodepoints { count: n }),
        n => Ok(n),
    }
}

/// Interior NULs would silently truncate the string on the native side
pub(crate) fn reject_interior_nul(text: &str, encoding: TextEncoding) -> Result<()> {
    if text.contains('\0') {
        return Err(Error::encoding(text, encoding, EncodingError::InteriorNul));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::color_pair;
    use crate::profile::resolve_for;

    #[test]
    fn test_select_by_profile() {
        assert_eq!(select(&resolve_for("win10-x64")).kind(), LayoutKind::WideUtf16);
        assert_eq!(select(&resolve_for("linux-x64")).kind(), LayoutKind::WideUtf32);
        assert_eq!(select(&resolve_for("osx.13-arm64")).encoding(), TextEncoding::Utf32);
        assert_eq!(select(&resolve_for("rhel.7-x64")).kind(), LayoutKind::WideUtf32Long);
    }

    #[test]
    fn test_codec_matches_synthesized_layout() {
        for id in ["linux-x64", "win10-x64", "rhel.7-x64", "ubuntu.16.04-x64", "win-x86"] {
            let profile = resolve_for(id);
            assert_eq!(select(&profile).kind(), LayoutKind::wide_for(&profile), "host {}", id);
        }
    }

    #[test]
    fn test_validate_cluster() {
        assert_eq!(validate_cluster("e"), Ok(1));
        assert_eq!(validate_cluster("e\u{301}"), Ok(2));
        assert_eq!(validate_cluster(""), Err(EncodingError::Empty));
        assert_eq!(validate_cluster("ab"), Err(EncodingError::SpacingMark('b')));
        assert_eq!(
            validate_cluster("a\u{301}\u{302}\u{303}\u{304}\u{305}"),
            Err(EncodingError::TooManyCodepoints { count: 6 })
        );
    }

    #[test]
    fn test_encode_generic_keeps_attribute_bits() {
        let codec = select(&resolve_for("linux-x64"));
        let raw = u64::from(b'x') | u64::from(color_pair(4)) | u64::from(Attr::BOLD.bits());
        let cell = codec.encode_generic(raw, Attr::UNDERLINE).unwrap();
        let decoded = cell.decode();
        assert_eq!(decoded.ch, 'x');
        assert_eq!(decoded.color_pair, 4);
        assert_eq!(decoded.attrs, Attr::BOLD | Attr::UNDERLINE);
        assert_eq!(cell.ext_color(), 0);
        assert_eq!(cell.kind(), LayoutKind::WideUtf32);
    }

    #[test]
    fn test_encode_generic_keeps_high_bits_of_long_attr() {
        let codec = select(&resolve_for("rhel.7-x64"));
        let raw = (1u64 << 40) | u64::from(b'x');
        let cell = codec.encode_generic(raw, Attr::BOLD).unwrap();
        assert_eq!(cell.kind(), LayoutKind::WideUtf32Long);
        assert_eq!(cell.attr(), (1 << 40) | u64::from(Attr::BOLD.bits()));
        assert_eq!(cell.decode_one(), 'x');
    }

    #[test]
    fn test_encode_generic_rejects_bits_beyond_short_attr() {
        let codec = select(&resolve_for("linux-x64"));
        let err = codec.encode_generic((1u64 << 40) | u64::from(b'x'), Attr::empty()).unwrap_err();
        match err {
            Error::Encoding { reason, .. } => assert_eq!(
                reason,
                EncodingError::AttributeOverflow {
                    word: 1 << 40,
                    bits: 32
                }
            ),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_cell_rejects_oversized_payload() {
        let codec = select(&resolve_for("win10-x64"));
        assert_eq!(
            codec.cell(&[1; 11], 0, 0),
            Err(EncodingError::PayloadOverflow {
                needed: 11,
                available: 10
            })
        );
        assert!(codec.cell(&[1; 10], 0, 0).is_ok());
    }

    #[test]
    fn test_encode_generic_rejects_high_byte() {
        let codec = select(&resolve_for("linux-x64"));
        let err = codec.encode_generic(0xe9, Attr::empty()).unwrap_err();
        assert!(err.is_encoding());
    }

    #[test]
    fn test_blank_cell_decodes_to_empty() {
        for id in ["linux-x64", "win-x64"] {
            let codec = select(&resolve_for(id));
            let blank = codec.cell(&[], 0, 0).unwrap();
            assert!(blank.is_blank());
            assert_eq!(codec.decode_one(&blank), EMPTY_CHAR);
            assert_eq!(codec.decode_cluster(&blank), "");
        }
    }

    #[test]
    fn test_text_encoding_display() {
        assert_eq!(TextEncoding::Utf16.to_string(), "UTF-16");
        assert_eq!(TextEncoding::Utf8.to_string(), "UTF-8");
    }
}
