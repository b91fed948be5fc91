//! Whole-string conversion
//!
//! An encoded string owns both scratch buffers of its conversion: the
//! first-stage transcoding and the native cell array. They go back to the
//! pools together when the string drops.

use std::ffi::c_void;

use super::narrow::NarrowCharacter;
use super::{utf16, utf32, EncodedCharacter};
use crate::layout::{AttrWord, CCharUtf16, CCharUtf32, ChType32, ChType64, LayoutKind};
use crate::pool::{BufferedRegion, EncoderState};

#[derive(Debug)]
pub(crate) enum CellRegion<'p> {
    Utf16(BufferedRegion<'p, CCharUtf16>),
    Utf32(BufferedRegion<'p, CCharUtf32>),
    Utf16Long(BufferedRegion<'p, CCharUtf16<u64>>),
    Utf32Long(BufferedRegion<'p, CCharUtf32<u64>>),
}

macro_rules! with_region {
    ($value:expr, $region:ident => $body:expr) => {
        match $value {
            CellRegion::Utf16($region) => $body,
            CellRegion::Utf32($region) => $body,
            CellRegion::Utf16Long($region) => $body,
            CellRegion::Utf32Long($region) => $body,
        }
    };
}

/// Borrowed run of wide cells in any shape
#[derive(Debug, Clone, Copy)]
pub enum CellSlice<'a> {
    Utf16(&'a [CCharUtf16]),
    Utf32(&'a [CCharUtf32]),
    Utf16Long(&'a [CCharUtf16<u64>]),
    Utf32Long(&'a [CCharUtf32<u64>]),
}

impl<'a> CellSlice<'a> {
    pub fn kind(&self) -> LayoutKind {
        match self {
            CellSlice::Utf16(_) => LayoutKind::WideUtf16,
            CellSlice::Utf32(_) => LayoutKind::WideUtf32,
            CellSlice::Utf16Long(_) => LayoutKind::WideUtf16Long,
            CellSlice::Utf32Long(_) => LayoutKind::WideUtf32Long,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            CellSlice::Utf16(cells) => cells.len(),
            CellSlice::Utf32(cells) => cells.len(),
            CellSlice::Utf16Long(cells) => cells.len(),
            CellSlice::Utf32Long(cells) => cells.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<EncodedCharacter> {
        match self {
            CellSlice::Utf16(cells) => cells.get(index).copied().map(EncodedCharacter::from),
            CellSlice::Utf32(cells) => cells.get(index).copied().map(EncodedCharacter::from),
            CellSlice::Utf16Long(cells) => cells.get(index).copied().map(EncodedCharacter::from),
            CellSlice::Utf32Long(cells) => cells.get(index).copied().map(EncodedCharacter::from),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = EncodedCharacter> + 'a {
        let cells = *self;
        (0..cells.len()).filter_map(move |i| cells.get(i))
    }
}

macro_rules! slice_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl<'a> From<&'a [$ty]> for CellSlice<'a> {
                fn from(cells: &'a [$ty]) -> Self {
                    CellSlice::$variant(cells)
                }
            }
        )*
    };
}

slice_from! {
    CCharUtf16 => Utf16,
    CCharUtf32 => Utf32,
    CCharUtf16<u64> => Utf16Long,
    CCharUtf32<u64> => Utf32Long,
}

/// Decode a run of cells back into text.
///
/// Code units are joined across cells, so a surrogate pair laid out as two
/// cells comes back as one character. Decoding stops at the first blank
/// cell, which is how the native library marks the end of a row it filled.
/// Invalid sequences decode to U+FFFD.
pub fn decode_string<'a>(cells: impl Into<CellSlice<'a>>) -> String {
    match cells.into() {
        CellSlice::Utf16(cells) => decode_utf16_cells(cells),
        CellSlice::Utf32(cells) => decode_utf32_cells(cells),
        CellSlice::Utf16Long(cells) => decode_utf16_cells(cells),
        CellSlice::Utf32Long(cells) => decode_utf32_cells(cells),
    }
}

fn decode_utf16_cells<A: AttrWord>(cells: &[CCharUtf16<A>]) -> String {
    char::decode_utf16(
        cells
            .iter()
            .take_while(|cell| !cell.is_blank())
            .flat_map(utf16::units),
    )
    .map(|decoded| decoded.unwrap_or(char::REPLACEMENT_CHARACTER))
    .collect()
}

fn decode_utf32_cells<A: AttrWord>(cells: &[CCharUtf32<A>]) -> String {
    cells
        .iter()
        .take_while(|cell| !cell.is_blank())
        .flat_map(utf32::units)
        .map(|unit| char::from_u32(unit).unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

/// A string laid out as native wide cells
#[derive(Debug)]
pub struct EncodedString<'p> {
    state: EncoderState<'p>,
    cells: CellRegion<'p>,
}

impl<'p> EncodedString<'p> {
    pub(crate) fn new(state: EncoderState<'p>, cells: CellRegion<'p>) -> Self {
        Self { state, cells }
    }

    /// Logical units laid out: code points, or UTF-16 code units on 2-byte hosts
    pub fn output_len(&self) -> usize {
        self.state.output_len()
    }

    pub fn len(&self) -> usize {
        self.output_len()
    }

    pub fn is_empty(&self) -> bool {
        self.output_len() == 0
    }

    /// Cells including the terminator slot, if one was requested
    pub fn len_with_terminator(&self) -> usize {
        with_region!(&self.cells, region => region.with_terminator().len())
    }

    pub fn is_terminated(&self) -> bool {
        with_region!(&self.cells, region => region.is_terminated())
    }

    /// First-stage bytes, NUL terminator included
    pub fn intermediate(&self) -> &[u8] {
        self.state.intermediate()
    }

    pub fn intermediate_len(&self) -> usize {
        self.state.intermediate_len()
    }

    pub fn kind(&self) -> LayoutKind {
        self.cells().kind()
    }

    /// The laid-out cells, without the terminator
    pub fn cells(&self) -> CellSlice<'_> {
        with_region!(&self.cells, region => CellSlice::from(region.as_slice()))
    }

    pub fn get(&self, index: usize) -> Option<EncodedCharacter> {
        self.cells().get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = EncodedCharacter> + '_ {
        self.cells().iter()
    }

    /// Pointer to the first cell, for `wadd_wchnstr` and friends
    pub fn as_ptr(&self) -> *const c_void {
        with_region!(&self.cells, region => region.as_ptr().cast())
    }

    pub fn decode(&self) -> String {
        decode_string(self.cells())
    }
}

#[derive(Debug)]
pub(crate) enum NarrowRegion<'p> {
    C32(BufferedRegion<'p, ChType32>),
    C64(BufferedRegion<'p, ChType64>),
}

/// A string laid out as native generic characters
#[derive(Debug)]
pub struct NarrowString<'p> {
    state: EncoderState<'p>,
    cells: NarrowRegion<'p>,
}

impl<'p> NarrowString<'p> {
    pub(crate) fn new(state: EncoderState<'p>, cells: NarrowRegion<'p>) -> Self {
        Self { state, cells }
    }

    pub fn len(&self) -> usize {
        self.state.output_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn intermediate(&self) -> &[u8] {
        self.state.intermediate()
    }

    pub fn kind(&self) -> LayoutKind {
        match &self.cells {
            NarrowRegion::C32(_) => LayoutKind::Narrow32,
            NarrowRegion::C64(_) => LayoutKind::Narrow64,
        }
    }

    pub fn get(&self, index: usize) -> Option<NarrowCharacter> {
        match &self.cells {
            NarrowRegion::C32(region) => region.as_slice().get(index).copied().map(NarrowCharacter::C32),
            NarrowRegion::C64(region) => region.as_slice().get(index).copied().map(NarrowCharacter::C64),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = NarrowCharacter> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    /// Pointer to the first `chtype`, for `waddchnstr`
    pub fn as_ptr(&self) -> *const c_void {
        match &self.cells {
            NarrowRegion::C32(region) => region.as_ptr().cast(),
            NarrowRegion::C64(region) => region.as_ptr().cast(),
        }
    }

    pub fn decode(&self) -> String {
        self.iter()
            .map(|ch| ch.decode_one())
            .take_while(|&ch| ch != super::EMPTY_CHAR)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::Attr;
    use crate::codec::{NarrowCodec, Utf16Codec, Utf32Codec, WideCodec};
    use crate::pool::Pools;
    use crate::profile::GenericCharWidth;

    #[test]
    fn test_utf32_string_layout() {
        let pools = Pools::default();
        let encoded = Utf32Codec::default()
            .encode_string(&pools, "héllo", Attr::empty(), None, true)
            .unwrap();
        assert_eq!(encoded.output_len(), 5);
        assert_eq!(encoded.len_with_terminator(), 6);
        // UTF-8 first stage: é is two bytes, plus the NUL
        assert_eq!(encoded.intermediate_len(), 7);
        assert_eq!(encoded.intermediate().last(), Some(&0));
        assert_eq!(encoded.get(1).map(|c| c.decode_one()), Some('é'));
        assert_eq!(encoded.decode(), "héllo");
    }

    #[test]
    fn test_utf16_string_splits_surrogates() {
        let pools = Pools::default();
        let encoded = Utf16Codec::default()
            .encode_string(&pools, "a😀", Attr::empty(), None, false)
            .unwrap();
        // one unit for 'a' and two for the emoji
        assert_eq!(encoded.output_len(), 3);
        assert_eq!(encoded.intermediate_len(), 8);
        assert!(!encoded.is_terminated());
        assert_eq!(encoded.decode(), "a😀");
    }

    #[test]
    fn test_interior_nul_rejected_and_released() {
        let pools = Pools::default();
        let err = Utf32Codec::default()
            .encode_string(&pools, "a\0b", Attr::empty(), None, true)
            .unwrap_err();
        assert!(err.is_encoding());
        let stats = pools.stats();
        assert_eq!(stats.acquired, stats.released);
    }

    #[test]
    fn test_decode_stops_at_blank() {
        let cells = [
            CCharUtf32::<u32>::with_payload(&u32::from('o').to_ne_bytes(), 0, 0),
            CCharUtf32::<u32>::with_payload(&u32::from('k').to_ne_bytes(), 0, 0),
            CCharUtf32::<u32>::zeroed(),
            CCharUtf32::<u32>::with_payload(&u32::from('x').to_ne_bytes(), 0, 0),
        ];
        assert_eq!(decode_string(&cells[..]), "ok");

        let long = [
            CCharUtf16::<u64>::with_payload(&0xd83du16.to_ne_bytes(), 1 << 40, 0),
            CCharUtf16::<u64>::with_payload(&0xde00u16.to_ne_bytes(), 1 << 40, 0),
            CCharUtf16::<u64>::zeroed(),
        ];
        assert_eq!(decode_string(&long[..]), "😀");
    }

    #[test]
    fn test_empty_string() {
        let pools = Pools::default();
        let encoded = Utf32Codec::default()
            .encode_string(&pools, "", Attr::empty(), None, true)
            .unwrap();
        assert!(encoded.is_empty());
        assert_eq!(encoded.len_with_terminator(), 1);
        assert_eq!(encoded.decode(), "");
    }

    #[test]
    fn test_narrow_string() {
        let pools = Pools::default();
        let codec = NarrowCodec::new(GenericCharWidth::Bits64);
        let encoded = codec
            .encode_string(&pools, "ok", Attr::UNDERLINE, None, true)
            .unwrap();
        assert_eq!(encoded.len(), 2);
        assert_eq!(encoded.kind(), LayoutKind::Narrow64);
        assert!(encoded.iter().all(|ch| ch.decode().attrs == Attr::UNDERLINE));
        assert_eq!(encoded.decode(), "ok");

        assert!(codec
            .encode_string(&pools, "naïve", Attr::empty(), None, false)
            .is_err());
    }
}
