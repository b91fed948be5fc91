//! UTF-32 cells for hosts with a 4-byte `wchar_t`

use super::string::{CellRegion, EncodedString};
use super::{reject_interior_nul, EncodedCharacter, TextEncoding, WideCodec, EMPTY_CHAR};
use crate::attr::{fold_color, Attr};
use crate::error::{EncodingError, Result};
use crate::layout::{AttrWord, CCharUtf32, LayoutKind};
use crate::pool::{BufferedRegion, EncoderState, Poolable, Pools};
use crate::profile::GenericCharWidth;

const UNIT: usize = 4;

/// UTF-32 cells whose `attr` field is `attr_width` wide
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Utf32Codec {
    attr_width: GenericCharWidth,
}

impl Utf32Codec {
    pub const fn new(attr_width: GenericCharWidth) -> Self {
        Self { attr_width }
    }
}

impl Default for Utf32Codec {
    fn default() -> Self {
        Self::new(GenericCharWidth::Bits32)
    }
}

impl WideCodec for Utf32Codec {
    fn kind(&self) -> LayoutKind {
        match self.attr_width {
            GenericCharWidth::Bits32 => LayoutKind::WideUtf32,
            GenericCharWidth::Bits64 => LayoutKind::WideUtf32Long,
        }
    }

    fn encoding(&self) -> TextEncoding {
        TextEncoding::Utf32
    }

    fn intermediate_encoding(&self) -> TextEncoding {
        TextEncoding::Utf8
    }

    fn payload_len(&self) -> usize {
        CCharUtf32::<u32>::PAYLOAD_LEN
    }

    fn attr_width(&self) -> GenericCharWidth {
        self.attr_width
    }

    fn write_payload(&self, cluster: &str, payload: &mut [u8]) -> std::result::Result<(), EncodingError> {
        let needed = cluster.chars().count() * UNIT;
        if needed > payload.len() {
            return Err(EncodingError::PayloadOverflow {
                needed,
                available: payload.len(),
            });
        }
        for (slot, ch) in payload.chunks_exact_mut(UNIT).zip(cluster.chars()) {
            slot.copy_from_slice(&u32::from(ch).to_ne_bytes());
        }
        Ok(())
    }

    fn cell(&self, payload: &[u8], attr: u64, ext_color: i32) -> std::result::Result<EncodedCharacter, EncodingError> {
        Ok(match self.attr_width {
            GenericCharWidth::Bits32 => {
                EncodedCharacter::Utf32(CCharUtf32::try_from_payload(payload, u32::try_from_word(attr)?, ext_color)?)
            },
            GenericCharWidth::Bits64 => {
                EncodedCharacter::Utf32Long(CCharUtf32::try_from_payload(payload, attr, ext_color)?)
            },
        })
    }

    fn encode_string<'p>(
        &self,
        pools: &'p Pools,
        text: &str,
        attrs: Attr,
        color_pair: Option<u16>,
        terminated: bool,
    ) -> Result<EncodedString<'p>> {
        reject_interior_nul(text, TextEncoding::Utf8)?;

        // Stage 1: the multibyte form with a NUL byte
        let bytes = text.len();
        let mut state = EncoderState::new(pools.get::<u8>(), bytes + 1);
        state.buffer_mut()[..bytes].copy_from_slice(text.as_bytes());
        let code_points = text.chars().count();
        state.set_lengths(bytes + 1, code_points);

        // Stage 2: one cell per code point of the staged text
        let (word, ext_color) = fold_color(attrs, color_pair);
        let cells = match self.attr_width {
            GenericCharWidth::Bits32 => {
                CellRegion::Utf32(lay_out(pools, text, code_points, word, ext_color, terminated))
            },
            GenericCharWidth::Bits64 => {
                CellRegion::Utf32Long(lay_out(pools, text, code_points, u64::from(word), ext_color, terminated))
            },
        };

        Ok(EncodedString::new(state, cells))
    }
}

fn lay_out<'p, A>(
    pools: &'p Pools,
    text: &str,
    code_points: usize,
    attr: A,
    ext_color: i32,
    terminated: bool,
) -> BufferedRegion<'p, CCharUtf32<A>>
where
    A: AttrWord,
    CCharUtf32<A>: Poolable,
{
    let mut region = BufferedRegion::acquire(pools.get::<CCharUtf32<A>>(), code_points, terminated);
    for (cell, ch) in region.as_mut_slice().iter_mut().zip(text.chars()) {
        *cell = CCharUtf32::with_payload(&u32::from(ch).to_ne_bytes(), attr, ext_color);
    }
    region
}

/// Code units of one cell, up to the first NUL unit
pub(crate) fn units<A: AttrWord>(cell: &CCharUtf32<A>) -> impl Iterator<Item = u32> + '_ {
    cell.chars
        .chunks_exact(UNIT)
        .map(|unit| u32::from_ne_bytes([unit[0], unit[1], unit[2], unit[3]]))
        .take_while(|&unit| unit != 0)
}

pub(crate) fn first_char<A: AttrWord>(cell: &CCharUtf32<A>) -> char {
    units(cell).find_map(char::from_u32).unwrap_or(EMPTY_CHAR)
}

pub(crate) fn cell_text<A: AttrWord>(cell: &CCharUtf32<A>) -> String {
    units(cell).filter_map(char::from_u32).collect()
}
