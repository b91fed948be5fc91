//! UTF-16 cells for hosts with a 2-byte `wchar_t`

use super::string::{CellRegion, EncodedString};
use super::{reject_interior_nul, EncodedCharacter, TextEncoding, WideCodec, EMPTY_CHAR};
use crate::attr::{fold_color, Attr};
use crate::error::{EncodingError, Result};
use crate::layout::{AttrWord, CCharUtf16, LayoutKind};
use crate::pool::{BufferedRegion, EncoderState, Poolable, Pools};
use crate::profile::GenericCharWidth;

const UNIT: usize = 2;

/// UTF-16 cells whose `attr` field is `attr_width` wide
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Utf16Codec {
    attr_width: GenericCharWidth,
}

impl Utf16Codec {
    pub const fn new(attr_width: GenericCharWidth) -> Self {
        Self { attr_width }
    }
}

impl Default for Utf16Codec {
    fn default() -> Self {
        Self::new(GenericCharWidth::Bits32)
    }
}

impl WideCodec for Utf16Codec {
    fn kind(&self) -> LayoutKind {
        match self.attr_width {
            GenericCharWidth::Bits32 => LayoutKind::WideUtf16,
            GenericCharWidth::Bits64 => LayoutKind::WideUtf16Long,
        }
    }

    fn encoding(&self) -> TextEncoding {
        TextEncoding::Utf16
    }

    fn intermediate_encoding(&self) -> TextEncoding {
        TextEncoding::Utf16
    }

    fn payload_len(&self) -> usize {
        CCharUtf16::<u32>::PAYLOAD_LEN
    }

    fn attr_width(&self) -> GenericCharWidth {
        self.attr_width
    }

    fn write_payload(&self, cluster: &str, payload: &mut [u8]) -> std::result::Result<(), EncodingError> {
        let needed = cluster.encode_utf16().count() * UNIT;
        if needed > payload.len() {
            return Err(EncodingError::PayloadOverflow {
                needed,
                available: payload.len(),
            });
        }
        for (slot, unit) in payload.chunks_exact_mut(UNIT).zip(cluster.encode_utf16()) {
            slot.copy_from_slice(&unit.to_ne_bytes());
        }
        Ok(())
    }

    fn cell(&self, payload: &[u8], attr: u64, ext_color: i32) -> std::result::Result<EncodedCharacter, EncodingError> {
        Ok(match self.attr_width {
            GenericCharWidth::Bits32 => {
                EncodedCharacter::Utf16(CCharUtf16::try_from_payload(payload, u32::try_from_word(attr)?, ext_color)?)
            },
            GenericCharWidth::Bits64 => {
                EncodedCharacter::Utf16Long(CCharUtf16::try_from_payload(payload, attr, ext_color)?)
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
        reject_interior_nul(text, TextEncoding::Utf16)?;

        // Stage 1: native-endian UTF-16 with a NUL unit
        let units = text.encode_utf16().count();
        let mut state = EncoderState::new(pools.get::<u8>(), (units + 1) * UNIT);
        for (slot, unit) in state.buffer_mut().chunks_exact_mut(UNIT).zip(text.encode_utf16()) {
            slot.copy_from_slice(&unit.to_ne_bytes());
        }
        state.set_lengths((units + 1) * UNIT, units);

        // Stage 2: one cell per code unit
        let (word, ext_color) = fold_color(attrs, color_pair);
        let staged = state.intermediate();
        let cells = match self.attr_width {
            GenericCharWidth::Bits32 => {
                CellRegion::Utf16(lay_out(pools, staged, units, word, ext_color, terminated))
            },
            GenericCharWidth::Bits64 => {
                CellRegion::Utf16Long(lay_out(pools, staged, units, u64::from(word), ext_color, terminated))
            },
        };

        Ok(EncodedString::new(state, cells))
    }
}

fn lay_out<'p, A>(
    pools: &'p Pools,
    staged: &[u8],
    units: usize,
    attr: A,
    ext_color: i32,
    terminated: bool,
) -> BufferedRegion<'p, CCharUtf16<A>>
where
    A: AttrWord,
    CCharUtf16<A>: Poolable,
{
    let mut region = BufferedRegion::acquire(pools.get::<CCharUtf16<A>>(), units, terminated);
    for (cell, unit) in region.as_mut_slice().iter_mut().zip(staged.chunks_exact(UNIT)) {
        *cell = CCharUtf16::with_payload(unit, attr, ext_color);
    }
    region
}

/// Code units of one cell, up to the first NUL unit
pub(crate) fn units<A: AttrWord>(cell: &CCharUtf16<A>) -> impl Iterator<Item = u16> + '_ {
    cell.chars
        .chunks_exact(UNIT)
        .map(|unit| u16::from_ne_bytes([unit[0], unit[1]]))
        .take_while(|&unit| unit != 0)
}

pub(crate) fn first_char<A: AttrWord>(cell: &CCharUtf16<A>) -> char {
    char::decode_utf16(units(cell))
        .find_map(|decoded| decoded.ok())
        .unwrap_or(EMPTY_CHAR)
}

pub(crate) fn cell_text<A: AttrWord>(cell: &CCharUtf16<A>) -> String {
    char::decode_utf16(units(cell))
        .filter_map(|decoded| decoded.ok())
        .collect()
}
