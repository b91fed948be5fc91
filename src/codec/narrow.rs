//! Single-byte `chtype` cells
//!
//! A generic character is one integer: the text byte in `A_CHARTEXT`, the
//! rendition flags and packed color pair above it. There is no `ext_color`
//! field, so pairs above 255 keep only the saturated packed value.

use std::ffi::c_void;

use super::string::{NarrowRegion, NarrowString};
use super::{reject_interior_nul, DecodedChar, TextEncoding, EMPTY_CHAR};
use crate::attr::{fold_color, unfold_color, Attr, A_ATTRIBUTES};
use crate::error::{EncodingError, Error, Result};
use crate::layout::{ChType32, ChType64, GenericChar, LayoutKind};
use crate::pool::{BufferedRegion, EncoderState, Pools};
use crate::profile::{GenericCharWidth, HostProfile};

/// One native generic character in the host's width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NarrowCharacter {
    C32(ChType32),
    C64(ChType64),
}

impl NarrowCharacter {
    pub fn raw(&self) -> u64 {
        match self {
            NarrowCharacter::C32(ch) => ch.raw(),
            NarrowCharacter::C64(ch) => ch.raw(),
        }
    }

    pub fn text(&self) -> u8 {
        match self {
            NarrowCharacter::C32(ch) => ch.text(),
            NarrowCharacter::C64(ch) => ch.text(),
        }
    }

    pub fn attr_word(&self) -> u32 {
        match self {
            NarrowCharacter::C32(ch) => ch.attr_word(),
            NarrowCharacter::C64(ch) => ch.attr_word(),
        }
    }

    pub fn as_ptr(&self) -> *const c_void {
        match self {
            NarrowCharacter::C32(ch) => (ch as *const ChType32).cast(),
            NarrowCharacter::C64(ch) => (ch as *const ChType64).cast(),
        }
    }

    /// The text byte as a character; [`EMPTY_CHAR`] for a blank or non-ASCII byte
    pub fn decode_one(&self) -> char {
        let text = self.text();
        if text.is_ascii() {
            char::from(text)
        } else {
            EMPTY_CHAR
        }
    }

    pub fn decode(&self) -> DecodedChar {
        let (attrs, color_pair) = unfold_color(self.attr_word(), 0);
        DecodedChar {
            ch: self.decode_one(),
            attrs,
            color_pair,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NarrowCodec {
    width: GenericCharWidth,
}

impl NarrowCodec {
    pub const fn new(width: GenericCharWidth) -> Self {
        Self { width }
    }

    pub fn for_profile(profile: &HostProfile) -> Self {
        Self::new(profile.generic_char_width)
    }

    pub fn width(&self) -> GenericCharWidth {
        self.width
    }

    pub fn kind(&self) -> LayoutKind {
        match self.width {
            GenericCharWidth::Bits32 => LayoutKind::Narrow32,
            GenericCharWidth::Bits64 => LayoutKind::Narrow64,
        }
    }

    /// Wrap a raw `chtype` value, truncating it to the native width
    pub fn from_raw(&self, raw: u64) -> NarrowCharacter {
        match self.width {
            GenericCharWidth::Bits32 => NarrowCharacter::C32(ChType32::from_raw(raw)),
            GenericCharWidth::Bits64 => NarrowCharacter::C64(ChType64::from_raw(raw)),
        }
    }

    pub fn encode_one(&self, ch: char, attrs: Attr, color_pair: Option<u16>) -> Result<NarrowCharacter> {
        let byte = ascii_byte(ch).ok_or_else(|| {
            Error::encoding(ch.to_string(), TextEncoding::Ascii, EncodingError::Unrepresentable(ch))
        })?;
        let (word, _) = fold_color(attrs, color_pair);
        Ok(self.from_raw(u64::from(word & A_ATTRIBUTES) | u64::from(byte)))
    }

    pub fn decode_one(&self, ch: NarrowCharacter) -> char {
        ch.decode_one()
    }

    /// Lay out an ASCII string one `chtype` per byte
    pub fn encode_string<'p>(
        &self,
        pools: &'p Pools,
        text: &str,
        attrs: Attr,
        color_pair: Option<u16>,
        terminated: bool,
    ) -> Result<NarrowString<'p>> {
        reject_interior_nul(text, TextEncoding::Ascii)?;
        if let Some(bad) = text.chars().find(|ch| !ch.is_ascii()) {
            return Err(Error::encoding(
                text,
                TextEncoding::Ascii,
                EncodingError::Unrepresentable(bad),
            ));
        }

        let len = text.len();
        let mut state = EncoderState::new(pools.get::<u8>(), len + 1);
        state.buffer_mut()[..len].copy_from_slice(text.as_bytes());
        state.set_lengths(len + 1, len);

        let (word, _) = fold_color(attrs, color_pair);
        let word = u64::from(word & A_ATTRIBUTES);
        let staged = &state.intermediate()[..len];
        let cells = match self.width {
            GenericCharWidth::Bits32 => NarrowRegion::C32(lay_out(pools, staged, word, terminated)),
            GenericCharWidth::Bits64 => NarrowRegion::C64(lay_out(pools, staged, word, terminated)),
        };
        Ok(NarrowString::new(state, cells))
    }
}

fn lay_out<'p, C>(pools: &'p Pools, bytes: &[u8], word: u64, terminated: bool) -> BufferedRegion<'p, C>
where
    C: GenericChar + crate::pool::Poolable,
{
    let mut region = BufferedRegion::acquire(pools.get::<C>(), bytes.len(), terminated);
    for (cell, &byte) in region.as_mut_slice().iter_mut().zip(bytes) {
        *cell = C::from_raw(word | u64::from(byte));
    }
    region
}

fn ascii_byte(ch: char) -> Option<u8> {
    if ch.is_ascii() {
        Some(ch as u8)
    } else {
        None
    }
}
