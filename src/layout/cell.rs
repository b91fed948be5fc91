//! Native character cells
//!
//! Fixed-layout records matching the library's `cchar_t` and `chtype` for
//! every host shape. Which one is live is decided at runtime from the
//! [`HostProfile`](crate::profile::HostProfile); the records themselves are
//! ordinary `#[repr(C)]` types.

use std::ffi::c_void;
use std::fmt;
use std::hash::Hash;
use std::mem::{offset_of, size_of};

use super::MAX_CELL_CODEPOINTS;
use crate::attr::{A_ATTRIBUTES, A_CHARTEXT};
use crate::error::EncodingError;

/// Integer type of a cell's `attr` field.
///
/// `attr_t` has the width of `chtype`: 32 bits for the ABI 6 library and on
/// 32-bit hosts, an `unsigned long` for the ABI 5 library on LP64 hosts.
pub trait AttrWord: Copy + Default + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    const ZERO: Self;

    /// Narrow a raw word, failing when set bits do not fit
    fn try_from_word(word: u64) -> Result<Self, EncodingError>;

    fn word(self) -> u64;
}

impl AttrWord for u32 {
    const ZERO: Self = 0;

    fn try_from_word(word: u64) -> Result<Self, EncodingError> {
        u32::try_from(word).map_err(|_| EncodingError::AttributeOverflow { word, bits: 32 })
    }

    fn word(self) -> u64 {
        u64::from(self)
    }
}

impl AttrWord for u64 {
    const ZERO: Self = 0;

    fn try_from_word(word: u64) -> Result<Self, EncodingError> {
        Ok(word)
    }

    fn word(self) -> u64 {
        self
    }
}

/// `cchar_t` with an `A` attribute word and an `N`-byte text payload.
///
/// ```text
/// struct { attr_t attr; byte chars[N]; int32 ext_color; }
/// ```
///
/// `chars` holds the base character and up to four combining marks in the
/// platform wide encoding, NUL-terminated when fewer than five are present.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CCharT<A, const N: usize> {
    pub attr: A,
    pub chars: [u8; N],
    pub ext_color: i32,
}

/// Cell for hosts with a 2-byte `wchar_t`
pub type CCharUtf16<A = u32> = CCharT<A, { 2 * MAX_CELL_CODEPOINTS }>;

/// Cell for hosts with a 4-byte `wchar_t`
pub type CCharUtf32<A = u32> = CCharT<A, { 4 * MAX_CELL_CODEPOINTS }>;

// 32-bit attr_t: payload at offset 4, ext_color aligned to 4.
const _: () = assert!(size_of::<CCharUtf16>() == 20);
const _: () = assert!(offset_of!(CCharUtf16, chars) == 4);
const _: () = assert!(offset_of!(CCharUtf16, ext_color) == 16);
const _: () = assert!(size_of::<CCharUtf32>() == 28);
const _: () = assert!(offset_of!(CCharUtf32, chars) == 4);
const _: () = assert!(offset_of!(CCharUtf32, ext_color) == 24);

// 64-bit attr_t: payload at offset 8, the record padded to a multiple of 8.
const _: () = assert!(size_of::<CCharUtf16<u64>>() == 24);
const _: () = assert!(offset_of!(CCharUtf16<u64>, chars) == 8);
const _: () = assert!(offset_of!(CCharUtf16<u64>, ext_color) == 20);
const _: () = assert!(size_of::<CCharUtf32<u64>>() == 32);
const _: () = assert!(offset_of!(CCharUtf32<u64>, chars) == 8);
const _: () = assert!(offset_of!(CCharUtf32<u64>, ext_color) == 28);

impl<A: AttrWord, const N: usize> Default for CCharT<A, N> {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl<A: AttrWord, const N: usize> CCharT<A, N> {
    pub const PAYLOAD_LEN: usize = N;

    /// All-zero cell, the blank screen position
    pub const fn zeroed() -> Self {
        Self {
            attr: A::ZERO,
            chars: [0; N],
            ext_color: 0,
        }
    }

    /// Cell with the given payload bytes and attribute word.
    ///
    /// A payload longer than `N` bytes is a [`EncodingError::PayloadOverflow`].
    pub fn try_from_payload(payload: &[u8], attr: A, ext_color: i32) -> Result<Self, EncodingError> {
        if payload.len() > N {
            return Err(EncodingError::PayloadOverflow {
                needed: payload.len(),
                available: N,
            });
        }
        Ok(Self::with_payload(payload, attr, ext_color))
    }

    /// Cell with `payload` copied in; the caller guarantees it fits `N` bytes
    pub(crate) fn with_payload(payload: &[u8], attr: A, ext_color: i32) -> Self {
        let mut cell = Self::zeroed();
        cell.chars[..payload.len()].copy_from_slice(payload);
        cell.attr = attr;
        cell.ext_color = ext_color;
        cell
    }

    pub fn payload(&self) -> &[u8] {
        &self.chars
    }

    /// True when the payload holds no text
    pub fn is_blank(&self) -> bool {
        self.chars.iter().all(|&b| b == 0)
    }

    pub fn as_ptr(&self) -> *const c_void {
        (self as *const Self).cast()
    }

    pub fn as_mut_ptr(&mut self) -> *mut c_void {
        (self as *mut Self).cast()
    }
}

/// Native generic character holding one byte of text plus attributes
pub trait GenericChar: Copy + Default + PartialEq + Send + Sync + 'static {
    fn from_raw(raw: u64) -> Self;
    fn raw(self) -> u64;

    fn text(self) -> u8 {
        (self.raw() & u64::from(A_CHARTEXT)) as u8
    }

    /// Attribute and color bits, without the text byte
    fn attr_word(self) -> u32 {
        (self.raw() & u64::from(A_ATTRIBUTES)) as u32
    }
}

/// `chtype` for the ABI 6 library and every 32-bit host
#[repr(transparent)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ChType32(pub u32);

/// `chtype` for the ABI 5 library on LP64 hosts (`unsigned long`)
#[repr(transparent)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ChType64(pub u64);

impl GenericChar for ChType32 {
    fn from_raw(raw: u64) -> Self {
        ChType32(raw as u32)
    }

    fn raw(self) -> u64 {
        u64::from(self.0)
    }
}

impl GenericChar for ChType64 {
    fn from_raw(raw: u64) -> Self {
        ChType64(raw)
    }

    fn raw(self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroed_is_blank() {
        let cell = CCharUtf32::<u32>::zeroed();
        assert!(cell.is_blank());
        assert_eq!(cell.attr, 0);
        assert_eq!(cell.ext_color, 0);
        assert_eq!(cell, CCharUtf32::<u32>::default());
    }

    #[test]
    fn test_from_payload_fills_capacity() {
        let cell = CCharUtf16::<u32>::try_from_payload(&[1; 10], 7, 3).unwrap();
        assert_eq!(cell.payload(), &[1; 10]);
        assert_eq!(cell.attr, 7);
        assert_eq!(cell.ext_color, 3);
    }

    #[test]
    fn test_oversized_payload_is_an_error() {
        let err = CCharUtf16::<u32>::try_from_payload(&[1; 16], 7, 3).unwrap_err();
        assert_eq!(
            err,
            EncodingError::PayloadOverflow {
                needed: 16,
                available: 10
            }
        );
        assert!(CCharUtf32::<u64>::try_from_payload(&[1; 21], 0, 0).is_err());
    }

    #[test]
    fn test_attr_word_widths() {
        assert_eq!(u32::try_from_word(0xffff_ff00), Ok(0xffff_ff00));
        assert_eq!(
            u32::try_from_word(1 << 40),
            Err(EncodingError::AttributeOverflow { word: 1 << 40, bits: 32 })
        );
        assert_eq!(u64::try_from_word(1 << 40), Ok(1 << 40));

        let cell = CCharUtf32::<u64>::try_from_payload(&[0x41, 0, 0, 0], 1 << 40, 0).unwrap();
        assert_eq!(cell.attr.word(), 1 << 40);
    }

    #[test]
    fn test_chtype_fields() {
        let ch = ChType32(0x0020_0341);
        assert_eq!(ch.text(), 0x41);
        assert_eq!(ch.attr_word(), 0x0020_0300);

        let ch = ChType64::from_raw(0x0020_0341);
        assert_eq!(ch.text(), 0x41);
        assert_eq!(ch.raw(), 0x0020_0341);
    }

    #[test]
    fn test_pointer_is_cell_start() {
        let cell = CCharUtf16::<u32>::zeroed();
        assert_eq!(cell.as_ptr() as usize, &cell as *const _ as usize);
    }
}
