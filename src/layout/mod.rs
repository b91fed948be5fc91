//! Layout Synthesizer
//!
//! The set of native shapes is closed: four wide cells (2- or 4-byte
//! `wchar_t`, each with a 32- or 64-bit `attr_t`), two generic characters
//! (32- or 64-bit `chtype`) and two mouse events. [`LayoutSynthesizer`] picks the one matching a host profile and
//! describes it once; later calls return the same descriptor.

mod cell;

use std::mem::{align_of, offset_of, size_of};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use serde::Serialize;

pub use cell::{AttrWord, CCharT, CCharUtf16, CCharUtf32, ChType32, ChType64, GenericChar};

use crate::mouse::{MEvent32, MEvent64};
use crate::profile::{GenericCharWidth, HostProfile, WideCharWidth};

/// Code points in one display cell: a base character plus four combining marks
pub const MAX_CELL_CODEPOINTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LayoutKind {
    /// `cchar_t` with a 2-byte `wchar_t`
    WideUtf16,
    /// `cchar_t` with a 4-byte `wchar_t`
    WideUtf32,
    /// `cchar_t` with a 2-byte `wchar_t` and a 64-bit `attr_t`
    WideUtf16Long,
    /// `cchar_t` with a 4-byte `wchar_t` and a 64-bit `attr_t`
    WideUtf32Long,
    /// 32-bit `chtype`
    Narrow32,
    /// 64-bit `chtype`
    Narrow64,
    /// `MEVENT` with a 32-bit `mmask_t`
    Mouse32,
    /// `MEVENT` with a 64-bit `mmask_t`
    Mouse64,
}

impl LayoutKind {
    /// Wide cell shape: payload from the `wchar_t` width, `attr` as wide as `chtype`
    pub fn wide_for(profile: &HostProfile) -> Self {
        match (profile.wide_char_width, profile.generic_char_width) {
            (WideCharWidth::Two, GenericCharWidth::Bits32) => LayoutKind::WideUtf16,
            (WideCharWidth::Four, GenericCharWidth::Bits32) => LayoutKind::WideUtf32,
            (WideCharWidth::Two, GenericCharWidth::Bits64) => LayoutKind::WideUtf16Long,
            (WideCharWidth::Four, GenericCharWidth::Bits64) => LayoutKind::WideUtf32Long,
        }
    }

    pub fn is_wide(self) -> bool {
        matches!(
            self,
            LayoutKind::WideUtf16 | LayoutKind::WideUtf32 | LayoutKind::WideUtf16Long | LayoutKind::WideUtf32Long
        )
    }

    pub fn narrow_for(profile: &HostProfile) -> Self {
        match profile.generic_char_width {
            GenericCharWidth::Bits32 => LayoutKind::Narrow32,
            GenericCharWidth::Bits64 => LayoutKind::Narrow64,
        }
    }

    pub fn mouse_for(profile: &HostProfile) -> Self {
        match profile.generic_char_width {
            GenericCharWidth::Bits32 => LayoutKind::Mouse32,
            GenericCharWidth::Bits64 => LayoutKind::Mouse64,
        }
    }
}

/// Byte positions of one native shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LayoutDescriptor {
    pub kind: LayoutKind,
    /// Native size, including trailing alignment padding
    pub size: usize,
    pub align: usize,
    pub attr_offset: usize,
    pub attr_len: usize,
    pub payload_offset: usize,
    pub payload_len: usize,
    pub ext_color_offset: Option<usize>,
}

impl LayoutDescriptor {
    /// Describe the static record behind `kind`
    pub fn of(kind: LayoutKind) -> Self {
        match kind {
            LayoutKind::WideUtf16 => Self::wide::<u32, { 2 * MAX_CELL_CODEPOINTS }>(kind),
            LayoutKind::WideUtf32 => Self::wide::<u32, { 4 * MAX_CELL_CODEPOINTS }>(kind),
            LayoutKind::WideUtf16Long => Self::wide::<u64, { 2 * MAX_CELL_CODEPOINTS }>(kind),
            LayoutKind::WideUtf32Long => Self::wide::<u64, { 4 * MAX_CELL_CODEPOINTS }>(kind),
            LayoutKind::Narrow32 => Self::narrow::<ChType32>(kind),
            LayoutKind::Narrow64 => Self::narrow::<ChType64>(kind),
            LayoutKind::Mouse32 => Self {
                kind,
                size: size_of::<MEvent32>(),
                align: align_of::<MEvent32>(),
                attr_offset: offset_of!(MEvent32, bstate),
                attr_len: size_of::<u32>(),
                payload_offset: 0,
                payload_len: 0,
                ext_color_offset: None,
            },
            LayoutKind::Mouse64 => Self {
                kind,
                size: size_of::<MEvent64>(),
                align: align_of::<MEvent64>(),
                attr_offset: offset_of!(MEvent64, bstate),
                attr_len: size_of::<u64>(),
                payload_offset: 0,
                payload_len: 0,
                ext_color_offset: None,
            },
        }
    }

    fn wide<A: AttrWord, const N: usize>(kind: LayoutKind) -> Self {
        Self {
            kind,
            size: size_of::<CCharT<A, N>>(),
            align: align_of::<CCharT<A, N>>(),
            attr_offset: offset_of!(CCharT<A, N>, attr),
            attr_len: size_of::<A>(),
            payload_offset: offset_of!(CCharT<A, N>, chars),
            payload_len: N,
            ext_color_offset: Some(offset_of!(CCharT<A, N>, ext_color)),
        }
    }

    fn narrow<C: GenericChar>(kind: LayoutKind) -> Self {
        // text byte and attributes share the single integer
        Self {
            kind,
            size: size_of::<C>(),
            align: align_of::<C>(),
            attr_offset: 0,
            attr_len: size_of::<C>(),
            payload_offset: 0,
            payload_len: 1,
            ext_color_offset: None,
        }
    }

    /// Sum of the field sizes, without alignment padding
    pub fn field_bytes(&self) -> usize {
        if self.kind.is_wide() {
            self.attr_len + self.payload_len + 4
        } else {
            self.size
        }
    }

    pub fn is_wide(&self) -> bool {
        self.kind.is_wide()
    }
}

/// Builds each layout descriptor once and caches it for the process.
///
/// Concurrent first callers block until the single construction finishes;
/// nobody observes a partial descriptor.
#[derive(Debug, Default)]
pub struct LayoutSynthesizer {
    wide: OnceLock<LayoutDescriptor>,
    narrow: OnceLock<LayoutDescriptor>,
    mouse: OnceLock<LayoutDescriptor>,
    builds: AtomicUsize,
}

impl LayoutSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wide cell layout. The first profile passed in wins.
    pub fn synthesize_wide(&self, profile: &HostProfile) -> &LayoutDescriptor {
        self.wide.get_or_init(|| self.build(LayoutKind::wide_for(profile)))
    }

    /// Generic character layout. The first profile passed in wins.
    pub fn synthesize_narrow(&self, profile: &HostProfile) -> &LayoutDescriptor {
        self.narrow.get_or_init(|| self.build(LayoutKind::narrow_for(profile)))
    }

    /// Mouse event layout. The first profile passed in wins.
    pub fn synthesize_mouse(&self, profile: &HostProfile) -> &LayoutDescriptor {
        self.mouse.get_or_init(|| self.build(LayoutKind::mouse_for(profile)))
    }

    /// Number of descriptor constructions performed so far
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::Acquire)
    }

    fn build(&self, kind: LayoutKind) -> LayoutDescriptor {
        self.builds.fetch_add(1, Ordering::AcqRel);
        let descriptor = LayoutDescriptor::of(kind);
        tracing::debug!(
            ?kind,
            size = descriptor.size,
            payload = descriptor.payload_len,
            "synthesized native layout"
        );
        descriptor
    }
}
