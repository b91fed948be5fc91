//! Mouse events
//!
//! `MEVENT` carries the button state in an `mmask_t`, which has the width of
//! the generic character type, so its layout is host dependent too.

use std::ffi::{c_int, c_short, c_void};
use std::mem::{offset_of, size_of};

use crate::profile::GenericCharWidth;

/// `NCURSES_MOUSE_MASK(button, mask)`: five bits per button.
///
/// Buttons count from 1; button 0 maps like button 1, and a group shifted
/// past the 64-bit mask is empty.
pub const fn mouse_mask(button: u32, mask: u64) -> u64 {
    let shift = button.saturating_sub(1).saturating_mul(5);
    match mask.checked_shl(shift) {
        Some(bits) => bits,
        None => 0,
    }
}

pub const BUTTON_RELEASED: u64 = 0o01;
pub const BUTTON_PRESSED: u64 = 0o02;
pub const BUTTON_CLICKED: u64 = 0o04;
pub const DOUBLE_CLICKED: u64 = 0o10;
pub const TRIPLE_CLICKED: u64 = 0o20;
pub const RESERVED_EVENT: u64 = 0o40;

pub const BUTTON1_RELEASED: u64 = mouse_mask(1, BUTTON_RELEASED);
pub const BUTTON1_PRESSED: u64 = mouse_mask(1, BUTTON_PRESSED);
pub const BUTTON1_CLICKED: u64 = mouse_mask(1, BUTTON_CLICKED);
pub const BUTTON1_DOUBLE_CLICKED: u64 = mouse_mask(1, DOUBLE_CLICKED);
pub const BUTTON1_TRIPLE_CLICKED: u64 = mouse_mask(1, TRIPLE_CLICKED);

pub const BUTTON2_RELEASED: u64 = mouse_mask(2, BUTTON_RELEASED);
pub const BUTTON2_PRESSED: u64 = mouse_mask(2, BUTTON_PRESSED);
pub const BUTTON2_CLICKED: u64 = mouse_mask(2, BUTTON_CLICKED);
pub const BUTTON2_DOUBLE_CLICKED: u64 = mouse_mask(2, DOUBLE_CLICKED);
pub const BUTTON2_TRIPLE_CLICKED: u64 = mouse_mask(2, TRIPLE_CLICKED);

pub const BUTTON3_RELEASED: u64 = mouse_mask(3, BUTTON_RELEASED);
pub const BUTTON3_PRESSED: u64 = mouse_mask(3, BUTTON_PRESSED);
pub const BUTTON3_CLICKED: u64 = mouse_mask(3, BUTTON_CLICKED);
pub const BUTTON3_DOUBLE_CLICKED: u64 = mouse_mask(3, DOUBLE_CLICKED);
pub const BUTTON3_TRIPLE_CLICKED: u64 = mouse_mask(3, TRIPLE_CLICKED);

pub const BUTTON4_RELEASED: u64 = mouse_mask(4, BUTTON_RELEASED);
pub const BUTTON4_PRESSED: u64 = mouse_mask(4, BUTTON_PRESSED);
pub const BUTTON4_CLICKED: u64 = mouse_mask(4, BUTTON_CLICKED);
pub const BUTTON4_DOUBLE_CLICKED: u64 = mouse_mask(4, DOUBLE_CLICKED);
pub const BUTTON4_TRIPLE_CLICKED: u64 = mouse_mask(4, TRIPLE_CLICKED);

// Provisional: button 5 and the modifier group have not been verified
// against a 32-bit x86 build of the library.
pub const BUTTON5_RELEASED: u64 = mouse_mask(5, BUTTON_RELEASED);
pub const BUTTON5_PRESSED: u64 = mouse_mask(5, BUTTON_PRESSED);
pub const BUTTON5_CLICKED: u64 = mouse_mask(5, BUTTON_CLICKED);
pub const BUTTON5_DOUBLE_CLICKED: u64 = mouse_mask(5, DOUBLE_CLICKED);
pub const BUTTON5_TRIPLE_CLICKED: u64 = mouse_mask(5, TRIPLE_CLICKED);

pub const BUTTON_CTRL: u64 = mouse_mask(6, 0o01);
pub const BUTTON_SHIFT: u64 = mouse_mask(6, 0o02);
pub const BUTTON_ALT: u64 = mouse_mask(6, 0o04);
pub const REPORT_MOUSE_POSITION: u64 = mouse_mask(6, 0o10);

pub const ALL_MOUSE_EVENTS: u64 = REPORT_MOUSE_POSITION - 1;

/// `MEVENT` with a 32-bit `mmask_t`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MEvent32 {
    pub id: c_short,
    pub x: c_int,
    pub y: c_int,
    pub z: c_int,
    pub bstate: u32,
}

/// `MEVENT` with a 64-bit `mmask_t`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MEvent64 {
    pub id: c_short,
    pub x: c_int,
    pub y: c_int,
    pub z: c_int,
    pub bstate: u64,
}

const _: () = assert!(size_of::<MEvent32>() == 20);
const _: () = assert!(offset_of!(MEvent32, bstate) == 16);
const _: () = assert!(size_of::<MEvent64>() == 24);
const _: () = assert!(offset_of!(MEvent64, bstate) == 16);

/// A mouse event independent of the native mask width
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MouseEvent {
    pub id: i16,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub bstate: u64,
}

impl MouseEvent {
    pub fn contains(&self, mask: u64) -> bool {
        self.bstate & mask == mask
    }

    /// Button number (1-5) this event reports, if any
    pub fn button(&self) -> Option<u32> {
        (1..=5).find(|&button| self.bstate & mouse_mask(button, 0o37) != 0)
    }
}

impl From<MEvent32> for MouseEvent {
    fn from(ev: MEvent32) -> Self {
        Self {
            id: ev.id,
            x: ev.x,
            y: ev.y,
            z: ev.z,
            bstate: u64::from(ev.bstate),
        }
    }
}

impl From<MEvent64> for MouseEvent {
    fn from(ev: MEvent64) -> Self {
        Self {
            id: ev.id,
            x: ev.x,
            y: ev.y,
            z: ev.z,
            bstate: ev.bstate,
        }
    }
}

impl From<MouseEvent> for MEvent32 {
    fn from(ev: MouseEvent) -> Self {
        Self {
            id: ev.id,
            x: ev.x,
            y: ev.y,
            z: ev.z,
            bstate: ev.bstate as u32,
        }
    }
}

impl From<MouseEvent> for MEvent64 {
    fn from(ev: MouseEvent) -> Self {
        Self {
            id: ev.id,
            x: ev.x,
            y: ev.y,
            z: ev.z,
            bstate: ev.bstate,
        }
    }
}

/// `MEVENT` buffer in the host's shape, for `getmouse` to fill
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeMouseEvent {
    Mask32(MEvent32),
    Mask64(MEvent64),
}

impl NativeMouseEvent {
    /// Zeroed event for a host whose `mmask_t` has the given width
    pub fn for_width(width: GenericCharWidth) -> Self {
        match width {
            GenericCharWidth::Bits32 => NativeMouseEvent::Mask32(MEvent32::default()),
            GenericCharWidth::Bits64 => NativeMouseEvent::Mask64(MEvent64::default()),
        }
    }

    pub fn as_mut_ptr(&mut self) -> *mut c_void {
        match self {
            NativeMouseEvent::Mask32(ev) => (ev as *mut MEvent32).cast(),
            NativeMouseEvent::Mask64(ev) => (ev as *mut MEvent64).cast(),
        }
    }

    pub fn event(&self) -> MouseEvent {
        match *self {
            NativeMouseEvent::Mask32(ev) => ev.into(),
            NativeMouseEvent::Mask64(ev) => ev.into(),
        }
    }
}
