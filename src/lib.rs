//! ncurses cell core
//!
//! Lets Rust code exchange character data with a native curses library
//! whose cell layout is only known at runtime. This crate provides:
//!
//! - `profile`: host identification, library name and character widths
//! - `layout`: the native `cchar_t`/`chtype`/`MEVENT` shapes and their descriptors
//! - `codec`: character and string conversion into native cells
//! - `pool`: pooled scratch buffers for string conversion
//! - `native`: dynamic binding of the library's entry points
//! - `context`: the process-wide instance tying the above together
//!
//! ```no_run
//! use ncurses_cell::Attr;
//!
//! let ctx = ncurses_cell::global();
//! let cell = ctx.encode_one('A', Attr::BOLD, Some(3))?;
//! let table = ctx.bind_native_entry_points()?;
//! let window = unsafe { (table.initscr)() };
//! unsafe { (table.wadd_wch)(window, cell.as_ptr()) };
//! # Ok::<(), ncurses_cell::Error>(())
//! ```

pub mod attr;
pub mod codec;
pub mod config;
pub mod context;
pub mod error;
pub mod layout;
pub mod mouse;
pub mod native;
pub mod platform;
pub mod pool;
pub mod profile;

pub use attr::Attr;
pub use codec::{DecodedChar, EncodedCharacter, EncodedString, WideCodec, EMPTY_CHAR};
pub use config::Config;
pub use context::{
    bind_native_entry_points, decode_char, decode_string, encode_char, encode_string, global, init, try_global,
    Context,
};
pub use error::{EncodingError, Error, Result};
pub use layout::{LayoutDescriptor, LayoutKind, MAX_CELL_CODEPOINTS};
pub use native::EntryPointTable;
pub use profile::{resolve, resolve_for, HostProfile};
