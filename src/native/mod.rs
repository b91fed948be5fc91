//! Native Entry-Point Synthesizer
//!
//! The library's file name is only known once the host profile is resolved,
//! so the primitives the cell core needs are looked up by name at startup
//! and stored as typed function pointers. Binding is all or nothing: if any
//! symbol is missing, no table is produced.

mod loader;

use std::ffi::{c_char, c_int, c_void, CStr};
use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;

pub use loader::{library_file_name, DynamicLibrary, SymbolSource};

use crate::error::{Error, Result};

/// `ERR` as returned by the integer entry points
pub const ERR: c_int = -1;
pub const OK: c_int = 0;

/// Opaque native `WINDOW`
#[repr(C)]
pub struct Window {
    _private: [u8; 0],
}

macro_rules! entry_points {
    ($( $(#[$meta:meta])* $name:ident: fn($($arg:ty),*) -> $ret:ty; )*) => {
        /// Typed entry points into the native library.
        ///
        /// Cell arguments are passed as untyped pointers because their shape
        /// depends on the host profile; build them with the codecs.
        pub struct EntryPointTable {
            source: Arc<dyn SymbolSource>,
            $( $(#[$meta])* pub $name: unsafe extern "C" fn($($arg),*) -> $ret, )*
        }

        impl EntryPointTable {
            /// Every symbol the table binds
            pub const SYMBOLS: &'static [&'static str] = &[$(stringify!($name)),*];

            fn resolve(source: Arc<dyn SymbolSource>) -> Result<Self> {
                let missing: Vec<&str> = Self::SYMBOLS
                    .iter()
                    .copied()
                    .filter(|symbol| source.lookup(symbol).is_none())
                    .collect();
                if !missing.is_empty() {
                    return Err(Error::SymbolBinding {
                        library: source.name().to_string(),
                        symbols: missing.join(", "),
                    });
                }

                Ok(Self {
                    $(
                        $name: {
                            let address = lookup(source.as_ref(), stringify!($name))?;
                            // SAFETY: the library exports this name as a C function
                            // with the declared signature
                            unsafe {
                                std::mem::transmute::<*const c_void, unsafe extern "C" fn($($arg),*) -> $ret>(address)
                            }
                        },
                    )*
                    source,
                })
            }
        }
    };
}

entry_points! {
    initscr: fn() -> *mut Window;
    endwin: fn() -> c_int;
    curses_version: fn() -> *const c_char;
    newwin: fn(c_int, c_int, c_int, c_int) -> *mut Window;
    delwin: fn(*mut Window) -> c_int;
    wrefresh: fn(*mut Window) -> c_int;
    /// `cchar_t *`
    wadd_wch: fn(*mut Window, *const c_void) -> c_int;
    /// `cchar_t *`, count
    wadd_wchnstr: fn(*mut Window, *const c_void, c_int) -> c_int;
    /// `cchar_t *` to fill
    win_wch: fn(*mut Window, *mut c_void) -> c_int;
    /// `cchar_t *` to fill, count
    win_wchnstr: fn(*mut Window, *mut c_void, c_int) -> c_int;
    waddnstr: fn(*mut Window, *const c_char, c_int) -> c_int;
    /// `wchar_t *`, count
    waddnwstr: fn(*mut Window, *const c_void, c_int) -> c_int;
    /// `chtype *`, count
    waddchnstr: fn(*mut Window, *const c_void, c_int) -> c_int;
    /// `MEVENT *` to fill
    getmouse: fn(*mut c_void) -> c_int;
}

impl EntryPointTable {
    /// Open `library_base_name` and bind every entry point
    pub fn bind(library_base_name: &str) -> Result<Self> {
        let library = DynamicLibrary::open(library_base_name)?;
        Self::bind_with(Arc::new(library))
    }

    /// Bind every entry point from an already opened source
    pub fn bind_with(source: Arc<dyn SymbolSource>) -> Result<Self> {
        let table = Self::resolve(source)?;
        tracing::debug!(
            library = table.library(),
            symbols = Self::SYMBOLS.len(),
            "bound native entry points"
        );
        Ok(table)
    }

    /// Name of the library the table is bound to
    pub fn library(&self) -> &str {
        self.source.name()
    }

    /// Version string reported by `curses_version()`
    pub fn version(&self) -> Result<String> {
        // SAFETY: curses_version takes no arguments and returns a pointer to
        // a static string, or null
        let version = unsafe { (self.curses_version)() };
        let version = check_ptr(version.cast_mut(), "curses_version")?;
        // SAFETY: the pointer is non-null and points at a NUL-terminated
        // string owned by the library
        let version = unsafe { CStr::from_ptr(version.as_ptr()) };
        Ok(version.to_string_lossy().into_owned())
    }
}

impl fmt::Debug for EntryPointTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryPointTable")
            .field("library", &self.library())
            .field("symbols", &Self::SYMBOLS.len())
            .finish()
    }
}

fn lookup(source: &dyn SymbolSource, symbol: &str) -> Result<*const c_void> {
    source.lookup(symbol).ok_or_else(|| Error::SymbolBinding {
        library: source.name().to_string(),
        symbols: symbol.to_string(),
    })
}

/// Turn an integer sentinel into a result: negative values are failures
pub fn check(code: c_int, function: &'static str) -> Result<c_int> {
    if code < 0 {
        Err(Error::NativeCall { function, code })
    } else {
        Ok(code)
    }
}

/// Turn a pointer sentinel into a result: null is a failure
pub fn check_ptr<T>(ptr: *mut T, function: &'static str) -> Result<NonNull<T>> {
    NonNull::new(ptr).ok_or(Error::NullPointer(function))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    extern "C" fn stub() -> c_int {
        OK
    }

    extern "C" fn stub_version() -> *const c_char {
        c"ncurses 6.4.20230520".as_ptr()
    }

    struct FakeLibrary {
        symbols: HashMap<&'static str, usize>,
    }

    impl FakeLibrary {
        fn without(missing: &[&str]) -> Self {
            let symbols = EntryPointTable::SYMBOLS
                .iter()
                .copied()
                .filter(|symbol| !missing.contains(symbol))
                .map(|symbol| {
                    let address = if symbol == "curses_version" {
                        stub_version as usize
                    } else {
                        stub as usize
                    };
                    (symbol, address)
                })
                .collect();
            Self { symbols }
        }
    }

    impl SymbolSource for FakeLibrary {
        fn name(&self) -> &str {
            "libfake.so.6"
        }

        fn lookup(&self, symbol: &str) -> Option<*const c_void> {
            self.symbols.get(symbol).map(|&address| address as *const c_void)
        }
    }

    #[test]
    fn test_bind_complete_library() {
        let table = EntryPointTable::bind_with(Arc::new(FakeLibrary::without(&[]))).unwrap();
        assert_eq!(table.library(), "libfake.so.6");
        assert_eq!(table.version().unwrap(), "ncurses 6.4.20230520");
        // SAFETY: the fake binds every integer entry point to `stub`
        assert_eq!(unsafe { (table.endwin)() }, OK);
    }

    #[test]
    fn test_missing_symbols_are_all_reported() {
        let err = EntryPointTable::bind_with(Arc::new(FakeLibrary::without(&["wadd_wch", "getmouse"])))
            .unwrap_err();
        match err {
            Error::SymbolBinding { library, symbols } => {
                assert_eq!(library, "libfake.so.6");
                assert_eq!(symbols, "wadd_wch, getmouse");
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_symbol_list() {
        assert_eq!(EntryPointTable::SYMBOLS.len(), 14);
        assert!(EntryPointTable::SYMBOLS.contains(&"win_wchnstr"));
    }

    #[test]
    fn test_check_sentinels() {
        assert_eq!(check(3, "wrefresh"), Ok(3));
        assert_eq!(
            check(ERR, "wrefresh"),
            Err(Error::NativeCall {
                function: "wrefresh",
                code: -1
            })
        );
        assert_eq!(
            check_ptr(std::ptr::null_mut::<Window>(), "newwin"),
            Err(Error::NullPointer("newwin"))
        );
        let mut value = 0u8;
        assert!(check_ptr(&mut value as *mut u8, "x").is_ok());
    }
}
