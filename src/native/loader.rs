//! Shared library loading

use std::env::consts::DLL_SUFFIX;
use std::ffi::c_void;
use std::fmt;

use libloading::Library;

use crate::error::{Error, Result};

/// Something that can resolve native symbols by name.
///
/// [`DynamicLibrary`] is the real source; anything else (a statically linked
/// table, a test double) can stand in for it.
pub trait SymbolSource: Send + Sync {
    /// Name reported in binding errors
    fn name(&self) -> &str;

    /// Address of `symbol`, or `None` when the library does not export it
    fn lookup(&self, symbol: &str) -> Option<*const c_void>;
}

/// A native library opened by its computed file name
pub struct DynamicLibrary {
    file_name: String,
    library: Library,
}

impl DynamicLibrary {
    /// Open the library for a profile's base name.
    ///
    /// Base names that already carry a platform suffix (`libncursesw.so.6`,
    /// `libncurses.dylib`) are used as is; bare names get the host's suffix.
    pub fn open(base_name: &str) -> Result<Self> {
        let file_name = library_file_name(base_name);
        // SAFETY: loading runs the library's initializers; the curses
        // libraries only set up their own static state there
        let library = unsafe { Library::new(&file_name) }.map_err(|e| Error::LibraryLoad {
            library: file_name.clone(),
            message: e.to_string(),
        })?;
        tracing::debug!(library = %file_name, "loaded native library");
        Ok(Self { file_name, library })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

impl SymbolSource for DynamicLibrary {
    fn name(&self) -> &str {
        &self.file_name
    }

    fn lookup(&self, symbol: &str) -> Option<*const c_void> {
        // SAFETY: the symbol is only read as an address here; the entry-point
        // table gives it its function type
        let address = unsafe { self.library.get::<*const c_void>(symbol.as_bytes()) }.ok()?;
        let address = *address;
        if address.is_null() {
            None
        } else {
            Some(address)
        }
    }
}

impl fmt::Debug for DynamicLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicLibrary")
            .field("file_name", &self.file_name)
            .finish_non_exhaustive()
    }
}

/// File name to hand to the platform loader for a library base name
pub fn library_file_name(base_name: &str) -> String {
    let has_suffix = base_name.contains(".so") || base_name.ends_with(".dylib") || base_name.ends_with(".dll");
    if has_suffix {
        base_name.to_string()
    } else {
        format!("{}{}", base_name, DLL_SUFFIX)
    }
}
