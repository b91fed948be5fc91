//! Shared test doubles

#![allow(dead_code)]

use std::collections::HashMap;
use std::ffi::{c_char, c_int, c_void};
use std::sync::atomic::{AtomicUsize, Ordering};

use ncurses_cell::native::{EntryPointTable, SymbolSource};

extern "C" fn stub() -> c_int {
    0
}

extern "C" fn stub_version() -> *const c_char {
    c"ncurses 6.4.20230520".as_ptr()
}

/// Symbol source standing in for the native library
pub struct FakeLibrary {
    name: String,
    symbols: HashMap<&'static str, usize>,
    lookups: AtomicUsize,
}

impl FakeLibrary {
    /// Exports every symbol the entry-point table needs
    pub fn complete() -> Self {
        Self::without(&[])
    }

    /// Exports everything except `missing`
    pub fn without(missing: &[&str]) -> Self {
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
        Self {
            name: "libncursesw.so.6".to_string(),
            symbols,
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl SymbolSource for FakeLibrary {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookup(&self, symbol: &str) -> Option<*const c_void> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.symbols.get(symbol).map(|&address| address as *const c_void)
    }
}
