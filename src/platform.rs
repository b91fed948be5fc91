//! Host facts the profile cannot express
//!
//! The native library converts multibyte text through the C locale, which
//! starts out as `"C"` until the program adopts the environment's locale.

use std::sync::OnceLock;

use crate::profile::WideCharWidth;

/// Adopt the environment's locale (`setlocale(LC_ALL, "")`).
///
/// Runs at most once per process; calling `setlocale` concurrently with
/// other locale-dependent C code is unsound, so later calls return the
/// first result. Returns the locale name the C library settled on.
pub fn set_locale() -> Option<&'static str> {
    static LOCALE: OnceLock<Option<String>> = OnceLock::new();
    LOCALE
        .get_or_init(|| {
            let locale = adopt_environment_locale();
            tracing::debug!(locale = ?locale, "set process locale");
            locale
        })
        .as_deref()
}

#[cfg(unix)]
fn adopt_environment_locale() -> Option<String> {
    use std::ffi::CStr;

    // SAFETY: guarded by the OnceLock above; the empty string is a valid
    // NUL-terminated locale name
    let name = unsafe { libc::setlocale(libc::LC_ALL, c"".as_ptr()) };
    if name.is_null() {
        return None;
    }
    // SAFETY: setlocale returned a non-null pointer to a NUL-terminated
    // string that stays valid until the next setlocale call
    let name = unsafe { CStr::from_ptr(name) };
    Some(name.to_string_lossy().into_owned())
}

#[cfg(not(unix))]
fn adopt_environment_locale() -> Option<String> {
    // The Windows build of the library works on UTF-16 directly
    None
}

/// Width of `wchar_t` in the C environment this crate was compiled for
pub fn native_wchar_width() -> WideCharWidth {
    #[cfg(unix)]
    let bytes = std::mem::size_of::<libc::wchar_t>();
    #[cfg(not(unix))]
    let bytes = 2;

    WideCharWidth::from_bytes(bytes).unwrap_or(WideCharWidth::Four)
}
