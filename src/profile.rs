//! Host Profile
//!
//! Resolves which native library and which character sizes apply to a host.
//! Resolution is a pure function of a host identifier of the form
//! `<os>[.<version>]-<arch>` (for example `linux-x64`, `ubuntu.22.04-x64`,
//! `win10-x64` or `osx.13-arm64`). Unknown identifiers never fail: they fall
//! back to the newest profile of their OS family, or to the generic Linux
//! profile when the family itself is unknown.

use std::fmt;
use std::sync::OnceLock;

use serde::Serialize;

/// Byte width of one native `wchar_t`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WideCharWidth {
    Two,
    Four,
}

impl WideCharWidth {
    pub const fn bytes(self) -> usize {
        match self {
            WideCharWidth::Two => 2,
            WideCharWidth::Four => 4,
        }
    }

    pub const fn from_bytes(bytes: usize) -> Option<Self> {
        match bytes {
            2 => Some(WideCharWidth::Two),
            4 => Some(WideCharWidth::Four),
            _ => None,
        }
    }
}

/// Bit width of the native generic character (`chtype`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GenericCharWidth {
    Bits32,
    Bits64,
}

impl GenericCharWidth {
    pub const fn bits(self) -> u32 {
        match self {
            GenericCharWidth::Bits32 => 32,
            GenericCharWidth::Bits64 => 64,
        }
    }

    pub const fn bytes(self) -> usize {
        self.bits() as usize / 8
    }

    pub const fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            32 => Some(GenericCharWidth::Bits32),
            64 => Some(GenericCharWidth::Bits64),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OsFamily {
    Windows,
    Linux,
    MacOs,
    Bsd,
}

/// Native library ABI generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Abi {
    V5,
    V6,
}

/// Parsed host identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostId {
    pub os: String,
    pub version: Option<String>,
    pub arch: String,
}

impl HostId {
    /// Parse an identifier such as `ubuntu.22.04-x64`.
    ///
    /// The architecture is everything after the last `-`; a missing
    /// architecture is recorded as `unknown`.
    pub fn parse(id: &str) -> Self {
        let id = id.trim().to_ascii_lowercase();
        let (os_part, arch) = match id.rsplit_once('-') {
            Some((os, arch)) if !os.is_empty() => (os.to_string(), arch.to_string()),
            _ => (id.clone(), "unknown".to_string()),
        };
        let (os, version) = match os_part.split_once('.') {
            Some((os, version)) if !version.is_empty() => (os.to_string(), Some(version.to_string())),
            _ => (os_part, None),
        };
        Self { os, version, arch }
    }

    /// Identifier of the running host
    pub fn current() -> Self {
        let os = match std::env::consts::OS {
            "macos" => "osx",
            "windows" => "win",
            other => other,
        };
        let arch = match std::env::consts::ARCH {
            "x86_64" => "x64",
            "aarch64" => "arm64",
            "x86" => "x86",
            "arm" => "arm",
            other => other,
        };
        Self {
            os: os.to_string(),
            version: None,
            arch: arch.to_string(),
        }
    }

    /// OS family, if the OS name is recognized
    pub fn family(&self) -> Option<OsFamily> {
        let os = self.os.as_str();
        // "linux-musl" and similar keep their libc suffix in the OS part
        let base = os.split('-').next().unwrap_or(os);
        if base.starts_with("win") {
            return Some(OsFamily::Windows);
        }
        match base {
            "linux" | "ubuntu" | "debian" | "fedora" | "rhel" | "centos" | "alpine" | "opensuse"
            | "sles" | "arch" | "gentoo" | "linuxmint" | "ol" | "rocky" | "almalinux" => {
                Some(OsFamily::Linux)
            },
            "osx" | "macos" | "darwin" => Some(OsFamily::MacOs),
            "freebsd" | "openbsd" | "netbsd" | "dragonfly" => Some(OsFamily::Bsd),
            _ => None,
        }
    }

    /// Whether pointers, and so `unsigned long`, are 64 bits wide
    pub fn is_64bit(&self) -> bool {
        !matches!(self.arch.as_str(), "x86" | "arm" | "armel" | "armv6" | "wasm32")
    }

    fn major_version(&self) -> Option<u32> {
        self.version
            .as_deref()
            .and_then(|v| v.split('.').next())
            .and_then(|major| major.parse().ok())
    }

    /// ABI of the library the host ships by default
    fn abi(&self) -> Abi {
        let major = match self.major_version() {
            Some(major) => major,
            None => return Abi::V6,
        };
        let base = self.os.split('-').next().unwrap_or(&self.os);
        let v5 = match base {
            "rhel" | "centos" | "ol" => major < 8,
            "debian" => major < 10,
            "ubuntu" => major < 18,
            _ => false,
        };
        if v5 {
            Abi::V5
        } else {
            Abi::V6
        }
    }
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}.{}-{}", self.os, version, self.arch),
            None => write!(f, "{}-{}", self.os, self.arch),
        }
    }
}

/// Immutable description of the native character sizes for one host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostProfile {
    pub library_base_name: String,
    pub wide_char_width: WideCharWidth,
    pub generic_char_width: GenericCharWidth,
    pub is_windows_family: bool,
    pub family: OsFamily,
    pub abi: Abi,
}

impl HostProfile {
    /// Build a profile directly, bypassing identifier resolution
    pub fn new(
        library_base_name: impl Into<String>,
        wide_char_width: WideCharWidth,
        generic_char_width: GenericCharWidth,
        is_windows_family: bool,
    ) -> Self {
        Self {
            library_base_name: library_base_name.into(),
            wide_char_width,
            generic_char_width,
            is_windows_family,
            family: if is_windows_family {
                OsFamily::Windows
            } else {
                OsFamily::Linux
            },
            abi: match generic_char_width {
                GenericCharWidth::Bits32 => Abi::V6,
                GenericCharWidth::Bits64 => Abi::V5,
            },
        }
    }

    /// Profile for a parsed host identifier
    pub fn for_host(host: &HostId) -> Self {
        let family = match host.family() {
            Some(family) => family,
            None => {
                tracing::debug!(host = %host, "unrecognized host, using the generic Linux profile");
                OsFamily::Linux
            },
        };

        match family {
            OsFamily::Windows => Self {
                library_base_name: "libncursesw6".to_string(),
                wide_char_width: WideCharWidth::Two,
                // LLP64: unsigned long stays 32 bits
                generic_char_width: GenericCharWidth::Bits32,
                is_windows_family: true,
                family,
                abi: Abi::V6,
            },
            OsFamily::Linux => {
                let abi = host.abi();
                let (library, generic) = match abi {
                    Abi::V6 => ("libncursesw.so.6", GenericCharWidth::Bits32),
                    Abi::V5 if host.is_64bit() => ("libncursesw.so.5", GenericCharWidth::Bits64),
                    Abi::V5 => ("libncursesw.so.5", GenericCharWidth::Bits32),
                };
                Self {
                    library_base_name: library.to_string(),
                    wide_char_width: WideCharWidth::Four,
                    generic_char_width: generic,
                    is_windows_family: false,
                    family,
                    abi,
                }
            },
            OsFamily::MacOs => Self {
                library_base_name: "libncurses.dylib".to_string(),
                wide_char_width: WideCharWidth::Four,
                generic_char_width: GenericCharWidth::Bits32,
                is_windows_family: false,
                family,
                abi: Abi::V6,
            },
            OsFamily::Bsd => Self {
                library_base_name: "libncursesw.so.9".to_string(),
                wide_char_width: WideCharWidth::Four,
                generic_char_width: GenericCharWidth::Bits32,
                is_windows_family: false,
                family,
                abi: Abi::V6,
            },
        }
    }

    /// Payload bytes of one wide cell: `wchar_t` width times five code points
    pub const fn payload_len(&self) -> usize {
        self.wide_char_width.bytes() * crate::layout::MAX_CELL_CODEPOINTS
    }

    /// Bytes of a wide cell's `attr` field (`attr_t` is as wide as `chtype`)
    pub const fn attr_len(&self) -> usize {
        self.generic_char_width.bytes()
    }
}

/// Resolve the profile for an identifier string. Pure and total.
pub fn resolve_for(id: &str) -> HostProfile {
    HostProfile::for_host(&HostId::parse(id))
}

/// Profile of the running host, computed once per process
pub fn resolve() -> &'static HostProfile {
    static PROFILE: OnceLock<HostProfile> = OnceLock::new();
    PROFILE.get_or_init(|| {
        let host = HostId::current();
        let profile = HostProfile::for_host(&host);
        tracing::debug!(
            host = %host,
            library = %profile.library_base_name,
            wchar = profile.wide_char_width.bytes(),
            chtype = profile.generic_char_width.bits(),
            "resolved host profile"
        );
        profile
    })
}
