//! Configuration for the cell core
//!
//! Everything here is optional: with no file and no environment overrides
//! the profile comes from the running host. Priority, lowest first: defaults,
//! the TOML file named by `NCCELL_CONFIG`, then `NCCELL_HOST` and
//! `NCCELL_LIBRARY`.

use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::profile::{GenericCharWidth, HostId, HostProfile, WideCharWidth};

pub const ENV_CONFIG: &str = "NCCELL_CONFIG";
pub const ENV_HOST: &str = "NCCELL_HOST";
pub const ENV_LIBRARY: &str = "NCCELL_LIBRARY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Host identifier to resolve instead of the running host
    pub host: Option<String>,
    /// Native library base name override
    pub library: Option<String>,
    /// `wchar_t` width in bytes (2 or 4)
    pub wide_char_width: Option<u8>,
    /// `chtype` width in bits (32 or 64)
    pub generic_char_width: Option<u8>,
    /// Call `setlocale(LC_ALL, "")` when a context for the running host is created
    pub set_locale: bool,
    pub pool: PoolConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: None,
            library: None,
            wide_char_width: None,
            generic_char_width: None,
            set_locale: true,
            pool: PoolConfig::default(),
        }
    }
}

/// Limits of the scratch buffer pools
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Free buffers kept per element type
    pub max_retained: usize,
    /// Largest buffer, in bytes, served from a pool
    pub max_buffer_len: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_retained: 32,
            max_buffer_len: 64 * 1024,
        }
    }
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Defaults, then the file named by `NCCELL_CONFIG`, then single-value overrides
    pub fn from_env() -> Result<Self> {
        let mut config = match env::var_os(ENV_CONFIG) {
            Some(path) => Self::load(path)?,
            None => Config::default(),
        };
        config.apply_env_vars();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_vars(&mut self) {
        if let Ok(val) = env::var(ENV_HOST) {
            if !val.trim().is_empty() {
                self.host = Some(val);
            }
        }
        if let Ok(val) = env::var(ENV_LIBRARY) {
            if !val.trim().is_empty() {
                self.library = Some(val);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(width) = self.wide_char_width {
            if WideCharWidth::from_bytes(usize::from(width)).is_none() {
                return Err(Error::Config(format!(
                    "wide_char_width must be 2 or 4, got {}",
                    width
                )));
            }
        }
        if let Some(bits) = self.generic_char_width {
            if GenericCharWidth::from_bits(u32::from(bits)).is_none() {
                return Err(Error::Config(format!(
                    "generic_char_width must be 32 or 64, got {}",
                    bits
                )));
            }
        }
        if let Some(library) = &self.library {
            if library.trim().is_empty() {
                return Err(Error::Config("library must not be empty".to_string()));
            }
        }
        if self.pool.max_buffer_len == 0 {
            return Err(Error::Config("pool.max_buffer_len must be positive".to_string()));
        }
        Ok(())
    }

    /// True when the profile describes the running host rather than a foreign one
    pub fn targets_running_host(&self) -> bool {
        self.host.is_none()
    }

    /// Resolve the host profile and apply the overrides
    pub fn profile(&self) -> HostProfile {
        let host = match &self.host {
            Some(id) => HostId::parse(id),
            None => HostId::current(),
        };
        let mut profile = HostProfile::for_host(&host);

        if let Some(library) = &self.library {
            profile.library_base_name = library.clone();
        }
        if let Some(width) = self
            .wide_char_width
            .and_then(|w| WideCharWidth::from_bytes(usize::from(w)))
        {
            profile.wide_char_width = width;
        }
        if let Some(bits) = self
            .generic_char_width
            .and_then(|b| GenericCharWidth::from_bits(u32::from(b)))
        {
            profile.generic_char_width = bits;
        }
        profile
    }
}
