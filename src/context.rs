//! Process-wide context
//!
//! One [`Context`] holds everything the cell core resolves once: the host
//! profile, the codec chosen for it, the synthesized layouts, the buffer
//! pools and the native entry-point table. The process-wide instance is
//! created on first use (or by [`init`]) and lives until exit; independent
//! contexts for foreign hosts can be built with [`Context::with_profile`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use crate::attr::Attr;
use crate::codec::{
    self, CellSlice, DecodedChar, EncodedCharacter, EncodedString, NarrowCharacter, NarrowCodec, NarrowString,
    WideCodec,
};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::layout::{LayoutDescriptor, LayoutSynthesizer};
use crate::mouse::NativeMouseEvent;
use crate::native::{EntryPointTable, SymbolSource};
use crate::platform;
use crate::pool::{PoolStats, Pools};
use crate::profile::HostProfile;

static GLOBAL: OnceLock<Context> = OnceLock::new();

pub struct Context {
    config: Config,
    profile: HostProfile,
    codec: &'static dyn WideCodec,
    narrow: NarrowCodec,
    layouts: LayoutSynthesizer,
    pools: Pools,
    entry_points: OnceLock<Result<EntryPointTable>>,
    bind_attempts: AtomicUsize,
}

impl Context {
    /// Build a context from configuration.
    ///
    /// For the running host this also adopts the environment's locale (when
    /// `set_locale` is on) and cross-checks the compiled `wchar_t` width.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let profile = config.profile();

        if config.targets_running_host() {
            if config.set_locale {
                platform::set_locale();
            }
            let native = platform::native_wchar_width();
            if native != profile.wide_char_width {
                tracing::warn!(
                    profile = profile.wide_char_width.bytes(),
                    compiled = native.bytes(),
                    "profile wchar_t width differs from the compiled one"
                );
            }
        }

        Ok(Self::build(config, profile))
    }

    /// Context for an explicit profile, with default pools and no locale changes
    pub fn with_profile(profile: HostProfile) -> Self {
        let config = Config {
            set_locale: false,
            ..Config::default()
        };
        Self::build(config, profile)
    }

    fn build(config: Config, profile: HostProfile) -> Self {
        let codec = codec::select(&profile);
        tracing::debug!(
            library = %profile.library_base_name,
            codec = ?codec.kind(),
            "created cell context"
        );
        Self {
            narrow: NarrowCodec::for_profile(&profile),
            pools: Pools::new(&config.pool),
            codec,
            profile,
            config,
            layouts: LayoutSynthesizer::new(),
            entry_points: OnceLock::new(),
            bind_attempts: AtomicUsize::new(0),
        }
    }

    pub fn profile(&self) -> &HostProfile {
        &self.profile
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn codec(&self) -> &'static dyn WideCodec {
        self.codec
    }

    pub fn narrow_codec(&self) -> NarrowCodec {
        self.narrow
    }

    pub fn pools(&self) -> &Pools {
        &self.pools
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pools.stats()
    }

    pub fn wide_layout(&self) -> &LayoutDescriptor {
        self.layouts.synthesize_wide(&self.profile)
    }

    pub fn narrow_layout(&self) -> &LayoutDescriptor {
        self.layouts.synthesize_narrow(&self.profile)
    }

    pub fn mouse_layout(&self) -> &LayoutDescriptor {
        self.layouts.synthesize_mouse(&self.profile)
    }

    /// Layout descriptors constructed so far
    pub fn layout_builds(&self) -> usize {
        self.layouts.builds()
    }

    fn wide_codec(&self) -> &'static dyn WideCodec {
        let layout = self.wide_layout();
        debug_assert_eq!(layout.kind, self.codec.kind());
        self.codec
    }

    // Cell construction: the four paths of the native `setcchar` family

    pub fn encode_char(&self, ch: char) -> Result<EncodedCharacter> {
        self.wide_codec().encode_one(ch, Attr::empty(), None)
    }

    pub fn encode_char_with_attrs(&self, ch: char, attrs: Attr) -> Result<EncodedCharacter> {
        self.wide_codec().encode_one(ch, attrs, None)
    }

    /// Raw generic character, text and attribute bits already packed
    pub fn encode_generic(&self, raw: u64) -> Result<EncodedCharacter> {
        self.wide_codec().encode_generic(raw, Attr::empty())
    }

    pub fn encode_generic_with_attrs(&self, raw: u64, attrs: Attr) -> Result<EncodedCharacter> {
        self.wide_codec().encode_generic(raw, attrs)
    }

    /// Character with attributes and an optional color pair
    pub fn encode_one(&self, ch: char, attrs: Attr, color_pair: Option<u16>) -> Result<EncodedCharacter> {
        self.wide_codec().encode_one(ch, attrs, color_pair)
    }

    /// Base character plus combining marks in one cell
    pub fn encode_cluster(&self, cluster: &str, attrs: Attr, color_pair: Option<u16>) -> Result<EncodedCharacter> {
        self.wide_codec().encode_cluster(cluster, attrs, color_pair)
    }

    pub fn decode_char(&self, cell: &EncodedCharacter) -> DecodedChar {
        self.codec.decode_full(cell)
    }

    pub fn encode_string(
        &self,
        text: &str,
        attrs: Attr,
        color_pair: Option<u16>,
        terminated: bool,
    ) -> Result<EncodedString<'_>> {
        self.wide_codec()
            .encode_string(&self.pools, text, attrs, color_pair, terminated)
    }

    pub fn decode_string<'a>(&self, cells: impl Into<CellSlice<'a>>) -> String {
        codec::decode_string(cells)
    }

    pub fn encode_narrow(&self, ch: char, attrs: Attr, color_pair: Option<u16>) -> Result<NarrowCharacter> {
        self.narrow_layout();
        self.narrow.encode_one(ch, attrs, color_pair)
    }

    pub fn encode_narrow_string(
        &self,
        text: &str,
        attrs: Attr,
        color_pair: Option<u16>,
        terminated: bool,
    ) -> Result<NarrowString<'_>> {
        self.narrow_layout();
        self.narrow
            .encode_string(&self.pools, text, attrs, color_pair, terminated)
    }

    /// Zeroed `MEVENT` for `getmouse` to fill
    pub fn mouse_event(&self) -> NativeMouseEvent {
        self.mouse_layout();
        NativeMouseEvent::for_width(self.profile.generic_char_width)
    }

    /// Bind the entry points of the profile's library.
    ///
    /// Runs once; every later call, including concurrent ones, gets the
    /// same table or the same binding error.
    pub fn bind_native_entry_points(&self) -> Result<&EntryPointTable> {
        self.bind_once(|| EntryPointTable::bind(&self.profile.library_base_name))
    }

    /// Like [`bind_native_entry_points`](Self::bind_native_entry_points)
    /// with a caller-supplied symbol source. The first binding wins.
    pub fn bind_native_entry_points_with(&self, source: Arc<dyn SymbolSource>) -> Result<&EntryPointTable> {
        self.bind_once(|| EntryPointTable::bind_with(source))
    }

    /// The bound table; `NotReady` before any binding attempt
    pub fn entry_points(&self) -> Result<&EntryPointTable> {
        match self.entry_points.get() {
            Some(bound) => bound.as_ref().map_err(Clone::clone),
            None => Err(Error::NotReady("native entry-point table")),
        }
    }

    /// Binding attempts performed so far (at most one)
    pub fn bind_attempts(&self) -> usize {
        self.bind_attempts.load(Ordering::Acquire)
    }

    fn bind_once(&self, bind: impl FnOnce() -> Result<EntryPointTable>) -> Result<&EntryPointTable> {
        let bound = self.entry_points.get_or_init(|| {
            self.bind_attempts.fetch_add(1, Ordering::AcqRel);
            let result = bind();
            if let Err(e) = &result {
                tracing::error!(error = %e, "native entry-point binding failed");
            }
            result
        });
        bound.as_ref().map_err(Clone::clone)
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("profile", &self.profile)
            .field("codec", &self.codec)
            .field("narrow", &self.narrow)
            .field("layouts", &self.layouts)
            .field("bound", &self.entry_points.get().map(|r| r.is_ok()))
            .finish()
    }
}

/// Create the process-wide context from `config`.
///
/// Only the first call (or first use of [`global`]) decides the context;
/// later configurations are ignored with a warning.
pub fn init(config: Config) -> Result<&'static Context> {
    if let Some(existing) = GLOBAL.get() {
        tracing::warn!("cell context already initialized; ignoring new configuration");
        return Ok(existing);
    }
    let context = Context::new(config)?;
    if GLOBAL.set(context).is_err() {
        tracing::warn!("cell context initialized concurrently; ignoring new configuration");
    }
    try_global()
}

/// The process-wide context, created from the environment on first use.
///
/// An invalid environment configuration is logged and replaced by defaults.
pub fn global() -> &'static Context {
    GLOBAL.get_or_init(|| {
        let config = Config::from_env().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "ignoring invalid cell configuration");
            Config::default()
        });
        Context::new(config).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to the default cell configuration");
            Context::build(Config::default(), crate::profile::resolve().clone())
        })
    })
}

/// The process-wide context if it has been created
pub fn try_global() -> Result<&'static Context> {
    GLOBAL.get().ok_or(Error::NotReady("process-wide cell context"))
}

/// Encode one character with the process-wide context
pub fn encode_char(ch: char) -> Result<EncodedCharacter> {
    global().encode_char(ch)
}

/// Encode a string with the process-wide context
pub fn encode_string(text: &str, terminated: bool) -> Result<EncodedString<'static>> {
    global().encode_string(text, Attr::empty(), None, terminated)
}

pub fn decode_char(cell: &EncodedCharacter) -> DecodedChar {
    global().decode_char(cell)
}

pub fn decode_string<'a>(cells: impl Into<CellSlice<'a>>) -> String {
    codec::decode_string(cells)
}

/// Bind the native entry points of the process-wide context
pub fn bind_native_entry_points() -> Result<&'static EntryPointTable> {
    global().bind_native_entry_points()
}
