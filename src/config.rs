//! Settings and deployment mode.
//!
//! The deployment mode is read from `APP_ENV` once per process. Everything
//! else comes from an optional TOML file:
//!
//! ```toml
//! addr = "0.0.0.0:3000"
//! mode = "development"
//! enabled = true
//! page_ref = "page_1"
//! ```

use std::path::Path;
use std::sync::OnceLock;

use serde::Deserialize;

use crate::error::Error;
use crate::fetch::Fetcher;
use crate::recorder::RecorderOptions;
use crate::selector::Enabled;
use crate::wrapper::FetchHarConfig;

/// Environment variable naming the deployment mode.
pub const MODE_VAR: &str = "APP_ENV";
/// Environment variable overriding [`Settings::addr`].
pub const ADDR_VAR: &str = "FETCH_HAR_ADDR";

const DEFAULT_ADDR: &str = "127.0.0.1:3000";

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Development,
    Production,
}

impl Mode {
    /// `production` or `prod` (any case) is production; everything else,
    /// including an unset variable, is development.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("production") || v.eq_ignore_ascii_case("prod") => {
                Self::Production
            }
            _ => Self::Development,
        }
    }

    /// The mode of this process, resolved on first use.
    pub fn current() -> Self {
        static MODE: OnceLock<Mode> = OnceLock::new();
        *MODE.get_or_init(|| Mode::parse(std::env::var(MODE_VAR).ok().as_deref()))
    }

    pub fn is_production(self) -> bool {
        self == Self::Production
    }
}

// ── Settings ──────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub addr: String,
    pub mode: Mode,
    /// Forces instrumentation on or off regardless of `mode`.
    pub enabled: Option<bool>,
    pub page_ref: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_owned(),
            mode: Mode::current(),
            enabled: None,
            page_ref: None,
        }
    }
}

impl Settings {
    /// Reads `path` when given (defaults otherwise), then applies the
    /// `FETCH_HAR_ADDR` override.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let mut settings = match path {
            Some(path) => Self::from_toml_str(&std::fs::read_to_string(path)?)?,
            None => Self::default(),
        };
        if let Ok(addr) = std::env::var(ADDR_VAR) {
            settings.addr = addr;
        }
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, Error> {
        let settings: Self = toml::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(Error::Config(format!("invalid addr `{}`", self.addr)));
        }
        Ok(())
    }

    pub fn enabled(&self) -> Enabled {
        match self.enabled {
            Some(flag) => Enabled::Flag(flag),
            None => Enabled::for_mode(self.mode),
        }
    }

    /// Wrapper configuration around the explicitly injected base fetcher.
    pub fn fetch_har_config(&self, fetch: Fetcher) -> FetchHarConfig {
        FetchHarConfig::new(fetch)
            .enabled(self.enabled())
            .recorder(RecorderOptions { page_ref: self.page_ref.clone(), ..Default::default() })
    }
}
