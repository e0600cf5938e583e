//! Settings loading.
//!
//! Settings are layered, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. an optional TOML file
//! 3. `MADBOARD_*` environment variables
//! 4. command-line flags
//!
//! ```toml
//! api_url = "http://127.0.0.1:5000"
//! refresh = "10s"
//! request_timeout = "10s"
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use ::config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use crate::data::duration::parse_duration;

const ENV_PREFIX: &str = "MADBOARD";

/// Resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub refresh: Duration,
    pub request_timeout: Duration,
}

/// Values given on the command line; `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_url: Option<String>,
    pub refresh: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    api_url: String,
    refresh: String,
    request_timeout: String,
}

impl Settings {
    /// Load settings from all layers.
    pub fn load(config_path: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        Self::load_from(config_path, overrides, Environment::with_prefix(ENV_PREFIX))
    }

    fn load_from(
        config_path: Option<&Path>,
        overrides: &Overrides,
        environment: Environment,
    ) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("api_url", crate::source::DEFAULT_ENDPOINT)?
            .set_default("refresh", "10s")?
            .set_default("request_timeout", "10s")?;

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }

        let config = builder
            .add_source(environment)
            .set_override_option("api_url", overrides.api_url.clone())?
            .set_override_option("refresh", overrides.refresh.clone())?
            .build()
            .context("Failed to load settings")?;

        let raw: RawSettings = config.try_deserialize().context("Invalid settings")?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawSettings) -> Result<Self> {
        let refresh = parse_duration(&raw.refresh)
            .with_context(|| format!("Invalid refresh interval: {}", raw.refresh))?;
        if refresh.is_zero() {
            bail!("Refresh interval must be greater than zero");
        }

        let request_timeout = parse_duration(&raw.request_timeout)
            .with_context(|| format!("Invalid request timeout: {}", raw.request_timeout))?;
        if request_timeout.is_zero() {
            bail!("Request timeout must be greater than zero");
        }

        if raw.api_url.trim().is_empty() {
            bail!("API URL must not be empty");
        }

        Ok(Self {
            api_url: raw.api_url.trim().to_string(),
            refresh,
            request_timeout,
        })
    }
}
