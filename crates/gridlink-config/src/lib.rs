//! Layered configuration for the gridlink daemon.
//!
//! TOML file plus `GRIDLINK_`-prefixed environment variables, merged over
//! built-in defaults. The daemon translates [`Settings`] into mediator and
//! adapter construction.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Settings structs ────────────────────────────────────────────────

/// Top-level daemon configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub mediator: MediatorSettings,

    #[serde(default)]
    pub log: LogSettings,

    /// Named adapter sections.
    #[serde(default)]
    pub adapters: HashMap<String, AdapterSettings>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct MediatorSettings {
    /// Bounded wait for a pending device registration before a dependent
    /// gadget arrival is discarded.
    #[serde(default = "default_registration_wait_ms")]
    pub registration_wait_ms: u64,

    /// Broadcast channel depth for derived events.
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,

    /// Adapter event queue depth.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for MediatorSettings {
    fn default() -> Self {
        Self {
            registration_wait_ms: default_registration_wait_ms(),
            bus_capacity: default_bus_capacity(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl MediatorSettings {
    pub fn registration_wait(&self) -> Duration {
        Duration::from_millis(self.registration_wait_ms)
    }
}

fn default_registration_wait_ms() -> u64 {
    1000
}
fn default_bus_capacity() -> usize {
    256
}
fn default_queue_capacity() -> usize {
    64
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LogSettings {
    /// Tracing filter directive (e.g. "info", "gridlink_core=debug").
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "info".into()
}

/// One adapter section.
#[derive(Debug, Deserialize, Serialize)]
pub struct AdapterSettings {
    /// Adapter implementation to instantiate (e.g. "sim").
    #[serde(default = "default_adapter_kind")]
    pub kind: String,

    /// Whether the adapter starts with joining permitted.
    #[serde(default = "default_permit_join")]
    pub permit_join: bool,

    /// Report interval for simulated adapters.
    #[serde(default = "default_report_interval_ms")]
    pub report_interval_ms: u64,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            kind: default_adapter_kind(),
            permit_join: default_permit_join(),
            report_interval_ms: default_report_interval_ms(),
        }
    }
}

impl AdapterSettings {
    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }
}

fn default_adapter_kind() -> String {
    "sim".into()
}
fn default_permit_join() -> bool {
    true
}
fn default_report_interval_ms() -> u64 {
    5000
}

// ── Loading ─────────────────────────────────────────────────────────

/// Default config file location: `<config dir>/gridlink/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("io", "gridlink", "gridlink")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Load settings: defaults, then the TOML file (if present), then
/// `GRIDLINK_`-prefixed environment variables (`__` separates nesting).
pub fn load(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(Settings::default()));

    let path = path
        .map(Path::to_path_buf)
        .or_else(default_config_path);
    if let Some(path) = path {
        figment = figment.merge(Toml::file(path));
    }

    let settings: Settings = figment
        .merge(Env::prefixed("GRIDLINK_").split("__"))
        .extract()?;
    validate(&settings)?;
    Ok(settings)
}

fn validate(settings: &Settings) -> Result<(), ConfigError> {
    if settings.mediator.registration_wait_ms == 0 {
        return Err(ConfigError::Validation {
            field: "mediator.registration_wait_ms".into(),
            reason: "must be greater than zero".into(),
        });
    }
    if settings.mediator.bus_capacity == 0 || settings.mediator.queue_capacity == 0 {
        return Err(ConfigError::Validation {
            field: "mediator".into(),
            reason: "channel capacities must be greater than zero".into(),
        });
    }
    Ok(())
}
