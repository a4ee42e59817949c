//! Projtree settings.
//!
//! These are projtree's own knobs (which executable to invoke, flag names,
//! notification threshold, logging), not the declarative project config the
//! reconciler consumes. Loaded with precedence: built-in defaults, then
//! `~/.config/projtree/config.toml`, then `PROJTREE_*` environment overrides.

use crate::error::ApiError;
use crate::logging::LoggingConfig;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How the external project CLI is invoked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliSettings {
    /// Executable name or path.
    #[serde(default = "default_command")]
    pub command: String,

    /// Flag requesting machine-readable output on list/detail commands.
    #[serde(default = "default_json_flag")]
    pub json_flag: String,
}

fn default_command() -> String {
    "proj".to_string()
}

fn default_json_flag() -> String {
    "--json".to_string()
}

impl Default for CliSettings {
    fn default() -> Self {
        CliSettings {
            command: default_command(),
            json_flag: default_json_flag(),
        }
    }
}

/// Root settings structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub cli: CliSettings,

    /// Remaining-day threshold at or below which a scratch org expiry notice
    /// is produced.
    #[serde(default = "default_expiry_notice_days")]
    pub expiry_notice_days: u32,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_expiry_notice_days() -> u32 {
    7
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            cli: CliSettings::default(),
            expiry_notice_days: default_expiry_notice_days(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Settings loader: defaults, then the user config file, then environment.
pub struct SettingsLoader;

impl SettingsLoader {
    /// Path to the user settings file.
    pub fn user_config_path() -> Option<PathBuf> {
        std::env::var("HOME").ok().map(|home| {
            PathBuf::from(home)
                .join(".config")
                .join("projtree")
                .join("config.toml")
        })
    }

    /// Load settings. A missing file is normal; a malformed one is an error.
    pub fn load() -> Result<Settings, ApiError> {
        let mut builder = Config::builder()
            .set_default("cli.command", default_command())?
            .set_default("cli.json_flag", default_json_flag())?
            .set_default("expiry_notice_days", i64::from(default_expiry_notice_days()))?;

        if let Some(path) = Self::user_config_path() {
            if path.exists() {
                builder = builder.add_source(File::from(path).required(false));
            }
        }
        builder = builder.add_source(Environment::with_prefix("PROJTREE").separator("__"));

        let settings = builder.build()?.try_deserialize::<Settings>()?;
        Ok(settings)
    }
}
