//! Piggy-back settings.
//!
//! [`PiggyBackSettings::load()`] reads the `piggy_back` section of
//! `config/piggyback.toml` (optional) and `PIGGYBACK__*` environment
//! variables:
//!
//! ```toml
//! [piggy_back]
//! quoting = "when_needed"
//! join_style = "left_join"
//!
//! [[piggy_back.declarations]]
//! entity = "Order"
//! name = "customer"
//! from = "customer"
//! attributes = ["name"]
//! ```

use crate::piggy_back::fragment::{JoinStyle, Quoting};
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

const CONFIG_FILE: &str = "config/piggyback.toml";
const ENV_PREFIX: &str = "PIGGYBACK";
const SECTION: &str = "piggy_back";

/// A declaration loaded from configuration
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct EntityDeclaration {
    /// Owner entity type
    pub entity: String,
    pub name: String,
    /// Association the attributes come from
    pub from: String,
    /// Target columns; empty means every content column
    #[serde(default)]
    pub attributes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct PiggyBackSettings {
    #[serde(default)]
    pub quoting: Quoting,
    #[serde(default)]
    pub join_style: JoinStyle,
    #[serde(default)]
    pub declarations: Vec<EntityDeclaration>,
}

impl PiggyBackSettings {
    /// Load settings from `config/piggyback.toml`, falling back to env vars.
    ///
    /// A missing `piggy_back` section yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

        let settings = match builder.build() {
            Ok(cfg) => cfg,
            Err(err) => {
                if std::path::Path::new(CONFIG_FILE).exists() {
                    log::warn!("failed to load {CONFIG_FILE}, falling back to env: {err}");
                }
                Config::builder()
                    .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
                    .build()
                    .map_err(|env_err| {
                        ConfigError::Message(format!(
                            "Failed to load configuration from file and env: {err}, then env-only error: {env_err}"
                        ))
                    })?
            }
        };

        Self::from_config(&settings)
    }

    /// Parse settings from a TOML document.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        Self::from_config(&settings)
    }

    fn from_config(settings: &Config) -> Result<Self, ConfigError> {
        match settings.get::<PiggyBackSettings>(SECTION) {
            Ok(parsed) => Ok(parsed),
            Err(ConfigError::NotFound(_)) => Ok(Self::default()),
            Err(e) => Err(ConfigError::Message(format!(
                "Piggy-back configuration could not be loaded: {e}"
            ))),
        }
    }
}
