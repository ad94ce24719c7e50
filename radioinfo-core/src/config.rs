use crate::channel::ChannelId;
use crate::error::{CoreError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RadioInfoConfig {
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Provider-specific tables, parsed by the provider crates
    #[serde(default)]
    pub providers: ProvidersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Seconds between bulk refreshes of cached schedules
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Channel selected at startup
    #[serde(default = "default_initial_channel")]
    pub initial_channel: ChannelId,
}

const fn default_interval_secs() -> u64 {
    3600
}

const fn default_initial_channel() -> ChannelId {
    132
}

impl RefreshConfig {
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            initial_channel: default_initial_channel(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to a file in the cache directory
    #[serde(default)]
    pub enabled: bool,
}

/// Raw `[providers.*]` tables.
///
/// The core does not know provider settings; each provider crate
/// deserializes its own table with [`ProvidersConfig::get`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProvidersConfig(HashMap<String, toml::Value>);

impl ProvidersConfig {
    /// Deserialize the table for one provider.
    ///
    /// Returns `Ok(None)` when the provider has no table.
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` if the table does not match `T`.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        self.0
            .get(name)
            .map(|value| {
                value.clone().try_into().map_err(|e| CoreError::ConfigInvalid {
                    message: format!("providers.{name}: {e}"),
                })
            })
            .transpose()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }
}

impl RadioInfoConfig {
    /// Get the configuration directory path (~/.config/radioinfo/)
    #[must_use]
    pub fn config_dir() -> PathBuf {
        crate::paths::config_dir()
    }

    /// Get the config file path (~/.config/radioinfo/config.toml)
    #[must_use]
    pub fn config_path() -> PathBuf {
        crate::paths::config_path()
    }

    /// Load config from the default path or create a template on first run
    ///
    /// # Errors
    ///
    /// Returns `ConfigNotFound` after writing the template, or an error if the
    /// file cannot be read, parsed or validated.
    pub fn load_or_create(provider_templates: Option<&[&str]>) -> Result<Self> {
        Self::load_or_create_at(&Self::config_path(), provider_templates)
    }

    /// Load config from `path` or create a template there
    ///
    /// # Errors
    ///
    /// See [`RadioInfoConfig::load_or_create`].
    pub fn load_or_create_at(path: &Path, provider_templates: Option<&[&str]>) -> Result<Self> {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }

            fs::write(path, build_config_template(provider_templates))?;

            return Err(CoreError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate config from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML or fails validation.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate fields that serde cannot check
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` if the refresh interval is zero.
    pub fn validate(&self) -> Result<()> {
        if self.refresh.interval_secs == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "refresh.interval_secs must be greater than 0".into(),
            });
        }
        Ok(())
    }
}

/// Core section of the config template
pub const CONFIG_TEMPLATE: &str = r"# RadioInfo Configuration
# ~/.config/radioinfo/config.toml

[refresh]
# Seconds between refreshes of every cached schedule
interval_secs = 3600
# Channel selected at startup (132 = P1)
initial_channel = 132

[logging]
# Also write logs to <cache dir>/radioinfo/radioinfo.log
enabled = false

";

/// Build the full config template from the core section and provider sections
#[must_use]
pub fn build_config_template(provider_templates: Option<&[&str]>) -> String {
    let mut template = String::from(CONFIG_TEMPLATE);
    for provider_template in provider_templates.unwrap_or_default() {
        template.push_str(provider_template);
    }
    template
}
