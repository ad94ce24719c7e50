//! Sveriges Radio provider configuration.

use const_format::concatcp;
use radioinfo_core::{CoreError, ProvidersConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Provider name used in config file
pub const PROVIDER_NAME: &str = "sr";

/// Default base URL of the Sveriges Radio open API
pub const DEFAULT_BASE_URL: &str = "https://api.sr.se/api/v2/";

/// Default timeout for HTTP requests (10 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default number of retry attempts
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Sveriges Radio specific configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SrProviderConfig {
    /// API root; endpoint paths are resolved against it
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retries for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

const fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

impl Default for SrProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl SrProviderConfig {
    /// Extract SR config from the dynamic providers config.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be parsed.
    pub fn from_providers(providers: &ProvidersConfig) -> Result<Option<Self>, CoreError> {
        providers.get(PROVIDER_NAME)
    }

    /// Validate that required fields are present.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is empty or the timeout is zero.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.base_url.trim().is_empty() {
            return Err(CoreError::ConfigMissingField {
                field: "providers.sr.base_url".into(),
            });
        }
        if self.timeout_secs == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "providers.sr.timeout_secs must be greater than 0".into(),
            });
        }
        Ok(())
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Config template for the SR provider.
/// This is appended to the base config template when creating a new config file.
pub const CONFIG_TEMPLATE: &str = concatcp!(
    "[providers.sr]\n",
    "# Sveriges Radio open API\n",
    "base_url = \"",
    DEFAULT_BASE_URL,
    "\"\n",
    "timeout_secs = ",
    DEFAULT_TIMEOUT_SECS,
    "\n",
    "max_retries = ",
    DEFAULT_MAX_RETRIES,
    "\n\n"
);

#[cfg(test)]
mod tests {
    use super::*;
    use radioinfo_core::{build_config_template, RadioInfoConfig};

    #[test]
    fn test_template_round_trips_to_defaults() {
        let template = build_config_template(Some(&[CONFIG_TEMPLATE]));
        let config = RadioInfoConfig::from_toml_str(&template).unwrap();
        let sr = SrProviderConfig::from_providers(&config.providers).unwrap();
        assert_eq!(sr, Some(SrProviderConfig::default()));
    }

    #[test]
    fn test_missing_table_is_none() {
        let config = RadioInfoConfig::from_toml_str("").unwrap();
        assert_eq!(SrProviderConfig::from_providers(&config.providers).unwrap(), None);
    }

    #[test]
    fn test_partial_table_fills_defaults() {
        let config =
            RadioInfoConfig::from_toml_str("[providers.sr]\ntimeout_secs = 30\n").unwrap();
        let sr = SrProviderConfig::from_providers(&config.providers)
            .unwrap()
            .unwrap();
        assert_eq!(sr.base_url, DEFAULT_BASE_URL);
        assert_eq!(sr.timeout(), Duration::from_secs(30));
        assert_eq!(sr.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn test_validate() {
        assert!(SrProviderConfig::default().validate().is_ok());

        let empty_url = SrProviderConfig {
            base_url: "  ".into(),
            ..SrProviderConfig::default()
        };
        assert!(matches!(
            empty_url.validate(),
            Err(CoreError::ConfigMissingField { .. })
        ));

        let zero_timeout = SrProviderConfig {
            timeout_secs: 0,
            ..SrProviderConfig::default()
        };
        assert!(matches!(
            zero_timeout.validate(),
            Err(CoreError::ConfigInvalid { .. })
        ));
    }
}
