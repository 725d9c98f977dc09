// SPDX-License-Identifier: AGPL-3.0-or-later

//! Settings management
//!
//! Settings live in `~/.cortado/settings.toml`. Every field has a serde
//! default so a partial file, or no file at all, yields a working
//! configuration.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CortadoError, Result};
use crate::profile::BusinessProfile;

/// Main settings structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Provider selection and backends
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Function catalog configuration
    #[serde(default)]
    pub functions: FunctionsConfig,

    /// The business the assistant speaks for
    #[serde(default)]
    pub business: BusinessConfig,
}

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Provider the session starts with
    #[serde(default = "default_provider")]
    pub default: String,

    /// HTTP backend, if one is configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            default: default_provider(),
            http: None,
        }
    }
}

/// HTTP backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Chat-completions endpoint URL
    pub base_url: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model identifier to request
    #[serde(default = "default_model")]
    pub model: String,
}

/// Function catalog configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FunctionsConfig {
    /// Names the session may call; empty allows everything
    #[serde(default)]
    pub allow_list: Vec<String>,

    /// Remote manifest of additional functions, loaded once at startup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_url: Option<String>,

    /// Per-function endpoint overrides, function name to URL
    #[serde(default)]
    pub endpoints: HashMap<String, String>,
}

/// Business configuration, mapped onto `BusinessProfile`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessConfig {
    /// Display name
    #[serde(default = "default_business_name")]
    pub name: String,

    /// Short description used in the system prompt
    #[serde(default = "default_business_description")]
    pub description: String,

    /// Desired voice
    #[serde(default = "default_business_tone")]
    pub tone: String,
}

impl Default for BusinessConfig {
    fn default() -> Self {
        Self {
            name: default_business_name(),
            description: default_business_description(),
            tone: default_business_tone(),
        }
    }
}

fn default_provider() -> String {
    "offline".to_string()
}

fn default_api_key_env() -> String {
    "CORTADO_API_KEY".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_business_name() -> String {
    BusinessProfile::default().name
}

fn default_business_description() -> String {
    BusinessProfile::default().description
}

fn default_business_tone() -> String {
    BusinessProfile::default().tone
}

impl Settings {
    /// Path to the settings file
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| CortadoError::Config("could not determine home directory".to_string()))?;
        Ok(home.join(".cortado").join("settings.toml"))
    }

    /// Load settings from the default path; missing file yields defaults
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    /// Load settings from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(target: "cortado.config", path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to an explicit path, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check the settings for internally inconsistent values
    pub fn validate(&self) -> Result<()> {
        if self.providers.default.is_empty() {
            return Err(CortadoError::Config(
                "providers.default must not be empty".to_string(),
            ));
        }
        if self.providers.default == "http" && self.providers.http.is_none() {
            return Err(CortadoError::Config(
                "providers.default is \"http\" but no [providers.http] section is configured"
                    .to_string(),
            ));
        }
        if let Some(http) = &self.providers.http {
            if http.base_url.is_empty() {
                return Err(CortadoError::Config(
                    "providers.http.base_url must not be empty".to_string(),
                ));
            }
        }
        if let Some(url) = &self.functions.manifest_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(CortadoError::Config(format!(
                    "functions.manifest_url is not an http(s) URL: {}",
                    url
                )));
            }
        }
        Ok(())
    }

    /// The configured business as a profile
    pub fn business_profile(&self) -> BusinessProfile {
        BusinessProfile {
            name: self.business.name.clone(),
            description: self.business.description.clone(),
            tone: self.business.tone.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.providers.default, "offline");
        assert!(settings.providers.http.is_none());
        assert!(settings.functions.allow_list.is_empty());
        assert_eq!(settings.business.name, "Cortado");
        settings.validate().unwrap();
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(settings.providers.default, "offline");
    }

    #[test]
    fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");

        let mut settings = Settings::default();
        settings.providers.default = "http".to_string();
        settings.providers.http = Some(HttpConfig {
            base_url: "http://localhost:8080/v1/chat/completions".to_string(),
            api_key_env: "CORTADO_API_KEY".to_string(),
            model: "test-model".to_string(),
        });
        settings
            .functions
            .allow_list
            .push("get_loyalty_points".to_string());
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded.providers.default, "http");
        assert_eq!(loaded.providers.http.unwrap().model, "test-model");
        assert_eq!(loaded.functions.allow_list, vec!["get_loyalty_points"]);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[business]\nname = \"Bar Luce\"\n").unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.business.name, "Bar Luce");
        assert_eq!(settings.providers.default, "offline");
    }

    #[test]
    fn test_validate_http_default_requires_section() {
        let mut settings = Settings::default();
        settings.providers.default = "http".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_bad_manifest_url() {
        let mut settings = Settings::default();
        settings.functions.manifest_url = Some("ftp://example.com/fns".to_string());
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "providers = 12").unwrap();
        assert!(Settings::load_from(&path).is_err());
    }

    #[test]
    fn test_business_profile_mapping() {
        let mut settings = Settings::default();
        settings.business.tone = "brisk".to_string();
        assert_eq!(settings.business_profile().tone, "brisk");
    }
}
