//! Consent Desktop - Configuration
//!
//! Read from `consent-config.json` in the app config directory. Every field
//! has a default, so a partial file or no file at all is fine.

use crate::consent::ConsentPreferences;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

pub const CONFIG_FILE_NAME: &str = "consent-config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid policy page '{0}'")]
    PolicyPage(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConsentConfig {
    /// Store file, relative to the app data directory.
    pub store_file: String,
    pub display_delay_ms: u64,
    /// Pre-selected preferences for users who have not decided yet.
    pub defaults: ConsentPreferences,
    /// App-relative page or absolute http(s) URL.
    pub policy_page: String,
    pub audit_log: bool,
    /// Also raise OS notifications, not just in-app toasts.
    pub notifications: bool,
}

impl Default for ConsentConfig {
    fn default() -> Self {
        Self {
            store_file: "consent.json".to_string(),
            display_delay_ms: 1000,
            defaults: ConsentPreferences::policy_default(),
            policy_page: "cookie-policy.html".to_string(),
            audit_log: true,
            notifications: true,
        }
    }
}

/// Where the policy page lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyTarget {
    App(PathBuf),
    External(Url),
}

impl ConsentConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Missing or unreadable files fall back to the defaults.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            info!("No consent config at {:?}, using defaults", path);
            return Self::default();
        }
        match Self::from_file(path) {
            Ok(config) => {
                info!("Loaded consent config from {:?}", path);
                config
            }
            Err(e) => {
                warn!("Ignoring consent config at {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn display_delay(&self) -> Duration {
        Duration::from_millis(self.display_delay_ms)
    }

    pub fn policy_target(&self) -> Result<PolicyTarget, ConfigError> {
        let page = self.policy_page.trim();
        if page.is_empty() {
            return Err(ConfigError::PolicyPage(self.policy_page.clone()));
        }
        match Url::parse(page) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(PolicyTarget::External(url)),
            Ok(_) => Err(ConfigError::PolicyPage(self.policy_page.clone())),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Ok(PolicyTarget::App(PathBuf::from(page.trim_start_matches('/'))))
            }
            Err(_) => Err(ConfigError::PolicyPage(self.policy_page.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_file(contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("consent-config-{}.json", Uuid::new_v4()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let path = temp_file(r#"{"displayDelayMs": 250}"#);
        let config = ConsentConfig::load_or_default(&path);
        assert_eq!(config.display_delay(), Duration::from_millis(250));
        assert_eq!(config.store_file, "consent.json");
        assert_eq!(config.defaults, ConsentPreferences::policy_default());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn defaults_cannot_disable_necessary() {
        let path = temp_file(
            r#"{"defaults": {"necessary": false, "functional": false, "analytics": false, "marketing": false}}"#,
        );
        let config = ConsentConfig::from_file(&path).unwrap();
        assert!(config.defaults.necessary());
        assert_eq!(config.defaults, ConsentPreferences::necessary_only());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn malformed_or_missing_file_uses_defaults() {
        let path = temp_file("{ nope");
        assert!(ConsentConfig::from_file(&path).is_err());
        assert_eq!(ConsentConfig::load_or_default(&path), ConsentConfig::default());
        let _ = fs::remove_file(&path);

        assert_eq!(ConsentConfig::load_or_default(&path), ConsentConfig::default());
    }

    #[test]
    fn policy_target_resolution() {
        let mut config = ConsentConfig::default();
        assert_eq!(
            config.policy_target().unwrap(),
            PolicyTarget::App(PathBuf::from("cookie-policy.html"))
        );

        config.policy_page = "/legal/cookies.html".to_string();
        assert_eq!(
            config.policy_target().unwrap(),
            PolicyTarget::App(PathBuf::from("legal/cookies.html"))
        );

        config.policy_page = "https://example.com/cookie-policy".to_string();
        assert!(matches!(
            config.policy_target().unwrap(),
            PolicyTarget::External(url) if url.host_str() == Some("example.com")
        ));

        config.policy_page = "file:///etc/passwd".to_string();
        assert!(config.policy_target().is_err());

        config.policy_page = "  ".to_string();
        assert!(config.policy_target().is_err());
    }
}
