//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [api]
//! url = "http://localhost:5000/api/v1"
//! timeout_secs = 30
//!
//! [session]
//! idle_timeout_secs = 900
//! data_dir = "~/.ruffed"
//!
//! [logging]
//! log_errors_to_server = true
//! max_errors = 100
//!
//! [sso]
//! providers = ["google", "github", "okta", "microsoft"]
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Default backend API root.
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api/v1";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default inactivity window before a forced logout (15 minutes).
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 15 * 60;

/// Default number of error events kept in memory.
pub const DEFAULT_MAX_ERRORS: usize = 100;

/// Environment variable overriding the session data directory.
pub const DATA_DIR_ENV: &str = "RUFFED_DATA_DIR";

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged. Use the accessor methods to read
/// effective values with defaults applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuffedConfig {
    /// Backend API settings.
    pub api: Option<ApiConfig>,

    /// Session lifetime and storage settings.
    pub session: Option<SessionConfig>,

    /// Error reporting settings.
    pub logging: Option<LoggingConfig>,

    /// Single sign-on settings.
    pub sso: Option<SsoSection>,
}

impl RuffedConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// A config with every section filled in, for `config init`.
    pub fn with_defaults() -> Self {
        Self {
            api: Some(ApiConfig::default()),
            session: Some(SessionConfig::default()),
            logging: Some(LoggingConfig::default()),
            sso: Some(SsoSection::default()),
        }
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> crate::Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> crate::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections are replaced whole, not field by field.
    pub fn merge(&mut self, other: RuffedConfig) {
        if other.api.is_some() {
            self.api = other.api;
        }

        if other.session.is_some() {
            self.session = other.session;
        }

        if other.logging.is_some() {
            self.logging = other.logging;
        }

        if other.sso.is_some() {
            self.sso = other.sso;
        }
    }

    /// Effective API settings.
    pub fn api(&self) -> ApiConfig {
        self.api.clone().unwrap_or_default()
    }

    /// Effective session settings.
    pub fn session(&self) -> SessionConfig {
        self.session.clone().unwrap_or_default()
    }

    /// Effective logging settings.
    pub fn logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }

    /// Effective SSO provider list.
    pub fn sso_providers(&self) -> Vec<String> {
        self.sso.clone().unwrap_or_default().providers
    }

    /// Override the API URL, creating the `[api]` section if needed.
    pub fn set_api_url(&mut self, url: impl Into<String>) {
        let mut api = self.api();
        api.url = url.into();
        self.api = Some(api);
    }

    /// Reject values that would make the client unusable.
    pub fn validate(&self) -> crate::Result<()> {
        let api = self.api();
        if api.url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "api.url".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if api.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "api.timeout_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.session().idle_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "session.idle_timeout_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.logging().max_errors == 0 {
            return Err(ConfigError::Invalid {
                field: "logging.max_errors".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sections
// ─────────────────────────────────────────────────────────────────────────────

/// `[api]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Root URL of the REST API; auth endpoints live under `{url}/auth`.
    pub url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// `[session]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Inactivity window before a forced logout.
    pub idle_timeout_secs: u64,
    /// Directory holding the persisted session marker.
    pub data_dir: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
            data_dir: None,
        }
    }
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Get the effective data directory, checking the environment first.
    ///
    /// Resolution order:
    /// 1. `RUFFED_DATA_DIR` environment variable
    /// 2. Configured `data_dir` (a leading `~/` expands to the home directory)
    /// 3. Default: `~/.ruffed`
    pub fn effective_data_dir(&self) -> PathBuf {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV)
            && !dir.is_empty()
        {
            return PathBuf::from(dir);
        }

        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        match &self.data_dir {
            Some(dir) => match dir.strip_prefix("~") {
                Ok(rest) => home.join(rest),
                Err(_) => dir.clone(),
            },
            None => home.join(".ruffed"),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Forward recorded errors to `{api.url}/logs/error`.
    pub log_errors_to_server: bool,
    /// Number of error events kept in memory.
    pub max_errors: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_errors_to_server: true,
            max_errors: DEFAULT_MAX_ERRORS,
        }
    }
}

/// `[sso]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SsoSection {
    /// Identity providers offered on the login screen.
    pub providers: Vec<String>,
}

impl Default for SsoSection {
    fn default() -> Self {
        Self {
            providers: ["google", "github", "okta", "microsoft"]
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = RuffedConfig::from_toml("").unwrap();
        assert_eq!(config, RuffedConfig::new());
        assert_eq!(config.api().url, DEFAULT_API_URL);
        assert_eq!(config.session().idle_timeout(), Duration::from_secs(900));
        assert!(config.logging().log_errors_to_server);
        assert_eq!(config.sso_providers().len(), 4);
    }

    #[test]
    fn test_defaults_survive_a_toml_round_trip() {
        let config = RuffedConfig::with_defaults();
        let parsed = RuffedConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, config);
        assert_eq!(parsed.api().url, DEFAULT_API_URL);
    }

    #[test]
    fn test_partial_section_fills_defaults() {
        let config = RuffedConfig::from_toml(
            r#"
[api]
url = "https://lemur.example.com/api/v1"
"#,
        )
        .unwrap();

        let api = config.api();
        assert_eq!(api.url, "https://lemur.example.com/api/v1");
        assert_eq!(api.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_merge_replaces_sections() {
        let mut base = RuffedConfig::from_toml(
            r#"
[api]
url = "http://base"

[sso]
providers = ["okta"]
"#,
        )
        .unwrap();
        let overlay = RuffedConfig::from_toml(
            r#"
[api]
url = "http://overlay"
"#,
        )
        .unwrap();

        base.merge(overlay);
        assert_eq!(base.api().url, "http://overlay");
        assert_eq!(base.sso_providers(), vec!["okta".to_string()]);
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = RuffedConfig::new();
        config.set_api_url("http://roundtrip");
        config.logging = Some(LoggingConfig {
            log_errors_to_server: false,
            max_errors: 5,
        });

        let parsed = RuffedConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_validate_rejects_zero_idle_window() {
        let config = RuffedConfig::from_toml(
            r#"
[session]
idle_timeout_secs = 0
"#,
        )
        .unwrap();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("session.idle_timeout_secs"));
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(RuffedConfig::new().validate().is_ok());
    }

    #[test]
    fn test_data_dir_tilde_expansion() {
        let session = SessionConfig {
            idle_timeout_secs: 60,
            data_dir: Some(PathBuf::from("~/lemur-data")),
        };
        if std::env::var(DATA_DIR_ENV).is_err() {
            let dir = session.effective_data_dir();
            assert!(dir.ends_with("lemur-data"));
            assert!(!dir.starts_with("~"));
        }
    }
}
