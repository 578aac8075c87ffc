//! Application settings loaded from the shared YAML configuration file.
//!
//! One explicit `Settings` value is constructed at startup and handed to each
//! subsystem; nothing reads global state after that. Key names follow the
//! shared config file convention (`DEBUG`, `LOGGING.SIZE_MB`, ...).

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Default config file path; override with the `CBU_CONFIG` env var.
pub const DEFAULT_CONFIG_PATH: &str = "config/config.yml";

const MEGABYTE: u64 = 1_048_576;

/// Accept the level names config files commonly carry, including the
/// Python-style `WARNING`/`CRITICAL` spellings, and reduce them to the
/// names `EnvFilter` understands.
fn normalize_level(raw: &str) -> String {
    match raw.to_lowercase().as_str() {
        "warning" => "warn".to_string(),
        "critical" | "fatal" => "error".to_string(),
        other => other.to_string(),
    }
}

/// Top-level application settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(rename = "DEBUG", default)]
    pub debug: bool,

    #[serde(rename = "SERVER", default)]
    pub server: ServerSettings,

    #[serde(rename = "LOGGING", default)]
    pub logging: LoggingSettings,

    #[serde(rename = "DATABASE", default)]
    pub database: Option<DatabaseSettings>,

    #[serde(rename = "MAIL", default)]
    pub mail: Option<MailSettings>,

    #[serde(rename = "SECURITY", default)]
    pub security: SecuritySettings,

    #[serde(rename = "ENCRYPTION", default)]
    pub encryption: Option<EncryptionSettings>,

    #[serde(rename = "UPLOADS", default)]
    pub uploads: UploadSettings,

    #[serde(rename = "OAUTH", default)]
    pub oauth: OauthSettings,

    #[serde(rename = "STRIPE", default)]
    pub stripe: Option<StripeSettings>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(rename = "HOST", default = "default_host")]
    pub host: String,
    #[serde(rename = "PORT", default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Raw logging keys; every one is optional with a fixed fallback.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSettings {
    #[serde(rename = "SIZE_MB", default)]
    pub size_mb: Option<u64>,
    #[serde(rename = "LEVEL", default)]
    pub level: Option<String>,
    #[serde(rename = "NAME", default)]
    pub name: Option<String>,
    #[serde(rename = "ROTATIONS", default)]
    pub rotations: Option<u32>,
}

/// Resolved logging policy after defaults are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPolicy {
    pub level: String,
    pub file: PathBuf,
    pub max_bytes: u64,
    pub rotations: u32,
}

impl Settings {
    /// Apply logging defaults: 25 MB, 10 rotations, `cbu.log`, level INFO
    /// (DEBUG when the debug flag is set).
    pub fn log_policy(&self) -> LogPolicy {
        let level = match &self.logging.level {
            Some(level) => normalize_level(level),
            None if self.debug => "debug".to_string(),
            None => "info".to_string(),
        };

        LogPolicy {
            level,
            file: PathBuf::from(self.logging.name.as_deref().unwrap_or("cbu.log")),
            max_bytes: self.logging.size_mb.unwrap_or(25) * MEGABYTE,
            rotations: self.logging.rotations.unwrap_or(10),
        }
    }

    /// Load settings from `CBU_CONFIG` or the default path.
    pub fn load() -> anyhow::Result<Self> {
        let path =
            std::env::var("CBU_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::from_path(Path::new(&path))
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read config file {}: {e}", path.display()))?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    #[serde(rename = "URL")]
    pub url: String,
    #[serde(rename = "MAX_CONNECTIONS", default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(rename = "MIN_CONNECTIONS", default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    100
}

fn default_min_connections() -> u32 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailSettings {
    #[serde(rename = "SERVER")]
    pub server: String,
    #[serde(rename = "PORT", default = "default_smtp_port")]
    pub port: u16,
    #[serde(rename = "USERNAME", default)]
    pub username: Option<String>,
    #[serde(rename = "PASSWORD", default)]
    pub password: Option<String>,
    #[serde(rename = "SENDER")]
    pub sender: String,
}

fn default_smtp_port() -> u16 {
    587
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecuritySettings {
    #[serde(rename = "SECRET_KEY", default = "default_secret")]
    pub secret_key: String,
    #[serde(rename = "SESSION_HOURS", default = "default_session_hours")]
    pub session_hours: i64,
    #[serde(rename = "RESET_MINUTES", default = "default_reset_minutes")]
    pub reset_minutes: i64,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            secret_key: default_secret(),
            session_hours: default_session_hours(),
            reset_minutes: default_reset_minutes(),
        }
    }
}

fn default_secret() -> String {
    "change-me-in-production".to_string()
}

fn default_session_hours() -> i64 {
    24
}

fn default_reset_minutes() -> i64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct EncryptionSettings {
    #[serde(rename = "LOCAL_KEY")]
    pub local_key: String,
    #[serde(rename = "REMOTE_KEY_URL")]
    pub remote_key_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadSettings {
    #[serde(rename = "FOLDER", default = "default_upload_folder")]
    pub folder: PathBuf,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            folder: default_upload_folder(),
        }
    }
}

fn default_upload_folder() -> PathBuf {
    PathBuf::from("uploads/photos")
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OauthSettings {
    #[serde(rename = "FACEBOOK", default)]
    pub facebook: Option<FacebookSettings>,
    #[serde(rename = "TWITTER", default)]
    pub twitter: Option<TwitterSettings>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FacebookSettings {
    #[serde(rename = "APP_ID")]
    pub app_id: String,
    #[serde(rename = "APP_SECRET")]
    pub app_secret: String,
    #[serde(rename = "REDIRECT_URI")]
    pub redirect_uri: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TwitterSettings {
    #[serde(rename = "CONSUMER_KEY")]
    pub consumer_key: String,
    #[serde(rename = "CONSUMER_SECRET")]
    pub consumer_secret: String,
    #[serde(rename = "REDIRECT_URI")]
    pub redirect_uri: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSettings {
    #[serde(rename = "SECRET_KEY")]
    pub secret_key: String,
    #[serde(rename = "PUBLISHABLE_KEY")]
    pub publishable_key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_gets_defaults() {
        let settings = Settings::from_yaml("DEBUG: false\n").unwrap();

        assert!(!settings.debug);
        assert_eq!(settings.server.port, 8080);

        let policy = settings.log_policy();
        assert_eq!(policy.level, "info");
        assert_eq!(policy.max_bytes, 25 * MEGABYTE);
        assert_eq!(policy.rotations, 10);
        assert_eq!(policy.file, PathBuf::from("cbu.log"));
    }

    #[test]
    fn debug_flag_lowers_default_level() {
        let settings = Settings::from_yaml("DEBUG: true\n").unwrap();
        assert_eq!(settings.log_policy().level, "debug");
    }

    #[test]
    fn logging_keys_override_defaults() {
        let settings = Settings::from_yaml(
            "DEBUG: false\nLOGGING:\n  SIZE_MB: 5\n  LEVEL: WARN\n  NAME: app.log\n  ROTATIONS: 5\n",
        )
        .unwrap();

        let policy = settings.log_policy();
        assert_eq!(policy.rotations, 5);
        assert_eq!(policy.max_bytes, 5 * MEGABYTE);
        assert_eq!(policy.level, "warn");
        assert_eq!(policy.file, PathBuf::from("app.log"));
    }

    #[test]
    fn python_style_level_names_are_mapped() {
        let settings =
            Settings::from_yaml("DEBUG: false\nLOGGING:\n  LEVEL: WARNING\n").unwrap();
        assert_eq!(settings.log_policy().level, "warn");

        let settings =
            Settings::from_yaml("DEBUG: false\nLOGGING:\n  LEVEL: CRITICAL\n").unwrap();
        assert_eq!(settings.log_policy().level, "error");
    }

    #[test]
    fn nested_sections_parse() {
        let settings = Settings::from_yaml(
            r#"
DEBUG: false
SERVER:
  HOST: 0.0.0.0
  PORT: 9000
DATABASE:
  URL: postgres://localhost/cbu
ENCRYPTION:
  LOCAL_KEY: local-secret
  REMOTE_KEY_URL: https://keys.example.org/cbu
OAUTH:
  FACEBOOK:
    APP_ID: fb-id
    APP_SECRET: fb-secret
    REDIRECT_URI: https://cbu.example.org/api/connect/facebook/callback
STRIPE:
  SECRET_KEY: sk_test_123
  PUBLISHABLE_KEY: pk_test_123
"#,
        )
        .unwrap();

        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.database.unwrap().max_connections, 100);
        assert_eq!(
            settings.encryption.unwrap().remote_key_url,
            "https://keys.example.org/cbu"
        );
        assert!(settings.oauth.facebook.is_some());
        assert!(settings.oauth.twitter.is_none());
        assert_eq!(settings.stripe.unwrap().publishable_key, "pk_test_123");
    }
}
