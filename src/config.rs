use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use treeform_core::IdPolicy;

use crate::records::PersistStrategy;

/// Shortest accepted HMAC key for signing session tokens.
pub const MIN_JWT_KEY_LEN: usize = 32;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Port to listen on
    pub port: u16,
    /// Path to the SQLite database
    pub database_path: PathBuf,
    /// How identifiers are chosen for created records
    pub id_policy: IdPolicy,
    /// How updated records are written back
    pub persist_strategy: PersistStrategy,
    /// Origins allowed to call the API from a browser
    pub cors_origins: Vec<String>,
    /// Mark the session cookie `Secure`; disable only for plain-HTTP development
    pub cookie_secure: bool,
    pub jwt: JwtConfig,
}

/// Session token settings
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct JwtConfig {
    pub key: String,
    pub issuer: String,
    pub audience: String,
    pub expiry_minutes: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            key: String::new(),
            issuer: "treeform".to_string(),
            audience: "treeform-clients".to_string(),
            expiry_minutes: 60,
        }
    }
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("key", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("expiry_minutes", &self.expiry_minutes)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            database_path: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("treeform")
                .join("treeform.db"),
            id_policy: IdPolicy::default(),
            persist_strategy: PersistStrategy::default(),
            cors_origins: Vec::new(),
            cookie_secure: true,
            jwt: JwtConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        Self::load_with_env(config_path, |name| std::env::var(name).ok())
    }

    /// Like [`Config::load`], reading environment variables through `env`.
    pub fn load_with_env<F>(config_path: Option<PathBuf>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Start with defaults
        let mut config = Self::default();

        // Try to load from config file
        let path = config_path
            .or_else(|| env("TREEFORM_CONFIG").map(PathBuf::from))
            .unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            config = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;
        }

        // Apply environment variable overrides
        if let Some(port) = env("TREEFORM_PORT") {
            config.port = parse_env("TREEFORM_PORT", &port)?;
        }
        if let Some(db_path) = env("TREEFORM_DATABASE_PATH") {
            config.database_path = PathBuf::from(db_path);
        }
        if let Some(key) = env("TREEFORM_JWT_KEY") {
            config.jwt.key = key;
        }
        if let Some(policy) = env("TREEFORM_ID_POLICY") {
            config.id_policy = parse_env("TREEFORM_ID_POLICY", &policy)?;
        }
        if let Some(strategy) = env("TREEFORM_PERSIST_STRATEGY") {
            config.persist_strategy = parse_env("TREEFORM_PERSIST_STRATEGY", &strategy)?;
        }
        if let Some(secure) = env("TREEFORM_COOKIE_SECURE") {
            config.cookie_secure = parse_env("TREEFORM_COOKIE_SECURE", &secure)?;
        }

        Ok(config)
    }

    /// Checks settings the server cannot start without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.key.len() < MIN_JWT_KEY_LEN {
            return Err(ConfigError::Invalid(format!(
                "jwt.key must be at least {} bytes (set it in the config file or TREEFORM_JWT_KEY)",
                MIN_JWT_KEY_LEN
            )));
        }
        if self.jwt.expiry_minutes <= 0 {
            return Err(ConfigError::Invalid(
                "jwt.expiry_minutes must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Default config file path: ~/.config/treeform/config.yaml
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("treeform")
            .join("config.yaml")
    }
}

fn parse_env<T>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .parse()
        .map_err(|e| ConfigError::Invalid(format!("{}: {}", name, e)))
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {}", .0.display(), .1)]
    ReadError(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config file '{}': {}", .0.display(), .1)]
    ParseError(PathBuf, #[source] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
