// ============================
// crates/backend-lib/src/config.rs
// ============================
//! Configuration management.
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::{
    net::{Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "userauth.toml";

/// Prefix of environment overrides, e.g. `USERAUTH_SESSION_NAME`
pub const ENV_PREFIX: &str = "USERAUTH_";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] figment::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Which authenticator guards protected routes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    BasicAuth,
    SessionAuth,
}

/// scrypt cost parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HasherSettings {
    /// log2 of the CPU/memory cost
    pub log_n: u8,
    /// Block size
    pub r: u32,
    /// Parallelism
    pub p: u32,
}

impl Default for HasherSettings {
    fn default() -> Self {
        Self {
            log_n: 15,
            r: 8,
            p: 1,
        }
    }
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Flat file holding user records
    pub data_file: PathBuf,
    /// Log filter directives, e.g. `info` or `info,tower_http=debug`
    pub log_level: String,
    /// Name of the session cookie
    pub session_name: String,
    /// Session lifetime in seconds, 0 disables expiry
    pub session_duration_secs: u64,
    /// Authenticator for protected routes
    pub auth_type: AuthType,
    /// Paths that never require authentication
    pub excluded_paths: Vec<String>,
    /// Field names redacted from log output
    pub pii_fields: Vec<String>,
    /// Password hashing cost
    pub hasher: HasherSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 5000)),
            data_file: PathBuf::from("data/users.jsonl"),
            log_level: "info".to_string(),
            session_name: "session_id".to_string(),
            session_duration_secs: 0,
            auth_type: AuthType::SessionAuth,
            excluded_paths: vec![
                "/api/v1/status/".to_string(),
                "/api/v1/unauthorized/".to_string(),
                "/api/v1/forbidden/".to_string(),
                "/api/v1/auth_session/login/".to_string(),
            ],
            pii_fields: crate::redact::PII_FIELDS
                .iter()
                .map(|f| f.to_string())
                .collect(),
            hasher: HasherSettings::default(),
        }
    }
}

impl Settings {
    /// Load from defaults, `userauth.toml` and `USERAUTH_*` variables
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load with an explicit config file path; a missing file is skipped
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings: Settings = Self::figment(path.as_ref()).extract()?;
        settings.validate()?;
        Ok(settings)
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Reject values the rest of the service cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        EnvFilter::try_new(&self.log_level).map_err(|e| {
            ConfigError::Invalid(format!("invalid log_level '{}': {e}", self.log_level))
        })?;

        if self.session_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "session_name cannot be empty".to_string(),
            ));
        }

        if self
            .session_name
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, ';' | ',' | '='))
        {
            return Err(ConfigError::Invalid(format!(
                "session_name '{}' is not a valid cookie name",
                self.session_name
            )));
        }

        crate::auth::password::PasswordHasher::from_settings(&self.hasher)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        Ok(())
    }

    /// Session lifetime, `None` when sessions never expire
    pub fn session_duration(&self) -> Option<Duration> {
        match self.session_duration_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

#[cfg(test)]
mod config_tests;
