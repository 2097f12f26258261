//! Configuration management for Postbox
//!
//! A [`Config`] is assembled from defaults, an optional TOML file and
//! `POSTBOX_<SECTION>_<KEY>` environment overrides, then validated once
//! before any service is built from it.

use argon2::password_hash::PasswordHash;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

use crate::logging::LogLevel;

mod error;

pub use error::ConfigError;

/// Longest accepted credential lifetime
pub const MAX_TOKEN_TTL: Duration = Duration::from_secs(30 * 24 * 3600);

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub broker: BrokerConfig,
    pub logging: LoggingConfig,
    /// Accounts loaded into the in-memory user directory at startup
    pub users: Vec<UserSeed>,
}

/// HTTP transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: SocketAddr,

    /// Upper bound on how long in-flight requests may run after a shutdown signal
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

/// Credential issuance configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 signing secret. Empty means "generate one at startup".
    pub jwt_secret: String,

    /// Value of the `iss` claim; tokens from other issuers are rejected
    pub issuer: String,

    #[serde(with = "humantime_serde")]
    pub token_ttl: Duration,
}

/// Subscription broker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Records buffered per subscriber before it is disconnected as too slow
    pub subscriber_buffer: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    pub json_format: bool,
    pub with_timestamp: bool,
    pub with_target: bool,
}

/// A directory entry provisioned from configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSeed {
    /// Stable identifier; a UUID is assigned when omitted
    #[serde(default)]
    pub user_id: Option<String>,
    pub email: String,
    /// Argon2 PHC string, e.g. the output of `postbox hash-password`
    pub password_hash: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 4000)),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            issuer: "postbox".to_string(),
            token_ttl: Duration::from_secs(60 * 60),
        }
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            subscriber_buffer: 128,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_timestamp: true,
            with_target: true,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, validated
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = Self::read_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// File (or defaults) plus environment overrides, *not* validated
    ///
    /// Environment variables follow the pattern `POSTBOX_<SECTION>_<KEY>`,
    /// e.g. `POSTBOX_SERVER_BIND_ADDRESS=0.0.0.0:4000`.
    ///
    /// Callers are expected to run [`Config::ensure_jwt_secret`] and
    /// [`Config::validate`] afterwards.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::read_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    fn read_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `POSTBOX_*` overrides using `lookup` as the variable source
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("POSTBOX_SERVER_BIND_ADDRESS") {
            self.server.bind_address = parse_var(&addr, "POSTBOX_SERVER_BIND_ADDRESS")?;
        }
        if let Some(secs) = lookup("POSTBOX_SERVER_SHUTDOWN_TIMEOUT_SECS") {
            self.server.shutdown_timeout =
                Duration::from_secs(parse_var(&secs, "POSTBOX_SERVER_SHUTDOWN_TIMEOUT_SECS")?);
        }

        if let Some(secret) = lookup("POSTBOX_AUTH_JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(issuer) = lookup("POSTBOX_AUTH_ISSUER") {
            self.auth.issuer = issuer;
        }
        if let Some(secs) = lookup("POSTBOX_AUTH_TOKEN_TTL_SECS") {
            self.auth.token_ttl =
                Duration::from_secs(parse_var(&secs, "POSTBOX_AUTH_TOKEN_TTL_SECS")?);
        }

        if let Some(buffer) = lookup("POSTBOX_BROKER_SUBSCRIBER_BUFFER") {
            self.broker.subscriber_buffer =
                parse_var(&buffer, "POSTBOX_BROKER_SUBSCRIBER_BUFFER")?;
        }

        if let Some(level) = lookup("POSTBOX_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = lookup("POSTBOX_LOG_JSON") {
            self.logging.json_format = parse_var(&json, "POSTBOX_LOG_JSON")?;
        }

        Ok(())
    }

    /// Fill an empty signing secret with a random one
    ///
    /// Returns `true` when a secret was generated. Tokens signed with a
    /// generated secret stop verifying when the process restarts.
    pub fn ensure_jwt_secret(&mut self) -> bool {
        if !self.auth.jwt_secret.trim().is_empty() {
            return false;
        }
        warn!("No JWT secret configured; generating an ephemeral one");
        self.auth.jwt_secret = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        true
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "auth.jwt_secret must not be empty".to_string(),
            ));
        }

        if self.auth.issuer.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "auth.issuer must not be empty".to_string(),
            ));
        }

        if self.auth.token_ttl.is_zero() {
            return Err(ConfigError::Invalid(
                "auth.token_ttl must be greater than 0".to_string(),
            ));
        }

        if self.auth.token_ttl > MAX_TOKEN_TTL {
            return Err(ConfigError::Invalid(format!(
                "auth.token_ttl must be at most {} days",
                MAX_TOKEN_TTL.as_secs() / (24 * 3600)
            )));
        }

        if self.broker.subscriber_buffer == 0 {
            return Err(ConfigError::Invalid(
                "broker.subscriber_buffer must be greater than 0".to_string(),
            ));
        }

        self.logging
            .level
            .parse::<LogLevel>()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let mut seen = HashSet::new();
        for user in &self.users {
            let email = user.email.trim().to_lowercase();
            if email.is_empty() {
                return Err(ConfigError::Invalid(
                    "users[].email must not be empty".to_string(),
                ));
            }
            if !seen.insert(email) {
                return Err(ConfigError::Invalid(format!(
                    "Duplicate user email: {}",
                    user.email
                )));
            }
            PasswordHash::new(&user.password_hash).map_err(|e| {
                ConfigError::Invalid(format!(
                    "Invalid password hash for {}: {}",
                    user.email, e
                ))
            })?;
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)?;

        std::fs::write(path, contents).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn parse_var<T>(raw: &str, var: &'static str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Override {
        var,
        reason: e.to_string(),
    })
}
