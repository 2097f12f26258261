//! Errors raised while loading, overriding or checking a [`Config`](super::Config)

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot write config file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("config file {} is not valid TOML: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("cannot encode config as TOML: {0}")]
    Encode(#[from] toml::ser::Error),

    /// A `POSTBOX_*` variable held something unparseable
    #[error("bad value in {var}: {reason}")]
    Override { var: &'static str, reason: String },

    /// The assembled config breaks a rule checked by `validate`
    #[error("invalid config: {0}")]
    Invalid(String),
}
