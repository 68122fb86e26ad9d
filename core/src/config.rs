//! Startup configuration, read once from the environment.
//!
//! The only setting is the base URL of the notes service, taken from
//! `NOTES_API_BASE_URL`.

use serde::Deserialize;
use thiserror::Error;

const ENV_PREFIX: &str = "NOTES_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration from the environment: {0}")]
    Env(#[from] envy::Error),
    #[error("NOTES_API_BASE_URL must not be empty")]
    EmptyBaseUrl,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub api_base_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        envy::prefixed(ENV_PREFIX).from_env::<Config>()?.validated()
    }

    /// Same as `from_env`, reading from the given key/value pairs instead of
    /// the process environment.
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed(ENV_PREFIX).from_iter::<_, Config>(vars)?.validated()
    }

    fn validated(self) -> Result<Self, ConfigError> {
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }
        Ok(self)
    }
}
