//! Process configuration, read once from the environment at startup.

use std::env;

use crate::sheets::ServiceAccountKey;

pub const DEFAULT_PORT: u16 = 10000;

pub const TOKEN_VAR: &str = "TELEGRAM_BOT_TOKEN";
pub const SHEET_NAME_VAR: &str = "SHEET_NAME";
pub const CREDENTIALS_BASE64_VAR: &str = "GOOGLE_CREDENTIALS_BASE64";
pub const CREDENTIALS_JSON_VAR: &str = "GOOGLE_CREDENTIALS";
pub const PORT_VAR: &str = "PORT";
pub const LOG_FORMAT_VAR: &str = "LOG_FORMAT";

/// Startup configuration errors. All of them are fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is unset or empty
    Missing(&'static str),
    /// Credentials were present but could not be decoded
    InvalidCredentials(String),
    /// `PORT` is not a valid port number
    InvalidPort(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(var) => write!(f, "No {var} found in environment variables"),
            ConfigError::InvalidCredentials(msg) => {
                write!(f, "Error loading Google credentials: {msg}")
            }
            ConfigError::InvalidPort(value) => write!(f, "Invalid {PORT_VAR} value: {value:?}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub telegram_token: String,
    pub sheet_name: String,
    pub credentials: ServiceAccountKey,
    pub port: u16,
    pub log_format: LogFormat,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any variable source; empty values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let telegram_token = get(TOKEN_VAR).ok_or(ConfigError::Missing(TOKEN_VAR))?;
        let sheet_name = get(SHEET_NAME_VAR).ok_or(ConfigError::Missing(SHEET_NAME_VAR))?;

        let credentials = match (get(CREDENTIALS_BASE64_VAR), get(CREDENTIALS_JSON_VAR)) {
            (Some(encoded), _) => ServiceAccountKey::from_base64(&encoded),
            (None, Some(json)) => ServiceAccountKey::from_json(&json),
            (None, None) => return Err(ConfigError::Missing(CREDENTIALS_BASE64_VAR)),
        };
        let credentials = credentials.map_err(ConfigError::InvalidCredentials)?;

        let port = match get(PORT_VAR) {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(value.clone()))?,
            None => DEFAULT_PORT,
        };

        let log_format = match get(LOG_FORMAT_VAR) {
            Some(value) if value.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            telegram_token,
            sheet_name,
            credentials,
            port,
            log_format,
        })
    }
}
