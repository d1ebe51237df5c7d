use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8080";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: String,
    pub token_file: PathBuf,
    pub credentials_file: PathBuf,
    /// Takes precedence over `token_file` when set.
    pub access_token: Option<String>,
    pub call_timeout: Duration,
    pub redirect_uri: String,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. `from_env` delegates here so
    /// tests can avoid mutating the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let call_timeout_secs: u64 = match lookup("GCAL_CALL_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("GCAL_CALL_TIMEOUT_SECS must be a whole number of seconds, got '{raw}'"))?,
            None => 30,
        };
        if call_timeout_secs == 0 {
            anyhow::bail!("GCAL_CALL_TIMEOUT_SECS must be greater than zero");
        }

        Ok(Self {
            api_base: lookup("GCAL_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            token_file: lookup("GCAL_TOKEN_FILE")
                .unwrap_or_else(|| "token.json".to_string())
                .into(),
            credentials_file: lookup("GCAL_CREDENTIALS_FILE")
                .unwrap_or_else(|| "credentials.json".to_string())
                .into(),
            access_token: lookup("GCAL_ACCESS_TOKEN").filter(|t| !t.trim().is_empty()),
            call_timeout: Duration::from_secs(call_timeout_secs),
            redirect_uri: lookup("GCAL_REDIRECT_URI")
                .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string()),
        })
    }
}
