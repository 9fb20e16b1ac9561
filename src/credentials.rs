use crate::{Result, ScrobbleIndexError};
use std::env;

/// Environment variable holding the Last.fm API key.
pub const API_KEY_VAR: &str = "LASTFM_API_KEY";
/// Environment variable holding the Last.fm username.
pub const USERNAME_VAR: &str = "LASTFM_USERNAME";

/// What the remote API needs to read a user's history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub username: String,
}

impl Credentials {
    /// Build credentials, rejecting blank values.
    pub fn new(api_key: &str, username: &str) -> Result<Self> {
        let api_key = api_key.trim();
        let username = username.trim();
        if api_key.is_empty() {
            return Err(ScrobbleIndexError::Configuration(
                "Last.fm API key is not configured".to_string(),
            ));
        }
        if username.is_empty() {
            return Err(ScrobbleIndexError::Configuration(
                "Last.fm username is not configured".to_string(),
            ));
        }
        Ok(Self {
            api_key: api_key.to_string(),
            username: username.to_string(),
        })
    }
}

/// Source of [`Credentials`], consulted once at the start of every sync.
pub trait CredentialsProvider {
    fn credentials(&self) -> Result<Credentials>;
}

/// Credentials fixed at construction time.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    api_key: String,
    username: String,
}

impl StaticCredentials {
    pub fn new(api_key: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            username: username.into(),
        }
    }
}

impl CredentialsProvider for StaticCredentials {
    fn credentials(&self) -> Result<Credentials> {
        Credentials::new(&self.api_key, &self.username)
    }
}

/// Reads `LASTFM_API_KEY` and `LASTFM_USERNAME` on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentials;

impl CredentialsProvider for EnvCredentials {
    fn credentials(&self) -> Result<Credentials> {
        let api_key = env::var(API_KEY_VAR).map_err(|_| {
            ScrobbleIndexError::Configuration(format!("{API_KEY_VAR} environment variable not set"))
        })?;
        let username = env::var(USERNAME_VAR).map_err(|_| {
            ScrobbleIndexError::Configuration(format!(
                "{USERNAME_VAR} environment variable not set"
            ))
        })?;
        Credentials::new(&api_key, &username)
    }
}
