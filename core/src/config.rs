//! Client configuration and credentials.
//!
//! # Design
//! There is no process-wide configuration. A `Configuration` value starts
//! from defaults (or the environment) and is consumed when a client is
//! built; the resulting `Credentials` never change for that client.

use std::env;
use std::fmt;

use crate::error::ApiError;

/// Base URI of the public todoable service.
pub const DEFAULT_BASE_URI: &str = "http://todoable.teachable.tech/api";

pub const ENV_BASE_URI: &str = "TODOABLE_BASE_URI";
pub const ENV_USERNAME: &str = "TODOABLE_USERNAME";
pub const ENV_PASSWORD: &str = "TODOABLE_PASSWORD";

#[derive(Clone, PartialEq, Eq)]
pub struct Configuration {
    pub base_uri: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            base_uri: DEFAULT_BASE_URI.to_string(),
            username: None,
            password: None,
        }
    }
}

impl Configuration {
    /// Defaults overridden by `TODOABLE_BASE_URI`, `TODOABLE_USERNAME` and
    /// `TODOABLE_PASSWORD` when set and non-empty.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let mut config = Self::default();
        if let Some(base_uri) = get(ENV_BASE_URI) {
            config.base_uri = base_uri;
        }
        config.username = get(ENV_USERNAME);
        config.password = get(ENV_PASSWORD);
        config
    }

    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = base_uri.into();
        self
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Freeze into `Credentials`. Fails if either half of the login is missing.
    pub fn credentials(&self) -> Result<Credentials, ApiError> {
        let username = self
            .username
            .clone()
            .ok_or_else(|| ApiError::ConfigError("username is not set".to_string()))?;
        let password = self
            .password
            .clone()
            .ok_or_else(|| ApiError::ConfigError("password is not set".to_string()))?;
        Ok(Credentials::new(username, password, &self.base_uri))
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("base_uri", &self.base_uri)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Login and service location for one client instance.
///
/// The password never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
    base_uri: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>, base_uri: &str) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            base_uri: base_uri.trim_end_matches('/').to_string(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Only read when building the authentication request.
    pub(crate) fn password(&self) -> &str {
        &self.password
    }

    /// Base URI without a trailing slash.
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// `base_uri` joined to `path` with exactly one `/` between them.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_uri, path.trim_start_matches('/'))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("base_uri", &self.base_uri)
            .finish()
    }
}
