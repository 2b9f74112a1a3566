//! Token cache and the authentication handshake.
//!
//! # Design
//! The handshake follows the same build/parse split as resource calls:
//! `build_authenticate` produces the `POST /authenticate` request carrying
//! HTTP basic credentials, and `parse_authenticate` turns the response into
//! a `Token`. The pipeline runs the transport in between.
//!
//! `TokenCache` stores the token value and its expiry as one `Token`, so a
//! value can never be paired with a stale or foreign expiry.

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::classify::{classify_response, Outcome};
use crate::config::Credentials;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

pub const AUTHENTICATE_PATH: &str = "/authenticate";

/// A bearer token issued by the authenticate endpoint.
///
/// The value never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    value: String,
    expires_at: DateTime<Utc>,
}

impl Token {
    pub fn new(value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    /// The raw token, for the authorization header only.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Usable until and including `expires_at`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now <= self.expires_at
    }

    /// Value of the `Authorization` header for resource calls.
    pub fn authorization(&self) -> String {
        format!("Token token=\"{}\"", self.value)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("value", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Where a client stands with respect to its token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticated,
    Expired,
    /// The last handshake failed and no valid token is held. Any earlier
    /// token is still cached; the next call retries.
    Failed,
}

/// The client's current token, if any.
#[derive(Debug, Clone, Default)]
pub struct TokenCache {
    token: Option<Token>,
    failed: bool,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.token.as_ref().is_some_and(|t| t.is_valid_at(now))
    }

    pub fn state(&self, now: DateTime<Utc>) -> AuthState {
        match &self.token {
            Some(t) if t.is_valid_at(now) => AuthState::Authenticated,
            _ if self.failed => AuthState::Failed,
            None => AuthState::Unauthenticated,
            Some(_) => AuthState::Expired,
        }
    }

    /// Replace any previous token.
    pub fn store(&mut self, token: Token) {
        self.token = Some(token);
        self.failed = false;
    }

    /// Record a failed handshake. The cached token, if any, is kept.
    pub fn mark_failed(&mut self) {
        self.failed = true;
    }

    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }
}

#[derive(Deserialize)]
struct AuthenticateResponse {
    token: Option<String>,
    expires_at: Option<String>,
}

pub fn build_authenticate(credentials: &Credentials) -> HttpRequest {
    let basic = BASE64.encode(format!(
        "{}:{}",
        credentials.username(),
        credentials.password()
    ));
    HttpRequest {
        method: HttpMethod::Post,
        url: credentials.url(AUTHENTICATE_PATH),
        headers: vec![
            ("authorization".to_string(), format!("Basic {basic}")),
            ("accept".to_string(), "application/json".to_string()),
            ("content-type".to_string(), "application/json".to_string()),
        ],
        body: None,
    }
}

pub fn parse_authenticate(response: &HttpResponse) -> Result<Token, ApiError> {
    let value = match classify_response(response) {
        Outcome::Decoded(value) => value,
        Outcome::Accepted => {
            return Err(ApiError::ProtocolError(
                "authentication response has no JSON body".to_string(),
            ))
        }
        Outcome::Failure(err) => return Err(err),
    };

    let body: AuthenticateResponse = serde_json::from_value(value)
        .map_err(|e| ApiError::ProtocolError(format!("malformed authentication response: {e}")))?;
    let token = body
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::ProtocolError("authentication response has no token".to_string()))?;
    let raw_expiry = body
        .expires_at
        .ok_or_else(|| ApiError::ProtocolError("authentication response has no expires_at".to_string()))?;
    let expires_at = parse_timestamp(&raw_expiry)
        .ok_or_else(|| ApiError::ProtocolError(format!("unparseable expires_at: {raw_expiry}")))?;

    Ok(Token::new(token, expires_at))
}

/// Parse an ISO-8601 timestamp. Accepts RFC 3339, the space-separated
/// `2017-12-25 12:20:00 -0800` form, and offset-less forms (read as UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S %z", "%Y-%m-%dT%H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    None
}
