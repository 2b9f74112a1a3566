//! Error types for the todoable client.
//!
//! # Design
//! Statuses the service documents get dedicated variants so callers can
//! branch on them (treat `NotFound` as "already deleted", surface the
//! `UnprocessableEntity` body as form errors). Any other non-2xx lands in
//! `HttpError` with the raw status and body.
//!
//! The enum is `Clone + PartialEq`: transport and serde failures are carried
//! as messages rather than source errors so classified outcomes can be
//! compared directly.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// 401: the token or the basic credentials were rejected.
    #[error("unauthorized")]
    Unauthorized,

    /// 404: the list or item does not exist.
    #[error("resource not found")]
    NotFound,

    /// 422: the service rejected the payload. Carries the service's error
    /// body, e.g. `{"name": ["can't be blank"]}`.
    #[error("unprocessable entity: {0}")]
    UnprocessableEntity(Value),

    /// 500.
    #[error("internal server error")]
    InternalServerError,

    /// Any other non-2xx status.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The authentication response was missing `token` or a parseable
    /// `expires_at`.
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// A list or item id needed to build the request path is empty; no
    /// request was sent.
    #[error("{0} has no id")]
    MissingId(&'static str),

    /// The item already has a `finished_at`; no request was sent.
    #[error("item is already finished")]
    AlreadyFinished,

    /// The transport could not complete the round-trip.
    #[error("transport error: {0}")]
    TransportError(String),

    /// A request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// A response body did not match the expected shape.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The configuration is missing something the client needs.
    #[error("configuration error: {0}")]
    ConfigError(String),
}
