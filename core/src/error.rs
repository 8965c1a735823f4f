//! Error types for the resource client.
//!
//! # Design
//! Only configuration mistakes, caller mistakes and transport failures are
//! errors. Expected remote outcomes (a record that does not exist, a save the
//! server rejected as invalid) are reported through return values instead, so
//! callers never have to match on an error to learn that a lookup missed.
//!
//! `TransportError` is kept apart from `ApiError` because one of its variants
//! still carries a usable response: transports that treat 4xx/5xx as failures
//! hand the response back through `TransportError::Status`, and the request
//! builder turns it into an ordinary `HttpResponse`.

use thiserror::Error;

use crate::http::HttpResponse;

/// Errors surfaced by the resource client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No driver type is registered under the resolved name.
    #[error("unsupported driver [{driver}] to load [{resolved}]")]
    UnsupportedDriver { driver: String, resolved: String },

    /// The driver type exists but does not provide the requested capability.
    #[error("unsupported interface [{driver}] must implement [{capability}]")]
    UnsupportedInterface { driver: String, capability: String },

    /// A logical operator other than the configured AND/OR tokens.
    #[error("invalid logical operator: {0}")]
    InvalidOperator(String),

    /// An order direction other than the configured ascending/descending tokens.
    #[error("invalid order direction: {0}")]
    InvalidDirection(String),

    #[error("invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// The error handler expected the errors under a key the body lacks.
    #[error("error key [{0}] does not exist in response")]
    MissingErrorKey(String),

    /// A request builder method was called before `create_request`.
    #[error("no request has been created")]
    RequestNotCreated,

    /// The server answered with a status no configured rule accounts for.
    #[error("unexpected HTTP {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// A collection key is configured but the response does not contain it.
    #[error("collection key [{0}] does not exist in response")]
    MissingCollectionKey(String),

    /// The record has no value for its identity property.
    #[error("record has no [{0}] to address it by")]
    MissingIdentity(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("deserialization failed: {0}")]
    Deserialization(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("base64 decoding failed: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("configuration failed: {0}")]
    Config(#[from] ::config::ConfigError),
}

/// Failures reported by a `Transport` implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport raised an error for a status code but the server did
    /// answer; the response is preserved so it can still be interpreted.
    #[error("server answered with HTTP {}", .0.status)]
    Status(HttpResponse),

    /// No response was received (connection refused, DNS, TLS, ...).
    #[error("transport failed: {0}")]
    Connection(String),

    /// The request payload could not be encoded locally, e.g. a file part
    /// that can no longer be read. Nothing was sent.
    #[error("request body could not be encoded: {0}")]
    Body(#[source] std::io::Error),
}
