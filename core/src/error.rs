//! Error types for the resolver.
//!
//! # Design
//! Two families with opposite reach. `ApiError` describes one failed call
//! against Home Assistant; the resolver always catches it at attempt
//! granularity and degrades to an empty result. `ConfigError` describes a
//! setup that no attempt could ever satisfy and is the only error handed back
//! to callers of a resolution.

use std::path::PathBuf;

/// Errors returned by `Transport::execute` and `HassClient` parse methods.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response (refused, timed out, reset).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The server rejected the bearer token.
    #[error("unauthorized")]
    Unauthorized,

    /// The server returned 404, the entity or endpoint does not exist.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 401 and 404.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response body did not have the expected shape.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),
}

/// Errors raised while loading or applying configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A required setting is empty.
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
