//! Error taxonomy for the loader.
//!
//! Every failure path surfaces as a `LoadError` on the async result; nothing
//! is logged-and-swallowed or retried internally.

/// A rejected input, detected before any DOM interaction.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("base URL must be a non-empty string")]
    EmptyBaseUrl,

    #[error("base URL {url:?} is not a valid absolute URL: {reason}")]
    MalformedUrl { url: String, reason: String },

    #[error("base URL scheme {scheme:?} is not allowed (expected http or https)")]
    DisallowedScheme { scheme: String },

    #[error("query parameter key at position {position} is empty")]
    EmptyParamKey { position: usize },
}

/// Errors that can settle a script load.
#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("No browser-like environment available: {0}")]
    Environment(String),

    #[error("DOM error: {0}")]
    Dom(String),

    #[error("Failed to load {url}.")]
    Load { url: String },

    #[error("Script loading timed out after {timeout_ms}ms: {url}")]
    Timeout { url: String, timeout_ms: u64 },
}

/// Convenience result type.
pub type LoadResult<T> = Result<T, LoadError>;
