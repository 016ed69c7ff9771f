//! Error types for the forms engine
//!
//! Validation failures are never errors: they travel as
//! [`ValidationOutcome`](crate::validator::ValidationOutcome) data. The types
//! here cover the remaining failure classes: malformed rule descriptors,
//! transport failures, and faults captured while dispatching server commands.

use thiserror::Error;

/// Crate-level error for host-facing setup operations
#[derive(Error, Debug)]
pub enum FormsError {
    #[error("Rule descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),
}

/// Errors raised while parsing a `data-validation` rule descriptor
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("Token {position} has a parameter '{param}' but no rule name")]
    MissingRuleName { position: usize, param: String },
}

/// Failures of the request itself, distinct from a `validation_errors` reply
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        TransportError::Http(error.to_string())
    }
}

/// A command handler fault captured by the dispatch loop.
///
/// Faults are logged and reported, never propagated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Handler for '{command}' failed: {message}")]
pub struct HandlerFault {
    pub command: String,
    pub message: String,
}
