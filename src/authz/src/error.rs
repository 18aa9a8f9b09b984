//! Error types for the access-control engine

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::Identifier;

/// Access-control engine errors
///
/// Absence of an ACL or of a matching Authorization is never an error; it
/// surfaces as `Ok(false)` or `Ok(None)`.
#[derive(Debug, Error)]
pub enum AccessError {
    /// Identifier failed validation
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Malformed Authorization data returned by storage
    #[error("Invalid authorization: {0}")]
    InvalidAuthorization(String),

    /// A storage collaborator could not find something it was asked for
    #[error("Not found: {0}")]
    NotFound(String),

    /// Storage collaborator failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// The ancestor walk came back to an identifier it had already visited
    #[error("Cycle in resource hierarchy at {0}")]
    HierarchyCycle(Identifier),

    /// The ancestor walk exceeded the configured depth
    #[error("Resource hierarchy above {identifier} exceeds {max_depth} levels")]
    HierarchyTooDeep {
        identifier: Identifier,
        max_depth: usize,
    },

    /// An expired session was handed to the engine
    #[error("Session {session} expired at {expired_at}")]
    SessionExpired {
        session: Identifier,
        expired_at: DateTime<Utc>,
    },

    /// Requested expiry is out of range
    #[error("Invalid expiry: {0}")]
    InvalidExpiry(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file could not be parsed
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for access-control operations
pub type Result<T> = std::result::Result<T, AccessError>;
