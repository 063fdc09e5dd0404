//! # DomainError
//!
//! Centralized error handling for the Retro-Board engine.
//! Authorization failures stay split into not-found, conflict and forbidden
//! so callers can map each one to a distinct response.

use thiserror::Error;

/// Failures reported by a Document Store adapter.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A unique constraint rejected the write (e.g. duplicate shareable link)
    #[error("duplicate value for unique field `{field}`")]
    DuplicateKey { field: &'static str },

    /// Infrastructure failure (e.g. DB down, pool exhausted)
    #[error("store unavailable: {0}")]
    Unavailable(#[from] anyhow::Error),
}

impl StoreError {
    pub fn is_duplicate(&self, field: &str) -> bool {
        matches!(self, StoreError::DuplicateKey { field: f } if *f == field)
    }
}

/// The primary error type for all engine operations.
#[derive(Error, Debug)]
pub enum DomainError {
    /// Resource not found (e.g. Board, UserSession)
    #[error("{0} not found with ID {1}")]
    NotFound(&'static str, String),

    /// The board exists but has no column with this id
    #[error("column {column_id} not found on board {board_id}")]
    ColumnNotFound { board_id: String, column_id: String },

    /// The board is not in a state that permits the operation (e.g. closed)
    #[error("conflict: {0}")]
    Conflict(String),

    /// The identity lacks the privilege the operation requires
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Malformed input (e.g. empty name, bad column id)
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Link issuance retry budget used up, or entropy source failed
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Underlying store failure unrelated to any predicate
    #[error(transparent)]
    StoreFailure(#[from] StoreError),
}

impl From<validator::ValidationErrors> for DomainError {
    fn from(errors: validator::ValidationErrors) -> Self {
        DomainError::ValidationError(errors.to_string())
    }
}

/// A specialized Result type for Retro-Board logic.
pub type Result<T> = std::result::Result<T, DomainError>;

/// Result type returned by store ports.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
