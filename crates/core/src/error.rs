//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// The variants mirror how callers are expected to react, not where the
/// failure happened:
///
/// - [`Validation`](DomainError::Validation): bad input shape, rejected before
///   any mutation.
/// - [`Precondition`](DomainError::Precondition): state-dependent refusal
///   (item not editable, over-allocated cuts); user-visible, no retry.
/// - [`Consistency`](DomainError::Consistency): the books do not add up in a
///   way the engine refuses to resolve on its own; requires human review.
/// - [`Conflict`](DomainError::Conflict): lock contention / stale state; safe
///   to retry the whole batch from scratch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed or out-of-range input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A state-dependent precondition was not met.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// The stored state is inconsistent in a way that needs admin review.
    #[error("consistency violation: {0}")]
    Consistency(String),

    /// A requested resource was not found (domain-level).
    #[error("not found")]
    NotFound,

    /// A concurrent operation got in first; the batch is safe to retry.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Authorization failure at the domain boundary.
    #[error("unauthorized")]
    Unauthorized,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    pub fn consistency(msg: impl Into<String>) -> Self {
        Self::Consistency(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}
