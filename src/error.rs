//! Error types for the property store.
//!
//! All errors are strongly typed using thiserror. The store performs no I/O,
//! so there are no transient failure modes; every error here is a caller
//! error surfaced at the write site.

use thiserror::Error;

/// A value could not be reduced to a canonical byte form for fingerprinting.
///
/// Writes that fail canonicalization are rejected without mutating any state.
#[derive(Debug, Error)]
pub enum CanonicalizationError {
    /// Non-finite floats have no canonical serialized form.
    #[error("non-finite float {value} cannot be fingerprinted")]
    NonFiniteFloat {
        /// The offending float.
        value: f64,
    },

    /// The value failed to serialize.
    #[error("value serialization failed: {message}")]
    Serialization {
        /// Serializer diagnostic.
        message: String,
    },
}

/// Top-level error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The written value could not be fingerprinted.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Internal invariant violation.
    #[error("internal error: {message}")]
    Internal {
        /// What went wrong.
        message: String,
    },
}

impl StoreError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a canonicalization error.
    #[must_use]
    pub const fn is_canonicalization(&self) -> bool {
        matches!(self, Self::Canonicalization(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
