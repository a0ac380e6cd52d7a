//! Business rules for the marketplace: booking availability, pricing, and
//! conversation aggregation.
//!
//! Every entry point goes through this module; handlers never re-implement
//! these checks and never trust client-side validation.

pub mod availability;
pub mod conversations;
pub mod lifecycle;
pub mod pricing;

use thiserror::Error;

/// Typed failure for business-rule checks. The API layer maps each variant
/// onto the corresponding HTTP status.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }
}
