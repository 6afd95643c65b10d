//! Error types for mintgate-core.
//!
//! Errors are structured, explicit, and stable. Messages are intended to be
//! human-readable while preserving machine-level categorization.

use std::fmt::{self, Display};

/// Result type used throughout mintgate-core.
pub type CoreResult<T> = Result<T, CoreError>;

/// Top-level error type for mintgate-core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Identity string that cannot be normalized into a leaf commitment.
    InvalidIdentity {
        message: String,
    },

    /// Hex decoding or digest length failure.
    Decode {
        message: String,
    },
}

impl CoreError {
    /// Construct an invalid identity error.
    pub fn invalid_identity<M: Into<String>>(message: M) -> Self {
        Self::InvalidIdentity {
            message: message.into(),
        }
    }

    /// Construct a decode error.
    pub fn decode<M: Into<String>>(message: M) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

impl Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidIdentity { message } => {
                write!(f, "invalid identity: {message}")
            }
            Self::Decode { message } => {
                write!(f, "decode error: {message}")
            }
        }
    }
}

impl std::error::Error for CoreError {}
