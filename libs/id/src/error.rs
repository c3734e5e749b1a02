//! Errors returned when parsing identifiers.

use thiserror::Error;

/// Reasons an identifier string is rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("identifier is empty")]
    Empty,

    #[error("identifier has no '_' separator")]
    MissingSeparator,

    #[error("wrong identifier prefix: expected '{expected}', got '{actual}'")]
    WrongPrefix {
        expected: &'static str,
        actual: String,
    },

    #[error("malformed ULID: {0}")]
    Ulid(String),
}

impl IdError {
    /// True when the string belonged to another identifier kind.
    pub fn is_wrong_kind(&self) -> bool {
        matches!(self, IdError::WrongPrefix { .. })
    }
}
