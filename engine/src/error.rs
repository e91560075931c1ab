//! Error types for the Basket engine.

use thiserror::Error;

/// All possible errors from the Basket engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("unknown change action: {0}")]
    UnknownAction(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::InvalidRecord("missing field `id`".into());
        assert_eq!(err.to_string(), "invalid record: missing field `id`");

        let err = Error::UnknownAction("upsert".into());
        assert_eq!(err.to_string(), "unknown change action: upsert");
    }
}
