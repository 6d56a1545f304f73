//! # Error Types
//!
//! Errors shared across subsystems.

use thiserror::Error;

/// Failure to parse a textual primitive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Input is not valid hex.
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    /// Decoded input has the wrong number of bytes.
    #[error("Invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Expected byte length
        expected: usize,
        /// Actual byte length
        actual: usize,
    },
}

/// Failure reported by the host blockchain when serving blocks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockchainError {
    /// Requested block does not exist.
    #[error("Block not found at height {0}")]
    BlockNotFound(u64),

    /// Host storage failed.
    #[error("Blockchain storage error: {0}")]
    Storage(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_length_message() {
        let err = ParseError::InvalidLength {
            expected: 32,
            actual: 3,
        };
        assert!(err.to_string().contains("32"));
        assert!(err.to_string().contains("3"));
    }

    #[test]
    fn test_block_not_found_message() {
        assert!(BlockchainError::BlockNotFound(42).to_string().contains("42"));
    }
}
