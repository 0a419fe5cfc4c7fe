//! Error taxonomy for AO baking
//!
//! A single error type covers input validation, topology checks, host
//! collaborator failures and configuration parsing.

use thiserror::Error;

/// Errors raised while baking ambient occlusion
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BakeError {
    /// Rejected before any computation was attempted
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Color buffer does not match the mesh corner layout
    #[error("Topology mismatch: expected {expected} color values, got {actual}")]
    TopologyMismatch {
        /// Expected number of floats (4 per face corner)
        expected: usize,
        /// Number of floats actually produced or supplied
        actual: usize,
    },

    /// A single ray query failed inside the host
    #[error("Ray query failed: {0}")]
    QueryFailure(String),

    /// The host does not know the requested object
    #[error("Unknown object: {0}")]
    UnknownObject(String),

    /// The host could not create, remove or update scene state
    #[error("Host error: {0}")]
    Host(String),

    /// Configuration could not be parsed or serialized
    #[error("Config error: {0}")]
    Config(String),
}

impl BakeError {
    /// Shorthand for [`BakeError::InvalidInput`]
    pub fn invalid(message: impl Into<String>) -> Self {
        BakeError::InvalidInput(message.into())
    }
}

/// Result alias used throughout the crate
pub type BakeResult<T> = Result<T, BakeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = BakeError::TopologyMismatch { expected: 12, actual: 8 };
        assert_eq!(
            err.to_string(),
            "Topology mismatch: expected 12 color values, got 8"
        );

        let err = BakeError::invalid("ray_count must be at least 1");
        assert_eq!(err.to_string(), "Invalid input: ray_count must be at least 1");
    }
}
