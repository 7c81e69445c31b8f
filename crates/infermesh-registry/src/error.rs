//! Error types for registry operations.

use thiserror::Error;

/// A result type using `RegistryError`.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors that can occur in registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The referenced agent id is not registered.
    #[error("agent not found: {0}")]
    NotFound(String),

    /// The registration payload failed validation.
    #[error("invalid registration: {0}")]
    InvalidRegistration(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages() {
        assert_eq!(
            RegistryError::NotFound("a1".into()).to_string(),
            "agent not found: a1"
        );
        assert_eq!(
            RegistryError::InvalidRegistration("agent_id is required".into()).to_string(),
            "invalid registration: agent_id is required"
        );
    }
}
