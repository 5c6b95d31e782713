//! Error types for the tax advisor client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {

    // =============================
    // Collaborator Errors
    // =============================

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Contract violation: {0}")]
    ContractViolation(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    // =============================
    // Local Errors
    // =============================

    #[error("Configuration error: {0}")]
    Config(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ClientError {
    /// True for failures caused by an unexpected response shape rather than
    /// an unreachable or failing collaborator.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            ClientError::ContractViolation(_) | ClientError::SerializationError(_)
        )
    }
}
