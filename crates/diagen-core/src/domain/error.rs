//! Domain-level error taxonomy for the Diagen pipeline.

use std::path::PathBuf;

/// Diagen pipeline errors.
///
/// Validation, execution, and artifact errors are retryable within one
/// pipeline invocation (the model may regenerate differently). Upload and
/// mapping-table errors are not: the former is reported distinctly to the
/// caller, the latter is fatal at process start.
#[derive(Debug, thiserror::Error)]
pub enum DiagenError {
    #[error("script synthesis failed: {0}")]
    Synthesis(String),

    #[error("script rejected by validator: {reason}")]
    Validation { reason: String },

    #[error("disallowed interpreter: {path}")]
    DisallowedInterpreter { path: PathBuf },

    #[error("script execution timed out after {limit_ms}ms")]
    Timeout { limit_ms: u64 },

    #[error("script execution failed with exit code {exit_code}: {stderr}")]
    Execution { exit_code: i32, stderr: String },

    #[error("execution succeeded but expected artifact {expected} was not produced")]
    ArtifactMissing { expected: String },

    #[error("execution succeeded but artifact {expected} is empty")]
    ArtifactEmpty { expected: String },

    #[error("artifact upload failed: {0}")]
    Upload(String),

    #[error("invalid mapping table: {0}")]
    MappingTable(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DiagenError {
    /// Upload failures are a distinct failure class: they happen after a
    /// successful execution and are not retried inside the publisher.
    pub fn is_upload(&self) -> bool {
        matches!(self, DiagenError::Upload(_))
    }
}

/// Result type for Diagen domain operations.
pub type Result<T> = std::result::Result<T, DiagenError>;
