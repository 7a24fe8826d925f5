//! Pipeline configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for one pipeline process.
///
/// Loaded once at startup from the environment; immutable thereafter and
/// passed by reference to the pipeline components.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Key prefix for published artifacts.
    pub key_prefix: String,
    /// Root under which per-invocation scratch directories are created.
    pub scratch_root: PathBuf,
    /// Interpreter used to run validated scripts.
    pub interpreter: PathBuf,
    /// Fixed allowlist of trusted interpreter locations. Execution is
    /// refused when `interpreter` is not a member.
    pub allowed_interpreters: Vec<PathBuf>,
    /// Hard wall-clock limit for one script execution (milliseconds).
    pub execution_timeout_ms: u64,
    /// Maximum pipeline attempts per invocation (1 = no retries).
    pub max_attempts: u32,
    /// Base delay for exponential backoff between attempts (milliseconds).
    pub initial_delay_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            key_prefix: "uploaded_images".to_string(),
            scratch_root: std::env::temp_dir(),
            interpreter: PathBuf::from("/usr/bin/python3"),
            allowed_interpreters: vec![
                PathBuf::from("/usr/bin/python3"),
                PathBuf::from("/var/lang/bin/python3"),
            ],
            execution_timeout_ms: 30_000,
            max_attempts: 3,
            initial_delay_ms: 1_000,
        }
    }
}

impl PipelineConfig {
    /// Create a config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(root) = std::env::var("DIAGEN_SCRATCH_ROOT") {
            config.scratch_root = PathBuf::from(root);
        }
        if let Ok(interpreter) = std::env::var("DIAGEN_INTERPRETER") {
            config.interpreter = PathBuf::from(interpreter);
        }
        if let Ok(timeout) = std::env::var("DIAGEN_EXECUTION_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse() {
                config.execution_timeout_ms = ms;
            }
        }
        config
    }

    /// Set the scratch root (builder style).
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = root.into();
        self
    }

    /// Set the interpreter and make it the sole allowlist member.
    pub fn with_interpreter(mut self, interpreter: impl Into<PathBuf>) -> Self {
        let interpreter = interpreter.into();
        self.allowed_interpreters = vec![interpreter.clone()];
        self.interpreter = interpreter;
        self
    }
}
