//! Isolated execution of validated scripts in a child process.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::domain::{Artifact, DiagenError, ResolvedScript, Result};

use super::scratch::ScratchDir;

/// Conventional artifact name when normalization derived none.
const DEFAULT_ARTIFACT_NAME: &str = "diagram.png";

/// `PATH` visible to the child process.
const SANDBOX_PATH: &str = "/usr/bin:/bin";

/// Outcome of one child-process run.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    /// Where the produced artifact was found, if it was.
    pub artifact_path: Option<PathBuf>,
}

/// Runs validated scripts in an isolated child process.
///
/// Isolation measures: explicit argument vector (no shell), working
/// directory pinned to a per-invocation scratch directory, a minimized
/// environment (fixed `PATH`, scratch-scoped module path and home), an
/// interpreter allowlist, and a hard wall-clock timeout.
#[derive(Debug, Clone)]
pub struct SandboxExecutor {
    interpreter: PathBuf,
    allowed_interpreters: Vec<PathBuf>,
    scratch_root: PathBuf,
    timeout_ms: u64,
}

impl SandboxExecutor {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            interpreter: config.interpreter.clone(),
            allowed_interpreters: config.allowed_interpreters.clone(),
            scratch_root: config.scratch_root.clone(),
            timeout_ms: config.execution_timeout_ms,
        }
    }

    /// Execute a validated script and recover the produced artifact.
    ///
    /// `expected_artifact` is the filename the normalizer derived; when
    /// `None` the conventional default is used. Success requires a zero
    /// exit status and a non-empty artifact file; a clean exit with a
    /// missing or zero-byte artifact is still a failure.
    pub async fn execute(
        &self,
        script: &ResolvedScript,
        expected_artifact: Option<&str>,
    ) -> Result<Artifact> {
        if !self.allowed_interpreters.contains(&self.interpreter) || !self.interpreter.is_file() {
            warn!(event = "sandbox.interpreter_rejected", path = %self.interpreter.display());
            return Err(DiagenError::DisallowedInterpreter {
                path: self.interpreter.clone(),
            });
        }

        let scratch = ScratchDir::create(&self.scratch_root)?;
        let script_path = scratch.write_script(&script.code)?;
        let expected = expected_artifact.unwrap_or(DEFAULT_ARTIFACT_NAME);

        let result = self.run_child(&script_path, &scratch, expected).await?;

        if result.exit_code != 0 {
            warn!(
                event = "sandbox.execution_failed",
                exit_code = result.exit_code,
                stderr = %result.stderr,
            );
            return Err(DiagenError::Execution {
                exit_code: result.exit_code,
                stderr: result.stderr,
            });
        }

        let artifact_path = match result.artifact_path {
            Some(path) => path,
            None => {
                warn!(event = "sandbox.artifact_missing", expected = %expected);
                return Err(DiagenError::ArtifactMissing {
                    expected: expected.to_string(),
                });
            }
        };

        // Read before the scratch directory is dropped and removed.
        let bytes = tokio::fs::read(&artifact_path).await?;
        if bytes.is_empty() {
            warn!(event = "sandbox.artifact_empty", expected = %expected);
            return Err(DiagenError::ArtifactEmpty {
                expected: expected.to_string(),
            });
        }
        info!(
            event = "sandbox.artifact_recovered",
            file_name = %expected,
            size = bytes.len(),
            duration_ms = result.duration_ms,
        );

        Ok(Artifact {
            bytes,
            file_name: expected.to_string(),
        })
    }

    async fn run_child(
        &self,
        script_path: &std::path::Path,
        scratch: &ScratchDir,
        expected: &str,
    ) -> Result<ExecutionResult> {
        let start = Instant::now();

        let child = Command::new(&self.interpreter)
            .arg(script_path)
            .current_dir(scratch.path())
            .env_clear()
            .env("PATH", SANDBOX_PATH)
            .env("PYTHONPATH", scratch.path())
            .env("HOME", scratch.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let timeout = Duration::from_millis(self.timeout_ms);
        // Dropping the wait future on timeout kills the child; no partial
        // artifact is inspected after a timeout.
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_elapsed) => {
                warn!(event = "sandbox.timeout", limit_ms = self.timeout_ms);
                return Err(DiagenError::Timeout {
                    limit_ms: self.timeout_ms,
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if !stdout.is_empty() {
            debug!(event = "sandbox.stdout", output = %stdout);
        }
        if !stderr.is_empty() {
            debug!(event = "sandbox.stderr", output = %stderr);
        }

        let candidate = scratch.path().join(expected);
        Ok(ExecutionResult {
            exit_code: output.status.code().unwrap_or(-1),
            stdout,
            stderr,
            duration_ms: start.elapsed().as_millis() as u64,
            artifact_path: candidate.is_file().then_some(candidate),
        })
    }
}
