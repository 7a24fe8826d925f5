//! Sandbox: isolated execution of validated, model-generated scripts.
//!
//! A script only reaches this layer after the security validator has
//! accepted it. Each invocation stages the script in its own randomly
//! named scratch directory, runs it through an allowlisted interpreter
//! with a minimized environment and a hard wall-clock timeout, and
//! recovers the artifact the script was expected to produce.
//!
//! # Modules
//!
//! - [`scratch`]  — per-invocation scratch directories
//! - [`executor`] — `SandboxExecutor`, `ExecutionResult`

pub mod executor;
pub mod scratch;

pub use executor::{ExecutionResult, SandboxExecutor};
pub use scratch::ScratchDir;
