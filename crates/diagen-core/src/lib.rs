//! Diagen Core Library
//!
//! Pipeline that turns an LLM-authored diagram script into a published
//! image artifact: synthesize → normalize → resolve symbolic references →
//! validate for safety → execute in isolation → retry on transient
//! failure → publish.

pub mod config;
pub mod domain;
pub mod handler;
pub mod mapping;
pub mod normalize;
pub mod pipeline;
pub mod publish;
pub mod resolve;
pub mod retry;
pub mod sandbox;
pub mod synth;
pub mod telemetry;
pub mod validate;

pub use config::PipelineConfig;
pub use domain::{
    Artifact, DiagenError, GenerationRequest, NormalizedScript, ResolvedScript, Result,
};
pub use handler::{AgentEvent, AgentResponse, EventHandler, ResponseBody};
pub use mapping::{ServiceMap, SymbolRegistry};
pub use normalize::normalize;
pub use pipeline::DiagramPipeline;
pub use publish::{ArtifactPublisher, FsObjectStore, ObjectStore, PublishedArtifact};
pub use resolve::resolve_imports;
pub use retry::{run_with_backoff, RetryOutcome, RetryPolicy};
pub use sandbox::{ExecutionResult, SandboxExecutor, ScratchDir};
pub use synth::{HttpSynthesizer, ScriptSynthesizer, StaticSynthesizer, SynthesizerConfig, SYSTEM_PROMPT};
pub use telemetry::init_tracing;
pub use validate::{RejectionCause, ScriptVerdict, SecurityValidator};

/// Diagen version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
