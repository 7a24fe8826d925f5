//! End-to-end pipeline: synthesize → normalize → resolve → validate →
//! execute, wrapped in bounded retry.

use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::domain::{Artifact, DiagenError, GenerationRequest, Result};
use crate::mapping::{ServiceMap, SymbolRegistry};
use crate::normalize::normalize;
use crate::resolve::resolve_imports;
use crate::retry::{run_with_backoff, RetryOutcome, RetryPolicy};
use crate::sandbox::SandboxExecutor;
use crate::synth::{ScriptSynthesizer, SYSTEM_PROMPT};
use crate::validate::{ScriptVerdict, SecurityValidator};

/// One pipeline instance per process.
///
/// Holds the immutable mapping table and compiled validator patterns;
/// individual invocations share them read-only, so no locking is needed
/// across concurrent invocations.
pub struct DiagramPipeline<S: ScriptSynthesizer> {
    config: PipelineConfig,
    services: ServiceMap,
    registry: SymbolRegistry,
    validator: SecurityValidator,
    executor: SandboxExecutor,
    synthesizer: S,
}

impl<S: ScriptSynthesizer> DiagramPipeline<S> {
    pub fn new(config: PipelineConfig, services: ServiceMap, synthesizer: S) -> Self {
        let executor = SandboxExecutor::new(&config);
        Self {
            config,
            services,
            registry: SymbolRegistry::new(),
            validator: SecurityValidator::new(),
            executor,
            synthesizer,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the full pipeline for one prompt, retrying failed attempts
    /// with exponential backoff.
    pub async fn generate(&self, prompt: &str) -> RetryOutcome<Artifact> {
        let policy = RetryPolicy {
            max_attempts: self.config.max_attempts,
            initial_delay_ms: self.config.initial_delay_ms,
        };
        run_with_backoff(&policy, |attempt_index| {
            info!(event = "pipeline.attempt", attempt = attempt_index + 1);
            self.attempt(prompt)
        })
        .await
    }

    /// One attempt. Validation is the gate: a rejected script returns
    /// here and never reaches the executor.
    async fn attempt(&self, prompt: &str) -> Result<Artifact> {
        let request = GenerationRequest::new(SYSTEM_PROMPT, prompt);
        let raw = self.synthesizer.synthesize(&request).await?;
        debug!(event = "pipeline.synthesized", chars = raw.len());

        let normalized = normalize(&raw);
        let resolved = resolve_imports(&normalized, &self.services, &self.registry);

        if let ScriptVerdict::Rejected(cause) = self.validator.validate(&resolved.code) {
            return Err(DiagenError::Validation {
                reason: cause.to_string(),
            });
        }

        self.executor
            .execute(&resolved, normalized.artifact_name.as_deref())
            .await
    }
}
