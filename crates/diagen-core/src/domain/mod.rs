//! Domain types shared across the pipeline.

pub mod error;
pub mod script;

pub use error::{DiagenError, Result};
pub use script::{Artifact, GenerationRequest, NormalizedScript, ResolvedScript};
