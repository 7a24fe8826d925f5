//! Script lifecycle types: each pipeline stage produces a new immutable
//! value rather than mutating the previous stage's output.

use serde::{Deserialize, Serialize};

/// A single request to the text-generation collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub user_prompt: String,
}

impl GenerationRequest {
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
        }
    }
}

/// Output of the Code Normalizer: generation artifacts stripped, diagram
/// block bounded, and the expected artifact filename derived (if any).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedScript {
    pub code: String,
    /// Filename the execution is expected to produce. `None` when the raw
    /// text contains no diagram construction statement; the executor then
    /// falls back to the conventional default name.
    pub artifact_name: Option<String>,
}

/// Output of the Import Resolver: normalized code with the import block
/// for every detected, resolvable service prepended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedScript {
    pub code: String,
}

/// Rendered binary output recovered from a completed execution.
///
/// Ephemeral: exists in memory only between execution and publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub bytes: Vec<u8>,
    pub file_name: String,
}

impl Artifact {
    /// Infer the content type from the filename extension.
    ///
    /// JPEG variants map to `image/jpeg`; everything else defaults to the
    /// PNG image type the rendering library produces.
    pub fn content_type(&self) -> &'static str {
        let lower = self.file_name.to_ascii_lowercase();
        if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
            "image/jpeg"
        } else {
            "image/png"
        }
    }
}
