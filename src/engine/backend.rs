// src/engine/backend.rs

use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;

use super::job::GenerationJob;

/// Quiz question exactly as the model returned it, before normalization.
/// Loose on purpose: blank ids and out-of-range indices are repaired by
/// the runner, structural problems fail the attempt.
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuestion {
    #[serde(default)]
    pub id: Option<String>,
    pub prompt: String,
    pub options: Vec<String>,
    pub answer_index: i64,
    #[serde(default)]
    pub explanation: Option<String>,
}

/// Untyped generation result, matching the job's content kind.
#[derive(Debug, Clone)]
pub enum RawPayload {
    Note(String),
    Quiz(Vec<RawQuestion>),
}

/// Failure from the external generation call.
#[derive(Debug)]
pub struct BackendError(pub String);

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BackendError {}

/// External AI generation call. Injected into the engine at construction
/// rather than held as a module-scope singleton.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(&self, job: &GenerationJob) -> Result<RawPayload, BackendError>;
}
