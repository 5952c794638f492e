// src/engine/state.rs

use serde::{Deserialize, Serialize};

/// Lifecycle of one generation attempt.
///
/// `idle` is the virtual state of an owner with no record row yet;
/// it never appears in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Idle,
    Processing,
    Ready,
    Failed,
}

impl GenerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStatus::Idle => "idle",
            GenerationStatus::Processing => "processing",
            GenerationStatus::Ready => "ready",
            GenerationStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(GenerationStatus::Idle),
            "processing" => Some(GenerationStatus::Processing),
            "ready" => Some(GenerationStatus::Ready),
            "failed" => Some(GenerationStatus::Failed),
            _ => None,
        }
    }
}

/// Transition legality: may a new generation attempt start from `status`?
///
/// * `idle` and `failed` are always startable (failed retries on next request).
/// * `ready` is startable only with an explicit `force` regeneration.
/// * `processing` is never startable. There is no stale-lock reclaim: a
///   process crash between claim and commit leaves the record `processing`
///   until an operator intervenes.
pub fn can_start(status: GenerationStatus, force: bool) -> bool {
    match status {
        GenerationStatus::Idle => true,
        GenerationStatus::Failed => true,
        GenerationStatus::Processing => false,
        GenerationStatus::Ready => force,
    }
}
