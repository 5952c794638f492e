// src/engine/mod.rs
//
// The AI content-generation engine: one state machine, claim/commit
// store, job preparer, background runner and quiz grader, parameterized
// by (owner kind, content kind) instead of being written out per
// combination.

pub mod backend;
pub mod grader;
pub mod job;
pub mod prepare;
pub mod resolver;
pub mod runner;
pub mod state;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::{
    error::AppError,
    models::generation::{ContentKind, GenerationRecord, OwnerKind},
    models::submission::QuizSubmissionResult,
};

use backend::GenerationBackend;
use resolver::{OwnerChain, OwnerResolver};
use store::{ContentStore, OwnerKey};

/// Orchestrates generation attempts and quiz grading over injected
/// collaborators. Handlers hold it behind an `Arc` and never touch the
/// store or backend directly.
pub struct Engine {
    store: Arc<dyn ContentStore>,
    resolver: Arc<dyn OwnerResolver>,
    backend: Arc<dyn GenerationBackend>,
    generation_timeout: Duration,
}

impl Engine {
    pub fn new(
        store: Arc<dyn ContentStore>,
        resolver: Arc<dyn OwnerResolver>,
        backend: Arc<dyn GenerationBackend>,
        generation_timeout: Duration,
    ) -> Self {
        Self {
            store,
            resolver,
            backend,
            generation_timeout,
        }
    }

    /// Resolves `public_id` and authorizes `user_id` against the plan
    /// owner. A missing or broken chain is `NotFound`; a foreign plan is
    /// `AccessDenied`. The two are deliberately distinct.
    pub(crate) async fn resolve_authorized(
        &self,
        user_id: i64,
        owner_kind: OwnerKind,
        public_id: Uuid,
    ) -> Result<OwnerChain, AppError> {
        let chain = self
            .resolver
            .resolve(owner_kind, public_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("{} '{}' not found", owner_kind.as_str(), public_id))
            })?;

        if chain.plan.owner_user_id != user_id {
            return Err(AppError::AccessDenied(
                "You do not own the plan this item belongs to".to_string(),
            ));
        }

        Ok(chain)
    }

    /// Latest generation record for display/polling. `None` means the
    /// owner is still `idle` (no attempt ever started).
    pub async fn latest_record(
        &self,
        user_id: i64,
        owner_kind: OwnerKind,
        public_id: Uuid,
        kind: ContentKind,
    ) -> Result<Option<GenerationRecord>, AppError> {
        let chain = self.resolve_authorized(user_id, owner_kind, public_id).await?;
        let key = OwnerKey {
            owner_kind,
            owner_id: chain.owner.id,
            kind,
        };
        self.store.load(&key).await
    }

    /// Latest quiz submission by the caller for this owner's quiz.
    pub async fn latest_submission(
        &self,
        user_id: i64,
        owner_kind: OwnerKind,
        public_id: Uuid,
    ) -> Result<Option<QuizSubmissionResult>, AppError> {
        let chain = self.resolve_authorized(user_id, owner_kind, public_id).await?;
        let key = OwnerKey {
            owner_kind,
            owner_id: chain.owner.id,
            kind: ContentKind::Quiz,
        };
        let record = self.store.load(&key).await?.ok_or_else(|| {
            AppError::NotFound("No quiz has been generated for this item".to_string())
        })?;
        self.store.latest_submission(record.id, user_id).await
    }
}
