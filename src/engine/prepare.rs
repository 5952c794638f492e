// src/engine/prepare.rs

use uuid::Uuid;

use crate::{
    error::AppError,
    models::generation::{ContentKind, GenerationPayload, GenerationRecord, OwnerKind},
};

use super::Engine;
use super::job::{GenerationJob, MAX_REFERENCE_DOCUMENTS, quiz_target_count};
use super::state::{GenerationStatus, can_start};
use super::store::{ClaimOutcome, OwnerKey};

/// Result of a prepare call. `started == false` is the normal
/// "already done / already in flight" response, not an error.
#[derive(Debug)]
pub struct PrepareOutcome {
    pub started: bool,
    pub record: GenerationRecord,
    /// Present iff `started`; the caller detaches the runner with it.
    pub job: Option<GenerationJob>,
}

impl Engine {
    /// Decides whether a new generation attempt may start and, if so,
    /// atomically claims the slot and assembles the job snapshot.
    ///
    /// Under concurrent calls for the same (owner, kind), the store's
    /// compare-and-swap guarantees exactly one caller gets
    /// `started = true`; losers re-read and report the winner's
    /// `processing` record.
    pub async fn prepare(
        &self,
        user_id: i64,
        owner_kind: OwnerKind,
        public_id: Uuid,
        kind: ContentKind,
        force: bool,
    ) -> Result<PrepareOutcome, AppError> {
        let chain = self.resolve_authorized(user_id, owner_kind, public_id).await?;

        let key = OwnerKey {
            owner_kind,
            owner_id: chain.owner.id,
            kind,
        };

        let current = self.store.load(&key).await?;

        if let Some(record) = &current {
            if !can_start(record.status, force) {
                return Ok(PrepareOutcome {
                    started: false,
                    record: record.clone(),
                    job: None,
                });
            }
        }

        // Quiz target count is computed from source-material lengths
        // before the claim so it is persisted with the attempt.
        let (existing_note, target_count) = match kind {
            ContentKind::Note => (None, None),
            ContentKind::Quiz => {
                let note = self.load_ready_note(&key).await?;
                let note_len = note.as_deref().map_or(0, str::len);
                let count = quiz_target_count(
                    chain.owner.description.len(),
                    note_len,
                    chain.owner.memo.len(),
                );
                (note, Some(count))
            }
        };

        let previous = current.as_ref().map(|r| r.status);
        let claimed = match self
            .store
            .try_claim(&key, previous, target_count.map(|c| c as i32))
            .await?
        {
            ClaimOutcome::Claimed(record) => record,
            ClaimOutcome::Conflict => {
                // Lost the race. Someone else's attempt is the current
                // truth; report it instead of starting a duplicate.
                let record = self.store.load(&key).await?.ok_or_else(|| {
                    AppError::InternalServerError(
                        "generation record vanished after claim conflict".to_string(),
                    )
                })?;
                return Ok(PrepareOutcome {
                    started: false,
                    record,
                    job: None,
                });
            }
        };

        let outline = self.resolver.plan_outline(chain.plan.plan_id).await?;
        let documents = self
            .resolver
            .reference_documents(chain.plan.plan_id, MAX_REFERENCE_DOCUMENTS)
            .await?;

        let job = GenerationJob {
            key,
            plan: chain.plan,
            item: chain.owner,
            outline,
            documents,
            existing_note,
            target_count,
        };

        Ok(PrepareOutcome {
            started: true,
            record: claimed,
            job: Some(job),
        })
    }

    /// The owner's ready note text, if any. Used as quiz source material.
    async fn load_ready_note(&self, key: &OwnerKey) -> Result<Option<String>, AppError> {
        let note_key = OwnerKey {
            kind: ContentKind::Note,
            ..*key
        };
        let record = self.store.load(&note_key).await?;
        Ok(record.and_then(|r| match (r.status, r.payload) {
            (GenerationStatus::Ready, Some(GenerationPayload::Note { markdown })) => Some(markdown),
            _ => None,
        }))
    }
}
