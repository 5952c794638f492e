// src/engine/store.rs

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        generation::{ContentKind, GenerationPayload, GenerationRecord, OwnerKind},
        submission::{GradedAnswer, QuizSubmissionResult},
    },
};

use super::state::GenerationStatus;

/// Identifies one generation slot: (owning item, content kind).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerKey {
    pub owner_kind: OwnerKind,
    pub owner_id: i64,
    pub kind: ContentKind,
}

/// Outcome of a compare-and-swap claim attempt.
#[derive(Debug)]
pub enum ClaimOutcome {
    /// The slot was claimed; the record is now `processing`.
    Claimed(GenerationRecord),
    /// Another caller changed the record since it was read.
    /// Not an error: the caller re-reads and reports the current record.
    Conflict,
}

/// Persistent record of generation attempts and quiz submissions.
///
/// All mutation of a generation record goes through `try_claim` /
/// `commit_ready` / `commit_failed`; there are no direct field writes, so
/// the compare-and-swap in `try_claim` is the single source of truth for
/// the at-most-one-concurrent-generation guarantee.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn load(&self, key: &OwnerKey) -> Result<Option<GenerationRecord>, AppError>;

    /// Compare-and-swap claim. Succeeds only if the stored status still
    /// equals `previous` (`None` meaning no row exists yet). On success the
    /// record becomes `processing` with a fresh `requested_at` and cleared
    /// payload/error; the owning item's `updated_at` is touched.
    async fn try_claim(
        &self,
        key: &OwnerKey,
        previous: Option<GenerationStatus>,
        target_count: Option<i32>,
    ) -> Result<ClaimOutcome, AppError>;

    /// Concludes the in-flight attempt as `ready`. No-op (logged) if the
    /// record is not `processing`.
    async fn commit_ready(&self, key: &OwnerKey, payload: GenerationPayload)
    -> Result<(), AppError>;

    /// Concludes the in-flight attempt as `failed` with a reason.
    async fn commit_failed(&self, key: &OwnerKey, error: &str) -> Result<(), AppError>;

    /// Appends an immutable grading result row. Prior submissions for the
    /// same quiz/user are kept.
    async fn insert_submission(
        &self,
        record_id: i64,
        user_id: i64,
        correct_count: i32,
        answers: Vec<GradedAnswer>,
    ) -> Result<QuizSubmissionResult, AppError>;

    /// Most recent submission by `user_id` for `record_id`, if any.
    async fn latest_submission(
        &self,
        record_id: i64,
        user_id: i64,
    ) -> Result<Option<QuizSubmissionResult>, AppError>;
}
