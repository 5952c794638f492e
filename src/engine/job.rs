// src/engine/job.rs

use super::resolver::{OutlineEntry, OwnerItem, PlanContext, ReferenceDocument};
use super::store::OwnerKey;

/// Bounds on a generated quiz. The model is asked for `target_count`
/// questions and must return at least the minimum to be accepted.
pub const MIN_QUIZ_QUESTIONS: usize = 4;
pub const MAX_QUIZ_QUESTIONS: usize = 10;

/// How many reference documents are snapshotted into a job.
pub const MAX_REFERENCE_DOCUMENTS: i64 = 2;

/// Failure reasons recorded on the record are capped at this length.
pub const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// A self-contained snapshot of everything one generation call needs.
/// Built at claim time; the background task never re-reads the database
/// for prompt inputs.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub key: OwnerKey,
    pub plan: PlanContext,
    pub item: OwnerItem,
    /// Sibling structure of the whole plan, for coherence.
    pub outline: Vec<OutlineEntry>,
    pub documents: Vec<ReferenceDocument>,
    /// For quiz jobs: the item's ready note, if one exists, as extra
    /// source material.
    pub existing_note: Option<String>,
    /// Quiz only.
    pub target_count: Option<usize>,
}

/// Heuristic question count for a quiz: longer source material warrants
/// more questions, within bounds that keep generation cost and quiz
/// length reasonable.
pub fn quiz_target_count(description_len: usize, note_len: usize, memo_len: usize) -> usize {
    let mut count = MIN_QUIZ_QUESTIONS + description_len / 200 + note_len / 1200;
    if memo_len > 120 {
        count += 1;
    }
    count.clamp(MIN_QUIZ_QUESTIONS, MAX_QUIZ_QUESTIONS)
}
