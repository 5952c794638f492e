// src/models/generation.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::state::GenerationStatus;

/// Which payload shape a generation record holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Note,
    Quiz,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Note => "note",
            ContentKind::Quiz => "quiz",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "note" => Some(ContentKind::Note),
            "quiz" => Some(ContentKind::Quiz),
            _ => None,
        }
    }
}

/// Which kind of learning item owns the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    Task,
    Goal,
}

impl OwnerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerKind::Task => "task",
            OwnerKind::Goal => "goal",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "task" => Some(OwnerKind::Task),
            "goal" => Some(OwnerKind::Goal),
            _ => None,
        }
    }
}

/// One generated quiz question, normalized before storage:
/// trimmed text, non-empty id, `answer_index` within the options bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub id: String,
    pub prompt: String,
    pub options: Vec<String>,
    pub answer_index: usize,
    pub explanation: String,
}

/// Content-kind-specific generated data. Stored as a JSONB column;
/// present only while the record is `ready`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GenerationPayload {
    Note { markdown: String },
    Quiz { questions: Vec<QuizQuestion> },
}

/// One generation attempt per (owning item, content kind).
///
/// Invariant: at most one `processing` record per (owner, kind); a new
/// attempt may only begin from `idle`/`failed`, or forcibly from `ready`.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRecord {
    pub id: i64,
    pub owner_kind: OwnerKind,
    pub owner_id: i64,
    pub kind: ContentKind,
    pub status: GenerationStatus,
    pub payload: Option<GenerationPayload>,
    /// Quiz only: how many questions this attempt was asked to produce.
    pub target_count: Option<i32>,
    pub requested_at: DateTime<Utc>,
    /// Set on both success and failure; `None` while `processing`.
    pub completed_at: Option<DateTime<Utc>>,
    /// Last failure reason; cleared on every new attempt.
    pub error_message: Option<String>,
}

/// Quiz question as sent to a client before submission
/// (answer and explanation withheld).
#[derive(Debug, Serialize)]
pub struct PublicQuizQuestion {
    pub id: String,
    pub prompt: String,
    pub options: Vec<String>,
}

/// DTO for returning a generation record to a polling client.
/// Quiz answers are hidden; notes are returned verbatim.
#[derive(Debug, Serialize)]
pub struct GenerationRecordResponse {
    pub owner_kind: OwnerKind,
    pub kind: ContentKind,
    pub status: GenerationStatus,
    pub target_count: Option<i32>,
    pub requested_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub questions: Option<Vec<PublicQuizQuestion>>,
}

impl GenerationRecordResponse {
    /// A well-formed `idle` body for owners that have no record row yet,
    /// so polling clients always see one of the four statuses.
    pub fn idle(owner_kind: OwnerKind, kind: ContentKind) -> Self {
        Self {
            owner_kind,
            kind,
            status: GenerationStatus::Idle,
            target_count: None,
            requested_at: None,
            completed_at: None,
            error_message: None,
            note: None,
            questions: None,
        }
    }
}

impl From<GenerationRecord> for GenerationRecordResponse {
    fn from(record: GenerationRecord) -> Self {
        let (note, questions) = match record.payload {
            Some(GenerationPayload::Note { markdown }) => (Some(markdown), None),
            Some(GenerationPayload::Quiz { questions }) => (
                None,
                Some(
                    questions
                        .into_iter()
                        .map(|q| PublicQuizQuestion {
                            id: q.id,
                            prompt: q.prompt,
                            options: q.options,
                        })
                        .collect(),
                ),
            ),
            None => (None, None),
        };

        Self {
            owner_kind: record.owner_kind,
            kind: record.kind,
            status: record.status,
            target_count: record.target_count,
            requested_at: Some(record.requested_at),
            completed_at: record.completed_at,
            error_message: record.error_message,
            note,
            questions,
        }
    }
}
