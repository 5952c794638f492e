// src/models/submission.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// One answer inside a quiz submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerInput {
    pub question_id: String,
    pub selected_index: usize,
}

/// DTO for submitting a full quiz attempt.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitQuizRequest {
    #[validate(length(min = 1, message = "No answers submitted."))]
    pub answers: Vec<AnswerInput>,
}

/// Per-question grading outcome, stored inside the submission row.
/// Includes the correct index and explanation since the quiz is over
/// for this attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradedAnswer {
    pub question_id: String,
    pub prompt: String,
    pub options: Vec<String>,
    pub selected_index: usize,
    pub correct_index: usize,
    pub is_correct: bool,
    pub explanation: String,
}

/// Append-only grading result: one row per (quiz record, user, submission).
/// Never mutated; the "latest" result is the most recent `submitted_at`.
#[derive(Debug, Clone, Serialize)]
pub struct QuizSubmissionResult {
    pub id: i64,
    pub record_id: i64,
    pub user_id: i64,
    pub total_questions: i32,
    pub correct_count: i32,
    pub answers: Vec<GradedAnswer>,
    pub submitted_at: DateTime<Utc>,
}
