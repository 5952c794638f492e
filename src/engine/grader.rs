// src/engine/grader.rs

use std::collections::HashMap;

use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        generation::{ContentKind, GenerationPayload, GenerationRecord, OwnerKind, QuizQuestion},
        submission::{AnswerInput, GradedAnswer, QuizSubmissionResult},
    },
};

use super::Engine;
use super::state::GenerationStatus;
use super::store::OwnerKey;

/// Result of grading one submission: the quiz it was graded against and
/// the persisted evaluation row.
#[derive(Debug)]
pub struct SubmissionOutcome {
    pub quiz: GenerationRecord,
    pub evaluation: QuizSubmissionResult,
}

impl Engine {
    /// Grades a full answer submission against the ready quiz of the
    /// resolved owner and appends an immutable result row.
    ///
    /// Only a `ready` quiz is gradable; anything else is a conflict, so a
    /// submission is never graded against a partial or absent question
    /// set.
    pub async fn submit_quiz(
        &self,
        user_id: i64,
        owner_kind: OwnerKind,
        public_id: Uuid,
        answers: &[AnswerInput],
    ) -> Result<SubmissionOutcome, AppError> {
        if answers.is_empty() {
            return Err(AppError::BadRequest("No answers submitted".to_string()));
        }

        let chain = self.resolve_authorized(user_id, owner_kind, public_id).await?;

        let key = OwnerKey {
            owner_kind,
            owner_id: chain.owner.id,
            kind: ContentKind::Quiz,
        };
        let record = self.store.load(&key).await?.ok_or_else(|| {
            AppError::NotFound("No quiz has been generated for this item".to_string())
        })?;

        if record.status != GenerationStatus::Ready {
            return Err(AppError::Conflict(format!(
                "Quiz is not ready for submission (status: {})",
                record.status.as_str()
            )));
        }

        let questions = match &record.payload {
            Some(GenerationPayload::Quiz { questions }) => questions,
            _ => {
                return Err(AppError::InternalServerError(
                    "ready quiz record has no question payload".to_string(),
                ));
            }
        };

        let graded = grade(questions, answers)?;
        let correct_count = graded.iter().filter(|a| a.is_correct).count() as i32;

        let evaluation = self
            .store
            .insert_submission(record.id, user_id, correct_count, graded)
            .await?;

        Ok(SubmissionOutcome {
            quiz: record,
            evaluation,
        })
    }
}

/// Pure grading pass, in stored question order (not submission order).
///
/// The submission must be a bijection onto the stored question set: same
/// count, no duplicate ids, no omissions, every selection within its
/// question's option bounds. Each violation is a distinct bad-request.
fn grade(questions: &[QuizQuestion], answers: &[AnswerInput]) -> Result<Vec<GradedAnswer>, AppError> {
    if answers.len() != questions.len() {
        return Err(AppError::BadRequest(format!(
            "Expected {} answers, got {}",
            questions.len(),
            answers.len()
        )));
    }

    let mut by_id: HashMap<&str, &AnswerInput> = HashMap::with_capacity(answers.len());
    for answer in answers {
        if by_id.insert(answer.question_id.as_str(), answer).is_some() {
            return Err(AppError::BadRequest(format!(
                "Duplicate answer for question '{}'",
                answer.question_id
            )));
        }
    }

    let mut graded = Vec::with_capacity(questions.len());
    for question in questions {
        let answer = by_id.get(question.id.as_str()).ok_or_else(|| {
            AppError::BadRequest(format!("Missing answer for question '{}'", question.id))
        })?;

        if answer.selected_index >= question.options.len() {
            return Err(AppError::BadRequest(format!(
                "Selected option {} is out of range for question '{}'",
                answer.selected_index, question.id
            )));
        }

        let is_correct = answer.selected_index == question.answer_index;
        graded.push(GradedAnswer {
            question_id: question.id.clone(),
            prompt: question.prompt.clone(),
            options: question.options.clone(),
            selected_index: answer.selected_index,
            correct_index: question.answer_index,
            is_correct,
            explanation: question.explanation.clone(),
        });
    }

    Ok(graded)
}
