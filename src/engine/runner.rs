// src/engine/runner.rs

use std::sync::Arc;

use crate::models::generation::{ContentKind, GenerationPayload, QuizQuestion};

use super::Engine;
use super::backend::{RawPayload, RawQuestion};
use super::job::{GenerationJob, MAX_ERROR_MESSAGE_LEN, MIN_QUIZ_QUESTIONS};

impl Engine {
    /// Detaches `run` onto the runtime. Best-effort, at-most-once: the
    /// task does not survive a process restart, so a crash between claim
    /// and commit leaves the record `processing` until a forced retry.
    pub fn spawn_runner(self: &Arc<Self>, job: GenerationJob) {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            engine.run(job).await;
        });
    }

    /// Executes one claimed generation job to a terminal state.
    ///
    /// Every failure path (call error, timeout, empty result, malformed
    /// schema) commits `failed`; nothing escapes this boundary, so a
    /// polling caller always eventually observes `ready` or `failed`.
    pub async fn run(self: Arc<Self>, job: GenerationJob) {
        let key = job.key;

        let raw = match tokio::time::timeout(self.generation_timeout, self.backend.generate(&job))
            .await
        {
            Err(_) => Err(format!(
                "generation timed out after {}s",
                self.generation_timeout.as_secs()
            )),
            Ok(Err(e)) => Err(format!("generation call failed: {}", e)),
            Ok(Ok(raw)) => Ok(raw),
        };

        let payload = raw.and_then(|raw| validate_payload(raw, &job));

        match payload {
            Ok(payload) => {
                if let Err(e) = self.store.commit_ready(&key, payload).await {
                    // Known gap: the record stays `processing` if the
                    // final write fails. Observable only to an operator.
                    tracing::error!("Failed to commit ready generation for {:?}: {}", key, e);
                }
            }
            Err(reason) => {
                let reason = truncate_error(&reason);
                tracing::warn!("Generation failed for {:?}: {}", key, reason);
                if let Err(e) = self.store.commit_failed(&key, &reason).await {
                    tracing::error!("Failed to commit failed generation for {:?}: {}", key, e);
                }
            }
        }
    }
}

/// Validates the raw model output against the job's content kind and
/// normalizes it into a storable payload.
fn validate_payload(raw: RawPayload, job: &GenerationJob) -> Result<GenerationPayload, String> {
    match (job.key.kind, raw) {
        (ContentKind::Note, RawPayload::Note(text)) => {
            let markdown = text.trim();
            if markdown.is_empty() {
                return Err("model returned an empty note".to_string());
            }
            Ok(GenerationPayload::Note {
                markdown: markdown.to_string(),
            })
        }
        (ContentKind::Quiz, RawPayload::Quiz(raw_questions)) => {
            if raw_questions.len() < MIN_QUIZ_QUESTIONS {
                return Err(format!(
                    "model returned {} questions, need at least {}",
                    raw_questions.len(),
                    MIN_QUIZ_QUESTIONS
                ));
            }
            let questions = raw_questions
                .into_iter()
                .enumerate()
                .map(|(i, q)| normalize_question(i, q))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(GenerationPayload::Quiz { questions })
        }
        (kind, _) => Err(format!(
            "backend returned a payload that does not match content kind '{}'",
            kind.as_str()
        )),
    }
}

/// Idempotent question cleanup: trim all text, fall back to `q<n>` for a
/// blank id, clamp `answer_index` into the options bounds. Structural
/// problems (blank prompt, fewer than two options) fail the attempt.
fn normalize_question(index: usize, raw: RawQuestion) -> Result<QuizQuestion, String> {
    let prompt = raw.prompt.trim().to_string();
    if prompt.is_empty() {
        return Err(format!("question {} has an empty prompt", index + 1));
    }

    let options: Vec<String> = raw
        .options
        .iter()
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect();
    if options.len() < 2 {
        return Err(format!("question {} has fewer than 2 options", index + 1));
    }

    let id = match raw.id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => format!("q{}", index + 1),
    };

    let answer_index = raw.answer_index.clamp(0, options.len() as i64 - 1) as usize;

    let explanation = raw
        .explanation
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .to_string();

    Ok(QuizQuestion {
        id,
        prompt,
        options,
        answer_index,
        explanation,
    })
}

/// Caps a failure reason at MAX_ERROR_MESSAGE_LEN without splitting a
/// character.
fn truncate_error(message: &str) -> String {
    if message.len() <= MAX_ERROR_MESSAGE_LEN {
        return message.to_string();
    }
    let mut end = MAX_ERROR_MESSAGE_LEN;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    message[..end].to_string()
}
