// src/ai.rs

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::fmt::Write as _;

use crate::{
    engine::backend::{BackendError, GenerationBackend, RawPayload, RawQuestion},
    engine::job::GenerationJob,
    models::generation::ContentKind,
};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Per-document cap on prompt material, in characters.
const MAX_DOCUMENT_CHARS: usize = 8000;

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

/// Gemini-compatible generation backend over plain HTTP.
/// Constructed once at startup and injected into the engine.
pub struct GeminiBackend {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiBackend {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        }
    }

    async fn generate_text(&self, prompt: &str) -> Result<String, BackendError> {
        let url = format!(
            "{}/{}:generateContent?key={}",
            GEMINI_BASE_URL, self.model, self.api_key
        );

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError(format!("backend returned HTTP {}", status)));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| BackendError(format!("malformed response body: {}", e)))?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| BackendError("response contained no candidates".to_string()))
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    async fn generate(&self, job: &GenerationJob) -> Result<RawPayload, BackendError> {
        match job.key.kind {
            ContentKind::Note => {
                let prompt = build_note_prompt(job);
                let text = self.generate_text(&prompt).await?;
                Ok(RawPayload::Note(text))
            }
            ContentKind::Quiz => {
                let prompt = build_quiz_prompt(job);
                let text = self.generate_text(&prompt).await?;
                let questions: Vec<RawQuestion> = serde_json::from_str(strip_fences(&text))
                    .map_err(|e| BackendError(format!("quiz JSON did not parse: {}", e)))?;
                Ok(RawPayload::Quiz(questions))
            }
        }
    }
}

/// Shared preamble: plan goal/level/schedule, the item itself, sibling
/// structure and reference documents.
fn build_context(job: &GenerationJob) -> String {
    let mut ctx = String::new();
    let plan = &job.plan;
    let _ = writeln!(ctx, "Learning plan: {}", plan.title);
    let _ = writeln!(ctx, "Objective: {}", plan.objective);
    let _ = writeln!(
        ctx,
        "Learner level: {}, studying {} hours/week",
        plan.level, plan.weekly_hours
    );
    if let Some(date) = plan.target_date {
        let _ = writeln!(ctx, "Target date: {}", date);
    }

    let _ = writeln!(ctx, "\nPlan outline:");
    for entry in &job.outline {
        let _ = writeln!(ctx, "- {}", entry.goal_title);
        for task in &entry.task_titles {
            let _ = writeln!(ctx, "  - {}", task);
        }
    }

    let item = &job.item;
    let _ = writeln!(ctx, "\nCurrent item: {}", item.title);
    if !item.description.is_empty() {
        let _ = writeln!(ctx, "Description: {}", item.description);
    }
    if !item.memo.is_empty() {
        let _ = writeln!(ctx, "Learner memo: {}", item.memo);
    }
    if let Some(due) = item.due_date {
        let _ = writeln!(ctx, "Due: {}", due);
    }

    for doc in &job.documents {
        let excerpt: String = doc.content.chars().take(MAX_DOCUMENT_CHARS).collect();
        let _ = writeln!(
            ctx,
            "\nReference document '{}' ({}):\n{}",
            doc.filename, doc.declared_type, excerpt
        );
    }

    ctx
}

fn build_note_prompt(job: &GenerationJob) -> String {
    format!(
        "{}\n\
         Write a study note in Markdown for the current item, tailored to \
         the learner's level and coherent with the rest of the plan. \
         Respond with the Markdown body only.",
        build_context(job)
    )
}

fn build_quiz_prompt(job: &GenerationJob) -> String {
    let mut prompt = build_context(job);
    if let Some(note) = &job.existing_note {
        let _ = writeln!(prompt, "\nExisting study note:\n{}", note);
    }
    let count = job.target_count.unwrap_or(4);
    let _ = write!(
        prompt,
        "\nCreate exactly {} multiple-choice questions about the current \
         item. Respond with a JSON array only, no prose, where each element \
         is {{\"id\": string, \"prompt\": string, \"options\": [string], \
         \"answer_index\": number, \"explanation\": string}}.",
        count
    );
    prompt
}

/// Models often wrap JSON in a ```json fence despite instructions.
fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

#[cfg(test)]
mod tests {
    use super::strip_fences;

    #[test]
    fn strips_json_fences() {
        assert_eq!(strip_fences("```json\n[1,2]\n```"), "[1,2]");
        assert_eq!(strip_fences("```\n[]\n```"), "[]");
        assert_eq!(strip_fences("  [1] "), "[1]");
    }
}
