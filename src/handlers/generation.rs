// src/handlers/generation.rs
//
// Route surface for the generation engine. All eight start/poll routes
// funnel into two shared functions parameterized by (owner kind,
// content kind); the engine does the rest.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    engine::Engine,
    error::AppError,
    models::generation::{ContentKind, GenerationRecordResponse, OwnerKind},
    models::submission::SubmitQuizRequest,
    utils::jwt::Claims,
};

#[derive(Debug, Deserialize)]
pub struct StartParams {
    /// Regenerate even when a ready result exists.
    #[serde(default)]
    pub force: bool,
}

/// Prepares a generation attempt and, when one starts, detaches the
/// runner. Replies immediately either way: 202 with the fresh
/// `processing` record, or 200 with the existing record.
async fn start(
    engine: Arc<Engine>,
    claims: Claims,
    owner_kind: OwnerKind,
    public_id: Uuid,
    kind: ContentKind,
    force: bool,
) -> Result<impl IntoResponse, AppError> {
    let outcome = engine
        .prepare(claims.user_id(), owner_kind, public_id, kind, force)
        .await?;

    let status = if outcome.started {
        if let Some(job) = outcome.job {
            engine.spawn_runner(job);
        }
        StatusCode::ACCEPTED
    } else {
        StatusCode::OK
    };

    let body = GenerationRecordResponse::from(outcome.record);
    Ok((status, Json(body)))
}

/// Returns the latest record for polling; synthesizes an `idle` body when
/// no attempt has ever started.
async fn latest(
    engine: Arc<Engine>,
    claims: Claims,
    owner_kind: OwnerKind,
    public_id: Uuid,
    kind: ContentKind,
) -> Result<impl IntoResponse, AppError> {
    let record = engine
        .latest_record(claims.user_id(), owner_kind, public_id, kind)
        .await?;

    let body = match record {
        Some(record) => GenerationRecordResponse::from(record),
        None => GenerationRecordResponse::idle(owner_kind, kind),
    };
    Ok(Json(body))
}

async fn submit(
    engine: Arc<Engine>,
    claims: Claims,
    owner_kind: OwnerKind,
    public_id: Uuid,
    payload: SubmitQuizRequest,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let outcome = engine
        .submit_quiz(claims.user_id(), owner_kind, public_id, &payload.answers)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "quiz": GenerationRecordResponse::from(outcome.quiz),
            "evaluation": outcome.evaluation,
        })),
    ))
}

async fn latest_submission(
    engine: Arc<Engine>,
    claims: Claims,
    owner_kind: OwnerKind,
    public_id: Uuid,
) -> Result<impl IntoResponse, AppError> {
    let result = engine
        .latest_submission(claims.user_id(), owner_kind, public_id)
        .await?
        .ok_or_else(|| AppError::NotFound("No submission yet".to_string()))?;

    Ok(Json(result))
}

// Task-owned content.

pub async fn start_task_note(
    State(engine): State<Arc<Engine>>,
    Extension(claims): Extension<Claims>,
    Path(public_id): Path<Uuid>,
    Query(params): Query<StartParams>,
) -> Result<impl IntoResponse, AppError> {
    start(engine, claims, OwnerKind::Task, public_id, ContentKind::Note, params.force).await
}

pub async fn get_task_note(
    State(engine): State<Arc<Engine>>,
    Extension(claims): Extension<Claims>,
    Path(public_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    latest(engine, claims, OwnerKind::Task, public_id, ContentKind::Note).await
}

pub async fn start_task_quiz(
    State(engine): State<Arc<Engine>>,
    Extension(claims): Extension<Claims>,
    Path(public_id): Path<Uuid>,
    Query(params): Query<StartParams>,
) -> Result<impl IntoResponse, AppError> {
    start(engine, claims, OwnerKind::Task, public_id, ContentKind::Quiz, params.force).await
}

pub async fn get_task_quiz(
    State(engine): State<Arc<Engine>>,
    Extension(claims): Extension<Claims>,
    Path(public_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    latest(engine, claims, OwnerKind::Task, public_id, ContentKind::Quiz).await
}

pub async fn submit_task_quiz(
    State(engine): State<Arc<Engine>>,
    Extension(claims): Extension<Claims>,
    Path(public_id): Path<Uuid>,
    Json(payload): Json<SubmitQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    submit(engine, claims, OwnerKind::Task, public_id, payload).await
}

pub async fn get_task_quiz_submission(
    State(engine): State<Arc<Engine>>,
    Extension(claims): Extension<Claims>,
    Path(public_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    latest_submission(engine, claims, OwnerKind::Task, public_id).await
}

// Goal-owned content.

pub async fn start_goal_note(
    State(engine): State<Arc<Engine>>,
    Extension(claims): Extension<Claims>,
    Path(public_id): Path<Uuid>,
    Query(params): Query<StartParams>,
) -> Result<impl IntoResponse, AppError> {
    start(engine, claims, OwnerKind::Goal, public_id, ContentKind::Note, params.force).await
}

pub async fn get_goal_note(
    State(engine): State<Arc<Engine>>,
    Extension(claims): Extension<Claims>,
    Path(public_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    latest(engine, claims, OwnerKind::Goal, public_id, ContentKind::Note).await
}

pub async fn start_goal_quiz(
    State(engine): State<Arc<Engine>>,
    Extension(claims): Extension<Claims>,
    Path(public_id): Path<Uuid>,
    Query(params): Query<StartParams>,
) -> Result<impl IntoResponse, AppError> {
    start(engine, claims, OwnerKind::Goal, public_id, ContentKind::Quiz, params.force).await
}

pub async fn get_goal_quiz(
    State(engine): State<Arc<Engine>>,
    Extension(claims): Extension<Claims>,
    Path(public_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    latest(engine, claims, OwnerKind::Goal, public_id, ContentKind::Quiz).await
}

pub async fn submit_goal_quiz(
    State(engine): State<Arc<Engine>>,
    Extension(claims): Extension<Claims>,
    Path(public_id): Path<Uuid>,
    Json(payload): Json<SubmitQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    submit(engine, claims, OwnerKind::Goal, public_id, payload).await
}

pub async fn get_goal_quiz_submission(
    State(engine): State<Arc<Engine>>,
    Extension(claims): Extension<Claims>,
    Path(public_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    latest_submission(engine, claims, OwnerKind::Goal, public_id).await
}
