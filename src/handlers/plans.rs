// src/handlers/plans.rs
//
// Thin CRUD over the plan -> goal -> task hierarchy. Ownership checks
// mirror the engine's: missing rows are 404, foreign plans are 403.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    models::plan::{
        CreateDocumentRequest, CreateGoalRequest, CreatePlanRequest, CreateTaskRequest, Document,
        Goal, GoalDetail, Plan, PlanDetail, Task,
    },
    utils::jwt::Claims,
};

/// Loads a plan by public id and verifies the caller owns it.
async fn owned_plan(pool: &PgPool, user_id: i64, public_id: Uuid) -> Result<Plan, AppError> {
    let plan = sqlx::query_as::<_, Plan>(
        "SELECT id, public_id, user_id, title, objective, level, weekly_hours, target_date, \
                created_at, updated_at \
         FROM plans WHERE public_id = $1",
    )
    .bind(public_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Plan '{}' not found", public_id)))?;

    if plan.user_id != user_id {
        return Err(AppError::AccessDenied("You do not own this plan".to_string()));
    }

    Ok(plan)
}

/// Creates a new learning plan for the caller.
pub async fn create_plan(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreatePlanRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let plan = sqlx::query_as::<_, Plan>(
        "INSERT INTO plans (public_id, user_id, title, objective, level, weekly_hours, \
                            target_date) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING id, public_id, user_id, title, objective, level, weekly_hours, target_date, \
                   created_at, updated_at",
    )
    .bind(Uuid::new_v4())
    .bind(claims.user_id())
    .bind(&payload.title)
    .bind(&payload.objective)
    .bind(&payload.level)
    .bind(payload.weekly_hours)
    .bind(payload.target_date)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(plan)))
}

/// Lists the caller's plans, most recently updated first.
pub async fn list_plans(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let plans = sqlx::query_as::<_, Plan>(
        "SELECT id, public_id, user_id, title, objective, level, weekly_hours, target_date, \
                created_at, updated_at \
         FROM plans WHERE user_id = $1 \
         ORDER BY updated_at DESC, id DESC",
    )
    .bind(claims.user_id())
    .fetch_all(&pool)
    .await?;

    Ok(Json(plans))
}

/// Plan detail with its full goal/task tree.
pub async fn get_plan(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(public_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let plan = owned_plan(&pool, claims.user_id(), public_id).await?;

    let goals = sqlx::query_as::<_, Goal>(
        "SELECT id, public_id, plan_id, title, description, memo, position, created_at, \
                updated_at \
         FROM goals WHERE plan_id = $1 \
         ORDER BY position, id",
    )
    .bind(plan.id)
    .fetch_all(&pool)
    .await?;

    let tasks = sqlx::query_as::<_, Task>(
        "SELECT t.id, t.public_id, t.goal_id, t.title, t.description, t.memo, t.due_date, \
                t.position, t.created_at, t.updated_at \
         FROM tasks t \
         JOIN goals g ON g.id = t.goal_id \
         WHERE g.plan_id = $1 \
         ORDER BY t.position, t.id",
    )
    .bind(plan.id)
    .fetch_all(&pool)
    .await?;

    let goals = goals
        .into_iter()
        .map(|goal| {
            let tasks = tasks
                .iter()
                .filter(|t| t.goal_id == goal.id)
                .cloned()
                .collect();
            GoalDetail { goal, tasks }
        })
        .collect();

    Ok(Json(PlanDetail { plan, goals }))
}

/// Adds a goal to one of the caller's plans.
pub async fn create_goal(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(public_id): Path<Uuid>,
    Json(payload): Json<CreateGoalRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let plan = owned_plan(&pool, claims.user_id(), public_id).await?;

    let goal = sqlx::query_as::<_, Goal>(
        "INSERT INTO goals (public_id, plan_id, title, description, memo, position) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING id, public_id, plan_id, title, description, memo, position, created_at, \
                   updated_at",
    )
    .bind(Uuid::new_v4())
    .bind(plan.id)
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(&payload.memo)
    .bind(payload.position)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(goal)))
}

/// Adds a task to a goal the caller owns (via its plan).
pub async fn create_task(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(public_id): Path<Uuid>,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    #[derive(sqlx::FromRow)]
    struct GoalOwner {
        id: i64,
        user_id: i64,
    }

    let goal = sqlx::query_as::<_, GoalOwner>(
        "SELECT g.id, p.user_id \
         FROM goals g \
         JOIN plans p ON p.id = g.plan_id \
         WHERE g.public_id = $1",
    )
    .bind(public_id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Goal '{}' not found", public_id)))?;

    if goal.user_id != claims.user_id() {
        return Err(AppError::AccessDenied(
            "You do not own the plan this goal belongs to".to_string(),
        ));
    }

    let task = sqlx::query_as::<_, Task>(
        "INSERT INTO tasks (public_id, goal_id, title, description, memo, due_date, position) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING id, public_id, goal_id, title, description, memo, due_date, position, \
                   created_at, updated_at",
    )
    .bind(Uuid::new_v4())
    .bind(goal.id)
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(&payload.memo)
    .bind(payload.due_date)
    .bind(payload.position)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(task)))
}

/// Registers a reference document (extracted text) on a plan.
pub async fn add_document(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(public_id): Path<Uuid>,
    Json(payload): Json<CreateDocumentRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let plan = owned_plan(&pool, claims.user_id(), public_id).await?;

    let document = sqlx::query_as::<_, Document>(
        "INSERT INTO documents (plan_id, filename, declared_type, content) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id, plan_id, filename, declared_type, content, uploaded_at",
    )
    .bind(plan.id)
    .bind(&payload.filename)
    .bind(&payload.declared_type)
    .bind(&payload.content)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(document)))
}

/// Lists a plan's reference documents, newest first.
pub async fn list_documents(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(public_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let plan = owned_plan(&pool, claims.user_id(), public_id).await?;

    let documents = sqlx::query_as::<_, Document>(
        "SELECT id, plan_id, filename, declared_type, content, uploaded_at \
         FROM documents WHERE plan_id = $1 \
         ORDER BY uploaded_at DESC, id DESC",
    )
    .bind(plan.id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(documents))
}
