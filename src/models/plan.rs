// src/models/plan.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Represents the 'plans' table: a top-level learning roadmap.
/// The plan owner is the authorization root for everything beneath it.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Plan {
    pub id: i64,
    pub public_id: Uuid,
    #[serde(skip)]
    pub user_id: i64,
    pub title: String,

    /// What the user wants to achieve, in their own words.
    pub objective: String,

    /// Self-assessed starting level (e.g., "beginner").
    pub level: String,

    pub weekly_hours: i32,
    pub target_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Represents the 'goals' table: an ordered sub-goal/module within a plan.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Goal {
    pub id: i64,
    pub public_id: Uuid,
    #[serde(skip)]
    pub plan_id: i64,
    pub title: String,
    pub description: String,
    pub memo: String,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Represents the 'tasks' table: an ordered learning item within a goal.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Task {
    pub id: i64,
    pub public_id: Uuid,
    #[serde(skip)]
    pub goal_id: i64,
    pub title: String,
    pub description: String,
    pub memo: String,
    pub due_date: Option<NaiveDate>,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Represents the 'documents' table: a user-uploaded reference document
/// attached to a plan. Content is stored as extracted text.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Document {
    pub id: i64,
    #[serde(skip)]
    pub plan_id: i64,
    pub filename: String,
    pub declared_type: String,
    #[serde(skip)]
    pub content: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Plan detail with its full goal/task tree.
#[derive(Debug, Serialize)]
pub struct PlanDetail {
    #[serde(flatten)]
    pub plan: Plan,
    pub goals: Vec<GoalDetail>,
}

#[derive(Debug, Serialize)]
pub struct GoalDetail {
    #[serde(flatten)]
    pub goal: Goal,
    pub tasks: Vec<Task>,
}

/// DTO for creating a new plan.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePlanRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 2000))]
    pub objective: String,
    #[validate(length(min = 1, max = 50))]
    pub level: String,
    #[validate(range(min = 1, max = 80))]
    pub weekly_hours: i32,
    pub target_date: Option<NaiveDate>,
}

/// DTO for creating a new goal within a plan.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateGoalRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 5000))]
    #[serde(default)]
    pub description: String,
    #[validate(length(max = 2000))]
    #[serde(default)]
    pub memo: String,
    #[validate(range(min = 0, max = 1000))]
    pub position: i32,
}

/// DTO for creating a new task within a goal.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 5000))]
    #[serde(default)]
    pub description: String,
    #[validate(length(max = 2000))]
    #[serde(default)]
    pub memo: String,
    pub due_date: Option<NaiveDate>,
    #[validate(range(min = 0, max = 1000))]
    pub position: i32,
}

/// DTO for registering a reference document on a plan.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateDocumentRequest {
    #[validate(length(min = 1, max = 255))]
    pub filename: String,
    #[validate(length(min = 1, max = 100))]
    pub declared_type: String,
    #[validate(length(min = 1, max = 200000))]
    pub content: String,
}
