// src/db/resolver.rs

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, prelude::FromRow};
use uuid::Uuid;

use crate::{
    engine::resolver::{
        OutlineEntry, OwnerChain, OwnerItem, OwnerResolver, PlanContext, ReferenceDocument,
    },
    error::AppError,
    models::generation::OwnerKind,
};

#[derive(Debug, FromRow)]
struct TaskRow {
    id: i64,
    public_id: Uuid,
    goal_id: i64,
    title: String,
    description: String,
    memo: String,
    due_date: Option<NaiveDate>,
}

#[derive(Debug, FromRow)]
struct GoalRow {
    id: i64,
    public_id: Uuid,
    plan_id: i64,
    title: String,
    description: String,
    memo: String,
}

#[derive(Debug, FromRow)]
struct PlanRow {
    id: i64,
    user_id: i64,
    title: String,
    objective: String,
    level: String,
    weekly_hours: i32,
    target_date: Option<NaiveDate>,
}

#[derive(Debug, FromRow)]
struct OutlineRow {
    goal_id: i64,
    goal_title: String,
    task_title: Option<String>,
}

/// Postgres-backed owner resolution. Each link is fetched by the id its
/// child claims, so a dangling reference resolves to `None` rather than
/// to someone else's ancestor.
pub struct PgOwnerResolver {
    pool: PgPool,
}

impl PgOwnerResolver {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_plan(&self, plan_id: i64) -> Result<Option<PlanRow>, AppError> {
        let plan = sqlx::query_as::<_, PlanRow>(
            "SELECT id, user_id, title, objective, level, weekly_hours, target_date \
             FROM plans WHERE id = $1",
        )
        .bind(plan_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(plan)
    }
}

#[async_trait]
impl OwnerResolver for PgOwnerResolver {
    async fn resolve(
        &self,
        owner_kind: OwnerKind,
        public_id: Uuid,
    ) -> Result<Option<OwnerChain>, AppError> {
        match owner_kind {
            OwnerKind::Task => {
                let Some(task) = sqlx::query_as::<_, TaskRow>(
                    "SELECT id, public_id, goal_id, title, description, memo, due_date \
                     FROM tasks WHERE public_id = $1",
                )
                .bind(public_id)
                .fetch_optional(&self.pool)
                .await?
                else {
                    return Ok(None);
                };

                let Some(goal) = sqlx::query_as::<_, GoalRow>(
                    "SELECT id, public_id, plan_id, title, description, memo \
                     FROM goals WHERE id = $1",
                )
                .bind(task.goal_id)
                .fetch_optional(&self.pool)
                .await?
                else {
                    tracing::warn!("task {} references missing goal {}", task.id, task.goal_id);
                    return Ok(None);
                };

                let Some(plan) = self.fetch_plan(goal.plan_id).await? else {
                    tracing::warn!("goal {} references missing plan {}", goal.id, goal.plan_id);
                    return Ok(None);
                };

                Ok(Some(OwnerChain {
                    owner: OwnerItem {
                        id: task.id,
                        public_id: task.public_id,
                        title: task.title,
                        description: task.description,
                        memo: task.memo,
                        due_date: task.due_date,
                    },
                    plan: PlanContext {
                        plan_id: plan.id,
                        owner_user_id: plan.user_id,
                        title: plan.title,
                        objective: plan.objective,
                        level: plan.level,
                        weekly_hours: plan.weekly_hours,
                        target_date: plan.target_date,
                    },
                }))
            }
            OwnerKind::Goal => {
                let Some(goal) = sqlx::query_as::<_, GoalRow>(
                    "SELECT id, public_id, plan_id, title, description, memo \
                     FROM goals WHERE public_id = $1",
                )
                .bind(public_id)
                .fetch_optional(&self.pool)
                .await?
                else {
                    return Ok(None);
                };

                let Some(plan) = self.fetch_plan(goal.plan_id).await? else {
                    tracing::warn!("goal {} references missing plan {}", goal.id, goal.plan_id);
                    return Ok(None);
                };

                Ok(Some(OwnerChain {
                    owner: OwnerItem {
                        id: goal.id,
                        public_id: goal.public_id,
                        title: goal.title,
                        description: goal.description,
                        memo: goal.memo,
                        due_date: None,
                    },
                    plan: PlanContext {
                        plan_id: plan.id,
                        owner_user_id: plan.user_id,
                        title: plan.title,
                        objective: plan.objective,
                        level: plan.level,
                        weekly_hours: plan.weekly_hours,
                        target_date: plan.target_date,
                    },
                }))
            }
        }
    }

    async fn plan_outline(&self, plan_id: i64) -> Result<Vec<OutlineEntry>, AppError> {
        let rows = sqlx::query_as::<_, OutlineRow>(
            "SELECT g.id AS goal_id, g.title AS goal_title, t.title AS task_title \
             FROM goals g \
             LEFT JOIN tasks t ON t.goal_id = g.id \
             WHERE g.plan_id = $1 \
             ORDER BY g.position, g.id, t.position, t.id",
        )
        .bind(plan_id)
        .fetch_all(&self.pool)
        .await?;

        let mut outline: Vec<OutlineEntry> = Vec::new();
        let mut last_goal_id: Option<i64> = None;
        for row in rows {
            if last_goal_id != Some(row.goal_id) {
                outline.push(OutlineEntry {
                    goal_title: row.goal_title,
                    task_titles: Vec::new(),
                });
                last_goal_id = Some(row.goal_id);
            }
            if let (Some(entry), Some(title)) = (outline.last_mut(), row.task_title) {
                entry.task_titles.push(title);
            }
        }

        Ok(outline)
    }

    async fn reference_documents(
        &self,
        plan_id: i64,
        limit: i64,
    ) -> Result<Vec<ReferenceDocument>, AppError> {
        #[derive(FromRow)]
        struct DocRow {
            filename: String,
            declared_type: String,
            content: String,
        }

        let rows = sqlx::query_as::<_, DocRow>(
            "SELECT filename, declared_type, content \
             FROM documents \
             WHERE plan_id = $1 \
             ORDER BY uploaded_at DESC, id DESC \
             LIMIT $2",
        )
        .bind(plan_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|d| ReferenceDocument {
                filename: d.filename,
                declared_type: d.declared_type,
                content: d.content,
            })
            .collect())
    }
}
