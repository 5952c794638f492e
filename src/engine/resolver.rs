// src/engine/resolver.rs

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::{error::AppError, models::generation::OwnerKind};

/// Plan-level fields needed for authorization and prompt context.
#[derive(Debug, Clone)]
pub struct PlanContext {
    pub plan_id: i64,
    pub owner_user_id: i64,
    pub title: String,
    pub objective: String,
    pub level: String,
    pub weekly_hours: i32,
    pub target_date: Option<NaiveDate>,
}

/// The resolved learning item that owns a generation slot.
#[derive(Debug, Clone)]
pub struct OwnerItem {
    pub id: i64,
    pub public_id: Uuid,
    pub title: String,
    pub description: String,
    pub memo: String,
    pub due_date: Option<NaiveDate>,
}

/// Ordered ancestor path from a learning item up to its plan.
#[derive(Debug, Clone)]
pub struct OwnerChain {
    pub owner: OwnerItem,
    pub plan: PlanContext,
}

/// One goal and its task titles, used as sibling structure in prompts
/// so generated content stays coherent with the rest of the plan.
#[derive(Debug, Clone)]
pub struct OutlineEntry {
    pub goal_title: String,
    pub task_titles: Vec<String>,
}

/// Reference document content for prompt grounding.
#[derive(Debug, Clone)]
pub struct ReferenceDocument {
    pub filename: String,
    pub declared_type: String,
    pub content: String,
}

/// Resolves public identifiers to internal ids and ancestor chains, and
/// gathers the related entities a generation prompt needs.
///
/// `resolve` verifies the chain is internally consistent (each link
/// actually belongs to its claimed parent); a broken link is `Ok(None)`,
/// i.e. indistinguishable from a missing item. Authorization against the
/// plan owner is the caller's job and fails distinctly.
#[async_trait]
pub trait OwnerResolver: Send + Sync {
    async fn resolve(
        &self,
        owner_kind: OwnerKind,
        public_id: Uuid,
    ) -> Result<Option<OwnerChain>, AppError>;

    /// All goals and task titles of a plan, in position order.
    async fn plan_outline(&self, plan_id: i64) -> Result<Vec<OutlineEntry>, AppError>;

    /// Up to `limit` most recently uploaded reference documents.
    async fn reference_documents(
        &self,
        plan_id: i64,
        limit: i64,
    ) -> Result<Vec<ReferenceDocument>, AppError>;
}
