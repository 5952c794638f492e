// src/db/content_store.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction, prelude::FromRow, types::Json};

use crate::{
    engine::{
        state::GenerationStatus,
        store::{ClaimOutcome, ContentStore, OwnerKey},
    },
    error::AppError,
    models::{
        generation::{ContentKind, GenerationPayload, GenerationRecord, OwnerKind},
        submission::{GradedAnswer, QuizSubmissionResult},
    },
};

const RECORD_COLUMNS: &str = "id, task_id, goal_id, kind, status, payload, target_count, \
     requested_at, completed_at, error_message";

/// Which FK column addresses records for this owner kind. Each owner
/// kind has its own column so deleting the owner row cascades into its
/// records.
fn owner_column(owner_kind: OwnerKind) -> &'static str {
    match owner_kind {
        OwnerKind::Task => "task_id",
        OwnerKind::Goal => "goal_id",
    }
}

/// Raw 'generation_records' row; enums live as TEXT in the database and
/// are lifted into domain types on read.
#[derive(Debug, FromRow)]
struct GenerationRow {
    id: i64,
    task_id: Option<i64>,
    goal_id: Option<i64>,
    kind: String,
    status: String,
    payload: Option<Json<GenerationPayload>>,
    target_count: Option<i32>,
    requested_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
}

impl GenerationRow {
    fn into_record(self) -> Result<GenerationRecord, AppError> {
        // The schema CHECK guarantees exactly one owner column is set.
        let (owner_kind, owner_id) = match (self.task_id, self.goal_id) {
            (Some(id), None) => (OwnerKind::Task, id),
            (None, Some(id)) => (OwnerKind::Goal, id),
            _ => {
                return Err(AppError::InternalServerError(format!(
                    "generation record {} must reference exactly one owner",
                    self.id
                )));
            }
        };
        let kind = ContentKind::parse(&self.kind).ok_or_else(|| {
            AppError::InternalServerError(format!("unknown content kind '{}'", self.kind))
        })?;
        let status = GenerationStatus::parse(&self.status).ok_or_else(|| {
            AppError::InternalServerError(format!("unknown status '{}'", self.status))
        })?;

        Ok(GenerationRecord {
            id: self.id,
            owner_kind,
            owner_id,
            kind,
            status,
            payload: self.payload.map(|p| p.0),
            target_count: self.target_count,
            requested_at: self.requested_at,
            completed_at: self.completed_at,
            error_message: self.error_message,
        })
    }
}

#[derive(Debug, FromRow)]
struct SubmissionRow {
    id: i64,
    record_id: i64,
    user_id: i64,
    total_questions: i32,
    correct_count: i32,
    answers: Json<Vec<GradedAnswer>>,
    submitted_at: DateTime<Utc>,
}

impl From<SubmissionRow> for QuizSubmissionResult {
    fn from(row: SubmissionRow) -> Self {
        QuizSubmissionResult {
            id: row.id,
            record_id: row.record_id,
            user_id: row.user_id,
            total_questions: row.total_questions,
            correct_count: row.correct_count,
            answers: row.answers.0,
            submitted_at: row.submitted_at,
        }
    }
}

/// Postgres-backed content store. The compare-and-swap is a conditional
/// UPDATE (or INSERT ... ON CONFLICT DO NOTHING for the first attempt),
/// so legality is enforced by the row itself, not read-then-write.
pub struct PgContentStore {
    pool: PgPool,
}

impl PgContentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Touches the owning item's `updated_at` so list views reflect
    /// generation activity.
    async fn touch_owner(
        tx: &mut Transaction<'_, Postgres>,
        key: &OwnerKey,
    ) -> Result<(), AppError> {
        let sql = match key.owner_kind {
            OwnerKind::Task => "UPDATE tasks SET updated_at = now() WHERE id = $1",
            OwnerKind::Goal => "UPDATE goals SET updated_at = now() WHERE id = $1",
        };
        sqlx::query(sql).bind(key.owner_id).execute(&mut **tx).await?;
        Ok(())
    }
}

#[async_trait]
impl ContentStore for PgContentStore {
    async fn load(&self, key: &OwnerKey) -> Result<Option<GenerationRecord>, AppError> {
        let col = owner_column(key.owner_kind);
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM generation_records \
             WHERE {col} = $1 AND kind = $2"
        );
        let row = sqlx::query_as::<_, GenerationRow>(&sql)
            .bind(key.owner_id)
            .bind(key.kind.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(GenerationRow::into_record).transpose()
    }

    async fn try_claim(
        &self,
        key: &OwnerKey,
        previous: Option<GenerationStatus>,
        target_count: Option<i32>,
    ) -> Result<ClaimOutcome, AppError> {
        let col = owner_column(key.owner_kind);
        let mut tx = self.pool.begin().await?;

        let row = match previous {
            // First attempt: insert wins only if no row appeared since
            // the caller's read.
            None => {
                let sql = format!(
                    "INSERT INTO generation_records ({col}, kind, status, target_count) \
                     VALUES ($1, $2, 'processing', $3) \
                     ON CONFLICT ({col}, kind) DO NOTHING \
                     RETURNING {RECORD_COLUMNS}"
                );
                sqlx::query_as::<_, GenerationRow>(&sql)
                    .bind(key.owner_id)
                    .bind(key.kind.as_str())
                    .bind(target_count)
                    .fetch_optional(&mut *tx)
                    .await?
            }
            // Retry/regeneration: the conditional update succeeds only if
            // the status is still what the caller read.
            Some(expected) => {
                let sql = format!(
                    "UPDATE generation_records \
                     SET status = 'processing', payload = NULL, target_count = $3, \
                         requested_at = now(), completed_at = NULL, error_message = NULL \
                     WHERE {col} = $1 AND kind = $2 AND status = $4 \
                     RETURNING {RECORD_COLUMNS}"
                );
                sqlx::query_as::<_, GenerationRow>(&sql)
                    .bind(key.owner_id)
                    .bind(key.kind.as_str())
                    .bind(target_count)
                    .bind(expected.as_str())
                    .fetch_optional(&mut *tx)
                    .await?
            }
        };

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(ClaimOutcome::Conflict);
        };

        Self::touch_owner(&mut tx, key).await?;
        tx.commit().await?;

        Ok(ClaimOutcome::Claimed(row.into_record()?))
    }

    async fn commit_ready(
        &self,
        key: &OwnerKey,
        payload: GenerationPayload,
    ) -> Result<(), AppError> {
        let col = owner_column(key.owner_kind);
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "UPDATE generation_records \
             SET status = 'ready', payload = $3, completed_at = now(), error_message = NULL \
             WHERE {col} = $1 AND kind = $2 AND status = 'processing'"
        );
        let result = sqlx::query(&sql)
            .bind(key.owner_id)
            .bind(key.kind.as_str())
            .bind(Json(payload))
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            // Commit raced with something illegal; leave the record alone.
            tracing::warn!("commit_ready found no processing record for {:?}", key);
            tx.rollback().await?;
            return Ok(());
        }

        Self::touch_owner(&mut tx, key).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn commit_failed(&self, key: &OwnerKey, error: &str) -> Result<(), AppError> {
        let col = owner_column(key.owner_kind);
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "UPDATE generation_records \
             SET status = 'failed', completed_at = now(), error_message = $3 \
             WHERE {col} = $1 AND kind = $2 AND status = 'processing'"
        );
        let result = sqlx::query(&sql)
            .bind(key.owner_id)
            .bind(key.kind.as_str())
            .bind(error)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tracing::warn!("commit_failed found no processing record for {:?}", key);
            tx.rollback().await?;
            return Ok(());
        }

        Self::touch_owner(&mut tx, key).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn insert_submission(
        &self,
        record_id: i64,
        user_id: i64,
        correct_count: i32,
        answers: Vec<GradedAnswer>,
    ) -> Result<QuizSubmissionResult, AppError> {
        let total_questions = answers.len() as i32;

        let row = sqlx::query_as::<_, SubmissionRow>(
            "INSERT INTO quiz_submissions \
                 (record_id, user_id, total_questions, correct_count, answers) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, record_id, user_id, total_questions, correct_count, answers, \
                       submitted_at",
        )
        .bind(record_id)
        .bind(user_id)
        .bind(total_questions)
        .bind(correct_count)
        .bind(Json(answers))
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn latest_submission(
        &self,
        record_id: i64,
        user_id: i64,
    ) -> Result<Option<QuizSubmissionResult>, AppError> {
        let row = sqlx::query_as::<_, SubmissionRow>(
            "SELECT id, record_id, user_id, total_questions, correct_count, answers, \
                    submitted_at \
             FROM quiz_submissions \
             WHERE record_id = $1 AND user_id = $2 \
             ORDER BY submitted_at DESC, id DESC \
             LIMIT 1",
        )
        .bind(record_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(task_id: Option<i64>, goal_id: Option<i64>) -> GenerationRow {
        GenerationRow {
            id: 1,
            task_id,
            goal_id,
            kind: "note".to_string(),
            status: "processing".to_string(),
            payload: None,
            target_count: None,
            requested_at: Utc::now(),
            completed_at: None,
            error_message: None,
        }
    }

    #[test]
    fn task_column_maps_to_task_owner() {
        let record = row(Some(42), None).into_record().unwrap();
        assert_eq!(record.owner_kind, OwnerKind::Task);
        assert_eq!(record.owner_id, 42);
    }

    #[test]
    fn goal_column_maps_to_goal_owner() {
        let record = row(None, Some(9)).into_record().unwrap();
        assert_eq!(record.owner_kind, OwnerKind::Goal);
        assert_eq!(record.owner_id, 9);
    }

    #[test]
    fn ambiguous_or_missing_owner_is_an_error() {
        assert!(row(None, None).into_record().is_err());
        assert!(row(Some(1), Some(2)).into_record().is_err());
    }

    #[test]
    fn owner_columns_are_distinct() {
        assert_eq!(owner_column(OwnerKind::Task), "task_id");
        assert_eq!(owner_column(OwnerKind::Goal), "goal_id");
    }
}
