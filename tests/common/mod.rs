// tests/common/mod.rs
//
// In-memory collaborators for exercising the engine without Postgres or
// a real model backend.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use pathway::engine::Engine;
use pathway::engine::backend::{BackendError, GenerationBackend, RawPayload, RawQuestion};
use pathway::engine::job::GenerationJob;
use pathway::engine::resolver::{
    OutlineEntry, OwnerChain, OwnerItem, OwnerResolver, PlanContext, ReferenceDocument,
};
use pathway::engine::state::GenerationStatus;
use pathway::engine::store::{ClaimOutcome, ContentStore, OwnerKey};
use pathway::error::AppError;
use pathway::models::generation::{GenerationPayload, GenerationRecord};
use pathway::models::submission::{GradedAnswer, QuizSubmissionResult};

pub const USER_ID: i64 = 7;
pub const OTHER_USER_ID: i64 = 8;
pub const OWNER_ID: i64 = 42;

/// Mutex-guarded store; the claim is atomic under the lock, mirroring
/// the conditional-UPDATE semantics of the Postgres implementation.
#[derive(Default)]
pub struct MemoryContentStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    records: HashMap<OwnerKey, GenerationRecord>,
    submissions: Vec<QuizSubmissionResult>,
    next_id: i64,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test hook: read a record without going through the engine.
    pub fn record(&self, key: &OwnerKey) -> Option<GenerationRecord> {
        self.inner.lock().unwrap().records.get(key).cloned()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn load(&self, key: &OwnerKey) -> Result<Option<GenerationRecord>, AppError> {
        Ok(self.inner.lock().unwrap().records.get(key).cloned())
    }

    async fn try_claim(
        &self,
        key: &OwnerKey,
        previous: Option<GenerationStatus>,
        target_count: Option<i32>,
    ) -> Result<ClaimOutcome, AppError> {
        let mut inner = self.inner.lock().unwrap();
        match previous {
            None => {
                if inner.records.contains_key(key) {
                    return Ok(ClaimOutcome::Conflict);
                }
                inner.next_id += 1;
                let record = GenerationRecord {
                    id: inner.next_id,
                    owner_kind: key.owner_kind,
                    owner_id: key.owner_id,
                    kind: key.kind,
                    status: GenerationStatus::Processing,
                    payload: None,
                    target_count,
                    requested_at: Utc::now(),
                    completed_at: None,
                    error_message: None,
                };
                inner.records.insert(*key, record.clone());
                Ok(ClaimOutcome::Claimed(record))
            }
            Some(expected) => {
                let Some(record) = inner.records.get_mut(key) else {
                    return Ok(ClaimOutcome::Conflict);
                };
                if record.status != expected {
                    return Ok(ClaimOutcome::Conflict);
                }
                record.status = GenerationStatus::Processing;
                record.payload = None;
                record.target_count = target_count;
                record.requested_at = Utc::now();
                record.completed_at = None;
                record.error_message = None;
                Ok(ClaimOutcome::Claimed(record.clone()))
            }
        }
    }

    async fn commit_ready(
        &self,
        key: &OwnerKey,
        payload: GenerationPayload,
    ) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(record) = inner.records.get_mut(key) {
            if record.status == GenerationStatus::Processing {
                record.status = GenerationStatus::Ready;
                record.payload = Some(payload);
                record.completed_at = Some(Utc::now());
                record.error_message = None;
            }
        }
        Ok(())
    }

    async fn commit_failed(&self, key: &OwnerKey, error: &str) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(record) = inner.records.get_mut(key) {
            if record.status == GenerationStatus::Processing {
                record.status = GenerationStatus::Failed;
                record.completed_at = Some(Utc::now());
                record.error_message = Some(error.to_string());
            }
        }
        Ok(())
    }

    async fn insert_submission(
        &self,
        record_id: i64,
        user_id: i64,
        correct_count: i32,
        answers: Vec<GradedAnswer>,
    ) -> Result<QuizSubmissionResult, AppError> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let result = QuizSubmissionResult {
            id: inner.next_id,
            record_id,
            user_id,
            total_questions: answers.len() as i32,
            correct_count,
            answers,
            submitted_at: Utc::now(),
        };
        inner.submissions.push(result.clone());
        Ok(result)
    }

    async fn latest_submission(
        &self,
        record_id: i64,
        user_id: i64,
    ) -> Result<Option<QuizSubmissionResult>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .submissions
            .iter()
            .filter(|s| s.record_id == record_id && s.user_id == user_id)
            .max_by_key(|s| (s.submitted_at, s.id))
            .cloned())
    }
}

/// Resolver over a single fixed owner chain.
pub struct StaticResolver {
    pub public_id: Uuid,
    pub chain: OwnerChain,
    pub outline: Vec<OutlineEntry>,
    pub documents: Vec<ReferenceDocument>,
}

impl StaticResolver {
    pub fn new(public_id: Uuid, chain: OwnerChain) -> Self {
        Self {
            public_id,
            chain,
            outline: vec![OutlineEntry {
                goal_title: "Foundations".to_string(),
                task_titles: vec!["Ownership".to_string(), "Borrowing".to_string()],
            }],
            documents: Vec::new(),
        }
    }
}

#[async_trait]
impl OwnerResolver for StaticResolver {
    async fn resolve(
        &self,
        _owner_kind: pathway::models::generation::OwnerKind,
        public_id: Uuid,
    ) -> Result<Option<OwnerChain>, AppError> {
        if public_id == self.public_id {
            Ok(Some(self.chain.clone()))
        } else {
            Ok(None)
        }
    }

    async fn plan_outline(&self, _plan_id: i64) -> Result<Vec<OutlineEntry>, AppError> {
        Ok(self.outline.clone())
    }

    async fn reference_documents(
        &self,
        _plan_id: i64,
        limit: i64,
    ) -> Result<Vec<ReferenceDocument>, AppError> {
        Ok(self.documents.iter().take(limit as usize).cloned().collect())
    }
}

/// What the scripted backend should do on its next call.
#[derive(Clone)]
pub enum Script {
    Note(String),
    Quiz(Vec<RawQuestion>),
    Fail(String),
    /// Sleep past any reasonable timeout.
    Hang(Duration),
}

pub struct ScriptedBackend {
    script: Mutex<Script>,
    pub calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new(script: Script) -> Self {
        Self {
            script: Mutex::new(script),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_script(&self, script: Script) {
        *self.script.lock().unwrap() = script;
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn generate(&self, _job: &GenerationJob) -> Result<RawPayload, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let script = self.script.lock().unwrap().clone();
        match script {
            Script::Note(text) => Ok(RawPayload::Note(text)),
            Script::Quiz(questions) => Ok(RawPayload::Quiz(questions)),
            Script::Fail(reason) => Err(BackendError(reason)),
            Script::Hang(duration) => {
                tokio::time::sleep(duration).await;
                Err(BackendError("returned after hang".to_string()))
            }
        }
    }
}

/// A chain owned by USER_ID with configurable source-material lengths.
pub fn chain_with(description: String, memo: String) -> OwnerChain {
    OwnerChain {
        owner: OwnerItem {
            id: OWNER_ID,
            public_id: Uuid::new_v4(),
            title: "Ownership and borrowing".to_string(),
            description,
            memo,
            due_date: None,
        },
        plan: PlanContext {
            plan_id: 1,
            owner_user_id: USER_ID,
            title: "Learn Rust".to_string(),
            objective: "Become productive in Rust".to_string(),
            level: "beginner".to_string(),
            weekly_hours: 6,
            target_date: None,
        },
    }
}

pub struct Fixture {
    pub engine: Arc<Engine>,
    pub store: Arc<MemoryContentStore>,
    pub backend: Arc<ScriptedBackend>,
    pub public_id: Uuid,
}

/// Engine wired to in-memory collaborators and a short timeout.
pub fn fixture_with(chain: OwnerChain, script: Script) -> Fixture {
    let public_id = chain.owner.public_id;
    let store = Arc::new(MemoryContentStore::new());
    let backend = Arc::new(ScriptedBackend::new(script));
    let resolver = Arc::new(StaticResolver::new(public_id, chain));
    let engine = Arc::new(Engine::new(
        store.clone(),
        resolver,
        backend.clone(),
        Duration::from_millis(200),
    ));
    Fixture {
        engine,
        store,
        backend,
        public_id,
    }
}

pub fn fixture(script: Script) -> Fixture {
    fixture_with(chain_with(String::new(), String::new()), script)
}

/// Four regular questions with ids q1..q4; answer is always option 0.
pub fn four_questions() -> Vec<RawQuestion> {
    (1..=4)
        .map(|i| RawQuestion {
            id: Some(format!("q{}", i)),
            prompt: format!("Question {}", i),
            options: vec!["right".to_string(), "wrong".to_string(), "also wrong".to_string()],
            answer_index: 0,
            explanation: Some("because".to_string()),
        })
        .collect()
}
