// tests/engine_tests.rs
//
// Lifecycle and concurrency behavior of the generation engine, run
// against in-memory collaborators.

mod common;

use std::time::Duration;

use common::{
    OTHER_USER_ID, Script, USER_ID, chain_with, fixture, fixture_with, four_questions,
};
use pathway::engine::job::{MAX_ERROR_MESSAGE_LEN, MIN_QUIZ_QUESTIONS};
use pathway::engine::state::GenerationStatus;
use pathway::error::AppError;
use pathway::models::generation::{ContentKind, GenerationPayload, OwnerKind};

#[tokio::test]
async fn first_prepare_starts_processing_with_minimum_target() {
    // Arrange: no record, zero-length description/memo, no note
    let f = fixture(Script::Quiz(four_questions()));

    // Act
    let outcome = f
        .engine
        .prepare(USER_ID, OwnerKind::Task, f.public_id, ContentKind::Quiz, false)
        .await
        .unwrap();

    // Assert
    assert!(outcome.started);
    assert!(outcome.job.is_some());
    assert_eq!(outcome.record.status, GenerationStatus::Processing);
    assert_eq!(outcome.record.target_count, Some(MIN_QUIZ_QUESTIONS as i32));
    assert!(outcome.record.completed_at.is_none());
}

#[tokio::test]
async fn second_prepare_sees_processing_and_does_not_start() {
    let f = fixture(Script::Note("text".to_string()));

    let first = f
        .engine
        .prepare(USER_ID, OwnerKind::Task, f.public_id, ContentKind::Note, false)
        .await
        .unwrap();
    assert!(first.started);

    let second = f
        .engine
        .prepare(USER_ID, OwnerKind::Task, f.public_id, ContentKind::Note, false)
        .await
        .unwrap();

    assert!(!second.started);
    assert!(second.job.is_none());
    assert_eq!(second.record.status, GenerationStatus::Processing);
    assert_eq!(second.record.requested_at, first.record.requested_at);
}

#[tokio::test]
async fn concurrent_prepares_have_exactly_one_winner() {
    let f = fixture(Script::Note("text".to_string()));

    let (a, b) = tokio::join!(
        f.engine
            .prepare(USER_ID, OwnerKind::Task, f.public_id, ContentKind::Note, false),
        f.engine
            .prepare(USER_ID, OwnerKind::Task, f.public_id, ContentKind::Note, false),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(
        a.started as u32 + b.started as u32,
        1,
        "exactly one caller may claim the slot"
    );
    // Both observe the same in-flight attempt.
    assert_eq!(a.record.status, GenerationStatus::Processing);
    assert_eq!(b.record.status, GenerationStatus::Processing);
    assert_eq!(a.record.requested_at, b.record.requested_at);
}

#[tokio::test]
async fn ready_record_requires_force_to_restart() {
    let f = fixture(Script::Note("# Ownership".to_string()));

    let outcome = f
        .engine
        .prepare(USER_ID, OwnerKind::Task, f.public_id, ContentKind::Note, false)
        .await
        .unwrap();
    f.engine.clone().run(outcome.job.unwrap()).await;

    let without_force = f
        .engine
        .prepare(USER_ID, OwnerKind::Task, f.public_id, ContentKind::Note, false)
        .await
        .unwrap();
    assert!(!without_force.started);
    assert_eq!(without_force.record.status, GenerationStatus::Ready);

    let with_force = f
        .engine
        .prepare(USER_ID, OwnerKind::Task, f.public_id, ContentKind::Note, true)
        .await
        .unwrap();
    assert!(with_force.started);
    assert_eq!(with_force.record.status, GenerationStatus::Processing);
    assert!(with_force.record.payload.is_none());
}

#[tokio::test]
async fn failed_record_restarts_without_force_and_clears_error() {
    let f = fixture(Script::Fail("model exploded".to_string()));

    let outcome = f
        .engine
        .prepare(USER_ID, OwnerKind::Task, f.public_id, ContentKind::Note, false)
        .await
        .unwrap();
    let requested_at = outcome.record.requested_at;
    f.engine.clone().run(outcome.job.unwrap()).await;

    let failed = f
        .engine
        .latest_record(USER_ID, OwnerKind::Task, f.public_id, ContentKind::Note)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(failed.status, GenerationStatus::Failed);
    assert!(failed.error_message.unwrap().contains("model exploded"));
    // The failure concludes the attempt it belongs to.
    assert_eq!(failed.requested_at, requested_at);
    assert!(failed.completed_at.unwrap() >= failed.requested_at);

    let retry = f
        .engine
        .prepare(USER_ID, OwnerKind::Task, f.public_id, ContentKind::Note, false)
        .await
        .unwrap();
    assert!(retry.started);
    assert!(retry.record.error_message.is_none());
}

#[tokio::test]
async fn runner_commits_ready_note() {
    let f = fixture(Script::Note("  # Borrow checker\nnotes  ".to_string()));

    let outcome = f
        .engine
        .prepare(USER_ID, OwnerKind::Goal, f.public_id, ContentKind::Note, false)
        .await
        .unwrap();
    f.engine.clone().run(outcome.job.unwrap()).await;

    let record = f
        .engine
        .latest_record(USER_ID, OwnerKind::Goal, f.public_id, ContentKind::Note)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, GenerationStatus::Ready);
    match record.payload.unwrap() {
        GenerationPayload::Note { markdown } => {
            assert_eq!(markdown, "# Borrow checker\nnotes");
        }
        other => panic!("expected note payload, got {:?}", other),
    }
}

#[tokio::test]
async fn runner_rejects_blank_note() {
    let f = fixture(Script::Note("   \n  ".to_string()));

    let outcome = f
        .engine
        .prepare(USER_ID, OwnerKind::Task, f.public_id, ContentKind::Note, false)
        .await
        .unwrap();
    f.engine.clone().run(outcome.job.unwrap()).await;

    let record = f
        .engine
        .latest_record(USER_ID, OwnerKind::Task, f.public_id, ContentKind::Note)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, GenerationStatus::Failed);
}

#[tokio::test]
async fn runner_normalizes_quiz_questions() {
    let mut questions = four_questions();
    questions[1].id = None; // falls back to q2
    questions[2].answer_index = 99; // clamped to last option

    let f = fixture(Script::Quiz(questions));
    let outcome = f
        .engine
        .prepare(USER_ID, OwnerKind::Task, f.public_id, ContentKind::Quiz, false)
        .await
        .unwrap();
    f.engine.clone().run(outcome.job.unwrap()).await;

    let record = f
        .engine
        .latest_record(USER_ID, OwnerKind::Task, f.public_id, ContentKind::Quiz)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, GenerationStatus::Ready);
    match record.payload.unwrap() {
        GenerationPayload::Quiz { questions } => {
            assert_eq!(questions.len(), 4);
            assert_eq!(questions[1].id, "q2");
            assert_eq!(questions[2].answer_index, 2);
            for q in &questions {
                assert!(q.answer_index < q.options.len());
            }
        }
        other => panic!("expected quiz payload, got {:?}", other),
    }
}

#[tokio::test]
async fn runner_rejects_too_few_questions() {
    let questions: Vec<_> = four_questions()
        .into_iter()
        .take(MIN_QUIZ_QUESTIONS - 1)
        .collect();
    let f = fixture(Script::Quiz(questions));

    let outcome = f
        .engine
        .prepare(USER_ID, OwnerKind::Task, f.public_id, ContentKind::Quiz, false)
        .await
        .unwrap();
    f.engine.clone().run(outcome.job.unwrap()).await;

    let record = f
        .engine
        .latest_record(USER_ID, OwnerKind::Task, f.public_id, ContentKind::Quiz)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, GenerationStatus::Failed);
    assert!(record.error_message.unwrap().contains("questions"));
}

#[tokio::test]
async fn runner_truncates_long_error_messages() {
    let f = fixture(Script::Fail("x".repeat(5000)));

    let outcome = f
        .engine
        .prepare(USER_ID, OwnerKind::Task, f.public_id, ContentKind::Note, false)
        .await
        .unwrap();
    f.engine.clone().run(outcome.job.unwrap()).await;

    let record = f
        .engine
        .latest_record(USER_ID, OwnerKind::Task, f.public_id, ContentKind::Note)
        .await
        .unwrap()
        .unwrap();
    assert!(record.error_message.unwrap().len() <= MAX_ERROR_MESSAGE_LEN);
}

#[tokio::test]
async fn hung_backend_times_out_into_failed() {
    // Engine timeout in the fixture is 200ms
    let f = fixture(Script::Hang(Duration::from_secs(30)));

    let outcome = f
        .engine
        .prepare(USER_ID, OwnerKind::Task, f.public_id, ContentKind::Note, false)
        .await
        .unwrap();
    f.engine.clone().run(outcome.job.unwrap()).await;

    let record = f
        .engine
        .latest_record(USER_ID, OwnerKind::Task, f.public_id, ContentKind::Note)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, GenerationStatus::Failed);
    assert!(record.error_message.unwrap().contains("timed out"));
}

#[tokio::test]
async fn target_count_grows_with_source_material() {
    let chain = chain_with("d".repeat(450), "m".repeat(200));
    let f = fixture_with(chain, Script::Quiz(four_questions()));

    let outcome = f
        .engine
        .prepare(USER_ID, OwnerKind::Task, f.public_id, ContentKind::Quiz, false)
        .await
        .unwrap();

    // 4 base + 2 from description + 1 from memo
    assert_eq!(outcome.record.target_count, Some(7));
    assert_eq!(outcome.job.unwrap().target_count, Some(7));
}

#[tokio::test]
async fn quiz_job_snapshots_existing_ready_note() {
    let f = fixture(Script::Note("a ready note about ownership".to_string()));

    let note = f
        .engine
        .prepare(USER_ID, OwnerKind::Task, f.public_id, ContentKind::Note, false)
        .await
        .unwrap();
    f.engine.clone().run(note.job.unwrap()).await;

    f.backend.set_script(Script::Quiz(four_questions()));
    let quiz = f
        .engine
        .prepare(USER_ID, OwnerKind::Task, f.public_id, ContentKind::Quiz, false)
        .await
        .unwrap();

    assert!(quiz.started);
    let job = quiz.job.unwrap();
    assert_eq!(job.existing_note.as_deref(), Some("a ready note about ownership"));
}

#[tokio::test]
async fn unknown_public_id_is_not_found() {
    let f = fixture(Script::Note("text".to_string()));

    let err = f
        .engine
        .prepare(USER_ID, OwnerKind::Task, uuid::Uuid::new_v4(), ContentKind::Note, false)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn foreign_plan_owner_is_access_denied() {
    let f = fixture(Script::Note("text".to_string()));

    let err = f
        .engine
        .prepare(OTHER_USER_ID, OwnerKind::Task, f.public_id, ContentKind::Note, false)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::AccessDenied(_)));
}

#[tokio::test]
async fn note_and_quiz_slots_are_independent() {
    let f = fixture(Script::Note("text".to_string()));

    let note = f
        .engine
        .prepare(USER_ID, OwnerKind::Task, f.public_id, ContentKind::Note, false)
        .await
        .unwrap();
    assert!(note.started);

    f.backend.set_script(Script::Quiz(four_questions()));
    let quiz = f
        .engine
        .prepare(USER_ID, OwnerKind::Task, f.public_id, ContentKind::Quiz, false)
        .await
        .unwrap();
    assert!(quiz.started, "a note in flight must not block the quiz slot");
}
