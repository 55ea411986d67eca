use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use course_core::model::{
    AnswerValue, ContentKey, LessonId, LessonProgress, ModuleId, ProgressSnapshot, QuizAttempt,
    QuizProgress,
    UserStats,
};
use course_core::time::fixed_now;
use services::{AppServices, Clock, ProgressService};
use storage::content::InMemoryContent;
use storage::repository::{ProgressRepository, Storage, StorageError};

// ─── Helpers ────────────────────────────────────────────────────────────────

/// A store whose every call fails, standing in for a broken database.
struct FailingRepository;

fn broken() -> StorageError {
    StorageError::Connection("disk I/O error".into())
}

#[async_trait]
impl ProgressRepository for FailingRepository {
    async fn initialize_stats(&self, _at: DateTime<Utc>) -> Result<UserStats, StorageError> {
        Err(broken())
    }

    async fn record_lesson_completion(
        &self,
        _module_id: ModuleId,
        _lesson_id: LessonId,
        _at: DateTime<Utc>,
    ) -> Result<LessonProgress, StorageError> {
        Err(broken())
    }

    async fn lesson_progress(
        &self,
        _module_id: ModuleId,
        _lesson_id: LessonId,
    ) -> Result<Option<LessonProgress>, StorageError> {
        Err(broken())
    }

    async fn record_quiz_attempt(
        &self,
        _attempt: &QuizAttempt,
        _at: DateTime<Utc>,
    ) -> Result<QuizProgress, StorageError> {
        Err(broken())
    }

    async fn quiz_progress(
        &self,
        _module_id: ModuleId,
    ) -> Result<Option<QuizProgress>, StorageError> {
        Err(broken())
    }

    async fn completed_lesson_count(
        &self,
        _module_id: Option<ModuleId>,
    ) -> Result<u32, StorageError> {
        Err(broken())
    }

    async fn completed_quiz_count(&self) -> Result<u32, StorageError> {
        Err(broken())
    }

    async fn user_stats(&self) -> Result<Option<UserStats>, StorageError> {
        Err(broken())
    }

    async fn reset(&self) -> Result<(), StorageError> {
        Err(broken())
    }
}

async fn sqlite_services(name: &str, clock: Clock) -> AppServices {
    let storage = Storage::sqlite(&format!("sqlite:file:{name}?mode=memory&cache=shared"))
        .await
        .expect("sqlite storage");
    AppServices::with_storage(&storage, Arc::new(content()), clock).await
}

fn content() -> InMemoryContent {
    InMemoryContent::new()
        .with(
            ContentKey::lesson(ModuleId::new(1), LessonId::new(1)),
            r#"{"title": "What is Python?", "content": "Python is a language."}"#,
        )
        .with(
            ContentKey::quiz(ModuleId::new(1)),
            r#"{
                "title": "Module 1 Quiz",
                "questions": [
                    {"question": "2 + 2?", "type": "multiple_choice", "options": ["3", "4"], "correctAnswer": 1},
                    {"question": "Is Python interpreted?", "type": "true_false", "correctAnswer": "true"},
                    {"question": "Output of print(len(\"def\"))?", "type": "code_output", "correctAnswer": "3"}
                ]
            }"#,
        )
}

fn mid(id: u32) -> ModuleId {
    ModuleId::new(id)
}

fn lid(id: u32) -> LessonId {
    LessonId::new(id)
}

// ─── Lesson completion ──────────────────────────────────────────────────────

#[tokio::test]
async fn repeated_completion_bumps_attempts_and_keeps_count() {
    let services = sqlite_services("memdb_flow_repeat", Clock::fixed(fixed_now())).await;
    let progress = services.progress();

    progress.mark_lesson_complete(mid(2), lid(3)).await.unwrap();
    let again = progress.mark_lesson_complete(mid(2), lid(3)).await.unwrap();

    assert_eq!(again.attempts, 2);
    assert!(again.completed);
    let snapshot = progress.snapshot().await;
    assert_eq!(snapshot.completed_lessons, 1);
    assert_eq!(snapshot.stats.unwrap().total_lessons_completed, 1);
}

#[tokio::test]
async fn overall_progress_rounds_half_up() {
    let services = sqlite_services("memdb_flow_overall", Clock::fixed(fixed_now())).await;
    let progress = services.progress();
    let total = services.content().total_lessons();

    for lesson in 1..=5 {
        progress.mark_lesson_complete(mid(1), lid(lesson)).await;
    }
    for lesson in 1..=3 {
        progress.mark_lesson_complete(mid(2), lid(lesson)).await;
    }

    // 8 of 77 is 10.39%.
    assert_eq!(progress.overall_progress(total).await, 10);
    assert_eq!(progress.module_progress(mid(1), 5).await, 100);
    assert_eq!(progress.module_progress(mid(2), 5).await, 60);
    assert_eq!(progress.overall_progress(0).await, 0);
}

#[tokio::test]
async fn three_of_ten_is_thirty_percent_until_reset() {
    let services = sqlite_services("memdb_flow_three_of_ten", Clock::fixed(fixed_now())).await;
    let progress = services.progress();

    for lesson in 1..=3 {
        progress.mark_lesson_complete(mid(3), lid(lesson)).await.unwrap();
    }
    assert_eq!(progress.overall_progress(10).await, 30);

    assert!(progress.reset_progress().await);
    assert_eq!(progress.overall_progress(10).await, 0);
    assert_eq!(progress.overall_progress(services.content().total_lessons()).await, 0);
    for lesson in 1..=3 {
        assert!(!progress.is_lesson_complete(mid(3), lid(lesson)).await);
    }
}

// ─── Quiz attempts ──────────────────────────────────────────────────────────

#[tokio::test]
async fn quiz_pass_is_sticky_and_best_score_monotonic() {
    let services = sqlite_services("memdb_flow_quiz", Clock::fixed(fixed_now())).await;
    let progress = services.progress();

    let first = progress.record_quiz_attempt(mid(4), 6, 10).await.unwrap();
    assert!(!first.completed);
    assert_eq!(first.best_score, 60);

    let second = progress.record_quiz_attempt(mid(4), 7, 10).await.unwrap();
    assert!(second.completed);
    assert_eq!(second.best_score, 70);

    let third = progress.record_quiz_attempt(mid(4), 2, 10).await.unwrap();
    assert!(third.completed);
    assert_eq!(third.best_score, 70);
    assert_eq!(third.percentage, 20);
    assert_eq!(third.attempts, 3);

    assert_eq!(progress.snapshot().await.completed_quizzes, 1);
}

#[tokio::test]
async fn graded_quiz_feeds_progress() {
    let services = sqlite_services("memdb_flow_graded", Clock::fixed(fixed_now())).await;
    let quiz = services.content().load_quiz(mid(1)).expect("quiz fixture");

    let answers = ["1", "TRUE", "print"].map(|raw| Some(AnswerValue::parse(raw)));
    let score = quiz.score(&answers);
    assert_eq!((score.correct, score.total), (2, 3));
    assert_eq!(score.percentage(), 67);
    assert!(!score.passed());

    let record = services
        .progress()
        .record_quiz_attempt(mid(1), score.correct, score.total)
        .await
        .unwrap();
    assert_eq!(record.percentage, 67);
    assert!(!record.completed);
}

#[tokio::test]
async fn zero_question_quiz_records_zero_percent() {
    let services = AppServices::with_storage(
        &Storage::in_memory(),
        Arc::new(content()),
        Clock::fixed(fixed_now()),
    )
    .await;
    let record = services
        .progress()
        .record_quiz_attempt(mid(9), 0, 0)
        .await
        .unwrap();
    assert_eq!(record.percentage, 0);
    assert!(!record.completed);
}

// ─── Reset ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn reset_clears_records_and_keeps_start_time() {
    let services = sqlite_services("memdb_flow_reset", Clock::fixed(fixed_now())).await;
    let progress = services.progress();

    progress.mark_lesson_complete(mid(1), lid(1)).await;
    progress.record_quiz_attempt(mid(1), 3, 3).await;
    assert!(progress.reset_progress().await);

    assert!(!progress.is_lesson_complete(mid(1), lid(1)).await);
    assert!(progress.quiz_progress(mid(1)).await.is_none());
    let snapshot = progress.snapshot().await;
    assert_eq!(snapshot.completed_lessons, 0);
    assert_eq!(snapshot.completed_quizzes, 0);
    let stats = snapshot.stats.unwrap();
    assert_eq!(stats.total_lessons_completed, 0);
    assert_eq!(stats.total_quizzes_completed, 0);
    assert_eq!(stats.started_at, fixed_now());
    services.close().await;
}

// ─── Failure handling ───────────────────────────────────────────────────────

#[tokio::test]
async fn failing_store_yields_neutral_values() {
    let progress = ProgressService::new(Clock::fixed(fixed_now()), Arc::new(FailingRepository));

    assert!(progress.is_available());
    assert!(progress.initialize().await.is_none());
    assert!(progress.mark_lesson_complete(mid(1), lid(1)).await.is_none());
    assert!(!progress.is_lesson_complete(mid(1), lid(1)).await);
    assert!(progress.lesson_progress(mid(1), lid(1)).await.is_none());
    assert!(progress.record_quiz_attempt(mid(1), 1, 2).await.is_none());
    assert!(progress.quiz_progress(mid(1)).await.is_none());
    assert_eq!(progress.module_progress(mid(1), 5).await, 0);
    assert_eq!(progress.overall_progress(77).await, 0);
    assert_eq!(progress.snapshot().await, ProgressSnapshot::default());
    assert!(!progress.reset_progress().await);
}

#[tokio::test]
async fn content_lookups_survive_missing_documents() {
    let services = AppServices::with_storage(
        &Storage::in_memory(),
        Arc::new(content()),
        Clock::fixed(fixed_now()),
    )
    .await;
    let content = services.content();

    assert_eq!(content.lesson_title(mid(1), lid(1)), "What is Python?");
    assert_eq!(content.lesson_title(mid(1), lid(2)), "Unknown Lesson");
    assert!(content.load_quiz(mid(2)).is_none());
    assert!(content.module(mid(15)).is_none());
}
