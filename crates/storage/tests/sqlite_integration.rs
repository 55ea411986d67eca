use chrono::Duration;
use course_core::model::{LessonId, ModuleId, QuizAttempt};
use course_core::time::fixed_now;
use storage::repository::{ProgressRepository, Storage};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let repo = SqliteRepository::connect(&format!("sqlite:file:{name}?mode=memory&cache=shared"))
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_lesson_completion_upserts_and_counts_attempts() {
    let repo = connect("memdb_lesson_upsert").await;
    repo.initialize_stats(fixed_now()).await.unwrap();

    let module = ModuleId::new(1);
    let lesson = LessonId::new(2);
    let first = repo
        .record_lesson_completion(module, lesson, fixed_now())
        .await
        .unwrap();
    assert_eq!(first.attempts, 1);

    let later = fixed_now() + Duration::minutes(10);
    let second = repo
        .record_lesson_completion(module, lesson, later)
        .await
        .unwrap();
    assert_eq!(second.attempts, 2);

    let stored = repo
        .lesson_progress(module, lesson)
        .await
        .unwrap()
        .expect("record persisted");
    assert!(stored.completed);
    assert_eq!(stored.attempts, 2);
    assert_eq!(stored.completed_at, Some(later));

    let stats = repo.user_stats().await.unwrap().unwrap();
    assert_eq!(stats.total_lessons_completed, 1);
    assert_eq!(stats.started_at, fixed_now());
    assert_eq!(stats.last_activity, later);
}

#[tokio::test]
async fn sqlite_quiz_attempts_keep_best_and_completion() {
    let repo = connect("memdb_quiz_attempts").await;
    repo.initialize_stats(fixed_now()).await.unwrap();

    let module = ModuleId::new(3);
    let pass = QuizAttempt::new(module, 7, 10).unwrap();
    let fail = QuizAttempt::new(module, 3, 10).unwrap();

    repo.record_quiz_attempt(&pass, fixed_now()).await.unwrap();
    repo.record_quiz_attempt(&fail, fixed_now() + Duration::minutes(1))
        .await
        .unwrap();

    let stored = repo.quiz_progress(module).await.unwrap().unwrap();
    assert!(stored.completed);
    assert_eq!(stored.best_score, 70);
    assert_eq!(stored.score, 3);
    assert_eq!(stored.percentage, 30);
    assert_eq!(stored.attempts, 2);
    assert_eq!(repo.completed_quiz_count().await.unwrap(), 1);

    let stats = repo.user_stats().await.unwrap().unwrap();
    assert_eq!(stats.total_quizzes_completed, 1);
}

#[tokio::test]
async fn sqlite_counts_by_module_and_resets() {
    let repo = connect("memdb_counts_reset").await;
    let started = repo.initialize_stats(fixed_now()).await.unwrap();

    for (module, lesson) in [(1, 1), (1, 2), (1, 3), (2, 1)] {
        repo.record_lesson_completion(ModuleId::new(module), LessonId::new(lesson), fixed_now())
            .await
            .unwrap();
    }
    assert_eq!(repo.completed_lesson_count(None).await.unwrap(), 4);
    assert_eq!(
        repo.completed_lesson_count(Some(ModuleId::new(1)))
            .await
            .unwrap(),
        3
    );

    repo.reset().await.unwrap();

    assert_eq!(repo.completed_lesson_count(None).await.unwrap(), 0);
    assert!(
        repo.lesson_progress(ModuleId::new(1), LessonId::new(1))
            .await
            .unwrap()
            .is_none()
    );
    let stats = repo.user_stats().await.unwrap().unwrap();
    assert_eq!(stats.total_lessons_completed, 0);
    assert_eq!(stats.started_at, started.started_at);
}

#[tokio::test]
async fn sqlite_migrations_are_idempotent() {
    let repo = connect("memdb_migrate_twice").await;
    repo.migrate().await.expect("second migrate");
    let first = repo.initialize_stats(fixed_now()).await.unwrap();
    let second = repo
        .initialize_stats(fixed_now() + Duration::days(1))
        .await
        .unwrap();
    assert_eq!(first.started_at, second.started_at);
}

#[tokio::test]
async fn storage_sqlite_builds_repository() {
    let storage = Storage::sqlite("sqlite:file:memdb_storage_builder?mode=memory&cache=shared")
        .await
        .expect("storage");
    storage.progress.initialize_stats(fixed_now()).await.unwrap();
    storage
        .progress
        .record_lesson_completion(ModuleId::new(5), LessonId::new(6), fixed_now())
        .await
        .unwrap();
    assert_eq!(
        storage
            .progress
            .completed_lesson_count(Some(ModuleId::new(5)))
            .await
            .unwrap(),
        1
    );
    storage.progress.close().await;
}
