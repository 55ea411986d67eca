use async_trait::async_trait;
use chrono::{DateTime, Utc};
use course_core::model::{
    LessonId, LessonProgress, ModuleId, QuizAttempt, QuizProgress, UserStats,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for lesson, quiz and aggregate progress.
///
/// Every mutation recomputes the `UserStats` counters before returning.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Create the stats row if it does not exist yet and return it.
    ///
    /// `started_at` is only written the first time.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the stats row cannot be read or written.
    async fn initialize_stats(&self, at: DateTime<Utc>) -> Result<UserStats, StorageError>;

    /// Upsert a lesson completion and return the merged record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn record_lesson_completion(
        &self,
        module_id: ModuleId,
        lesson_id: LessonId,
        at: DateTime<Utc>,
    ) -> Result<LessonProgress, StorageError>;

    /// Fetch the record for one lesson.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read or decode failures.
    async fn lesson_progress(
        &self,
        module_id: ModuleId,
        lesson_id: LessonId,
    ) -> Result<Option<LessonProgress>, StorageError>;

    /// Upsert a quiz attempt and return the merged record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn record_quiz_attempt(
        &self,
        attempt: &QuizAttempt,
        at: DateTime<Utc>,
    ) -> Result<QuizProgress, StorageError>;

    /// Fetch the record for one module quiz.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read or decode failures.
    async fn quiz_progress(&self, module_id: ModuleId)
    -> Result<Option<QuizProgress>, StorageError>;

    /// Completed lessons, optionally restricted to one module.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the count query fails.
    async fn completed_lesson_count(&self, module_id: Option<ModuleId>)
    -> Result<u32, StorageError>;

    /// Completed (passed) quizzes.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the count query fails.
    async fn completed_quiz_count(&self) -> Result<u32, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on read or decode failures.
    async fn user_stats(&self) -> Result<Option<UserStats>, StorageError>;

    /// Delete every lesson and quiz record and zero the stats counters.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if any delete or update fails.
    async fn reset(&self) -> Result<(), StorageError>;

    /// Release underlying resources. Further calls may fail.
    async fn close(&self) {}
}

#[derive(Debug, Default)]
struct ProgressState {
    lessons: BTreeMap<(ModuleId, LessonId), LessonProgress>,
    quizzes: BTreeMap<ModuleId, QuizProgress>,
    stats: Option<UserStats>,
}

impl ProgressState {
    fn completed_lessons(&self, module_id: Option<ModuleId>) -> u32 {
        let count = self
            .lessons
            .values()
            .filter(|p| p.completed && module_id.is_none_or(|m| p.module_id == m))
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    fn completed_quizzes(&self) -> u32 {
        let count = self.quizzes.values().filter(|p| p.completed).count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    fn refresh_stats(&mut self, at: DateTime<Utc>) {
        let lessons = self.completed_lessons(None);
        let quizzes = self.completed_quizzes();
        self.stats = self
            .stats
            .take()
            .map(|stats| stats.recounted(lessons, quizzes, at));
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<ProgressState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, ProgressState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn initialize_stats(&self, at: DateTime<Utc>) -> Result<UserStats, StorageError> {
        let mut guard = self.lock()?;
        Ok(guard
            .stats
            .get_or_insert_with(|| UserStats::started(at))
            .clone())
    }

    async fn record_lesson_completion(
        &self,
        module_id: ModuleId,
        lesson_id: LessonId,
        at: DateTime<Utc>,
    ) -> Result<LessonProgress, StorageError> {
        let mut guard = self.lock()?;
        let key = (module_id, lesson_id);
        let merged = LessonProgress::merge(
            guard.lessons.remove(&key),
            LessonProgress::completion(module_id, lesson_id, at),
        );
        guard.lessons.insert(key, merged.clone());
        guard.refresh_stats(at);
        Ok(merged)
    }

    async fn lesson_progress(
        &self,
        module_id: ModuleId,
        lesson_id: LessonId,
    ) -> Result<Option<LessonProgress>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.lessons.get(&(module_id, lesson_id)).cloned())
    }

    async fn record_quiz_attempt(
        &self,
        attempt: &QuizAttempt,
        at: DateTime<Utc>,
    ) -> Result<QuizProgress, StorageError> {
        let mut guard = self.lock()?;
        let module_id = attempt.module_id();
        let merged = QuizProgress::merge(
            guard.quizzes.remove(&module_id),
            QuizProgress::from_attempt(attempt, at),
        );
        guard.quizzes.insert(module_id, merged.clone());
        guard.refresh_stats(at);
        Ok(merged)
    }

    async fn quiz_progress(
        &self,
        module_id: ModuleId,
    ) -> Result<Option<QuizProgress>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.quizzes.get(&module_id).cloned())
    }

    async fn completed_lesson_count(
        &self,
        module_id: Option<ModuleId>,
    ) -> Result<u32, StorageError> {
        Ok(self.lock()?.completed_lessons(module_id))
    }

    async fn completed_quiz_count(&self) -> Result<u32, StorageError> {
        Ok(self.lock()?.completed_quizzes())
    }

    async fn user_stats(&self) -> Result<Option<UserStats>, StorageError> {
        Ok(self.lock()?.stats.clone())
    }

    async fn reset(&self) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.lessons.clear();
        guard.quizzes.clear();
        guard.stats = guard.stats.take().map(UserStats::cleared);
        Ok(())
    }
}

/// Progress repository behind a trait object for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let progress: Arc<dyn ProgressRepository> = Arc::new(InMemoryRepository::new());
        Self { progress }
    }
}
