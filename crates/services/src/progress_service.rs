use std::sync::Arc;

use course_core::model::{
    LessonId, LessonProgress, ModuleId, ProgressSnapshot, QuizAttempt, QuizProgress, UserStats,
    percent_of,
};
use storage::repository::ProgressRepository;

use crate::Clock;
use crate::error::ProgressServiceError;

/// Records lesson completions and quiz attempts and answers progress queries.
///
/// Best effort: a failing or missing store never surfaces to the caller.
/// Failures are logged and the operation yields a neutral value (`false`,
/// `0`, `None` or an empty snapshot).
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    progress: Option<Arc<dyn ProgressRepository>>,
}

impl ProgressService {
    #[must_use]
    pub fn new(clock: Clock, progress: Arc<dyn ProgressRepository>) -> Self {
        Self {
            clock,
            progress: Some(progress),
        }
    }

    /// A service with no backing store, used when the store failed to open.
    #[must_use]
    pub fn degraded(clock: Clock) -> Self {
        Self {
            clock,
            progress: None,
        }
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.progress.is_some()
    }

    /// Ensure the stats row exists; `started_at` is set on first run only.
    pub async fn initialize(&self) -> Option<UserStats> {
        settle_write("initialize", self.try_initialize().await)
    }

    pub async fn mark_lesson_complete(
        &self,
        module_id: ModuleId,
        lesson_id: LessonId,
    ) -> Option<LessonProgress> {
        let record = settle_write(
            "mark_lesson_complete",
            self.try_mark_lesson_complete(module_id, lesson_id).await,
        )?;
        tracing::info!(
            module = %module_id,
            lesson = %lesson_id,
            attempts = record.attempts,
            "marked lesson complete"
        );
        Some(record)
    }

    pub async fn is_lesson_complete(&self, module_id: ModuleId, lesson_id: LessonId) -> bool {
        self.lesson_progress(module_id, lesson_id)
            .await
            .is_some_and(|record| record.completed)
    }

    pub async fn lesson_progress(
        &self,
        module_id: ModuleId,
        lesson_id: LessonId,
    ) -> Option<LessonProgress> {
        settle("lesson_progress", self.try_lesson_progress(module_id, lesson_id).await).flatten()
    }

    /// Record one quiz attempt of `score` correct answers out of `total_questions`.
    ///
    /// An attempt with `score > total_questions` is rejected and logged.
    pub async fn record_quiz_attempt(
        &self,
        module_id: ModuleId,
        score: u32,
        total_questions: u32,
    ) -> Option<QuizProgress> {
        let record = settle_write(
            "record_quiz_attempt",
            self.try_record_quiz_attempt(module_id, score, total_questions)
                .await,
        )?;
        tracing::info!(
            module = %module_id,
            score,
            total_questions,
            percentage = record.percentage,
            completed = record.completed,
            "recorded quiz attempt"
        );
        Some(record)
    }

    pub async fn quiz_progress(&self, module_id: ModuleId) -> Option<QuizProgress> {
        settle("quiz_progress", self.try_quiz_progress(module_id).await).flatten()
    }

    /// Percentage of a module's lessons completed, 0 when the module has none.
    pub async fn module_progress(&self, module_id: ModuleId, total_lessons_in_module: u32) -> u8 {
        self.completed_lessons(Some(module_id))
            .await
            .map_or(0, |completed| percent_of(completed, total_lessons_in_module))
    }

    /// Percentage of all lessons completed, 0 when `total_lessons` is 0.
    pub async fn overall_progress(&self, total_lessons: u32) -> u8 {
        self.completed_lessons(None)
            .await
            .map_or(0, |completed| percent_of(completed, total_lessons))
    }

    pub async fn snapshot(&self) -> ProgressSnapshot {
        settle("snapshot", self.try_snapshot().await).unwrap_or_default()
    }

    /// Delete all lesson and quiz records and zero the counters.
    ///
    /// `started_at` and `last_activity` are left as they were. Returns
    /// `false` when nothing was reset.
    pub async fn reset_progress(&self) -> bool {
        let reset = settle_write("reset_progress", self.try_reset().await).is_some();
        if reset {
            tracing::info!("progress reset");
        }
        reset
    }

    /// Release the underlying store. Call once at shutdown.
    pub async fn close(&self) {
        if let Some(progress) = &self.progress {
            progress.close().await;
            tracing::info!("progress store closed");
        }
    }

    async fn completed_lessons(&self, module_id: Option<ModuleId>) -> Option<u32> {
        settle("completed_lesson_count", self.try_completed_lessons(module_id).await)
    }

    async fn try_initialize(&self) -> Result<UserStats, ProgressServiceError> {
        let stats = self.repo()?.initialize_stats(self.clock.now()).await?;
        Ok(stats)
    }

    async fn try_mark_lesson_complete(
        &self,
        module_id: ModuleId,
        lesson_id: LessonId,
    ) -> Result<LessonProgress, ProgressServiceError> {
        let record = self
            .repo()?
            .record_lesson_completion(module_id, lesson_id, self.clock.now())
            .await?;
        Ok(record)
    }

    async fn try_record_quiz_attempt(
        &self,
        module_id: ModuleId,
        score: u32,
        total_questions: u32,
    ) -> Result<QuizProgress, ProgressServiceError> {
        let repo = self.repo()?;
        let attempt = QuizAttempt::new(module_id, score, total_questions)?;
        let record = repo.record_quiz_attempt(&attempt, self.clock.now()).await?;
        Ok(record)
    }

    async fn try_lesson_progress(
        &self,
        module_id: ModuleId,
        lesson_id: LessonId,
    ) -> Result<Option<LessonProgress>, ProgressServiceError> {
        Ok(self.repo()?.lesson_progress(module_id, lesson_id).await?)
    }

    async fn try_quiz_progress(
        &self,
        module_id: ModuleId,
    ) -> Result<Option<QuizProgress>, ProgressServiceError> {
        Ok(self.repo()?.quiz_progress(module_id).await?)
    }

    async fn try_completed_lessons(
        &self,
        module_id: Option<ModuleId>,
    ) -> Result<u32, ProgressServiceError> {
        Ok(self.repo()?.completed_lesson_count(module_id).await?)
    }

    async fn try_snapshot(&self) -> Result<ProgressSnapshot, ProgressServiceError> {
        let repo = self.repo()?;
        Ok(ProgressSnapshot {
            stats: repo.user_stats().await?,
            completed_lessons: repo.completed_lesson_count(None).await?,
            completed_quizzes: repo.completed_quiz_count().await?,
        })
    }

    async fn try_reset(&self) -> Result<(), ProgressServiceError> {
        self.repo()?.reset().await?;
        Ok(())
    }

    fn repo(&self) -> Result<&Arc<dyn ProgressRepository>, ProgressServiceError> {
        self.progress.as_ref().ok_or(ProgressServiceError::Unavailable)
    }
}

/// Log a failed read and drop the error.
///
/// Reads against a missing store are expected in degraded mode and only
/// logged at debug level.
fn settle<T>(operation: &'static str, result: Result<T, ProgressServiceError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(ProgressServiceError::Unavailable) => {
            tracing::debug!(operation, "progress store unavailable, skipping");
            None
        }
        Err(err) => {
            tracing::error!(operation, error = %err, "progress store operation failed");
            None
        }
    }
}

/// Log a failed mutation and drop the error. Every dropped write is logged.
fn settle_write<T>(
    operation: &'static str,
    result: Result<T, ProgressServiceError>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(ProgressServiceError::Unavailable) => {
            tracing::warn!(operation, "progress store unavailable, change not saved");
            None
        }
        Err(err) => {
            tracing::error!(operation, error = %err, "progress store operation failed");
            None
        }
    }
}
