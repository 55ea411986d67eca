use async_trait::async_trait;
use chrono::{DateTime, Utc};
use course_core::model::{
    LessonId, LessonProgress, ModuleId, QuizAttempt, QuizProgress, UserStats,
};
use sqlx::SqliteConnection;

use super::SqliteRepository;
use super::mapping::{conn, count_from_i64, map_lesson_row, map_quiz_row, map_stats_row};
use crate::repository::{ProgressRepository, StorageError};

const LESSON_COLUMNS: &str = "module_id, lesson_id, completed, completed_at, attempts";
const QUIZ_COLUMNS: &str = "module_id, completed, score, total_questions, percentage, attempts, best_score, last_attempt";

/// Recount completed lessons and quizzes into the stats row.
///
/// Runs on the caller's connection so it commits together with the mutation.
async fn refresh_stats(db: &mut SqliteConnection, at: DateTime<Utc>) -> Result<(), sqlx::Error> {
    sqlx::query(
        r"
            UPDATE user_stats SET
                total_lessons_completed = (SELECT COUNT(*) FROM lesson_progress WHERE completed = 1),
                total_quizzes_completed = (SELECT COUNT(*) FROM quiz_progress WHERE completed = 1),
                last_activity = ?1
            WHERE id = 1
        ",
    )
    .bind(at)
    .execute(&mut *db)
    .await?;
    Ok(())
}

#[async_trait]
impl ProgressRepository for SqliteRepository {
    async fn initialize_stats(&self, at: DateTime<Utc>) -> Result<UserStats, StorageError> {
        sqlx::query(
            r"
                INSERT INTO user_stats (id, started_at, last_activity)
                VALUES (1, ?1, ?1)
                ON CONFLICT(id) DO NOTHING
            ",
        )
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        self.user_stats()
            .await?
            .ok_or_else(|| StorageError::Serialization("user_stats row missing".into()))
    }

    async fn record_lesson_completion(
        &self,
        module_id: ModuleId,
        lesson_id: LessonId,
        at: DateTime<Utc>,
    ) -> Result<LessonProgress, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let existing = sqlx::query(&format!(
            "SELECT {LESSON_COLUMNS} FROM lesson_progress WHERE module_id = ?1 AND lesson_id = ?2"
        ))
        .bind(i64::from(module_id.value()))
        .bind(i64::from(lesson_id.value()))
        .fetch_optional(&mut *tx)
        .await
        .map_err(conn)?
        .map(|row| map_lesson_row(&row))
        .transpose()?;

        let merged = LessonProgress::merge(
            existing,
            LessonProgress::completion(module_id, lesson_id, at),
        );

        sqlx::query(
            r"
                INSERT INTO lesson_progress (module_id, lesson_id, completed, completed_at, attempts)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(module_id, lesson_id) DO UPDATE SET
                    completed = excluded.completed,
                    completed_at = excluded.completed_at,
                    attempts = excluded.attempts
            ",
        )
        .bind(i64::from(merged.module_id.value()))
        .bind(i64::from(merged.lesson_id.value()))
        .bind(merged.completed)
        .bind(merged.completed_at)
        .bind(i64::from(merged.attempts))
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        refresh_stats(&mut tx, at).await.map_err(conn)?;
        tx.commit().await.map_err(conn)?;

        Ok(merged)
    }

    async fn lesson_progress(
        &self,
        module_id: ModuleId,
        lesson_id: LessonId,
    ) -> Result<Option<LessonProgress>, StorageError> {
        sqlx::query(&format!(
            "SELECT {LESSON_COLUMNS} FROM lesson_progress WHERE module_id = ?1 AND lesson_id = ?2"
        ))
        .bind(i64::from(module_id.value()))
        .bind(i64::from(lesson_id.value()))
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .map(|row| map_lesson_row(&row))
        .transpose()
    }

    async fn record_quiz_attempt(
        &self,
        attempt: &QuizAttempt,
        at: DateTime<Utc>,
    ) -> Result<QuizProgress, StorageError> {
        let module_id = i64::from(attempt.module_id().value());
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let existing = sqlx::query(&format!(
            "SELECT {QUIZ_COLUMNS} FROM quiz_progress WHERE module_id = ?1"
        ))
        .bind(module_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(conn)?
        .map(|row| map_quiz_row(&row))
        .transpose()?;

        let merged = QuizProgress::merge(existing, QuizProgress::from_attempt(attempt, at));

        sqlx::query(
            r"
                INSERT INTO quiz_progress (
                    module_id, completed, score, total_questions,
                    percentage, attempts, best_score, last_attempt
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(module_id) DO UPDATE SET
                    completed = excluded.completed,
                    score = excluded.score,
                    total_questions = excluded.total_questions,
                    percentage = excluded.percentage,
                    attempts = excluded.attempts,
                    best_score = excluded.best_score,
                    last_attempt = excluded.last_attempt
            ",
        )
        .bind(module_id)
        .bind(merged.completed)
        .bind(i64::from(merged.score))
        .bind(i64::from(merged.total_questions))
        .bind(i64::from(merged.percentage))
        .bind(i64::from(merged.attempts))
        .bind(i64::from(merged.best_score))
        .bind(merged.last_attempt)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        refresh_stats(&mut tx, at).await.map_err(conn)?;
        tx.commit().await.map_err(conn)?;

        Ok(merged)
    }

    async fn quiz_progress(
        &self,
        module_id: ModuleId,
    ) -> Result<Option<QuizProgress>, StorageError> {
        sqlx::query(&format!(
            "SELECT {QUIZ_COLUMNS} FROM quiz_progress WHERE module_id = ?1"
        ))
        .bind(i64::from(module_id.value()))
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .map(|row| map_quiz_row(&row))
        .transpose()
    }

    async fn completed_lesson_count(
        &self,
        module_id: Option<ModuleId>,
    ) -> Result<u32, StorageError> {
        let count: i64 = match module_id {
            Some(module_id) => {
                sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM lesson_progress WHERE module_id = ?1 AND completed = 1",
                )
                .bind(i64::from(module_id.value()))
                .fetch_one(&self.pool)
                .await
            }
            None => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM lesson_progress WHERE completed = 1")
                    .fetch_one(&self.pool)
                    .await
            }
        }
        .map_err(conn)?;

        count_from_i64(count)
    }

    async fn completed_quiz_count(&self) -> Result<u32, StorageError> {
        let count: i64 =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM quiz_progress WHERE completed = 1")
                .fetch_one(&self.pool)
                .await
                .map_err(conn)?;
        count_from_i64(count)
    }

    async fn user_stats(&self) -> Result<Option<UserStats>, StorageError> {
        sqlx::query(
            r"
                SELECT total_lessons_completed, total_quizzes_completed, started_at, last_activity
                FROM user_stats
                WHERE id = 1
            ",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .map(|row| map_stats_row(&row))
        .transpose()
    }

    async fn reset(&self) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query("DELETE FROM lesson_progress")
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        sqlx::query("DELETE FROM quiz_progress")
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        sqlx::query(
            "UPDATE user_stats SET total_lessons_completed = 0, total_quizzes_completed = 0",
        )
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
