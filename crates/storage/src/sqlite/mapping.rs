use course_core::model::{LessonId, LessonProgress, ModuleId, QuizProgress, UserStats};
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn percent_from_i64(field: &'static str, v: i64) -> Result<u8, StorageError> {
    u8::try_from(v)
        .ok()
        .filter(|p| *p <= 100)
        .ok_or_else(|| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn module_id_from_i64(v: i64) -> Result<ModuleId, StorageError> {
    Ok(ModuleId::new(u32_from_i64("module_id", v)?))
}

pub(crate) fn lesson_id_from_i64(v: i64) -> Result<LessonId, StorageError> {
    Ok(LessonId::new(u32_from_i64("lesson_id", v)?))
}

pub(crate) fn map_lesson_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<LessonProgress, StorageError> {
    Ok(LessonProgress {
        module_id: module_id_from_i64(row.try_get::<i64, _>("module_id").map_err(ser)?)?,
        lesson_id: lesson_id_from_i64(row.try_get::<i64, _>("lesson_id").map_err(ser)?)?,
        completed: row.try_get("completed").map_err(ser)?,
        completed_at: row.try_get("completed_at").map_err(ser)?,
        attempts: u32_from_i64("attempts", row.try_get::<i64, _>("attempts").map_err(ser)?)?,
    })
}

pub(crate) fn map_quiz_row(row: &sqlx::sqlite::SqliteRow) -> Result<QuizProgress, StorageError> {
    Ok(QuizProgress {
        module_id: module_id_from_i64(row.try_get::<i64, _>("module_id").map_err(ser)?)?,
        completed: row.try_get("completed").map_err(ser)?,
        score: u32_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?,
        total_questions: u32_from_i64(
            "total_questions",
            row.try_get::<i64, _>("total_questions").map_err(ser)?,
        )?,
        percentage: percent_from_i64(
            "percentage",
            row.try_get::<i64, _>("percentage").map_err(ser)?,
        )?,
        attempts: u32_from_i64("attempts", row.try_get::<i64, _>("attempts").map_err(ser)?)?,
        best_score: percent_from_i64(
            "best_score",
            row.try_get::<i64, _>("best_score").map_err(ser)?,
        )?,
        last_attempt: row.try_get("last_attempt").map_err(ser)?,
    })
}

pub(crate) fn map_stats_row(row: &sqlx::sqlite::SqliteRow) -> Result<UserStats, StorageError> {
    Ok(UserStats {
        total_lessons_completed: u32_from_i64(
            "total_lessons_completed",
            row.try_get::<i64, _>("total_lessons_completed")
                .map_err(ser)?,
        )?,
        total_quizzes_completed: u32_from_i64(
            "total_quizzes_completed",
            row.try_get::<i64, _>("total_quizzes_completed")
                .map_err(ser)?,
        )?,
        started_at: row.try_get("started_at").map_err(ser)?,
        last_activity: row.try_get("last_activity").map_err(ser)?,
    })
}

/// Counts come back from `COUNT(*)` as `i64`.
pub(crate) fn count_from_i64(v: i64) -> Result<u32, StorageError> {
    u32_from_i64("count", v)
}
