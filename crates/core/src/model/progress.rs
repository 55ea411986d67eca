use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::ids::{LessonId, ModuleId};

/// Quiz percentage at or above which an attempt completes the quiz.
pub const PASSING_PERCENTAGE: u8 = 70;

/// `part / whole` as a whole percentage, rounding halves up.
///
/// A zero `whole` yields 0 and the result never exceeds 100.
#[must_use]
pub fn percent_of(part: u32, whole: u32) -> u8 {
    if whole == 0 {
        return 0;
    }
    let part = u64::from(part);
    let whole = u64::from(whole);
    let rounded = (part * 200 + whole) / (whole * 2);
    u8::try_from(rounded.min(100)).unwrap_or(100)
}

//
// ─── LESSONS ───────────────────────────────────────────────────────────────────
//

/// Completion state of one lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LessonProgress {
    pub module_id: ModuleId,
    pub lesson_id: LessonId,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub attempts: u32,
}

impl LessonProgress {
    /// A single completion recorded at `at`.
    #[must_use]
    pub fn completion(module_id: ModuleId, lesson_id: LessonId, at: DateTime<Utc>) -> Self {
        Self {
            module_id,
            lesson_id,
            completed: true,
            completed_at: Some(at),
            attempts: 1,
        }
    }

    /// Fold a new completion into the stored record, if any.
    ///
    /// `completed` never reverts, attempts accumulate and the newest
    /// completion time wins.
    #[must_use]
    pub fn merge(old: Option<Self>, new: Self) -> Self {
        let Some(old) = old else {
            return new;
        };
        debug_assert_eq!(
            (old.module_id, old.lesson_id),
            (new.module_id, new.lesson_id)
        );

        Self {
            module_id: new.module_id,
            lesson_id: new.lesson_id,
            completed: old.completed || new.completed,
            completed_at: new.completed_at.or(old.completed_at),
            attempts: old.attempts.saturating_add(new.attempts),
        }
    }
}

//
// ─── QUIZZES ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizAttemptError {
    #[error("score {score} exceeds total questions {total}")]
    ScoreExceedsTotal { score: u32, total: u32 },
}

/// A validated quiz result ready to be recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizAttempt {
    module_id: ModuleId,
    score: u32,
    total_questions: u32,
    percentage: u8,
}

impl QuizAttempt {
    /// # Errors
    ///
    /// Returns `QuizAttemptError::ScoreExceedsTotal` when `score > total_questions`.
    pub fn new(
        module_id: ModuleId,
        score: u32,
        total_questions: u32,
    ) -> Result<Self, QuizAttemptError> {
        if score > total_questions {
            return Err(QuizAttemptError::ScoreExceedsTotal {
                score,
                total: total_questions,
            });
        }
        Ok(Self {
            module_id,
            score,
            total_questions,
            percentage: percent_of(score, total_questions),
        })
    }

    #[must_use]
    pub fn module_id(&self) -> ModuleId {
        self.module_id
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn percentage(&self) -> u8 {
        self.percentage
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.percentage >= PASSING_PERCENTAGE
    }
}

/// Attempt history of one module quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizProgress {
    pub module_id: ModuleId,
    pub completed: bool,
    pub score: u32,
    pub total_questions: u32,
    pub percentage: u8,
    pub attempts: u32,
    pub best_score: u8,
    pub last_attempt: DateTime<Utc>,
}

impl QuizProgress {
    /// Record for a single attempt taken at `at`.
    #[must_use]
    pub fn from_attempt(attempt: &QuizAttempt, at: DateTime<Utc>) -> Self {
        Self {
            module_id: attempt.module_id,
            completed: attempt.passed(),
            score: attempt.score,
            total_questions: attempt.total_questions,
            percentage: attempt.percentage,
            attempts: 1,
            best_score: attempt.percentage,
            last_attempt: at,
        }
    }

    /// Fold a new attempt into the stored record, if any.
    ///
    /// Score fields describe the latest attempt; `best_score` keeps the
    /// maximum percentage and `completed` stays true once any attempt passed.
    #[must_use]
    pub fn merge(old: Option<Self>, new: Self) -> Self {
        let Some(old) = old else {
            return new;
        };
        debug_assert_eq!(old.module_id, new.module_id);

        Self {
            module_id: new.module_id,
            completed: old.completed || new.completed,
            score: new.score,
            total_questions: new.total_questions,
            percentage: new.percentage,
            attempts: old.attempts.saturating_add(new.attempts),
            best_score: old.best_score.max(new.best_score),
            last_attempt: new.last_attempt,
        }
    }
}

//
// ─── AGGREGATES ────────────────────────────────────────────────────────────────
//

/// Derived totals across all progress records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub total_lessons_completed: u32,
    pub total_quizzes_completed: u32,
    pub started_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl UserStats {
    #[must_use]
    pub fn started(at: DateTime<Utc>) -> Self {
        Self {
            total_lessons_completed: 0,
            total_quizzes_completed: 0,
            started_at: at,
            last_activity: at,
        }
    }

    /// Replace the counters after a mutation at `at`.
    #[must_use]
    pub fn recounted(self, lessons: u32, quizzes: u32, at: DateTime<Utc>) -> Self {
        Self {
            total_lessons_completed: lessons,
            total_quizzes_completed: quizzes,
            last_activity: at,
            ..self
        }
    }

    /// Zero the counters, leaving both timestamps as they were.
    #[must_use]
    pub fn cleared(self) -> Self {
        Self {
            total_lessons_completed: 0,
            total_quizzes_completed: 0,
            ..self
        }
    }
}

/// Everything a progress screen shows in one read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub stats: Option<UserStats>,
    pub completed_lessons: u32,
    pub completed_quizzes: u32,
}
