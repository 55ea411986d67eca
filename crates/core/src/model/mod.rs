mod catalog;
mod content_key;
mod ids;
mod lesson;
mod progress;
mod quiz;

pub use catalog::{COURSE_TITLE, Catalog, Module};
pub use content_key::ContentKey;
pub use ids::{LessonId, ModuleId, ParseIdError};
pub use lesson::{CodeExample, Exercise, Lesson, Solution};
pub use progress::{
    LessonProgress, PASSING_PERCENTAGE, ProgressSnapshot, QuizAttempt, QuizAttemptError,
    QuizProgress, UserStats, percent_of,
};
pub use quiz::{AnswerValue, Question, QuestionKind, Quiz, QuizScore, ScoreBand};
