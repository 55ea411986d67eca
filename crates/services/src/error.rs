//! Shared error types for the services crate.

use thiserror::Error;

use course_core::model::QuizAttemptError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors raised inside `ProgressService` before they are logged and
/// replaced with a neutral default.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error("progress store is unavailable")]
    Unavailable,
    #[error(transparent)]
    Attempt(#[from] QuizAttemptError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while opening the progress store at startup.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
