use std::path::PathBuf;
use std::sync::Arc;

use storage::content::{ContentSource, DirectoryContent};
use storage::repository::Storage;

use crate::Clock;
use crate::content_service::ContentService;
use crate::error::AppServicesError;
use crate::progress_service::ProgressService;

/// Assembles the content and progress services for a front end.
#[derive(Clone)]
pub struct AppServices {
    content: Arc<ContentService>,
    progress: Arc<ProgressService>,
}

impl AppServices {
    /// Build services backed by `SQLite` progress and on-disk content.
    ///
    /// Never fails: if the database cannot be opened the progress service
    /// runs degraded and every progress query answers with a neutral value.
    pub async fn new_sqlite(db_url: &str, content_root: impl Into<PathBuf>, clock: Clock) -> Self {
        let source: Arc<dyn ContentSource> = Arc::new(DirectoryContent::new(content_root));
        let progress = match open_sqlite(db_url, clock).await {
            Ok(storage) => ProgressService::new(clock, storage.progress),
            Err(err) => {
                tracing::error!(
                    db_url,
                    error = %err,
                    "progress store unavailable, continuing without it"
                );
                ProgressService::degraded(clock)
            }
        };
        Self {
            content: Arc::new(ContentService::python_course(source)),
            progress: Arc::new(progress),
        }
    }

    /// Build services over an already opened store and initialize the stats row.
    pub async fn with_storage(
        storage: &Storage,
        source: Arc<dyn ContentSource>,
        clock: Clock,
    ) -> Self {
        let progress = ProgressService::new(clock, Arc::clone(&storage.progress));
        progress.initialize().await;
        Self {
            content: Arc::new(ContentService::python_course(source)),
            progress: Arc::new(progress),
        }
    }

    #[must_use]
    pub fn content(&self) -> Arc<ContentService> {
        Arc::clone(&self.content)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    /// Close the progress store.
    pub async fn close(&self) {
        self.progress.close().await;
    }
}

async fn open_sqlite(db_url: &str, clock: Clock) -> Result<Storage, AppServicesError> {
    let storage = Storage::sqlite(db_url).await?;
    storage.progress.initialize_stats(clock.now()).await?;
    Ok(storage)
}
