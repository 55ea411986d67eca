use std::sync::Arc;

use course_core::model::{
    COURSE_TITLE, Catalog, ContentKey, Lesson, LessonId, Module, ModuleId, Quiz,
};
use serde::de::DeserializeOwned;
use storage::content::{ContentSource, load};

/// Label used when a lesson has no readable document.
pub const UNKNOWN_LESSON_TITLE: &str = "Unknown Lesson";

/// Course catalog plus on-demand lesson and quiz lookup.
///
/// Nothing is cached: every lookup re-reads the content source. A missing or
/// unreadable document is logged and reported as `None`.
#[derive(Clone)]
pub struct ContentService {
    catalog: Catalog,
    source: Arc<dyn ContentSource>,
}

impl ContentService {
    #[must_use]
    pub fn new(catalog: Catalog, source: Arc<dyn ContentSource>) -> Self {
        Self { catalog, source }
    }

    /// The bundled Python course over the given content source.
    #[must_use]
    pub fn python_course(source: Arc<dyn ContentSource>) -> Self {
        Self::new(Catalog::python_course(), source)
    }

    #[must_use]
    pub fn course_title(&self) -> &'static str {
        COURSE_TITLE
    }

    /// All modules in id order.
    #[must_use]
    pub fn list_modules(&self) -> &'static [Module] {
        self.catalog.modules()
    }

    /// Returns `None` for ids outside `1..=module_count`.
    #[must_use]
    pub fn module(&self, id: ModuleId) -> Option<&'static Module> {
        self.catalog.module(id)
    }

    #[must_use]
    pub fn total_lessons(&self) -> u32 {
        self.catalog.total_lessons()
    }

    #[must_use]
    pub fn load_lesson(&self, module_id: ModuleId, lesson_id: LessonId) -> Option<Lesson> {
        let lesson: Lesson = self.fetch(ContentKey::lesson(module_id, lesson_id))?;
        tracing::info!(
            module = %module_id,
            lesson = %lesson_id,
            title = %lesson.title,
            "loaded lesson"
        );
        Some(lesson)
    }

    #[must_use]
    pub fn load_quiz(&self, module_id: ModuleId) -> Option<Quiz> {
        let quiz: Quiz = self.fetch(ContentKey::quiz(module_id))?;
        tracing::info!(module = %module_id, title = %quiz.title, "loaded quiz");
        Some(quiz)
    }

    #[must_use]
    pub fn lesson_exists(&self, module_id: ModuleId, lesson_id: LessonId) -> bool {
        self.source
            .exists(&ContentKey::lesson(module_id, lesson_id))
    }

    #[must_use]
    pub fn quiz_exists(&self, module_id: ModuleId) -> bool {
        self.source.exists(&ContentKey::quiz(module_id))
    }

    /// Lesson title, or `"Unknown Lesson"` when the document is unavailable.
    #[must_use]
    pub fn lesson_title(&self, module_id: ModuleId, lesson_id: LessonId) -> String {
        self.load_lesson(module_id, lesson_id)
            .map_or_else(|| UNKNOWN_LESSON_TITLE.to_owned(), |lesson| lesson.title)
    }

    fn fetch<T: DeserializeOwned>(&self, key: ContentKey) -> Option<T> {
        match load(self.source.as_ref(), &key) {
            Ok(Some(document)) => Some(document),
            Ok(None) => {
                tracing::warn!(path = %key, "content not found");
                None
            }
            Err(err) => {
                tracing::error!(path = %key, error = %err, "failed to load content");
                None
            }
        }
    }
}
