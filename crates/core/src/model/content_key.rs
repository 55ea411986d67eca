use std::fmt;

use crate::model::ids::{LessonId, ModuleId};

/// Address of a bundled content document.
///
/// Content authors lay files out as
/// `modules/module_{mm}/lesson_{ll}.json` and `quizzes/quiz_{mm}.json`,
/// with ids zero-padded to two digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKey {
    Lesson { module: ModuleId, lesson: LessonId },
    Quiz { module: ModuleId },
}

impl ContentKey {
    #[must_use]
    pub fn lesson(module: ModuleId, lesson: LessonId) -> Self {
        Self::Lesson { module, lesson }
    }

    #[must_use]
    pub fn quiz(module: ModuleId) -> Self {
        Self::Quiz { module }
    }

    #[must_use]
    pub fn module(&self) -> ModuleId {
        match self {
            Self::Lesson { module, .. } | Self::Quiz { module } => *module,
        }
    }

    /// Path relative to the content root, always with `/` separators.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Lesson { module, lesson } => format!(
                "modules/module_{:02}/lesson_{:02}.json",
                module.value(),
                lesson.value()
            ),
            Self::Quiz { module } => format!("quizzes/quiz_{:02}.json", module.value()),
        }
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lesson_path_is_zero_padded() {
        let key = ContentKey::lesson(ModuleId::new(3), LessonId::new(4));
        assert_eq!(key.path(), "modules/module_03/lesson_04.json");
    }

    #[test]
    fn quiz_path_is_zero_padded() {
        assert_eq!(
            ContentKey::quiz(ModuleId::new(12)).path(),
            "quizzes/quiz_12.json"
        );
    }

    #[test]
    fn wide_ids_are_not_truncated() {
        let key = ContentKey::lesson(ModuleId::new(1), LessonId::new(123));
        assert_eq!(key.path(), "modules/module_01/lesson_123.json");
    }
}
