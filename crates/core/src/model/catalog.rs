use serde::Serialize;

use crate::model::ids::ModuleId;

/// Title shown for the whole curriculum.
pub const COURSE_TITLE: &str = "Python: From Zero to Full-Stack Developer";

/// A top-level curriculum unit: several lessons and one quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Module {
    id: ModuleId,
    title: &'static str,
    subtitle: &'static str,
    lesson_count: u32,
    icon: &'static str,
}

impl Module {
    const fn new(
        id: u32,
        title: &'static str,
        subtitle: &'static str,
        lesson_count: u32,
        icon: &'static str,
    ) -> Self {
        Self {
            id: ModuleId::new(id),
            title,
            subtitle,
            lesson_count,
            icon,
        }
    }

    #[must_use]
    pub fn id(&self) -> ModuleId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &'static str {
        self.title
    }

    #[must_use]
    pub fn subtitle(&self) -> &'static str {
        self.subtitle
    }

    #[must_use]
    pub fn lesson_count(&self) -> u32 {
        self.lesson_count
    }

    #[must_use]
    pub fn icon(&self) -> &'static str {
        self.icon
    }

    /// Label used in navigation lists, e.g. `🎯 Module 1: The Absolute Basics`.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} Module {}: {}", self.icon, self.id, self.title)
    }
}

static MODULES: [Module; 14] = [
    Module::new(1, "The Absolute Basics", "The 'What'", 5, "🎯"),
    Module::new(2, "Storing & Using Information", "The 'Boxes'", 5, "📦"),
    Module::new(3, "Making Decisions", "The 'Forks in the Road'", 5, "🔀"),
    Module::new(4, "Repeating Actions", "The 'Loops'", 5, "🔁"),
    Module::new(5, "Grouping Information", "The 'Containers'", 6, "🗂️"),
    Module::new(6, "Creating Reusable Tools", "The 'Recipes'", 5, "🧰"),
    Module::new(7, "Handling Mistakes", "The 'Safety Nets'", 5, "🛡️"),
    Module::new(8, "Blueprints for Code", "Object-Oriented Programming", 6, "🏗️"),
    Module::new(9, "Working with the Real World", "Files & Libraries", 6, "🌍"),
    Module::new(10, "Building for the Web", "Back-End", 6, "🌐"),
    Module::new(11, "Storing Data", "Databases", 6, "💾"),
    Module::new(12, "Building for the User", "Front-End Basics", 6, "🎨"),
    Module::new(13, "Tying It All Together", "Full Stack", 6, "🚀"),
    Module::new(14, "Sharing Your Work", "Deployment & Tools", 5, "📤"),
];

/// The fixed, ordered list of course modules.
///
/// Module ids are dense and start at 1, so lookup is positional.
#[derive(Debug, Clone, Copy)]
pub struct Catalog {
    modules: &'static [Module],
}

impl Catalog {
    /// The bundled Python curriculum.
    #[must_use]
    pub fn python_course() -> Self {
        Self { modules: &MODULES }
    }

    #[must_use]
    pub fn modules(&self) -> &'static [Module] {
        self.modules
    }

    #[must_use]
    pub fn module(&self, id: ModuleId) -> Option<&'static Module> {
        let index = usize::try_from(id.value()).ok()?.checked_sub(1)?;
        self.modules.get(index)
    }

    #[must_use]
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Sum of lesson counts across all modules.
    #[must_use]
    pub fn total_lessons(&self) -> u32 {
        self.modules.iter().map(Module::lesson_count).sum()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::python_course()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modules_are_ordered_by_id() {
        let catalog = Catalog::python_course();
        for (index, module) in catalog.modules().iter().enumerate() {
            assert_eq!(module.id().value() as usize, index + 1);
            assert!(module.lesson_count() >= 1);
        }
    }

    #[test]
    fn out_of_range_ids_are_absent() {
        let catalog = Catalog::python_course();
        assert!(catalog.module(ModuleId::new(0)).is_none());
        assert!(catalog.module(ModuleId::new(15)).is_none());
        assert_eq!(
            catalog.module(ModuleId::new(14)).map(Module::title),
            Some("Sharing Your Work")
        );
    }

    #[test]
    fn total_lessons_sums_every_module() {
        assert_eq!(Catalog::python_course().total_lessons(), 77);
    }

    #[test]
    fn display_name_includes_icon_and_id() {
        let catalog = Catalog::python_course();
        let module = catalog.module(ModuleId::new(1)).unwrap();
        assert_eq!(module.display_name(), "🎯 Module 1: The Absolute Basics");
    }
}
