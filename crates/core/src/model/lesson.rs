use serde::{Deserialize, Serialize};

/// A single teaching unit, deserialized from a bundled lesson document.
///
/// Rich-text fields hold author-supplied HTML and default to empty when a
/// document omits them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub title: String,
    #[serde(default, alias = "estimated_time")]
    pub estimated_time: String,
    #[serde(default)]
    pub concept: String,
    #[serde(default, alias = "code_example")]
    pub code_example: Option<CodeExample>,
    #[serde(default, alias = "syntax_breakdown")]
    pub syntax_breakdown: String,
    #[serde(default)]
    pub exercise: Option<Exercise>,
    #[serde(default)]
    pub solution: Option<Solution>,
    #[serde(default, alias = "key_takeaways")]
    pub key_takeaways: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeExample {
    #[serde(default = "default_language")]
    pub language: String,
    pub code: String,
    #[serde(default)]
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub instructions: String,
    #[serde(default, alias = "starter_code")]
    pub starter_code: String,
    #[serde(default)]
    pub hint: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Solution {
    pub code: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default, alias = "common_mistakes")]
    pub common_mistakes: String,
}

fn default_language() -> String {
    "python".to_owned()
}
