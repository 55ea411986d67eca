use serde::{Deserialize, Deserializer, Serialize};

use crate::model::progress::{PASSING_PERCENTAGE, percent_of};

/// End-of-module quiz document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "estimated_time")]
    pub estimated_time: String,
    #[serde(default = "default_passing_score", alias = "passing_score")]
    pub passing_score: u8,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Quiz {
    /// Count correct answers, position by position.
    ///
    /// Unanswered questions (`None`, or missing because `answers` is shorter
    /// than the question list) count as wrong. Extra answers are ignored.
    #[must_use]
    pub fn score(&self, answers: &[Option<AnswerValue>]) -> QuizScore {
        let correct = self
            .questions
            .iter()
            .enumerate()
            .filter(|(index, question)| {
                answers
                    .get(*index)
                    .and_then(Option::as_ref)
                    .is_some_and(|answer| question.is_correct(answer))
            })
            .count();

        QuizScore {
            correct: u32::try_from(correct).unwrap_or(u32::MAX),
            total: u32::try_from(self.questions.len()).unwrap_or(u32::MAX),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice,
    TrueFalse,
    CodeOutput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(rename = "question", alias = "text")]
    pub text: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(alias = "correct_answer")]
    pub correct_answer: AnswerValue,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub code: Option<String>,
}

impl Question {
    #[must_use]
    pub fn is_correct(&self, answer: &AnswerValue) -> bool {
        self.correct_answer.matches(answer)
    }

    /// Read raw input in the same form as this question's correct answer.
    ///
    /// Index questions take integers. Text questions compare as text, except
    /// that an in-range option index stands for that option's text, so `"0"`
    /// answers `"True"` on a true/false question listing `["True", "False"]`.
    #[must_use]
    pub fn read_answer(&self, input: &str) -> AnswerValue {
        let trimmed = input.trim();
        match self.correct_answer {
            AnswerValue::Numeric(_) => AnswerValue::parse(trimmed),
            AnswerValue::Text(_) => {
                let option = trimmed
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| self.options.get(index));
                AnswerValue::Text(option.map_or(trimmed, String::as_str).to_owned())
            }
        }
    }

    /// Option text of the correct answer when it is stored as an option index.
    #[must_use]
    pub fn correct_option(&self) -> Option<&str> {
        match &self.correct_answer {
            AnswerValue::Numeric(index) => usize::try_from(*index)
                .ok()
                .and_then(|i| self.options.get(i))
                .map(String::as_str),
            AnswerValue::Text(_) => None,
        }
    }
}

/// A correct or given answer: an option index or a literal value.
///
/// Documents store true/false answers either as strings or JSON booleans;
/// booleans are read as their text form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Numeric(i64),
    Text(String),
}

impl AnswerValue {
    /// Interpret raw user input: integers become `Numeric`, anything else `Text`.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        trimmed
            .parse::<i64>()
            .map_or_else(|_| Self::Text(trimmed.to_owned()), Self::Numeric)
    }

    /// Numbers compare by value, text case-insensitively; mixed tags never match.
    #[must_use]
    pub fn matches(&self, other: &AnswerValue) -> bool {
        match (self, other) {
            (Self::Numeric(a), Self::Numeric(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a.to_lowercase() == b.to_lowercase(),
            _ => false,
        }
    }
}

impl<'de> Deserialize<'de> for AnswerValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Numeric(i64),
            Bool(bool),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Numeric(n) => Self::Numeric(n),
            Raw::Bool(b) => Self::Text(b.to_string()),
            Raw::Text(s) => Self::Text(s),
        })
    }
}

/// Correct answers out of total questions for one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizScore {
    pub correct: u32,
    pub total: u32,
}

impl QuizScore {
    #[must_use]
    pub fn percentage(&self) -> u8 {
        percent_of(self.correct, self.total)
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.percentage() >= PASSING_PERCENTAGE
    }
}

/// Feedback tier for a quiz result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Outstanding,
    Passed,
    Close,
    KeepTrying,
}

impl ScoreBand {
    #[must_use]
    pub fn from_percentage(percentage: u8) -> Self {
        match percentage {
            90.. => Self::Outstanding,
            p if p >= PASSING_PERCENTAGE => Self::Passed,
            50.. => Self::Close,
            _ => Self::KeepTrying,
        }
    }

    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::Outstanding => {
                "Excellent work! You have a strong grasp of this module's concepts."
            }
            Self::Passed => "Great job! You passed the quiz and can move on to the next module.",
            Self::Close => {
                "You're getting there! Review the lessons and try again to improve your score."
            }
            Self::KeepTrying => {
                "Don't give up! Review the lessons carefully and retake the quiz."
            }
        }
    }
}

fn default_passing_score() -> u8 {
    PASSING_PERCENTAGE
}
