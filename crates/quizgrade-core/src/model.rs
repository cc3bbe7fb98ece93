//! Core data model types for quizgrade.
//!
//! These are the types the grading engine consumes: questions, their answer
//! keys, and the question banks that bundle them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default similarity threshold for free-text questions.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.7;

/// A single question together with its answer key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// Unique identifier for this question.
    pub id: String,
    /// The question text shown to students.
    pub text: String,
    /// The instructor-supplied correct answer.
    pub correct_answer: String,
    /// How submissions to this question are graded.
    #[serde(default)]
    pub question_type: QuestionType,
    /// Minimum similarity for a text answer to be accepted.
    #[serde(default = "default_threshold")]
    pub similarity_threshold: f64,
    /// Whether the tiered matcher is used for text answers.
    #[serde(default = "default_true")]
    pub semantic_matching: bool,
    /// Options for multiple-choice and checkbox questions.
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub rating_min: Option<i64>,
    #[serde(default)]
    pub rating_max: Option<i64>,
    #[serde(default)]
    pub grid_rows: Option<Vec<String>>,
    #[serde(default)]
    pub grid_columns: Option<Vec<String>>,
}

impl Question {
    /// Create a free-text question with default grading settings.
    pub fn text(id: &str, text: &str, correct_answer: &str) -> Self {
        Self {
            id: id.to_string(),
            text: text.to_string(),
            correct_answer: correct_answer.to_string(),
            question_type: QuestionType::Text,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            semantic_matching: true,
            options: None,
            rating_min: None,
            rating_max: None,
            grid_rows: None,
            grid_columns: None,
        }
    }

    /// Same question with a different type.
    pub fn with_type(mut self, question_type: QuestionType) -> Self {
        self.question_type = question_type;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn with_semantic_matching(mut self, enabled: bool) -> Self {
        self.semantic_matching = enabled;
        self
    }
}

fn default_threshold() -> f64 {
    DEFAULT_SIMILARITY_THRESHOLD
}

fn default_true() -> bool {
    true
}

/// Supported question types.
///
/// Parsing never fails: stored types are untrusted legacy data, and anything
/// unrecognised is graded on the free-text path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "String")]
pub enum QuestionType {
    #[default]
    Text,
    MultipleChoice,
    Checkbox,
    Rating,
    Grid,
}

impl QuestionType {
    /// Lenient parse used for stored and user-supplied type names.
    pub fn from_legacy(s: &str) -> Self {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "multiplechoice" | "radio" | "choice" => QuestionType::MultipleChoice,
            "checkbox" | "checkboxes" => QuestionType::Checkbox,
            "rating" | "scale" => QuestionType::Rating,
            "grid" => QuestionType::Grid,
            "text" => QuestionType::Text,
            other => {
                tracing::debug!("unknown question type '{other}', grading as text");
                QuestionType::Text
            }
        }
    }
}

impl From<String> for QuestionType {
    fn from(s: String) -> Self {
        QuestionType::from_legacy(&s)
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionType::Text => write!(f, "text"),
            QuestionType::MultipleChoice => write!(f, "multipleChoice"),
            QuestionType::Checkbox => write!(f, "checkbox"),
            QuestionType::Rating => write!(f, "rating"),
            QuestionType::Grid => write!(f, "grid"),
        }
    }
}

impl FromStr for QuestionType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(QuestionType::from_legacy(s))
    }
}

/// A collection of questions, e.g. one test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionBank {
    /// Unique identifier for this bank.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// The questions in this bank.
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl QuestionBank {
    /// Look up a question by id.
    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }
}

/// One student's raw answer to one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub question_id: String,
    /// Student identifier (name, email, or share-link token).
    #[serde(default)]
    pub student: String,
    /// Raw answer payload; encoding depends on the question type.
    pub answer: String,
}
