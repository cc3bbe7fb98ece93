//! TOML question bank and submission parser.
//!
//! Loads question banks from TOML files and directories, loads submission
//! files, and validates banks against the question invariants.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::engine::split_selection;
use crate::model::{Question, QuestionBank, QuestionType, Submission};

/// Intermediate TOML structure for parsing question bank files.
#[derive(Debug, Deserialize)]
struct TomlBankFile {
    bank: TomlBankHeader,
    #[serde(default)]
    questions: Vec<Question>,
}

#[derive(Debug, Deserialize)]
struct TomlBankHeader {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct TomlSubmissionFile {
    #[serde(default)]
    submissions: Vec<Submission>,
}

/// Parse a single TOML file into a `QuestionBank`.
pub fn parse_bank(path: &Path) -> Result<QuestionBank> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read question bank: {}", path.display()))?;

    parse_bank_str(&content, path)
}

/// Parse a TOML string into a `QuestionBank` (useful for testing).
pub fn parse_bank_str(content: &str, source_path: &Path) -> Result<QuestionBank> {
    let parsed: TomlBankFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    Ok(QuestionBank {
        id: parsed.bank.id,
        name: parsed.bank.name,
        description: parsed.bank.description,
        questions: parsed.questions,
    })
}

/// Recursively load all `.toml` question banks from a directory.
pub fn load_bank_directory(dir: &Path) -> Result<Vec<QuestionBank>> {
    let mut banks = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            banks.extend(load_bank_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_bank(&path) {
                Ok(bank) => banks.push(bank),
                Err(e) => {
                    tracing::warn!("skipping {}: {}", path.display(), e);
                }
            }
        }
    }

    banks.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(banks)
}

/// Load a bank from a file, or every bank under a directory.
pub fn load_banks(path: &Path) -> Result<Vec<QuestionBank>> {
    if path.is_dir() {
        load_bank_directory(path)
    } else {
        Ok(vec![parse_bank(path)?])
    }
}

/// Parse a TOML submissions file.
pub fn parse_submissions(path: &Path) -> Result<Vec<Submission>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read submissions: {}", path.display()))?;

    parse_submissions_str(&content, path)
}

pub fn parse_submissions_str(content: &str, source_path: &Path) -> Result<Vec<Submission>> {
    let parsed: TomlSubmissionFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;
    Ok(parsed.submissions)
}

/// A warning from question bank validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    /// Warning message.
    pub message: String,
}

impl ValidationWarning {
    fn for_question(question: &Question, message: impl Into<String>) -> Self {
        Self {
            question_id: Some(question.id.clone()),
            message: message.into(),
        }
    }
}

/// Validate a question bank for invariant violations and common mistakes.
pub fn validate_bank(bank: &QuestionBank) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if bank.questions.is_empty() {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "bank has no questions".into(),
        });
    }

    // Check for duplicate question IDs
    let mut seen_ids = HashSet::new();
    for question in &bank.questions {
        if !seen_ids.insert(&question.id) {
            warnings.push(ValidationWarning::for_question(
                question,
                format!("duplicate question ID: {}", question.id),
            ));
        }
    }

    for question in &bank.questions {
        warnings.extend(validate_question(question));
    }

    warnings
}

/// Validate a single question.
pub fn validate_question(question: &Question) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let mut warn = |message: String| {
        warnings.push(ValidationWarning::for_question(question, message));
    };

    if question.text.trim().is_empty() {
        warn("question text is empty".into());
    }
    if question.correct_answer.trim().is_empty() && question.question_type != QuestionType::Grid {
        warn("correct answer is empty".into());
    }
    if !(0.0..=1.0).contains(&question.similarity_threshold) {
        warn(format!(
            "similarity_threshold {} is outside [0, 1]",
            question.similarity_threshold
        ));
    }

    if let Some(options) = &question.options {
        let non_empty = options.iter().filter(|o| !o.trim().is_empty()).count();
        if non_empty < 2 {
            warn(format!(
                "options must have at least 2 non-empty entries, found {non_empty}"
            ));
        }
    }

    match question.question_type {
        QuestionType::Text => {}
        QuestionType::MultipleChoice => match &question.options {
            None => warn("multipleChoice question has no options".into()),
            Some(options) => {
                if !options.contains(&question.correct_answer) {
                    warn(format!(
                        "correct answer '{}' is not one of the options",
                        question.correct_answer
                    ));
                }
            }
        },
        QuestionType::Checkbox => match &question.options {
            None => warn("checkbox question has no options".into()),
            Some(options) => {
                for token in split_selection(&question.correct_answer) {
                    if !options.iter().any(|o| o.trim() == token) {
                        warn(format!("correct option '{token}' is not one of the options"));
                    }
                }
            }
        },
        QuestionType::Rating => validate_rating(question, &mut warn),
        QuestionType::Grid => {
            let rows = question.grid_rows.as_ref().map_or(0, Vec::len);
            let columns = question.grid_columns.as_ref().map_or(0, Vec::len);
            if rows < 2 || columns < 2 {
                warn(format!(
                    "grid needs at least 2 rows and 2 columns, found {rows}x{columns}"
                ));
            }
        }
    }

    if question.question_type != QuestionType::Text && !question.semantic_matching {
        warn(format!(
            "semantic_matching has no effect on {} questions",
            question.question_type
        ));
    }

    warnings
}

fn validate_rating(question: &Question, warn: &mut impl FnMut(String)) {
    if let (Some(min), Some(max)) = (question.rating_min, question.rating_max) {
        if min >= max {
            warn(format!("rating_min ({min}) must be less than rating_max ({max})"));
        }
    }

    match question.correct_answer.trim().parse::<i64>() {
        Err(_) => warn(format!(
            "rating answer '{}' is not an integer",
            question.correct_answer
        )),
        Ok(value) => {
            let below = question.rating_min.is_some_and(|min| value < min);
            let above = question.rating_max.is_some_and(|max| value > max);
            if below || above {
                warn(format!("rating answer {value} is outside the rating scale"));
            }
        }
    }
}
