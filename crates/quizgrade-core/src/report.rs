//! Grade report types with JSON persistence.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::QuestionBank;
use crate::results::GradedSubmission;
use crate::statistics::{compute_bank_stats, BankStats};

/// A complete grading report for one bank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
    /// Summary of the graded bank.
    pub bank: BankSummary,
    /// Individual graded submissions.
    pub results: Vec<GradedSubmission>,
    /// Aggregate statistics.
    pub stats: BankStats,
    /// Total wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// Summary of a question bank (without the answer keys).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankSummary {
    pub id: String,
    pub name: String,
    pub question_count: usize,
}

impl GradeReport {
    /// Build a report from graded submissions.
    pub fn new(bank: &QuestionBank, results: Vec<GradedSubmission>, duration_ms: u64) -> Self {
        let stats = compute_bank_stats(bank, &results);
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            bank: BankSummary {
                id: bank.id.clone(),
                name: bank.name.clone(),
                question_count: bank.questions.len(),
            },
            results,
            stats,
            duration_ms,
        }
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: GradeReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Question, QuestionType, Submission};
    use crate::results::{GradeSource, GradingResult};

    #[test]
    fn save_and_load() {
        let bank = QuestionBank {
            id: "geo".into(),
            name: "Geography".into(),
            description: String::new(),
            questions: vec![Question::text("capital", "?", "Stockholm")],
        };
        let results = vec![GradedSubmission::new(
            &Submission {
                question_id: "capital".into(),
                student: "alice".into(),
                answer: "Stokholm".into(),
            },
            QuestionType::Text,
            GradingResult::from_similarity(0.85, 0.7),
            GradeSource::Local,
        )];
        let report = GradeReport::new(&bank, results, 12);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("report.json");
        report.save_json(&path).unwrap();

        let loaded = GradeReport::load_json(&path).unwrap();
        assert_eq!(loaded.id, report.id);
        assert_eq!(loaded.bank.question_count, 1);
        assert_eq!(loaded.results.len(), 1);
        assert_eq!(loaded.stats.per_question["capital"].correct, 1);
    }

    #[test]
    fn load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = GradeReport::load_json(&dir.path().join("nope.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read report"));
    }
}
