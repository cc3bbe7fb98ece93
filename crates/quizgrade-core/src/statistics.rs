//! Aggregate statistics over graded submissions.
//!
//! Backs the instructor dashboard: per-question pass rates and mean text
//! similarity, and per-student scores. Grid submissions are counted as
//! pending review and excluded from pass rates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{QuestionBank, QuestionType};
use crate::results::{GradeSource, GradedSubmission};

/// Statistics for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionStats {
    pub question_type: QuestionType,
    /// Number of submissions graded for this question.
    pub attempts: usize,
    pub correct: usize,
    /// Submissions awaiting manual review.
    pub pending_review: usize,
    /// `correct / (attempts - pending_review)`, or 0.0 when nothing was auto-graded.
    pub pass_rate: f64,
    /// Mean similarity across attempts; text questions only.
    pub mean_similarity: Option<f64>,
}

/// Score for one student across the bank.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentScore {
    pub answered: usize,
    pub correct: usize,
    pub pending_review: usize,
}

/// Aggregate statistics for a bank.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BankStats {
    pub total_submissions: usize,
    pub total_correct: usize,
    pub total_pending_review: usize,
    /// Pass rate over auto-graded submissions.
    pub overall_pass_rate: f64,
    pub per_question: BTreeMap<String, QuestionStats>,
    pub per_student: BTreeMap<String, StudentScore>,
}

fn rate(correct: usize, graded: usize) -> f64 {
    if graded == 0 {
        0.0
    } else {
        correct as f64 / graded as f64
    }
}

/// Per-question statistics. Every question in the bank gets an entry.
pub fn compute_question_stats(
    bank: &QuestionBank,
    graded: &[GradedSubmission],
) -> BTreeMap<String, QuestionStats> {
    let mut stats = BTreeMap::new();

    for question in &bank.questions {
        let attempts: Vec<&GradedSubmission> = graded
            .iter()
            .filter(|g| g.question_id == question.id)
            .collect();

        let pending_review = attempts
            .iter()
            .filter(|g| g.source == GradeSource::ManualReview)
            .count();
        let correct = attempts.iter().filter(|g| g.result.is_correct).count();

        let mean_similarity = if question.question_type == QuestionType::Text && !attempts.is_empty()
        {
            let sum: f64 = attempts.iter().map(|g| g.result.similarity).sum();
            Some(sum / attempts.len() as f64)
        } else {
            None
        };

        stats.insert(
            question.id.clone(),
            QuestionStats {
                question_type: question.question_type,
                attempts: attempts.len(),
                correct,
                pending_review,
                pass_rate: rate(correct, attempts.len() - pending_review),
                mean_similarity,
            },
        );
    }

    stats
}

/// Per-student scores keyed by student identifier.
pub fn compute_student_scores(graded: &[GradedSubmission]) -> BTreeMap<String, StudentScore> {
    let mut scores: BTreeMap<String, StudentScore> = BTreeMap::new();
    for g in graded {
        let entry = scores.entry(g.student.clone()).or_default();
        entry.answered += 1;
        if g.result.is_correct {
            entry.correct += 1;
        }
        if g.source == GradeSource::ManualReview {
            entry.pending_review += 1;
        }
    }
    scores
}

/// Compute all statistics for a bank.
pub fn compute_bank_stats(bank: &QuestionBank, graded: &[GradedSubmission]) -> BankStats {
    let total_submissions = graded.len();
    let total_correct = graded.iter().filter(|g| g.result.is_correct).count();
    let total_pending_review = graded
        .iter()
        .filter(|g| g.source == GradeSource::ManualReview)
        .count();

    BankStats {
        total_submissions,
        total_correct,
        total_pending_review,
        overall_pass_rate: rate(total_correct, total_submissions - total_pending_review),
        per_question: compute_question_stats(bank, graded),
        per_student: compute_student_scores(graded),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Question, Submission};
    use crate::results::GradingResult;

    fn graded(
        question_id: &str,
        student: &str,
        question_type: QuestionType,
        result: GradingResult,
        source: GradeSource,
    ) -> GradedSubmission {
        GradedSubmission::new(
            &Submission {
                question_id: question_id.into(),
                student: student.into(),
                answer: String::new(),
            },
            question_type,
            result,
            source,
        )
    }

    fn bank() -> QuestionBank {
        QuestionBank {
            id: "b".into(),
            name: "B".into(),
            description: String::new(),
            questions: vec![
                Question::text("capital", "?", "Stockholm"),
                Question::text("grid", "?", "").with_type(QuestionType::Grid),
                Question::text("unused", "?", "3").with_type(QuestionType::Rating),
            ],
        }
    }

    fn sample() -> Vec<GradedSubmission> {
        vec![
            graded(
                "capital",
                "alice",
                QuestionType::Text,
                GradingResult::from_similarity(1.0, 0.7),
                GradeSource::Local,
            ),
            graded(
                "capital",
                "bob",
                QuestionType::Text,
                GradingResult::from_similarity(0.5, 0.7),
                GradeSource::Local,
            ),
            graded(
                "grid",
                "alice",
                QuestionType::Grid,
                GradingResult::incorrect(),
                GradeSource::ManualReview,
            ),
        ]
    }

    #[test]
    fn question_stats() {
        let stats = compute_question_stats(&bank(), &sample());
        assert_eq!(stats.len(), 3);

        let capital = &stats["capital"];
        assert_eq!(capital.attempts, 2);
        assert_eq!(capital.correct, 1);
        assert_eq!(capital.pass_rate, 0.5);
        assert_eq!(capital.mean_similarity, Some(0.75));

        let grid = &stats["grid"];
        assert_eq!(grid.pending_review, 1);
        assert_eq!(grid.pass_rate, 0.0);
        assert_eq!(grid.mean_similarity, None);

        let unused = &stats["unused"];
        assert_eq!(unused.attempts, 0);
        assert_eq!(unused.mean_similarity, None);
    }

    #[test]
    fn student_scores() {
        let scores = compute_student_scores(&sample());
        assert_eq!(scores["alice"].answered, 2);
        assert_eq!(scores["alice"].correct, 1);
        assert_eq!(scores["alice"].pending_review, 1);
        assert_eq!(scores["bob"].correct, 0);
    }

    #[test]
    fn bank_stats_exclude_pending_from_pass_rate() {
        let stats = compute_bank_stats(&bank(), &sample());
        assert_eq!(stats.total_submissions, 3);
        assert_eq!(stats.total_pending_review, 1);
        assert_eq!(stats.overall_pass_rate, 0.5);
    }

    #[test]
    fn empty_input() {
        let stats = compute_bank_stats(&bank(), &[]);
        assert_eq!(stats.total_submissions, 0);
        assert_eq!(stats.overall_pass_rate, 0.0);
        assert!(stats.per_student.is_empty());
    }
}
