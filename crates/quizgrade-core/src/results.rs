//! Grading result types.

use serde::{Deserialize, Serialize};

use crate::model::{QuestionType, Submission};

/// Outcome of grading one answer.
///
/// `similarity` is only meaningful for text questions; other types report
/// 1.0 when correct and 0.0 otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradingResult {
    pub is_correct: bool,
    pub similarity: f64,
}

impl GradingResult {
    /// A degenerate 0/1 result for exact-match question types.
    pub fn exact(is_correct: bool) -> Self {
        Self {
            is_correct,
            similarity: if is_correct { 1.0 } else { 0.0 },
        }
    }

    /// Accept a similarity at an inclusive threshold.
    pub fn from_similarity(similarity: f64, threshold: f64) -> Self {
        Self {
            is_correct: similarity >= threshold,
            similarity,
        }
    }

    pub fn incorrect() -> Self {
        Self::exact(false)
    }
}

/// Where a text similarity came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeSource {
    /// The in-process matcher.
    Local,
    /// A remote similarity delegate.
    Delegate,
    /// Not auto-graded; waits for an instructor.
    ManualReview,
}

/// A submission together with its grade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradedSubmission {
    pub question_id: String,
    pub student: String,
    pub answer: String,
    pub question_type: QuestionType,
    pub result: GradingResult,
    pub source: GradeSource,
}

impl GradedSubmission {
    pub fn new(
        submission: &Submission,
        question_type: QuestionType,
        result: GradingResult,
        source: GradeSource,
    ) -> Self {
        Self {
            question_id: submission.question_id.clone(),
            student: submission.student.clone(),
            answer: submission.answer.clone(),
            question_type,
            result,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_results_are_degenerate() {
        assert_eq!(GradingResult::exact(true).similarity, 1.0);
        assert_eq!(GradingResult::exact(false).similarity, 0.0);
        assert!(!GradingResult::incorrect().is_correct);
    }

    #[test]
    fn threshold_is_inclusive() {
        assert!(GradingResult::from_similarity(0.7, 0.7).is_correct);
        assert!(!GradingResult::from_similarity(0.69, 0.7).is_correct);
    }

    #[test]
    fn serializes_snake_case_fields() {
        let json = serde_json::to_value(GradingResult::exact(true)).unwrap();
        assert_eq!(json["is_correct"], true);
        assert_eq!(json["similarity"], 1.0);
        assert_eq!(
            serde_json::to_string(&GradeSource::ManualReview).unwrap(),
            "\"manual_review\""
        );
    }
}
