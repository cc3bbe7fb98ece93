//! The `quizgrade batch` command.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;

use quizgrade_core::engine::{Grader, ProgressReporter};
use quizgrade_core::error::DelegateError;
use quizgrade_core::model::Submission;
use quizgrade_core::parser;
use quizgrade_core::report::GradeReport;
use quizgrade_core::results::{GradeSource, GradedSubmission};
use quizgrade_core::traits::SimilarityDelegate;
use quizgrade_delegates::config::load_config_from;
use quizgrade_delegates::create_delegate;

/// Console progress reporter.
struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn on_graded(&self, graded: &GradedSubmission) {
        let verdict = match graded.source {
            GradeSource::ManualReview => "REVIEW",
            _ if graded.result.is_correct => "OK",
            _ => "WRONG",
        };
        let source = match graded.source {
            GradeSource::Local => "local",
            GradeSource::Delegate => "delegate",
            GradeSource::ManualReview => "manual",
        };
        eprintln!(
            "  Graded: {} :: {} [{}] {verdict} ({:.2}, {source})",
            graded.student, graded.question_id, graded.question_type, graded.result.similarity,
        );
    }

    fn on_delegate_fallback(&self, question_id: &str, error: &DelegateError) {
        eprintln!("  FALLBACK: {question_id}: {error}");
    }

    fn on_unknown_question(&self, submission: &Submission) {
        eprintln!(
            "  SKIPPED: {} :: unknown question '{}'",
            submission.student, submission.question_id
        );
    }

    fn on_batch_complete(&self, total: usize, graded: usize, skipped: usize, elapsed: Duration) {
        eprintln!(
            "\nComplete: {graded}/{total} graded, {skipped} skipped ({:.1}s)",
            elapsed.as_secs_f64()
        );
    }
}

pub async fn execute(
    bank_path: PathBuf,
    submissions_path: PathBuf,
    output: Option<PathBuf>,
    parallelism: Option<usize>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;

    let mut grader_config = config.grader_config();
    if let Some(parallelism) = parallelism {
        anyhow::ensure!(parallelism >= 1, "parallelism must be at least 1");
        grader_config.parallelism = parallelism;
    }
    let output = output.unwrap_or_else(|| config.output_dir.clone());

    let bank = parser::parse_bank(&bank_path)?;
    for w in parser::validate_bank(&bank) {
        let id = w.question_id.as_deref().unwrap_or("-");
        eprintln!("Warning: [{id}] {}", w.message);
    }
    let submissions = parser::parse_submissions(&submissions_path)?;

    let delegate: Option<Arc<dyn SimilarityDelegate>> = match &config.delegate {
        Some(delegate_config) => {
            let delegate = create_delegate(delegate_config, config.delegate_timeout_ms)?;
            tracing::info!("using similarity delegate '{}'", delegate.name());
            Some(Arc::from(delegate))
        }
        None => None,
    };

    let grader = Grader::new(Arc::new(config.engine()), delegate, grader_config);

    eprintln!(
        "quizgrade v{}: grading {} submissions against '{}' ({} questions)",
        env!("CARGO_PKG_VERSION"),
        submissions.len(),
        bank.name,
        bank.questions.len()
    );
    eprintln!();

    let start = Instant::now();
    let results = grader
        .grade_batch(&bank, &submissions, &ConsoleReporter)
        .await;
    let report = GradeReport::new(&bank, results, start.elapsed().as_millis() as u64);

    print_summary(&report);

    std::fs::create_dir_all(&output)?;
    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H%M%S");
    let path = output.join(format!("report-{}-{timestamp}.json", bank.id));
    report.save_json(&path)?;
    eprintln!("Results saved to: {}", path.display());

    Ok(())
}

fn print_summary(report: &GradeReport) {
    use comfy_table::{Cell, Table};

    let mut questions = Table::new();
    questions.set_header(vec![
        "Question",
        "Type",
        "Attempts",
        "Correct",
        "Review",
        "Pass %",
        "Mean sim.",
    ]);
    for (id, stats) in &report.stats.per_question {
        questions.add_row(vec![
            Cell::new(id),
            Cell::new(stats.question_type),
            Cell::new(stats.attempts),
            Cell::new(stats.correct),
            Cell::new(stats.pending_review),
            Cell::new(format!("{:.1}%", stats.pass_rate * 100.0)),
            Cell::new(
                stats
                    .mean_similarity
                    .map(|s| format!("{s:.2}"))
                    .unwrap_or_else(|| "-".to_string()),
            ),
        ]);
    }

    let mut students = Table::new();
    students.set_header(vec!["Student", "Answered", "Correct", "Review"]);
    for (student, score) in &report.stats.per_student {
        students.add_row(vec![
            Cell::new(student),
            Cell::new(score.answered),
            Cell::new(score.correct),
            Cell::new(score.pending_review),
        ]);
    }

    eprintln!("\n{questions}");
    eprintln!("\n{students}");
    eprintln!(
        "\nOverall: {}/{} correct ({:.1}% of auto-graded), {} pending review",
        report.stats.total_correct,
        report.stats.total_submissions,
        report.stats.overall_pass_rate * 100.0,
        report.stats.total_pending_review
    );
}
