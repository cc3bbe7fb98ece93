//! Grading engine and batch grader.
//!
//! [`GradingEngine`] is the synchronous, side-effect free entry point that
//! dispatches on question type. [`Grader`] wraps it for async callers: it
//! can consult a remote [`SimilarityDelegate`] first (bounded by a timeout,
//! always falling back to the local matcher) and grades whole batches with
//! bounded parallelism.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;

use crate::error::DelegateError;
use crate::model::{Question, QuestionBank, QuestionType, Submission};
use crate::results::{GradeSource, GradedSubmission, GradingResult};
use crate::similarity::normalize;
use crate::text::{plain_lexical, TextMatcher};
use crate::traits::{SimilarityDelegate, SimilarityRequest};

/// Split a comma-joined checkbox answer into trimmed, non-empty options.
pub fn split_selection(s: &str) -> Vec<&str> {
    s.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .collect()
}

/// The synchronous grading engine.
#[derive(Debug, Clone, Default)]
pub struct GradingEngine {
    matcher: TextMatcher,
}

impl GradingEngine {
    pub fn new(matcher: TextMatcher) -> Self {
        Self { matcher }
    }

    pub fn matcher(&self) -> &TextMatcher {
        &self.matcher
    }

    /// Grade a submission using the question's own type.
    pub fn grade(&self, question: &Question, submitted: &str) -> GradingResult {
        self.evaluate(question.question_type, submitted, question)
    }

    /// Grade `submitted` as an answer of type `question_type` to `question`.
    pub fn evaluate(
        &self,
        question_type: QuestionType,
        submitted: &str,
        question: &Question,
    ) -> GradingResult {
        match question_type {
            QuestionType::Rating => grade_rating(submitted, &question.correct_answer),
            QuestionType::MultipleChoice => {
                grade_multiple_choice(submitted, &question.correct_answer)
            }
            QuestionType::Checkbox => grade_checkbox(submitted, &question.correct_answer),
            QuestionType::Grid => GradingResult::incorrect(),
            QuestionType::Text => self.grade_text(submitted, question),
        }
    }

    fn grade_text(&self, submitted: &str, question: &Question) -> GradingResult {
        if normalize(submitted).is_empty() {
            return GradingResult::incorrect();
        }
        let similarity = if question.semantic_matching {
            self.matcher.similarity(submitted, &question.correct_answer)
        } else {
            plain_lexical(submitted, &question.correct_answer)
        };
        GradingResult::from_similarity(similarity, question.similarity_threshold)
    }
}

fn grade_rating(submitted: &str, correct: &str) -> GradingResult {
    let submitted = submitted.trim().parse::<i64>();
    let correct = correct.trim().parse::<i64>();
    match (submitted, correct) {
        (Ok(s), Ok(c)) => GradingResult::exact(s == c),
        _ => GradingResult::incorrect(),
    }
}

fn grade_multiple_choice(submitted: &str, correct: &str) -> GradingResult {
    GradingResult::exact(!submitted.trim().is_empty() && submitted == correct)
}

fn grade_checkbox(submitted: &str, correct: &str) -> GradingResult {
    let submitted = split_selection(submitted);
    let correct = split_selection(correct);
    if submitted.is_empty() {
        return GradingResult::incorrect();
    }

    let submitted_set: HashSet<&str> = submitted.iter().copied().collect();
    let correct_set: HashSet<&str> = correct.iter().copied().collect();
    GradingResult::exact(submitted_set == correct_set && submitted.len() == correct.len())
}

// ---------------------------------------------------------------------------
// Async grader
// ---------------------------------------------------------------------------

/// Configuration for the async grader.
#[derive(Debug, Clone)]
pub struct GraderConfig {
    /// Maximum concurrent gradings in a batch.
    pub parallelism: usize,
    /// Upper bound on a single delegate call.
    pub delegate_timeout: Duration,
}

impl Default for GraderConfig {
    fn default() -> Self {
        Self {
            parallelism: 4,
            delegate_timeout: Duration::from_millis(3000),
        }
    }
}

/// Progress reporting trait.
pub trait ProgressReporter: Send + Sync {
    fn on_graded(&self, graded: &GradedSubmission);
    fn on_delegate_fallback(&self, question_id: &str, error: &DelegateError);
    fn on_unknown_question(&self, submission: &Submission);
    fn on_batch_complete(&self, total: usize, graded: usize, skipped: usize, elapsed: Duration);
}

/// No-op progress reporter.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_graded(&self, _: &GradedSubmission) {}
    fn on_delegate_fallback(&self, _: &str, _: &DelegateError) {}
    fn on_unknown_question(&self, _: &Submission) {}
    fn on_batch_complete(&self, _: usize, _: usize, _: usize, _: Duration) {}
}

/// Async grader with an optional remote delegate.
pub struct Grader {
    engine: Arc<GradingEngine>,
    delegate: Option<Arc<dyn SimilarityDelegate>>,
    config: GraderConfig,
    /// Set once the delegate fails permanently; later answers go straight to
    /// the local matcher.
    delegate_disabled: AtomicBool,
}

impl Grader {
    pub fn new(
        engine: Arc<GradingEngine>,
        delegate: Option<Arc<dyn SimilarityDelegate>>,
        config: GraderConfig,
    ) -> Self {
        Self {
            engine,
            delegate,
            config,
            delegate_disabled: AtomicBool::new(false),
        }
    }

    /// A grader that only uses the local engine.
    pub fn local(engine: GradingEngine) -> Self {
        Self::new(Arc::new(engine), None, GraderConfig::default())
    }

    pub fn engine(&self) -> &GradingEngine {
        &self.engine
    }

    /// Grade one answer, consulting the delegate for semantic text questions.
    pub async fn grade(&self, question: &Question, submitted: &str) -> GradingResult {
        self.grade_with_source(question, submitted, &NoopReporter)
            .await
            .0
    }

    async fn grade_with_source(
        &self,
        question: &Question,
        submitted: &str,
        progress: &dyn ProgressReporter,
    ) -> (GradingResult, GradeSource) {
        match question.question_type {
            QuestionType::Grid => return (GradingResult::incorrect(), GradeSource::ManualReview),
            QuestionType::Text if question.semantic_matching => {}
            _ => return (self.engine.grade(question, submitted), GradeSource::Local),
        }

        let delegate = self
            .delegate
            .as_ref()
            .filter(|_| !self.delegate_disabled.load(Ordering::Relaxed));
        let Some(delegate) = delegate else {
            return (self.engine.grade(question, submitted), GradeSource::Local);
        };
        if normalize(submitted).is_empty() {
            return (GradingResult::incorrect(), GradeSource::Local);
        }

        match self.consult(delegate.as_ref(), question, submitted).await {
            Ok(similarity) => (
                GradingResult::from_similarity(similarity, question.similarity_threshold),
                GradeSource::Delegate,
            ),
            Err(e) => {
                if e.is_permanent() {
                    tracing::error!(
                        "similarity delegate '{}' failed permanently, grading locally from now on: {e}",
                        delegate.name()
                    );
                    self.delegate_disabled.store(true, Ordering::Relaxed);
                } else {
                    tracing::warn!(
                        "similarity delegate '{}' failed for question {}, using local matcher: {e}",
                        delegate.name(),
                        question.id
                    );
                }
                progress.on_delegate_fallback(&question.id, &e);
                (self.engine.grade(question, submitted), GradeSource::Local)
            }
        }
    }

    async fn consult(
        &self,
        delegate: &dyn SimilarityDelegate,
        question: &Question,
        submitted: &str,
    ) -> Result<f64, DelegateError> {
        let request = SimilarityRequest {
            text1: submitted.to_string(),
            text2: question.correct_answer.clone(),
            strictness: question.similarity_threshold,
        };

        let timeout = self.config.delegate_timeout;
        let response = match tokio::time::timeout(timeout, delegate.similarity(&request)).await {
            Err(_) => return Err(DelegateError::Timeout(timeout.as_millis() as u64)),
            Ok(Err(e)) => {
                return Err(match e.downcast::<DelegateError>() {
                    Ok(delegate_error) => delegate_error,
                    Err(other) => DelegateError::NetworkError(format!("{other:#}")),
                })
            }
            Ok(Ok(response)) => response,
        };

        if !response.is_valid() {
            return Err(DelegateError::MalformedResponse(format!(
                "similarity {} outside [0, 1]",
                response.similarity
            )));
        }
        Ok(response.similarity)
    }

    /// Grade every submission against its question in `bank`.
    ///
    /// Submissions naming an unknown question are reported and skipped.
    /// Results are sorted by question id, then student.
    pub async fn grade_batch(
        &self,
        bank: &QuestionBank,
        submissions: &[Submission],
        progress: &dyn ProgressReporter,
    ) -> Vec<GradedSubmission> {
        let start = Instant::now();
        let semaphore = Semaphore::new(self.config.parallelism.max(1));
        let mut skipped = 0usize;

        let mut futures = FuturesUnordered::new();
        for submission in submissions {
            let Some(question) = bank.question(&submission.question_id) else {
                tracing::warn!(
                    "submission from '{}' names unknown question '{}', skipping",
                    submission.student,
                    submission.question_id
                );
                progress.on_unknown_question(submission);
                skipped += 1;
                continue;
            };

            let semaphore = &semaphore;
            futures.push(async move {
                let _permit = semaphore.acquire().await.ok();
                let (result, source) = self
                    .grade_with_source(question, &submission.answer, progress)
                    .await;
                GradedSubmission::new(submission, question.question_type, result, source)
            });
        }

        let mut graded = Vec::with_capacity(futures.len());
        while let Some(result) = futures.next().await {
            progress.on_graded(&result);
            graded.push(result);
        }

        progress.on_batch_complete(submissions.len(), graded.len(), skipped, start.elapsed());

        graded.sort_by(|a, b| {
            a.question_id
                .cmp(&b.question_id)
                .then_with(|| a.student.cmp(&b.student))
        });
        graded
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::traits::SimilarityResponse;

    fn question(question_type: QuestionType, correct: &str) -> Question {
        question_as("q", question_type, correct)
    }

    fn question_as(id: &str, question_type: QuestionType, correct: &str) -> Question {
        Question::text(id, "?", correct).with_type(question_type)
    }

    // --- sync engine ---

    #[test]
    fn rating_exact_value() {
        let engine = GradingEngine::default();
        let q = question(QuestionType::Rating, "4");
        assert_eq!(engine.grade(&q, "4"), GradingResult::exact(true));
        assert_eq!(engine.grade(&q, " 4 "), GradingResult::exact(true));
        assert!(!engine.grade(&q, "5").is_correct);
    }

    #[test]
    fn rating_malformed_input_is_incorrect() {
        let engine = GradingEngine::default();
        let q = question(QuestionType::Rating, "4");
        assert!(!engine.grade(&q, "four").is_correct);
        assert!(!engine.grade(&q, "").is_correct);
        assert!(!engine.grade(&q, "4.0").is_correct);

        let broken_key = question(QuestionType::Rating, "n/a");
        assert!(!engine.grade(&broken_key, "n/a").is_correct);
    }

    #[test]
    fn multiple_choice_is_case_sensitive() {
        let engine = GradingEngine::default();
        let q = question(QuestionType::MultipleChoice, "Option B");
        assert!(engine.grade(&q, "Option B").is_correct);
        assert!(!engine.grade(&q, "option b").is_correct);
        assert!(!engine.grade(&q, "Option A").is_correct);
    }

    #[test]
    fn multiple_choice_empty_is_incorrect() {
        let engine = GradingEngine::default();
        let q = question(QuestionType::MultipleChoice, "");
        assert!(!engine.grade(&q, "").is_correct);
    }

    #[test]
    fn checkbox_set_equality() {
        let engine = GradingEngine::default();
        let q = question(QuestionType::Checkbox, "A,B,C");
        assert!(engine.grade(&q, "B,A,C").is_correct);
        assert!(engine.grade(&q, "C, B , A").is_correct);
        assert!(!engine.grade(&q, "A,B").is_correct);
        assert!(!engine.grade(&q, "A,B,C,A").is_correct);
        assert!(!engine.grade(&q, "A,B,D").is_correct);
        assert!(!engine.grade(&q, "").is_correct);
        assert!(!engine.grade(&q, " , ").is_correct);
    }

    #[test]
    fn grid_is_never_auto_graded() {
        let engine = GradingEngine::default();
        let q = question(QuestionType::Grid, r#"{"Row 1":"Col 1"}"#);
        let result = engine.grade(&q, r#"{"Row 1":"Col 1"}"#);
        assert!(!result.is_correct);
        assert_eq!(result.similarity, 0.0);
    }

    #[test]
    fn text_uses_threshold() {
        let engine = GradingEngine::default();
        let q = question(QuestionType::Text, "The capital of Spain is Madrid");
        let result = engine.grade(&q, "Madrid");
        assert_eq!(result.similarity, 0.9);
        assert!(result.is_correct);

        let strict = q.clone().with_threshold(0.95);
        assert!(!engine.grade(&strict, "Madrid").is_correct);
    }

    #[test]
    fn empty_text_answer_is_incorrect_at_zero_threshold() {
        let engine = GradingEngine::default();
        let q = question(QuestionType::Text, "Stockholm").with_threshold(0.0);
        assert_eq!(engine.grade(&q, "   "), GradingResult::incorrect());
        assert_eq!(engine.grade(&q, ""), GradingResult::incorrect());

        let lexical = q.clone().with_semantic_matching(false);
        assert_eq!(engine.grade(&lexical, ""), GradingResult::incorrect());
        assert_eq!(engine.grade(&lexical, "\t"), GradingResult::incorrect());

        // A non-empty unrelated answer still clears a zero threshold.
        assert!(engine.grade(&lexical, "xyz").is_correct);
    }

    #[test]
    fn text_without_semantic_matching_is_lexical() {
        let engine = GradingEngine::default();
        let q = question(QuestionType::Text, "Helsinki").with_semantic_matching(false);
        assert!(!engine.grade(&q, "Helsingfors").is_correct);
        assert!(engine.grade(&q, "helsinki").is_correct);
    }

    #[test]
    fn explicit_type_overrides_question_type() {
        let engine = GradingEngine::default();
        let q = question(QuestionType::Rating, "Stockholm");
        let result = engine.evaluate(QuestionType::Text, "stockholm", &q);
        assert!(result.is_correct);
        assert_eq!(result.similarity, 1.0);
    }

    #[test]
    fn evaluate_is_idempotent() {
        let engine = GradingEngine::default();
        let q = question(QuestionType::Text, "Stockholm");
        let first = engine.evaluate(QuestionType::Text, "Stokholm", &q);
        let second = engine.evaluate(QuestionType::Text, "Stokholm", &q);
        assert_eq!(first, second);
    }

    // --- async grader ---

    enum Behaviour {
        Fixed(f64),
        Fail,
        Unauthorized,
        Hang,
    }

    struct StubDelegate {
        behaviour: Behaviour,
        calls: AtomicUsize,
    }

    impl StubDelegate {
        fn new(behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                behaviour,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl SimilarityDelegate for StubDelegate {
        fn name(&self) -> &str {
            "stub"
        }

        async fn similarity(
            &self,
            _request: &SimilarityRequest,
        ) -> anyhow::Result<SimilarityResponse> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            match self.behaviour {
                Behaviour::Fixed(similarity) => Ok(SimilarityResponse { similarity }),
                Behaviour::Fail => Err(DelegateError::ApiError {
                    status: 500,
                    message: "boom".into(),
                }
                .into()),
                Behaviour::Unauthorized => {
                    Err(DelegateError::AuthenticationFailed("invalid key".into()).into())
                }
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(SimilarityResponse { similarity: 1.0 })
                }
            }
        }
    }

    #[derive(Default)]
    struct RecordingReporter {
        fallbacks: Mutex<Vec<String>>,
        unknown: AtomicUsize,
        graded: AtomicUsize,
    }

    impl ProgressReporter for RecordingReporter {
        fn on_graded(&self, _: &GradedSubmission) {
            self.graded.fetch_add(1, Ordering::Relaxed);
        }
        fn on_delegate_fallback(&self, _: &str, error: &DelegateError) {
            self.fallbacks.lock().unwrap().push(error.to_string());
        }
        fn on_unknown_question(&self, _: &Submission) {
            self.unknown.fetch_add(1, Ordering::Relaxed);
        }
        fn on_batch_complete(&self, _: usize, _: usize, _: usize, _: Duration) {}
    }

    fn grader_with(delegate: Arc<StubDelegate>, timeout: Duration) -> Grader {
        Grader::new(
            Arc::new(GradingEngine::default()),
            Some(delegate as Arc<dyn SimilarityDelegate>),
            GraderConfig {
                parallelism: 2,
                delegate_timeout: timeout,
            },
        )
    }

    #[tokio::test]
    async fn delegate_similarity_is_used() {
        let stub = StubDelegate::new(Behaviour::Fixed(0.75));
        let grader = grader_with(stub.clone(), Duration::from_secs(1));
        let q = question(QuestionType::Text, "Stockholm");

        let (result, source) = grader
            .grade_with_source(&q, "something else", &NoopReporter)
            .await;
        assert_eq!(result.similarity, 0.75);
        assert!(result.is_correct);
        assert_eq!(source, GradeSource::Delegate);
        assert_eq!(stub.calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn delegate_error_falls_back_to_local() {
        let stub = StubDelegate::new(Behaviour::Fail);
        let grader = grader_with(stub, Duration::from_secs(1));
        let q = question(QuestionType::Text, "Stockholm");
        let reporter = RecordingReporter::default();

        let (result, source) = grader.grade_with_source(&q, "Stokholm", &reporter).await;
        assert_eq!(source, GradeSource::Local);
        assert_eq!(result.similarity, 0.85);
        assert!(result.is_correct);
        let fallbacks = reporter.fallbacks.lock().unwrap();
        assert_eq!(fallbacks.len(), 1);
        assert!(fallbacks[0].contains("HTTP 500"));
    }

    #[tokio::test]
    async fn authentication_failure_disables_delegate() {
        let stub = StubDelegate::new(Behaviour::Unauthorized);
        let grader = grader_with(stub.clone(), Duration::from_secs(1));
        let q = question(QuestionType::Text, "Stockholm");
        let reporter = RecordingReporter::default();

        for answer in ["Stokholm", "Stockholm", "Oslo"] {
            let (_, source) = grader.grade_with_source(&q, answer, &reporter).await;
            assert_eq!(source, GradeSource::Local);
        }
        assert_eq!(stub.calls.load(Ordering::Relaxed), 1);
        assert_eq!(reporter.fallbacks.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn transient_failures_keep_consulting_delegate() {
        let stub = StubDelegate::new(Behaviour::Fail);
        let grader = grader_with(stub.clone(), Duration::from_secs(1));
        let q = question(QuestionType::Text, "Stockholm");

        grader.grade(&q, "Stokholm").await;
        grader.grade(&q, "Oslo").await;
        assert_eq!(stub.calls.load(Ordering::Relaxed), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn delegate_timeout_falls_back_to_local() {
        let stub = StubDelegate::new(Behaviour::Hang);
        let grader = grader_with(stub, Duration::from_millis(50));
        let q = question(QuestionType::Text, "Stockholm");
        let reporter = RecordingReporter::default();

        let (result, source) = grader.grade_with_source(&q, "Stockholm", &reporter).await;
        assert_eq!(source, GradeSource::Local);
        assert!(result.is_correct);
        assert!(reporter.fallbacks.lock().unwrap()[0].contains("timed out"));
    }

    #[tokio::test]
    async fn malformed_delegate_similarity_falls_back() {
        let stub = StubDelegate::new(Behaviour::Fixed(f64::NAN));
        let grader = grader_with(stub, Duration::from_secs(1));
        let q = question(QuestionType::Text, "Stockholm");

        let (result, source) = grader
            .grade_with_source(&q, "Stockholm", &NoopReporter)
            .await;
        assert_eq!(source, GradeSource::Local);
        assert_eq!(result.similarity, 1.0);
    }

    #[tokio::test]
    async fn delegate_skipped_for_non_text_and_empty_answers() {
        let stub = StubDelegate::new(Behaviour::Fixed(1.0));
        let grader = grader_with(stub.clone(), Duration::from_secs(1));

        let rating = question(QuestionType::Rating, "3");
        assert!(grader.grade(&rating, "3").await.is_correct);

        let lexical_only = question(QuestionType::Text, "Stockholm").with_semantic_matching(false);
        assert!(!grader.grade(&lexical_only, "Oslo").await.is_correct);

        let text = question(QuestionType::Text, "Stockholm");
        assert!(!grader.grade(&text, "   ").await.is_correct);

        assert_eq!(stub.calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn batch_grades_known_and_skips_unknown() {
        let bank = QuestionBank {
            id: "geo".into(),
            name: "Geography".into(),
            description: String::new(),
            questions: vec![
                Question::text("capital", "Capital of Finland?", "Helsinki"),
                question_as("cities", QuestionType::Checkbox, "Oslo,Bergen"),
                question_as("match", QuestionType::Grid, "{}"),
            ],
        };
        let submissions = vec![
            Submission {
                question_id: "capital".into(),
                student: "bob".into(),
                answer: "Helsingfors".into(),
            },
            Submission {
                question_id: "capital".into(),
                student: "alice".into(),
                answer: "Turku".into(),
            },
            Submission {
                question_id: "cities".into(),
                student: "alice".into(),
                answer: "Bergen,Oslo".into(),
            },
            Submission {
                question_id: "match".into(),
                student: "alice".into(),
                answer: "{}".into(),
            },
            Submission {
                question_id: "missing".into(),
                student: "carol".into(),
                answer: "x".into(),
            },
        ];

        let grader = Grader::local(GradingEngine::default());
        let reporter = RecordingReporter::default();
        let graded = grader.grade_batch(&bank, &submissions, &reporter).await;

        assert_eq!(graded.len(), 4);
        assert_eq!(reporter.unknown.load(Ordering::Relaxed), 1);
        assert_eq!(reporter.graded.load(Ordering::Relaxed), 4);

        let keys: Vec<(&str, &str)> = graded
            .iter()
            .map(|g| (g.question_id.as_str(), g.student.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("capital", "alice"),
                ("capital", "bob"),
                ("cities", "alice"),
                ("match", "alice"),
            ]
        );
        assert!(!graded[0].result.is_correct);
        assert!(graded[1].result.is_correct);
        assert!(graded[2].result.is_correct);
        assert_eq!(graded[3].source, GradeSource::ManualReview);
    }
}
