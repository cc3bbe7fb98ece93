//! quizgrade-core: Answer grading engine, question model, and statistics.
//!
//! This crate defines the question data model, the tiered free-text matcher,
//! the per-question-type grading rules, and the aggregate statistics that the
//! rest of quizgrade builds on.

pub mod engine;
pub mod error;
pub mod model;
pub mod parser;
pub mod report;
pub mod results;
pub mod similarity;
pub mod statistics;
pub mod text;
pub mod traits;
pub mod translation;

pub use engine::{Grader, GraderConfig, GradingEngine};
pub use model::{Question, QuestionBank, QuestionType, Submission};
pub use results::GradingResult;
pub use text::TextMatcher;
pub use translation::TranslationTable;
