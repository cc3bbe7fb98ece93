//! quizgrade-delegates: Remote similarity delegates and configuration.
//!
//! Implements the `SimilarityDelegate` trait over HTTP (plus an offline mock)
//! and loads the `quizgrade.toml` configuration that wires a delegate and a
//! translation table into the grader.

pub mod config;
pub mod http;
pub mod mock;

pub use config::{create_delegate, load_config, DelegateConfig, QuizgradeConfig};
pub use http::HttpDelegate;
pub use mock::MockDelegate;
pub use quizgrade_core::error::DelegateError;
