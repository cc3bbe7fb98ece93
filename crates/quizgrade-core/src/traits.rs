//! Trait definition for remote similarity delegates.
//!
//! Implemented by the `quizgrade-delegates` crate. A delegate is an optional
//! service consulted before the local text matcher; the grader always falls
//! back to the local matcher when it fails.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A remote similarity service.
#[async_trait]
pub trait SimilarityDelegate: Send + Sync {
    /// Human-readable delegate name (e.g. "http").
    fn name(&self) -> &str;

    /// Compare two texts.
    async fn similarity(&self, request: &SimilarityRequest) -> anyhow::Result<SimilarityResponse>;
}

/// Request body sent to a similarity delegate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityRequest {
    /// The student's answer.
    pub text1: String,
    /// The correct answer.
    pub text2: String,
    /// How strict the delegate should be; the question's threshold.
    pub strictness: f64,
}

/// Response from a similarity delegate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResponse {
    pub similarity: f64,
}

impl SimilarityResponse {
    /// A usable similarity is finite and within `[0, 1]`.
    pub fn is_valid(&self) -> bool {
        self.similarity.is_finite() && (0.0..=1.0).contains(&self.similarity)
    }
}
