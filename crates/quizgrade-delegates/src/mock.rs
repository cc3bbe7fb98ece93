//! Mock delegate for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use quizgrade_core::error::DelegateError;
use quizgrade_core::traits::{SimilarityDelegate, SimilarityRequest, SimilarityResponse};

/// A mock similarity delegate for exercising the grader without a network.
///
/// Returns configurable similarities keyed by the student's answer.
pub struct MockDelegate {
    /// Map of student answer → similarity.
    responses: HashMap<String, f64>,
    /// Similarity for answers not in the map; `None` makes the call fail.
    default_similarity: Option<f64>,
    /// Number of calls made.
    call_count: AtomicU32,
    /// Last request received.
    last_request: Mutex<Option<SimilarityRequest>>,
}

impl MockDelegate {
    /// Create a mock with answer → similarity mappings, failing on anything else.
    pub fn new(responses: HashMap<String, f64>) -> Self {
        Self {
            responses,
            default_similarity: None,
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Create a mock that always returns the same similarity.
    pub fn with_fixed_similarity(similarity: f64) -> Self {
        Self {
            responses: HashMap::new(),
            default_similarity: Some(similarity),
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Create a mock whose every call fails with a network error.
    pub fn failing() -> Self {
        Self::new(HashMap::new())
    }

    /// Get the number of calls made to this delegate.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Get the last request made to this delegate.
    pub fn last_request(&self) -> Option<SimilarityRequest> {
        self.last_request
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl SimilarityDelegate for MockDelegate {
    fn name(&self) -> &str {
        "mock"
    }

    async fn similarity(&self, request: &SimilarityRequest) -> anyhow::Result<SimilarityResponse> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }

        let similarity = self
            .responses
            .get(&request.text1)
            .copied()
            .or(self.default_similarity)
            .ok_or_else(|| DelegateError::NetworkError("mock delegate unavailable".into()))?;

        Ok(SimilarityResponse { similarity })
    }
}
