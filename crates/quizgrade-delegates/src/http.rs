//! HTTP similarity delegate.
//!
//! Posts `{text1, text2, strictness}` to `{base_url}/similarity` and expects
//! `{"similarity": <f64>}` back.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;

use quizgrade_core::error::DelegateError;
use quizgrade_core::traits::{SimilarityDelegate, SimilarityRequest, SimilarityResponse};

pub const DEFAULT_TIMEOUT_MS: u64 = 3000;

/// Remote similarity service reached over HTTP.
pub struct HttpDelegate {
    base_url: String,
    api_key: Option<String>,
    timeout_ms: u64,
    client: reqwest::Client,
}

impl HttpDelegate {
    pub fn new(base_url: &str, api_key: Option<String>, timeout_ms: u64) -> anyhow::Result<Self> {
        anyhow::ensure!(
            !base_url.trim().is_empty(),
            "similarity delegate base_url is empty"
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            timeout_ms,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[derive(Deserialize)]
struct ApiResponse {
    similarity: Option<f64>,
    #[serde(default)]
    error: Option<String>,
}

#[async_trait]
impl SimilarityDelegate for HttpDelegate {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self, request), fields(base_url = %self.base_url))]
    async fn similarity(&self, request: &SimilarityRequest) -> anyhow::Result<SimilarityResponse> {
        let mut builder = self
            .client
            .post(format!("{}/similarity", self.base_url))
            .json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                DelegateError::Timeout(self.timeout_ms)
            } else if e.is_connect() {
                DelegateError::NetworkError(format!(
                    "similarity service not reachable at {}",
                    self.base_url
                ))
            } else {
                DelegateError::NetworkError(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status == 401 || status == 403 {
            let body = response.text().await.unwrap_or_default();
            return Err(DelegateError::AuthenticationFailed(body).into());
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(DelegateError::ApiError {
                status,
                message: body,
            }
            .into());
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| DelegateError::MalformedResponse(format!("invalid JSON: {e}")))?;

        let similarity = match (api_response.similarity, api_response.error) {
            (Some(similarity), _) => similarity,
            (None, Some(error)) => {
                return Err(DelegateError::ApiError {
                    status,
                    message: error,
                }
                .into())
            }
            (None, None) => {
                return Err(
                    DelegateError::MalformedResponse("missing 'similarity' field".into()).into(),
                )
            }
        };

        tracing::debug!(similarity, "delegate answered");
        Ok(SimilarityResponse { similarity })
    }
}
