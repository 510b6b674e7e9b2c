//! HTTP client for the ranking oracle
//!
//! Three operations: register a batch of provider URLs, search the ranked
//! tool subset for a session, and report per-call telemetry. Every operation
//! is a single attempt; the caller decides what a failure means
//! (register: abort, search: fall back, log: drop).

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::logging::Logger;
use crate::types::ToolCallOutcome;

use super::types::{LogRequest, RankedToolRef, RegisterRequest, RegisterResponse};

/// Ranking-oracle errors, one variant per operation
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// Registration did not produce a usable session. Non-fatal for the
    /// process, but scheduling is impossible for this request.
    #[error("Oracle register failed: {0}")]
    RegisterFailed(String),

    /// Ranked search failed for this turn; the middleware falls back.
    #[error("Oracle search failed: {0}")]
    SearchFailed(String),

    /// Telemetry report was dropped; diagnostic only.
    #[error("Oracle log failed: {0}")]
    LogFailed(String),
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Seam for the three oracle operations
///
/// `SchedulerClient` is the HTTP implementation; tests substitute
/// deterministic stubs.
#[async_trait]
pub trait SchedulerApi: Send + Sync {
    /// Register a batch of provider URLs, yielding a session id
    async fn register(&self, provider_urls: &[String]) -> SchedulerResult<RegisterResponse>;

    /// Fetch the ranked tool subset for a session. Called anew every model
    /// turn; results must not be cached across turns.
    async fn search(
        &self,
        session_id: &str,
        limit: Option<usize>,
        score_threshold: Option<f64>,
    ) -> SchedulerResult<Vec<RankedToolRef>>;

    /// Report one tool-call outcome. Single attempt, response ignored.
    async fn log(&self, outcome: &ToolCallOutcome) -> SchedulerResult<()>;
}

/// HTTP implementation of the oracle protocol
pub struct SchedulerClient {
    base_url: String,
    http: reqwest::Client,
    logger: Arc<dyn Logger>,
}

impl SchedulerClient {
    /// Create a client for the oracle at `base_url`
    pub fn new(base_url: impl Into<String>, logger: Arc<dyn Logger>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
            logger,
        }
    }

    /// The oracle base URL this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl SchedulerApi for SchedulerClient {
    async fn register(&self, provider_urls: &[String]) -> SchedulerResult<RegisterResponse> {
        let body = RegisterRequest {
            mcp_urls: provider_urls.to_vec(),
        };

        let response = self
            .http
            .post(format!("{}/register", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| SchedulerError::RegisterFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SchedulerError::RegisterFailed(format!(
                "status {}",
                response.status()
            )));
        }

        let parsed: RegisterResponse = response
            .json()
            .await
            .map_err(|e| SchedulerError::RegisterFailed(e.to_string()))?;

        self.logger.info(&format!(
            "[SchedulerClient] Registered {} provider(s): {}",
            provider_urls.len(),
            parsed.message
        ));

        Ok(parsed)
    }

    async fn search(
        &self,
        session_id: &str,
        limit: Option<usize>,
        score_threshold: Option<f64>,
    ) -> SchedulerResult<Vec<RankedToolRef>> {
        let mut query: Vec<(&str, String)> = vec![("batch_id", session_id.to_string())];
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(threshold) = score_threshold {
            query.push(("score_threshold", threshold.to_string()));
        }

        let response = self
            .http
            .get(format!("{}/search", self.base_url))
            .query(&query)
            .send()
            .await
            .map_err(|e| SchedulerError::SearchFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SchedulerError::SearchFailed(format!(
                "status {}",
                response.status()
            )));
        }

        let refs: Vec<RankedToolRef> = response
            .json()
            .await
            .map_err(|e| SchedulerError::SearchFailed(e.to_string()))?;

        self.logger.debug(&format!(
            "[SchedulerClient] Search returned {} ranked tool(s)",
            refs.len()
        ));

        Ok(refs)
    }

    async fn log(&self, outcome: &ToolCallOutcome) -> SchedulerResult<()> {
        // Direct field reads; the id is never parsed back apart.
        let body = LogRequest {
            mcp_url: outcome.provider_url.clone(),
            tool_name: outcome.local_name.clone(),
            total_time_ms: outcome.duration_ms,
            is_error: outcome.is_error,
        };

        let response = self
            .http
            .post(format!("{}/log", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| SchedulerError::LogFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SchedulerError::LogFailed(format!(
                "status {}",
                response.status()
            )));
        }

        // Response body mirrors the register response; nothing in it matters here.
        self.logger.debug(&format!(
            "[SchedulerClient] Logged call of {} from {}",
            outcome.local_name, outcome.provider_url
        ));

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;

    #[test]
    fn test_client_keeps_base_url() {
        let client = SchedulerClient::new("http://localhost:4000", Arc::new(NoOpLogger));
        assert_eq!(client.base_url(), "http://localhost:4000");
    }

    #[test]
    fn test_error_variants_name_the_operation() {
        assert!(SchedulerError::RegisterFailed("x".into())
            .to_string()
            .contains("register"));
        assert!(SchedulerError::SearchFailed("x".into())
            .to_string()
            .contains("search"));
        assert!(SchedulerError::LogFailed("x".into())
            .to_string()
            .contains("log"));
    }
}
