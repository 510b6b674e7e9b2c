//! Selection middleware
//!
//! Sits between the agent loop and everything remote. Before each model turn
//! it narrows the visible tool set using the ranking oracle; around each tool
//! invocation it measures the call and reports the outcome. Instrumentation
//! is transparent: the tool's result or error always comes back unchanged,
//! and a lost telemetry report can never fail the call it describes.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::logging::Logger;
use crate::mcp::{ProviderResult, ToolContent};
use crate::scheduler::{RankedToolRef, SchedulerApi, SchedulerError};
use crate::tools::{RegisteredTool, ToolRegistry};
use crate::types::ToolCallOutcome;

/// What to expose when the oracle yields no usable ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    /// Proceed with the full unfiltered registry (graceful degradation)
    #[default]
    FullToolset,
    /// Expose no tools at all (strict scheduling)
    NoTools,
}

/// Result of one ranking lookup, before the fallback policy is applied
#[derive(Debug)]
pub enum RankingOutcome {
    /// The oracle returned at least one ref that matched the registry
    Ranked(Vec<RegisteredTool>),
    /// The oracle answered, but nothing matched the registry
    Empty,
    /// The oracle could not be consulted this turn
    Unavailable(SchedulerError),
}

/// Per-request tool selection and call instrumentation
pub struct SelectionMiddleware {
    registry: Arc<ToolRegistry>,
    scheduler: Arc<dyn SchedulerApi>,
    session_id: Option<String>,
    enabled: bool,
    fallback: FallbackPolicy,
    limit: Option<usize>,
    score_threshold: Option<f64>,
    logger: Arc<dyn Logger>,
}

impl SelectionMiddleware {
    /// Create a middleware over a populated registry
    pub fn new(
        registry: Arc<ToolRegistry>,
        scheduler: Arc<dyn SchedulerApi>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            registry,
            scheduler,
            session_id: None,
            enabled: true,
            fallback: FallbackPolicy::default(),
            limit: None,
            score_threshold: None,
            logger,
        }
    }

    /// Set the oracle session id for ranked lookups
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Enable or disable scheduling for this request
    pub fn with_scheduling(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the fallback policy for failed or empty rankings
    pub fn with_fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.fallback = fallback;
        self
    }

    /// Tune the oracle search (result limit, minimum score)
    pub fn with_search_params(mut self, limit: Option<usize>, score_threshold: Option<f64>) -> Self {
        self.limit = limit;
        self.score_threshold = score_threshold;
        self
    }

    /// Whether scheduling is active for this request
    pub fn scheduling_enabled(&self) -> bool {
        self.enabled && self.session_id.is_some()
    }

    /// Compute the tool set visible to the model for the coming turn
    ///
    /// Re-consults the oracle on every call; rankings are never cached across
    /// turns because relevance may depend on conversation state the oracle
    /// tracks externally.
    pub async fn select_tools(&self) -> Vec<RegisteredTool> {
        let session_id = match (&self.session_id, self.enabled) {
            (Some(id), true) => id,
            _ => return self.registry.all(),
        };

        let outcome = match self
            .scheduler
            .search(session_id, self.limit, self.score_threshold)
            .await
        {
            Ok(refs) if refs.is_empty() => RankingOutcome::Empty,
            Ok(refs) => {
                let matched = self.match_refs(&refs);
                if matched.is_empty() {
                    RankingOutcome::Empty
                } else {
                    RankingOutcome::Ranked(matched)
                }
            }
            Err(e) => RankingOutcome::Unavailable(e),
        };

        match outcome {
            RankingOutcome::Ranked(tools) => {
                self.logger.debug(&format!(
                    "[SelectionMiddleware] Oracle narrowed toolset to {} of {}",
                    tools.len(),
                    self.registry.len()
                ));
                tools
            }
            RankingOutcome::Empty => {
                self.logger
                    .debug("[SelectionMiddleware] Oracle ranking empty; applying fallback");
                self.fall_back()
            }
            RankingOutcome::Unavailable(e) => {
                self.logger
                    .warn(&format!("[SelectionMiddleware] {}; applying fallback", e));
                self.fall_back()
            }
        }
    }

    /// Invoke a tool with timing and exactly one telemetry attempt
    ///
    /// The report task is spawned before the result is handed back, so the
    /// timing data reaches the oracle in causal order, but its completion is
    /// never awaited.
    pub async fn invoke_tool(
        &self,
        tool: &RegisteredTool,
        input: Value,
    ) -> ProviderResult<ToolContent> {
        let start = Instant::now();
        let result = tool.invoke(input).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let is_error = match &result {
            Ok(content) => content.is_error,
            Err(_) => true,
        };

        if self.enabled {
            self.report(ToolCallOutcome::record(tool.descriptor(), duration_ms, is_error));
        }

        if let Err(e) = &result {
            self.logger
                .warn(&format!("[SelectionMiddleware] Tool {} failed: {}", tool.id(), e));
        }

        result
    }

    /// Match ranked refs against the registry by (provider, local name),
    /// silently dropping refs that resolve to no registered tool
    fn match_refs(&self, refs: &[RankedToolRef]) -> Vec<RegisteredTool> {
        refs.iter()
            .filter_map(|r| {
                let tool = self.registry.find_by_origin(&r.mcp_url, &r.name);
                if tool.is_none() {
                    self.logger.debug(&format!(
                        "[SelectionMiddleware] Ranked ref {} from {} not in registry; dropped",
                        r.name, r.mcp_url
                    ));
                }
                tool.cloned()
            })
            .collect()
    }

    fn fall_back(&self) -> Vec<RegisteredTool> {
        match self.fallback {
            FallbackPolicy::FullToolset => self.registry.all(),
            FallbackPolicy::NoTools => Vec::new(),
        }
    }

    fn report(&self, outcome: ToolCallOutcome) {
        let scheduler = Arc::clone(&self.scheduler);
        let logger = Arc::clone(&self.logger);
        tokio::spawn(async move {
            if let Err(e) = scheduler.log(&outcome).await {
                logger.warn(&format!(
                    "[SelectionMiddleware] Telemetry dropped for {}: {}",
                    outcome.tool_id, e
                ));
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;
    use crate::mcp::{ProviderError, ToolInvoker};
    use crate::scheduler::{RegisterResponse, SchedulerResult};
    use crate::types::ToolDescriptor;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    const PROVIDER_URL: &str = "http://localhost:3005/mcp";

    /// Deterministic oracle stub: fixed search result, counters for every call
    struct StubScheduler {
        refs: Vec<RankedToolRef>,
        search_fails: bool,
        searches: AtomicUsize,
        logs: Mutex<Vec<ToolCallOutcome>>,
    }

    impl StubScheduler {
        fn returning(refs: Vec<RankedToolRef>) -> Self {
            Self {
                refs,
                search_fails: false,
                searches: AtomicUsize::new(0),
                logs: Mutex::new(Vec::new()),
            }
        }

        fn unreachable() -> Self {
            Self {
                refs: Vec::new(),
                search_fails: true,
                searches: AtomicUsize::new(0),
                logs: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SchedulerApi for StubScheduler {
        async fn register(&self, urls: &[String]) -> SchedulerResult<RegisterResponse> {
            Ok(RegisterResponse {
                message: "ok".to_string(),
                registered_id: Some("batch-1".to_string()),
                urls: urls.to_vec(),
            })
        }

        async fn search(
            &self,
            _session_id: &str,
            _limit: Option<usize>,
            _score_threshold: Option<f64>,
        ) -> SchedulerResult<Vec<RankedToolRef>> {
            self.searches.fetch_add(1, Ordering::SeqCst);
            if self.search_fails {
                return Err(SchedulerError::SearchFailed("connection refused".into()));
            }
            Ok(self.refs.clone())
        }

        async fn log(&self, outcome: &ToolCallOutcome) -> SchedulerResult<()> {
            self.logs.lock().unwrap().push(outcome.clone());
            Ok(())
        }
    }

    struct StubInvoker {
        fail: bool,
    }

    #[async_trait]
    impl ToolInvoker for StubInvoker {
        async fn invoke(&self, _local_name: &str, _arguments: Value) -> ProviderResult<ToolContent> {
            if self.fail {
                Err(ProviderError::ToolCallFailed("boom".into()))
            } else {
                Ok(ToolContent {
                    text: "4".to_string(),
                    is_error: false,
                })
            }
        }
    }

    fn registry(fail: bool) -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new(Arc::new(NoOpLogger));
        registry
            .add_provider(
                vec![
                    ToolDescriptor::new(PROVIDER_URL, "add-f", "Add"),
                    ToolDescriptor::new(PROVIDER_URL, "sub-f", "Subtract"),
                ],
                Arc::new(StubInvoker { fail }),
            )
            .unwrap();
        Arc::new(registry)
    }

    fn ranked(name: &str) -> RankedToolRef {
        RankedToolRef {
            mcp_url: PROVIDER_URL.to_string(),
            name: name.to_string(),
            description: String::new(),
            input_schema: None,
            score: Some(0.9),
        }
    }

    async fn settle() {
        // Let spawned telemetry tasks run
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn test_select_narrows_to_ranked_subset() {
        let scheduler = Arc::new(StubScheduler::returning(vec![ranked("add-f")]));
        let mw = SelectionMiddleware::new(registry(false), scheduler, Arc::new(NoOpLogger))
            .with_session("batch-1");

        let tools = mw.select_tools().await;
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].id(), "httplocalhost3005mcp__add-f");
    }

    #[tokio::test]
    async fn test_unknown_refs_are_dropped_not_synthesized() {
        let scheduler = Arc::new(StubScheduler::returning(vec![
            ranked("add-f"),
            RankedToolRef {
                mcp_url: "http://localhost:9999/mcp".to_string(),
                name: "phantom".to_string(),
                description: String::new(),
                input_schema: None,
                score: None,
            },
        ]));
        let mw = SelectionMiddleware::new(registry(false), scheduler, Arc::new(NoOpLogger))
            .with_session("batch-1");

        let tools = mw.select_tools().await;
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].id(), "httplocalhost3005mcp__add-f");
    }

    #[tokio::test]
    async fn test_search_failure_falls_back_to_full_toolset() {
        let scheduler = Arc::new(StubScheduler::unreachable());
        let mw = SelectionMiddleware::new(registry(false), scheduler, Arc::new(NoOpLogger))
            .with_session("batch-1");

        let tools = mw.select_tools().await;
        assert_eq!(tools.len(), 2);
    }

    #[tokio::test]
    async fn test_no_tools_fallback_policy() {
        let scheduler = Arc::new(StubScheduler::unreachable());
        let mw = SelectionMiddleware::new(registry(false), scheduler, Arc::new(NoOpLogger))
            .with_session("batch-1")
            .with_fallback(FallbackPolicy::NoTools);

        let tools = mw.select_tools().await;
        assert!(tools.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_scheduling_skips_the_oracle() {
        let scheduler = Arc::new(StubScheduler::returning(vec![ranked("add-f")]));
        let mw = SelectionMiddleware::new(
            registry(false),
            Arc::clone(&scheduler) as Arc<dyn SchedulerApi>,
            Arc::new(NoOpLogger),
        )
        .with_session("batch-1")
        .with_scheduling(false);

        let tools = mw.select_tools().await;
        assert_eq!(tools.len(), 2);
        assert_eq!(scheduler.searches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stable_ranking_yields_stable_selection() {
        let scheduler = Arc::new(StubScheduler::returning(vec![ranked("add-f")]));
        let mw = SelectionMiddleware::new(registry(false), scheduler, Arc::new(NoOpLogger))
            .with_session("batch-1");

        let first: Vec<String> = mw
            .select_tools()
            .await
            .iter()
            .map(|t| t.id().to_string())
            .collect();
        let second: Vec<String> = mw
            .select_tools()
            .await
            .iter()
            .map(|t| t.id().to_string())
            .collect();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_invoke_reports_exactly_once_and_is_transparent() {
        let scheduler = Arc::new(StubScheduler::returning(vec![]));
        let registry = registry(false);
        let mw = SelectionMiddleware::new(
            Arc::clone(&registry),
            Arc::clone(&scheduler) as Arc<dyn SchedulerApi>,
            Arc::new(NoOpLogger),
        )
        .with_session("batch-1");

        let tool = registry.get("httplocalhost3005mcp__add-f").unwrap().clone();
        let result = mw.invoke_tool(&tool, json!({"a": 2, "b": 2})).await.unwrap();
        assert_eq!(result.text, "4");
        assert!(!result.is_error);

        settle().await;
        let logs = scheduler.logs.lock().unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].local_name, "add-f");
        assert_eq!(logs[0].provider_url, PROVIDER_URL);
        assert!(!logs[0].is_error);
    }

    #[tokio::test]
    async fn test_invoke_reports_errors_and_propagates_them_unchanged() {
        let scheduler = Arc::new(StubScheduler::returning(vec![]));
        let registry = registry(true);
        let mw = SelectionMiddleware::new(
            Arc::clone(&registry),
            Arc::clone(&scheduler) as Arc<dyn SchedulerApi>,
            Arc::new(NoOpLogger),
        )
        .with_session("batch-1");

        let tool = registry.get("httplocalhost3005mcp__sub-f").unwrap().clone();
        let result = mw.invoke_tool(&tool, json!({})).await;
        assert!(matches!(result, Err(ProviderError::ToolCallFailed(_))));

        settle().await;
        let logs = scheduler.logs.lock().unwrap();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].is_error);
    }

    #[tokio::test]
    async fn test_unscheduled_invocations_are_not_reported() {
        let scheduler = Arc::new(StubScheduler::returning(vec![]));
        let registry = registry(false);
        let mw = SelectionMiddleware::new(
            Arc::clone(&registry),
            Arc::clone(&scheduler) as Arc<dyn SchedulerApi>,
            Arc::new(NoOpLogger),
        )
        .with_scheduling(false);

        let tool = registry.get("httplocalhost3005mcp__add-f").unwrap().clone();
        mw.invoke_tool(&tool, json!({})).await.unwrap();

        settle().await;
        assert!(scheduler.logs.lock().unwrap().is_empty());
    }
}
