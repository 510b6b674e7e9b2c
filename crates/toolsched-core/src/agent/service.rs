//! Agent service
//!
//! The request cycle shared by the HTTP host and the benchmark harness:
//! register the providers with the ranking oracle, then orchestrate one
//! agent run against the session. Registration happens at most once per
//! request and always before any search or log references the session id.

use std::sync::Arc;

use crate::config::AgentConfig;
use crate::logging::Logger;
use crate::mcp::ProviderSpec;
use crate::middleware::FallbackPolicy;
use crate::scheduler::{SchedulerApi, SchedulerClient};
use crate::tools::ToolRegistry;

use super::genai_runtime::GenaiRuntime;
use super::orchestrator::{AgentOrchestrator, ToolSource};
use super::runtime::ModelRuntime;

/// Answers one question per call, with scheduling on or off
pub struct AgentService {
    scheduler: Arc<dyn SchedulerApi>,
    runtime: Arc<dyn ModelRuntime>,
    provider_urls: Vec<String>,
    /// Pre-populated registry override (tests and embedded use)
    registry: Option<Arc<ToolRegistry>>,
    fallback: FallbackPolicy,
    search_limit: Option<usize>,
    search_score_threshold: Option<f64>,
    max_steps: usize,
    logger: Arc<dyn Logger>,
}

impl AgentService {
    /// Create a service from explicit collaborators
    pub fn new(
        scheduler: Arc<dyn SchedulerApi>,
        runtime: Arc<dyn ModelRuntime>,
        provider_urls: Vec<String>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            scheduler,
            runtime,
            provider_urls,
            registry: None,
            fallback: FallbackPolicy::default(),
            search_limit: None,
            search_score_threshold: None,
            max_steps: 50,
            logger,
        }
    }

    /// Create a production service from configuration
    pub fn from_config(config: &AgentConfig, logger: Arc<dyn Logger>) -> Self {
        let scheduler = Arc::new(SchedulerClient::new(
            config.scheduler_url.clone(),
            Arc::clone(&logger),
        ));
        let runtime = Arc::new(GenaiRuntime::new(&config.llm, Arc::clone(&logger)));

        let mut service = Self::new(
            scheduler,
            runtime,
            config.provider_urls.clone(),
            logger,
        );
        service.max_steps = config.max_steps;
        service.search_limit = config.search_limit;
        service.search_score_threshold = config.search_score_threshold;
        service
    }

    /// Use a pre-populated registry instead of connecting providers
    pub fn with_registry(mut self, registry: Arc<ToolRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Set the reasoning-step budget
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Set the fallback policy for failed rankings
    pub fn with_fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.fallback = fallback;
        self
    }

    /// Answer one question. `scheduling` toggles the selection middleware
    /// per request; everything else is identical between the two modes.
    pub async fn answer(&self, question: &str, scheduling: bool) -> String {
        self.logger.info(&format!(
            "[AgentService] Registering {} provider(s) with the oracle ({}scheduler)",
            self.provider_urls.len(),
            if scheduling { "" } else { "no " }
        ));

        let registration = match self.scheduler.register(&self.provider_urls).await {
            Ok(registration) => registration,
            Err(e) => {
                self.logger.error(&format!("[AgentService] {}", e));
                return "Error".to_string();
            }
        };

        let Some(session_id) = registration.registered_id else {
            // Distinct from an ordinary failed answer: the oracle answered
            // but declined to allocate a session, so scheduling is impossible.
            self.logger
                .error("[AgentService] Oracle returned no registration id");
            return "Error".to_string();
        };

        self.logger
            .info(&format!("[AgentService] Registration id: {}", session_id));

        let source = match &self.registry {
            Some(registry) => ToolSource::Registry(Arc::clone(registry)),
            None => ToolSource::Providers(
                registration
                    .urls
                    .iter()
                    .map(ProviderSpec::required)
                    .collect(),
            ),
        };

        let orchestrator = AgentOrchestrator::new(
            Arc::clone(&self.runtime),
            Arc::clone(&self.scheduler),
            Arc::clone(&self.logger),
        )
        .with_source(source)
        .with_session(session_id)
        .with_scheduling(scheduling)
        .with_fallback(self.fallback)
        .with_search_params(self.search_limit, self.search_score_threshold)
        .with_max_steps(self.max_steps);

        orchestrator.run(question).await.answer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::runtime::ScriptedRuntime;
    use crate::logging::NoOpLogger;
    use crate::mcp::{ProviderResult, ToolContent, ToolInvoker};
    use crate::scheduler::{
        RankedToolRef, RegisterResponse, SchedulerError, SchedulerResult,
    };
    use crate::types::{ToolCallOutcome, ToolDescriptor};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Oracle stub with call accounting and configurable register behavior
    struct AccountingScheduler {
        registered_id: Option<String>,
        register_fails: bool,
        registers: AtomicUsize,
        searches: AtomicUsize,
    }

    impl AccountingScheduler {
        fn healthy() -> Self {
            Self {
                registered_id: Some("batch-1".to_string()),
                register_fails: false,
                registers: AtomicUsize::new(0),
                searches: AtomicUsize::new(0),
            }
        }

        fn declining() -> Self {
            Self {
                registered_id: None,
                register_fails: false,
                registers: AtomicUsize::new(0),
                searches: AtomicUsize::new(0),
            }
        }

        fn unreachable() -> Self {
            Self {
                registered_id: None,
                register_fails: true,
                registers: AtomicUsize::new(0),
                searches: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SchedulerApi for AccountingScheduler {
        async fn register(&self, urls: &[String]) -> SchedulerResult<RegisterResponse> {
            self.registers.fetch_add(1, Ordering::SeqCst);
            if self.register_fails {
                return Err(SchedulerError::RegisterFailed("connection refused".into()));
            }
            Ok(RegisterResponse {
                message: "registered".to_string(),
                registered_id: self.registered_id.clone(),
                urls: urls.to_vec(),
            })
        }

        async fn search(
            &self,
            session_id: &str,
            _limit: Option<usize>,
            _score_threshold: Option<f64>,
        ) -> SchedulerResult<Vec<RankedToolRef>> {
            // Search must never run before register allocated this session
            assert_eq!(session_id, "batch-1");
            assert!(self.registers.load(Ordering::SeqCst) > 0);
            self.searches.fetch_add(1, Ordering::SeqCst);
            Ok(vec![RankedToolRef {
                mcp_url: "providerA".to_string(),
                name: "add-f".to_string(),
                description: String::new(),
                input_schema: None,
                score: None,
            }])
        }

        async fn log(&self, _outcome: &ToolCallOutcome) -> SchedulerResult<()> {
            Ok(())
        }
    }

    struct OkInvoker;

    #[async_trait]
    impl ToolInvoker for OkInvoker {
        async fn invoke(&self, _local_name: &str, _arguments: Value) -> ProviderResult<ToolContent> {
            Ok(ToolContent {
                text: "ok".to_string(),
                is_error: false,
            })
        }
    }

    fn registry() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new(Arc::new(NoOpLogger));
        registry
            .add_provider(
                vec![ToolDescriptor::new("providerA", "add-f", "Add")],
                Arc::new(OkInvoker),
            )
            .unwrap();
        Arc::new(registry)
    }

    fn service(scheduler: Arc<AccountingScheduler>, runtime: Arc<ScriptedRuntime>) -> AgentService {
        AgentService::new(
            scheduler,
            runtime,
            vec!["providerA".to_string()],
            Arc::new(NoOpLogger),
        )
        .with_registry(registry())
    }

    #[tokio::test]
    async fn test_answer_registers_once_then_searches() {
        let scheduler = Arc::new(AccountingScheduler::healthy());
        let runtime = Arc::new(ScriptedRuntime::answering("**4**"));
        let svc = service(Arc::clone(&scheduler), Arc::clone(&runtime));

        let answer = svc.answer("2+2?", true).await;
        assert_eq!(answer, "**4**");
        assert_eq!(scheduler.registers.load(Ordering::SeqCst), 1);
        assert!(scheduler.searches.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_null_registration_id_short_circuits() {
        let scheduler = Arc::new(AccountingScheduler::declining());
        let runtime = Arc::new(ScriptedRuntime::answering("should not run"));
        let svc = service(scheduler, Arc::clone(&runtime));

        let answer = svc.answer("2+2?", true).await;
        assert_eq!(answer, "Error");
        // The model runtime was never invoked
        assert_eq!(runtime.turns_taken(), 0);
    }

    #[tokio::test]
    async fn test_register_transport_failure_short_circuits() {
        let scheduler = Arc::new(AccountingScheduler::unreachable());
        let runtime = Arc::new(ScriptedRuntime::answering("should not run"));
        let svc = service(scheduler, Arc::clone(&runtime));

        let answer = svc.answer("2+2?", true).await;
        assert_eq!(answer, "Error");
        assert_eq!(runtime.turns_taken(), 0);
    }

    #[tokio::test]
    async fn test_scheduler_flag_disables_search() {
        let scheduler = Arc::new(AccountingScheduler::healthy());
        let runtime = Arc::new(ScriptedRuntime::answering("done"));
        let svc = service(Arc::clone(&scheduler), runtime);

        svc.answer("anything", false).await;
        assert_eq!(scheduler.registers.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.searches.load(Ordering::SeqCst), 0);
    }
}
