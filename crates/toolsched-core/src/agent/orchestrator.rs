//! Agent orchestrator
//!
//! One request/response cycle: connect providers, register tools, loop model
//! turns and tool calls under a step budget, and map every failure to a
//! textual answer. `run` is infallible at the type level; nothing escapes to
//! the caller.

use std::sync::Arc;

use crate::logging::Logger;
use crate::mcp::ProviderSpec;
use crate::middleware::{FallbackPolicy, SelectionMiddleware};
use crate::scheduler::SchedulerApi;
use crate::tools::ToolRegistry;
use crate::types::{AgentMessage, ToolDescriptor, ToolOutput};

use super::prompt::DEFAULT_SYSTEM_PROMPT;
use super::runtime::ModelRuntime;

/// Answer returned when the model produced nothing usable
pub const NO_RESPONSE_SENTINEL: &str = "No response generated";

/// Phase of one request's lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    Idle,
    ProvidersConnecting,
    ToolsRegistered,
    ModelRunning,
    Completed,
    Failed,
}

impl RequestPhase {
    fn as_str(&self) -> &'static str {
        match self {
            RequestPhase::Idle => "Idle",
            RequestPhase::ProvidersConnecting => "ProvidersConnecting",
            RequestPhase::ToolsRegistered => "ToolsRegistered",
            RequestPhase::ModelRunning => "ModelRunning",
            RequestPhase::Completed => "Completed",
            RequestPhase::Failed => "Failed",
        }
    }
}

/// Where the orchestrator gets its tools from
pub enum ToolSource {
    /// Connect these providers at request time
    Providers(Vec<ProviderSpec>),
    /// Use an already-populated registry
    Registry(Arc<ToolRegistry>),
}

/// Outcome of one orchestrated request
#[derive(Debug, Clone)]
pub struct AgentRunReport {
    /// The user-facing answer (possibly an error string or sentinel)
    pub answer: String,
    /// Terminal phase of the request
    pub phase: RequestPhase,
    /// Model turns taken
    pub steps: usize,
}

/// Drives one agent request end to end
pub struct AgentOrchestrator {
    runtime: Arc<dyn ModelRuntime>,
    scheduler: Arc<dyn SchedulerApi>,
    source: ToolSource,
    session_id: Option<String>,
    scheduling: bool,
    fallback: FallbackPolicy,
    search_limit: Option<usize>,
    search_score_threshold: Option<f64>,
    max_steps: usize,
    system_prompt: String,
    logger: Arc<dyn Logger>,
}

impl AgentOrchestrator {
    /// Create an orchestrator with defaults (scheduling on, 50-step budget)
    pub fn new(
        runtime: Arc<dyn ModelRuntime>,
        scheduler: Arc<dyn SchedulerApi>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            runtime,
            scheduler,
            source: ToolSource::Providers(Vec::new()),
            session_id: None,
            scheduling: true,
            fallback: FallbackPolicy::default(),
            search_limit: None,
            search_score_threshold: None,
            max_steps: 50,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            logger,
        }
    }

    /// Set the tool source
    pub fn with_source(mut self, source: ToolSource) -> Self {
        self.source = source;
        self
    }

    /// Set the oracle session id
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Enable or disable scheduling for this request
    pub fn with_scheduling(mut self, enabled: bool) -> Self {
        self.scheduling = enabled;
        self
    }

    /// Set the fallback policy for failed rankings
    pub fn with_fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.fallback = fallback;
        self
    }

    /// Tune the oracle search
    pub fn with_search_params(mut self, limit: Option<usize>, score_threshold: Option<f64>) -> Self {
        self.search_limit = limit;
        self.search_score_threshold = score_threshold;
        self
    }

    /// Set the reasoning-step budget
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Replace the default system prompt
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    fn advance(&self, phase: &mut RequestPhase, next: RequestPhase) {
        self.logger.debug(&format!(
            "[AgentOrchestrator] {} -> {}",
            phase.as_str(),
            next.as_str()
        ));
        *phase = next;
    }

    fn fail(&self, mut phase: RequestPhase, steps: usize, message: String) -> AgentRunReport {
        self.logger
            .error(&format!("[AgentOrchestrator] {}", message));
        self.advance(&mut phase, RequestPhase::Failed);
        AgentRunReport {
            answer: format!("Error: {}", message),
            phase,
            steps,
        }
    }

    /// Run one request to completion. Never panics, never returns an error:
    /// every failure becomes a textual answer.
    pub async fn run(&self, question: &str) -> AgentRunReport {
        let mut phase = RequestPhase::Idle;
        self.logger
            .info(&format!("[AgentOrchestrator] Running agent for {}", question));

        self.advance(&mut phase, RequestPhase::ProvidersConnecting);
        let registry = match &self.source {
            ToolSource::Registry(registry) => Arc::clone(registry),
            ToolSource::Providers(specs) => {
                match ToolRegistry::connect(specs, Arc::clone(&self.logger)).await {
                    Ok(registry) => Arc::new(registry),
                    Err(e) => return self.fail(phase, 0, e.to_string()),
                }
            }
        };
        self.advance(&mut phase, RequestPhase::ToolsRegistered);

        let mut middleware = SelectionMiddleware::new(
            Arc::clone(&registry),
            Arc::clone(&self.scheduler),
            Arc::clone(&self.logger),
        )
        .with_scheduling(self.scheduling)
        .with_fallback(self.fallback)
        .with_search_params(self.search_limit, self.search_score_threshold);
        if let Some(session_id) = &self.session_id {
            middleware = middleware.with_session(session_id.clone());
        }

        self.advance(&mut phase, RequestPhase::ModelRunning);
        let mut transcript = vec![
            AgentMessage::system(&self.system_prompt),
            AgentMessage::user(question),
        ];
        let mut last_partial: Option<String> = None;

        for step in 0..self.max_steps {
            let visible = middleware.select_tools().await;
            let descriptors: Vec<ToolDescriptor> =
                visible.iter().map(|t| t.descriptor().clone()).collect();

            let turn = match self.runtime.next_turn(&transcript, &descriptors).await {
                Ok(turn) => turn,
                Err(e) => return self.fail(phase, step, e.to_string()),
            };

            if turn.is_final() {
                self.advance(&mut phase, RequestPhase::Completed);
                let answer = turn
                    .text
                    .or(last_partial)
                    .unwrap_or_else(|| NO_RESPONSE_SENTINEL.to_string());
                return AgentRunReport {
                    answer,
                    phase,
                    steps: step + 1,
                };
            }

            if let Some(text) = &turn.text {
                last_partial = Some(text.clone());
            }

            transcript.push(AgentMessage::assistant(
                turn.text.clone().unwrap_or_default(),
                turn.tool_calls.clone(),
            ));

            let mut outputs = Vec::with_capacity(turn.tool_calls.len());
            for call in &turn.tool_calls {
                let output = match registry.get(&call.name) {
                    None => {
                        self.logger.warn(&format!(
                            "[AgentOrchestrator] Model called unknown tool {}",
                            call.name
                        ));
                        ToolOutput::error(&call.id, format!("Unknown tool: {}", call.name))
                    }
                    Some(tool) => {
                        let tool = tool.clone();
                        match middleware.invoke_tool(&tool, call.input.clone()).await {
                            Ok(content) => ToolOutput {
                                call_id: call.id.clone(),
                                content: content.text,
                                is_error: content.is_error,
                            },
                            // The error goes back to the model verbatim; it
                            // decides whether to retry or answer around it.
                            Err(e) => ToolOutput::error(&call.id, e.to_string()),
                        }
                    }
                };
                outputs.push(output);
            }
            transcript.push(AgentMessage::tool_outputs(outputs));
        }

        // Reasoning budget exceeded: best-effort answer, not a failure
        self.logger.warn(&format!(
            "[AgentOrchestrator] Step budget of {} exhausted",
            self.max_steps
        ));
        self.advance(&mut phase, RequestPhase::Completed);
        AgentRunReport {
            answer: last_partial.unwrap_or_else(|| NO_RESPONSE_SENTINEL.to_string()),
            phase,
            steps: self.max_steps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::runtime::{ScriptMode, ScriptedRuntime};
    use crate::logging::NoOpLogger;
    use crate::mcp::{ProviderError, ProviderResult, ToolContent, ToolInvoker};
    use crate::scheduler::{
        RankedToolRef, RegisterResponse, SchedulerError, SchedulerResult,
    };
    use crate::types::{ToolCall, ToolCallOutcome, TurnOutput};
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct StubScheduler {
        refs: Vec<RankedToolRef>,
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
            if self.refs.is_empty() {
                return Err(SchedulerError::SearchFailed("down".into()));
            }
            Ok(self.refs.clone())
        }

        async fn log(&self, _outcome: &ToolCallOutcome) -> SchedulerResult<()> {
            Ok(())
        }
    }

    struct AddInvoker;

    #[async_trait]
    impl ToolInvoker for AddInvoker {
        async fn invoke(&self, local_name: &str, arguments: Value) -> ProviderResult<ToolContent> {
            if local_name != "add-f" {
                return Err(ProviderError::ToolCallFailed(format!(
                    "unknown tool {}",
                    local_name
                )));
            }
            let a = arguments["a"].as_i64().unwrap_or(0);
            let b = arguments["b"].as_i64().unwrap_or(0);
            Ok(ToolContent {
                text: (a + b).to_string(),
                is_error: false,
            })
        }
    }

    fn provider_a_registry() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new(Arc::new(NoOpLogger));
        registry
            .add_provider(
                vec![
                    crate::types::ToolDescriptor::new("providerA", "add-f", "Add"),
                    crate::types::ToolDescriptor::new("providerA", "mul-f", "Multiply"),
                ],
                Arc::new(AddInvoker),
            )
            .unwrap();
        Arc::new(registry)
    }

    fn ranked_add() -> RankedToolRef {
        RankedToolRef {
            mcp_url: "providerA".to_string(),
            name: "add-f".to_string(),
            description: String::new(),
            input_schema: None,
            score: Some(1.0),
        }
    }

    #[tokio::test]
    async fn test_oracle_narrows_every_turn_end_to_end() {
        let runtime = Arc::new(ScriptedRuntime::new(ScriptMode::Sequence(vec![
            TurnOutput::calls(vec![ToolCall::new(
                "c1",
                "providerA__add-f",
                json!({"a": 2, "b": 2}),
            )]),
            TurnOutput::text("**4**"),
        ])));

        let orchestrator = AgentOrchestrator::new(
            Arc::clone(&runtime) as Arc<dyn ModelRuntime>,
            Arc::new(StubScheduler {
                refs: vec![ranked_add()],
            }),
            Arc::new(NoOpLogger),
        )
        .with_source(ToolSource::Registry(provider_a_registry()))
        .with_session("batch-1");

        let report = orchestrator.run("2+2?").await;
        assert_eq!(report.answer, "**4**");
        assert_eq!(report.phase, RequestPhase::Completed);
        assert_eq!(report.steps, 2);

        // Exactly the ranked tool was visible on every turn
        for toolset in runtime.seen_toolsets() {
            assert_eq!(toolset, vec!["providerA__add-f".to_string()]);
        }
    }

    #[tokio::test]
    async fn test_oracle_down_still_answers_with_full_toolset() {
        let runtime = Arc::new(ScriptedRuntime::answering("**42**"));

        let orchestrator = AgentOrchestrator::new(
            Arc::clone(&runtime) as Arc<dyn ModelRuntime>,
            Arc::new(StubScheduler { refs: vec![] }),
            Arc::new(NoOpLogger),
        )
        .with_source(ToolSource::Registry(provider_a_registry()))
        .with_session("batch-1");

        let report = orchestrator.run("what is the answer?").await;
        assert_eq!(report.answer, "**42**");
        assert_eq!(report.phase, RequestPhase::Completed);

        // Degraded turn saw the whole registry
        let seen = runtime.seen_toolsets();
        assert_eq!(seen[0].len(), 2);
    }

    #[tokio::test]
    async fn test_step_budget_yields_sentinel() {
        let runtime = Arc::new(ScriptedRuntime::new(ScriptMode::Repeat(TurnOutput::calls(
            vec![ToolCall::new("c", "providerA__add-f", json!({"a": 1, "b": 1}))],
        ))));

        let orchestrator = AgentOrchestrator::new(
            Arc::clone(&runtime) as Arc<dyn ModelRuntime>,
            Arc::new(StubScheduler {
                refs: vec![ranked_add()],
            }),
            Arc::new(NoOpLogger),
        )
        .with_source(ToolSource::Registry(provider_a_registry()))
        .with_session("batch-1")
        .with_max_steps(3);

        let report = orchestrator.run("loop forever").await;
        assert_eq!(report.answer, NO_RESPONSE_SENTINEL);
        assert_eq!(report.phase, RequestPhase::Completed);
        assert_eq!(report.steps, 3);
        assert_eq!(runtime.turns_taken(), 3);
    }

    #[tokio::test]
    async fn test_runtime_failure_becomes_error_answer() {
        let orchestrator = AgentOrchestrator::new(
            Arc::new(ScriptedRuntime::new(ScriptMode::Fail("model offline".into()))),
            Arc::new(StubScheduler {
                refs: vec![ranked_add()],
            }),
            Arc::new(NoOpLogger),
        )
        .with_source(ToolSource::Registry(provider_a_registry()))
        .with_session("batch-1");

        let report = orchestrator.run("anything").await;
        assert!(report.answer.starts_with("Error: "));
        assert_eq!(report.phase, RequestPhase::Failed);
    }

    #[tokio::test]
    async fn test_unknown_tool_call_is_reported_to_the_model() {
        let runtime = Arc::new(ScriptedRuntime::new(ScriptMode::Sequence(vec![
            TurnOutput::calls(vec![ToolCall::new("c1", "providerB__nope", json!({}))]),
            TurnOutput::text("recovered"),
        ])));

        let orchestrator = AgentOrchestrator::new(
            Arc::clone(&runtime) as Arc<dyn ModelRuntime>,
            Arc::new(StubScheduler {
                refs: vec![ranked_add()],
            }),
            Arc::new(NoOpLogger),
        )
        .with_source(ToolSource::Registry(provider_a_registry()))
        .with_session("batch-1");

        let report = orchestrator.run("try a phantom tool").await;
        assert_eq!(report.answer, "recovered");
        assert_eq!(report.phase, RequestPhase::Completed);
    }

    #[tokio::test]
    async fn test_scheduling_disabled_exposes_full_toolset() {
        let runtime = Arc::new(ScriptedRuntime::answering("done"));

        let orchestrator = AgentOrchestrator::new(
            Arc::clone(&runtime) as Arc<dyn ModelRuntime>,
            Arc::new(StubScheduler {
                refs: vec![ranked_add()],
            }),
            Arc::new(NoOpLogger),
        )
        .with_source(ToolSource::Registry(provider_a_registry()))
        .with_session("batch-1")
        .with_scheduling(false);

        orchestrator.run("anything").await;
        assert_eq!(runtime.seen_toolsets()[0].len(), 2);
    }
}
