//! Agent orchestration
//!
//! The request/response cycle: a model runtime (black box, one turn at a
//! time), the orchestrator that loops it against the selection middleware,
//! and the service wrapper that ties oracle registration to a run.

mod genai_runtime;
mod orchestrator;
mod prompt;
mod runtime;
mod service;

pub use genai_runtime::GenaiRuntime;
pub use orchestrator::{
    AgentOrchestrator, AgentRunReport, RequestPhase, ToolSource, NO_RESPONSE_SENTINEL,
};
pub use prompt::DEFAULT_SYSTEM_PROMPT;
pub use runtime::{ModelRuntime, RuntimeError, RuntimeResult, ScriptMode, ScriptedRuntime};
pub use service::AgentService;
