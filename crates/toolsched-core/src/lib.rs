//! ToolSched Core
//!
//! Adaptive tool-scheduling middleware for model-driven agents. A ranking
//! oracle narrows, per request, which remote tools the model is allowed to
//! see; this crate provides the plumbing around it:
//!
//! - Connect MCP tool providers and aggregate their tools into a registry
//! - Consult the oracle (register/search/log) over its HTTP protocol
//! - Filter the visible tool set before every model turn and instrument
//!   every tool invocation with fire-and-forget telemetry
//! - Orchestrate the whole request cycle with graceful degradation when the
//!   oracle is unavailable
//!
//! ```rust,ignore
//! use toolsched_core::agent::AgentService;
//! use toolsched_core::config::AgentConfig;
//! use toolsched_core::logging::ConsoleLogger;
//! use std::sync::Arc;
//!
//! let config = AgentConfig::load();
//! let service = AgentService::from_config(&config, Arc::new(ConsoleLogger::new()));
//!
//! let answer = service.answer("2+2?", true).await;
//! ```

pub mod agent;
pub mod config;
pub mod logging;
pub mod mcp;
pub mod middleware;
pub mod scheduler;
pub mod tools;
pub mod types;

// Re-export commonly used types
pub use types::{
    AgentMessage, MessageRole, ToolCall, ToolCallOutcome, ToolDescriptor, ToolOutput, TurnOutput,
};

pub use logging::{ConsoleLogger, Logger, NoOpLogger, SharedLogger};

pub use config::{AgentConfig, ConfigError, ConfigResult, LlmConfig, LlmProvider};

pub use mcp::{
    compose_id, namespace, ProviderConnection, ProviderError, ProviderResult, ProviderSpec,
    ToolContent, ToolInvoker, NAMESPACE_DELIMITER,
};

pub use tools::{RegisteredTool, RegistryError, RegistryResult, ToolRegistry};

pub use scheduler::{
    RankedToolRef, RegisterRequest, RegisterResponse, SchedulerApi, SchedulerClient,
    SchedulerError, SchedulerResult,
};

pub use middleware::{FallbackPolicy, RankingOutcome, SelectionMiddleware};

pub use agent::{
    AgentOrchestrator, AgentRunReport, AgentService, GenaiRuntime, ModelRuntime, RequestPhase,
    RuntimeError, RuntimeResult, ToolSource, NO_RESPONSE_SENTINEL,
};
