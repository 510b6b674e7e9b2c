//! Core data model

mod message;
mod outcome;
mod tool;

pub use message::{AgentMessage, MessageRole, TurnOutput};
pub use outcome::ToolCallOutcome;
pub use tool::{ToolCall, ToolDescriptor, ToolOutput};
