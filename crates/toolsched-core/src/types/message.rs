//! Transcript types for the agent turn loop

use serde::{Deserialize, Serialize};

use super::tool::{ToolCall, ToolOutput};

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

/// One entry in the agent's conversation transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMessage {
    /// Who produced this message
    pub role: MessageRole,
    /// Text content (empty for pure tool-call turns)
    pub content: String,
    /// Tool calls the assistant requested on this turn
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Tool outputs being returned to the model
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_outputs: Vec<ToolOutput>,
}

impl AgentMessage {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_outputs: Vec::new(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_outputs: Vec::new(),
        }
    }

    /// Create an assistant message with optional tool calls
    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            tool_calls,
            tool_outputs: Vec::new(),
        }
    }

    /// Create a tool-output message
    pub fn tool_outputs(outputs: Vec<ToolOutput>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: String::new(),
            tool_calls: Vec::new(),
            tool_outputs: outputs,
        }
    }
}

/// What the model produced on one turn: final text, tool calls, or both
#[derive(Debug, Clone, Default)]
pub struct TurnOutput {
    /// Text content of the turn (the answer, once no tools are requested)
    pub text: Option<String>,
    /// Tool calls the model wants executed before it continues
    pub tool_calls: Vec<ToolCall>,
}

impl TurnOutput {
    /// A pure-text turn
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            text: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    /// A tool-calling turn
    pub fn calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            text: None,
            tool_calls,
        }
    }

    /// Whether this turn ends the loop (no tool calls requested)
    pub fn is_final(&self) -> bool {
        self.tool_calls.is_empty()
    }
}
