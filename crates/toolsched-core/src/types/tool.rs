//! Tool types
//!
//! A tool is a remote capability exposed by an MCP provider. Its registry id
//! is namespaced (`<namespace>__<localName>`) so tools from different
//! providers never collide; the descriptor also carries the raw
//! `(provider_url, local_name)` pair so telemetry and ranked-ref matching are
//! field reads rather than string surgery on the id.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Immutable description of one registered tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Globally unique, namespaced id ("<namespace>__<localName>")
    pub id: String,
    /// URL of the provider that exposes this tool
    #[serde(rename = "providerUrl")]
    pub provider_url: String,
    /// The tool's name as the provider knows it
    #[serde(rename = "localName")]
    pub local_name: String,
    /// Human-readable description (sent to the model)
    pub description: String,
    /// JSON Schema for the input parameters
    #[serde(rename = "inputSchema", skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
}

impl ToolDescriptor {
    /// Create a descriptor, deriving the namespaced id
    pub fn new(
        provider_url: impl Into<String>,
        local_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let provider_url = provider_url.into();
        let local_name = local_name.into();
        let id = crate::mcp::compose_id(&provider_url, &local_name);
        Self {
            id,
            provider_url,
            local_name,
            description: description.into(),
            input_schema: None,
        }
    }

    /// Set the input schema
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.input_schema = Some(schema);
        self
    }
}

/// Tool call requested by the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this tool call
    pub id: String,
    /// Registry id of the tool being called
    pub name: String,
    /// Input arguments for the tool
    pub input: Value,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input,
        }
    }
}

/// Result of one tool invocation, fed back to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    /// ID of the tool call this is responding to
    #[serde(rename = "callId")]
    pub call_id: String,
    /// The result content
    pub content: String,
    /// Whether this result represents an error
    #[serde(rename = "isError", default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolOutput {
    /// Create a successful tool output
    pub fn success(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    /// Create an error tool output
    pub fn error(call_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: error.into(),
            is_error: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_descriptor_derives_namespaced_id() {
        let desc = ToolDescriptor::new("http://localhost:3005/mcp", "add-f", "Add two numbers");
        assert_eq!(desc.id, "httplocalhost3005mcp__add-f");
        assert_eq!(desc.provider_url, "http://localhost:3005/mcp");
        assert_eq!(desc.local_name, "add-f");
    }

    #[test]
    fn test_descriptor_with_schema() {
        let desc = ToolDescriptor::new("http://localhost:3005/mcp", "add-f", "Add")
            .with_schema(json!({
                "type": "object",
                "properties": { "a": { "type": "number" }, "b": { "type": "number" } }
            }));
        assert!(desc.input_schema.is_some());
    }

    #[test]
    fn test_tool_output() {
        let ok = ToolOutput::success("call_1", "4");
        assert!(!ok.is_error);

        let err = ToolOutput::error("call_2", "divide by zero");
        assert!(err.is_error);
    }
}
