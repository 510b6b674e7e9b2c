//! Model runtime backed by the genai crate
//!
//! Handles both configured backends: Ollama natively and OpenRouter through
//! genai's OpenAI-compatible service-target resolution. Auth flows from the
//! agent configuration, not genai's env var lookup.

use std::sync::Arc;

use async_trait::async_trait;
use genai::chat::{
    ChatMessage as GenaiMessage, ChatRequest, Tool as GenaiTool, ToolCall as GenaiToolCall,
    ToolResponse,
};
use genai::resolver::{AuthData, AuthResolver, Endpoint, ServiceTargetResolver};
use genai::{adapter::AdapterKind, Client, ModelIden, ServiceTarget};

use crate::config::{LlmConfig, LlmProvider};
use crate::logging::Logger;
use crate::types::{AgentMessage, MessageRole, ToolCall, ToolDescriptor, TurnOutput};

use super::runtime::{ModelRuntime, RuntimeError, RuntimeResult};

/// Convert a tool descriptor to a genai tool definition
fn to_genai_tool(descriptor: &ToolDescriptor) -> GenaiTool {
    let mut tool = GenaiTool::new(&descriptor.id).with_description(&descriptor.description);
    if let Some(schema) = &descriptor.input_schema {
        tool = tool.with_schema(schema.clone());
    }
    tool
}

/// Convert the agent transcript to genai chat messages
fn to_genai_messages(transcript: &[AgentMessage]) -> Vec<GenaiMessage> {
    let mut messages = Vec::new();
    for msg in transcript {
        match msg.role {
            MessageRole::System => messages.push(GenaiMessage::system(msg.content.clone())),
            MessageRole::User => messages.push(GenaiMessage::user(msg.content.clone())),
            MessageRole::Assistant => {
                if msg.tool_calls.is_empty() {
                    messages.push(GenaiMessage::assistant(msg.content.clone()));
                } else {
                    let calls: Vec<GenaiToolCall> = msg
                        .tool_calls
                        .iter()
                        .map(|c| GenaiToolCall {
                            call_id: c.id.clone(),
                            fn_name: c.name.clone(),
                            fn_arguments: c.input.clone(),
                            thought_signatures: None,
                        })
                        .collect();
                    messages.push(GenaiMessage::from(calls));
                }
            }
            MessageRole::Tool => {
                for output in &msg.tool_outputs {
                    messages.push(GenaiMessage::from(ToolResponse::new(
                        output.call_id.clone(),
                        output.content.clone(),
                    )));
                }
            }
        }
    }
    messages
}

/// Create a genai client routed and authenticated per the LLM config
fn create_client(llm: &LlmConfig) -> Client {
    let api_key = llm.api_key.clone();
    let auth_resolver = AuthResolver::from_resolver_fn(
        move |_model_iden: ModelIden| -> Result<Option<AuthData>, genai::resolver::Error> {
            Ok(api_key.clone().map(AuthData::from_single))
        },
    );

    let provider = llm.provider;
    let api_base = llm.api_base.clone();
    let target_resolver = ServiceTargetResolver::from_resolver_fn(
        move |target: ServiceTarget| -> Result<ServiceTarget, genai::resolver::Error> {
            let ServiceTarget { ref model, .. } = target;

            let (endpoint, adapter_kind) = match provider {
                LlmProvider::OpenRouter => (
                    api_base
                        .as_ref()
                        .map(|u| Endpoint::from_owned(u.clone()))
                        .unwrap_or_else(|| {
                            Endpoint::from_static("https://openrouter.ai/api/v1/")
                        }),
                    AdapterKind::OpenAI,
                ),
                LlmProvider::Ollama => (
                    api_base
                        .as_ref()
                        .map(|u| Endpoint::from_owned(u.clone()))
                        .unwrap_or_else(|| Endpoint::from_static("http://localhost:11434/v1/")),
                    AdapterKind::Ollama,
                ),
            };

            let resolved_model = ModelIden::new(adapter_kind, model.model_name.clone());

            Ok(ServiceTarget {
                endpoint,
                auth: target.auth, // Auth is handled by the AuthResolver
                model: resolved_model,
            })
        },
    );

    Client::builder()
        .with_auth_resolver(auth_resolver)
        .with_service_target_resolver(target_resolver)
        .build()
}

/// Production model runtime
pub struct GenaiRuntime {
    client: Client,
    model: String,
    logger: Arc<dyn Logger>,
}

impl GenaiRuntime {
    /// Create a runtime for the configured backend
    pub fn new(llm: &LlmConfig, logger: Arc<dyn Logger>) -> Self {
        Self {
            client: create_client(llm),
            model: llm.model.clone(),
            logger,
        }
    }
}

#[async_trait]
impl ModelRuntime for GenaiRuntime {
    async fn next_turn(
        &self,
        transcript: &[AgentMessage],
        tools: &[ToolDescriptor],
    ) -> RuntimeResult<TurnOutput> {
        let mut chat_req = ChatRequest::new(to_genai_messages(transcript));
        if !tools.is_empty() {
            chat_req = chat_req.with_tools(tools.iter().map(to_genai_tool).collect::<Vec<_>>());
        }

        self.logger.debug(&format!(
            "[GenaiRuntime] Turn with {} message(s), {} visible tool(s)",
            transcript.len(),
            tools.len()
        ));

        let chat_res = self
            .client
            .exec_chat(&self.model, chat_req, None)
            .await
            .map_err(|e| RuntimeError::ModelCallFailed(e.to_string()))?;

        let text = chat_res.first_text().map(|s| s.to_string());
        let tool_calls: Vec<ToolCall> = chat_res
            .into_tool_calls()
            .into_iter()
            .map(|tc| ToolCall::new(tc.call_id, tc.fn_name, tc.fn_arguments))
            .collect();

        Ok(TurnOutput { text, tool_calls })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToolOutput;
    use serde_json::json;

    #[test]
    fn test_tool_conversion_keeps_namespaced_id() {
        let desc = ToolDescriptor::new("http://localhost:3005/mcp", "add-f", "Add two numbers")
            .with_schema(json!({ "type": "object" }));
        let tool = to_genai_tool(&desc);
        assert_eq!(tool.name, "httplocalhost3005mcp__add-f");
    }

    #[test]
    fn test_transcript_conversion_flattens_tool_outputs() {
        let transcript = vec![
            AgentMessage::system("be accurate"),
            AgentMessage::user("2+2?"),
            AgentMessage::assistant(
                "",
                vec![ToolCall::new("c1", "t__add", json!({"a": 2, "b": 2}))],
            ),
            AgentMessage::tool_outputs(vec![
                ToolOutput::success("c1", "4"),
                ToolOutput::success("c2", "also 4"),
            ]),
        ];

        let messages = to_genai_messages(&transcript);
        // system + user + assistant(tool calls) + two tool responses
        assert_eq!(messages.len(), 5);
    }
}
