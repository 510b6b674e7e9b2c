//! Tool-provider connection using the official rmcp SDK
//!
//! One connection per provider endpoint, established over streamable HTTP.
//! Discovery rewrites each tool's callable identity to the namespaced
//! registry id; invocation goes back out under the provider-local name.

use std::sync::Arc;

use async_trait::async_trait;
use rmcp::{
    model::{
        CallToolRequestParams, ClientCapabilities, ClientInfo, Implementation, RawContent,
    },
    service::RunningService,
    RoleClient, ServiceExt,
};
use serde_json::Value;
use thiserror::Error;

use crate::logging::Logger;
use crate::types::ToolDescriptor;

/// Tool-provider errors
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The provider endpoint could not be reached or initialized.
    /// Fatal for the session unless the provider was marked optional.
    #[error("Provider unreachable: {url}: {message}")]
    Unreachable { url: String, message: String },

    #[error("Tool call failed: {0}")]
    ToolCallFailed(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Text content of one tool invocation, before a call id is attached
#[derive(Debug, Clone)]
pub struct ToolContent {
    /// Concatenated text blocks of the result
    pub text: String,
    /// Whether the provider flagged the result as an error
    pub is_error: bool,
}

/// Seam for invoking a provider-local tool
///
/// `ProviderConnection` is the production implementation; tests substitute
/// deterministic stubs.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    /// Invoke a tool under its provider-local name
    async fn invoke(&self, local_name: &str, arguments: Value) -> ProviderResult<ToolContent>;
}

/// Connection to one remote tool provider
pub struct ProviderConnection {
    /// Endpoint URL this connection serves
    url: String,
    /// The underlying rmcp running service
    client: RunningService<RoleClient, ClientInfo>,
    /// Logger
    logger: Arc<dyn Logger>,
}

impl ProviderConnection {
    /// Connect to a tool provider over streamable HTTP
    pub async fn connect(url: &str, logger: Arc<dyn Logger>) -> ProviderResult<Self> {
        use rmcp::transport::StreamableHttpClientTransport;

        logger.info(&format!("[ProviderConnection] Connecting to {}", url));

        let transport = StreamableHttpClientTransport::from_uri(url);

        let client_info = ClientInfo {
            meta: None,
            protocol_version: Default::default(),
            capabilities: ClientCapabilities::default(),
            client_info: Implementation {
                name: "toolsched-core".to_string(),
                title: Some("ToolSched Core".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                website_url: None,
                icons: None,
            },
        };

        let client = client_info
            .serve(transport)
            .await
            .map_err(|e| ProviderError::Unreachable {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        logger.info(&format!("[ProviderConnection] Connected to {}", url));

        Ok(Self {
            url: url.to_string(),
            client,
            logger,
        })
    }

    /// Endpoint URL this connection serves
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Enumerate the provider's tools as namespaced descriptors
    pub async fn discover(&self) -> ProviderResult<Vec<ToolDescriptor>> {
        let result = self
            .client
            .list_tools(Default::default())
            .await
            .map_err(|e| ProviderError::Protocol(e.to_string()))?;

        self.logger.info(&format!(
            "[ProviderConnection] {} exposes {} tools",
            self.url,
            result.tools.len()
        ));

        let descriptors = result
            .tools
            .into_iter()
            .map(|tool| {
                let mut desc = ToolDescriptor::new(
                    &self.url,
                    tool.name.to_string(),
                    tool.description.map(|s| s.to_string()).unwrap_or_default(),
                );
                if let Ok(schema) = serde_json::to_value(tool.input_schema.as_ref()) {
                    desc = desc.with_schema(schema);
                }
                desc
            })
            .collect();

        Ok(descriptors)
    }

    /// Close the connection
    pub async fn close(self) -> ProviderResult<()> {
        self.logger
            .info(&format!("[ProviderConnection] Closing {}", self.url));
        self.client
            .cancel()
            .await
            .map_err(|e| ProviderError::Protocol(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ToolInvoker for ProviderConnection {
    async fn invoke(&self, local_name: &str, arguments: Value) -> ProviderResult<ToolContent> {
        self.logger.debug(&format!(
            "[ProviderConnection] Calling {} on {}",
            local_name, self.url
        ));

        let params = CallToolRequestParams {
            meta: None,
            name: local_name.to_owned().into(),
            arguments: arguments.as_object().cloned(),
            task: None,
        };

        let result = self
            .client
            .call_tool(params)
            .await
            .map_err(|e| ProviderError::ToolCallFailed(e.to_string()))?;

        // Content is Annotated<RawContent>; collect the text blocks
        let text = result
            .content
            .iter()
            .filter_map(|c| match &c.raw {
                RawContent::Text(t) => Some(t.text.clone()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        Ok(ToolContent {
            text,
            is_error: result.is_error.unwrap_or(false),
        })
    }
}
