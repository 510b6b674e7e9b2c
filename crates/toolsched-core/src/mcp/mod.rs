//! MCP (Model Context Protocol) provider connections
//!
//! Uses the official rmcp SDK over streamable HTTP. Each connection
//! enumerates one provider's tools and rewrites their callable identities to
//! namespaced registry ids.

mod connection;
mod namespace;

pub use connection::{
    ProviderConnection, ProviderError, ProviderResult, ToolContent, ToolInvoker,
};
pub use namespace::{compose_id, namespace, NAMESPACE_DELIMITER};

/// How a provider participates in a session
#[derive(Debug, Clone)]
pub struct ProviderSpec {
    /// Endpoint URL
    pub url: String,
    /// Whether a connect failure aborts the whole session (default true)
    pub required: bool,
}

impl ProviderSpec {
    /// A provider whose failure is fatal for the session
    pub fn required(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            required: true,
        }
    }

    /// A provider that is skipped with a warning if unreachable
    pub fn optional(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            required: false,
        }
    }
}
