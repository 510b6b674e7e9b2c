//! Tool-call telemetry record

use serde::{Deserialize, Serialize};

use super::tool::ToolDescriptor;

/// Outcome of one tool invocation, reported once to the ranking oracle.
///
/// Reporting is fire-and-forget: losing a record must never fail the call it
/// describes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallOutcome {
    /// Namespaced registry id of the tool
    #[serde(rename = "toolId")]
    pub tool_id: String,
    /// Provider endpoint the call went to
    #[serde(rename = "providerUrl")]
    pub provider_url: String,
    /// The tool's provider-local name (what the oracle tracks)
    #[serde(rename = "localName")]
    pub local_name: String,
    /// Wall-clock duration of the invocation in milliseconds
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
    /// Whether the invocation failed
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl ToolCallOutcome {
    /// Build an outcome for a descriptor's invocation
    pub fn record(descriptor: &ToolDescriptor, duration_ms: u64, is_error: bool) -> Self {
        Self {
            tool_id: descriptor.id.clone(),
            provider_url: descriptor.provider_url.clone(),
            local_name: descriptor.local_name.clone(),
            duration_ms,
            is_error,
        }
    }
}
