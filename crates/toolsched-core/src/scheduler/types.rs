//! Wire types for the ranking-oracle protocol
//!
//! Field names follow the oracle's HTTP API exactly (`mcp_urls`,
//! `registered_id`, `batch_id`, `total_time_ms`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// POST /register request body
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub mcp_urls: Vec<String>,
}

/// POST /register response
///
/// `registered_id` is the session id correlating all subsequent search/log
/// calls; the oracle may return null when registration did not stick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub registered_id: Option<String>,
    pub urls: Vec<String>,
}

/// One entry of the GET /search response
///
/// Produced fresh by the oracle on every search; never cached across turns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedToolRef {
    pub mcp_url: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// POST /log request body
#[derive(Debug, Clone, Serialize)]
pub struct LogRequest {
    pub mcp_url: String,
    pub tool_name: String,
    pub total_time_ms: u64,
    pub is_error: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_wire_format() {
        let req = RegisterRequest {
            mcp_urls: vec!["http://localhost:3005/mcp".to_string()],
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["mcp_urls"][0], "http://localhost:3005/mcp");
    }

    #[test]
    fn test_register_response_with_null_id() {
        let json = r#"{ "message": "rejected", "registered_id": null, "urls": [] }"#;
        let res: RegisterResponse = serde_json::from_str(json).unwrap();
        assert!(res.registered_id.is_none());
    }

    #[test]
    fn test_ranked_ref_score_is_optional() {
        let json = r#"[
            { "mcp_url": "http://localhost:3005/mcp", "name": "add-f", "description": "Add", "score": 0.92 },
            { "mcp_url": "http://localhost:3006/mcp", "name": "scrape", "description": "" }
        ]"#;
        let refs: Vec<RankedToolRef> = serde_json::from_str(json).unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].score, Some(0.92));
        assert!(refs[1].score.is_none());
    }

    #[test]
    fn test_log_request_wire_format() {
        let req = LogRequest {
            mcp_url: "http://localhost:3005/mcp".to_string(),
            tool_name: "add-f".to_string(),
            total_time_ms: 17,
            is_error: false,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["tool_name"], "add-f");
        assert_eq!(json["total_time_ms"], 17);
        assert_eq!(json["is_error"], false);
    }
}
