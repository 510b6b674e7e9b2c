//! Answer judge
//!
//! A black-box classifier deciding whether a produced answer matches the
//! expected answer semantically. The production implementation asks an
//! OpenRouter model with a strict JSON-schema response format; a judge that
//! cannot be reached yields an incorrect verdict with a diagnostic reason
//! instead of failing the benchmark run.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use toolsched_core::logging::Logger;

/// The judge's decision on one trial answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub is_correct: bool,
    pub reason: String,
}

impl Verdict {
    /// Verdict recorded when the judge itself is unavailable
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            is_correct: false,
            reason: reason.into(),
        }
    }
}

/// Seam for the semantic answer judge
#[async_trait]
pub trait Judge: Send + Sync {
    /// Compare an agent answer against the ground truth. Infallible by
    /// contract: judge failures become incorrect verdicts.
    async fn validate(&self, agent_answer: &str, expected_answer: &str, question: &str) -> Verdict;
}

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_MODEL: &str = "openai/gpt-oss-120b:nitro";

/// OpenRouter-backed judge
pub struct OpenRouterJudge {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    logger: Arc<dyn Logger>,
}

impl OpenRouterJudge {
    /// Create a judge with the default OpenRouter endpoint and model
    pub fn new(api_key: impl Into<String>, logger: Arc<dyn Logger>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: api_key.into(),
            logger,
        }
    }

    /// Override the API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the judge model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn build_prompt(agent_answer: &str, expected_answer: &str, question: &str) -> String {
        format!(
            "\
You are an expert answer validator. Your sole purpose is to compare a \"Model Prediction\" against a \
provided \"Ground Truth\" and determine if they match.

*** CRITICAL INSTRUCTION ***
The \"Ground Truth\" provided to you is the ABSOLUTE TRUTH. Do not use your own knowledge to evaluate \
the question. If the Ground Truth says \"France\" and the Model Prediction says \"Argentina\", the \
Model Prediction is WRONG, regardless of the reasoning.

Input Data:
Question: {question}
Ground Truth: {expected_answer}
Model Prediction: {agent_answer}

Validation Steps:
1. Extract the Core Answer: scan the Model Prediction for the final conclusion. Ignore the shown \
work (e.g. \"1887 - 1800 = 87\"); focus only on the final derived value or entity.
2. Compare Entities: a numeric Ground Truth like \"87\" matches \"87 years\"; a Proper Noun Ground \
Truth must match exactly (\"Argentina\" is not \"France\").
3. Assess Equivalence: allow minor rounding only where the context implies it (population counts); \
exact dates and integer calculations must be exact. Accept semantic equivalence: if the Ground \
Truth is \"Zirconium was discovered by Martin Heinrich Klaproth\", the answer \"**Martin Heinrich \
Klaproth**\" is correct even without restating the discovery.

Evaluation Rules:
- False Positives (Strictness): if the reasoning is sound but the final entity differs from the \
Ground Truth, mark FALSE.
- False Negatives (Lenience): do not penalize verbosity. If the correct answer is present as the \
conclusion of a long sentence, mark TRUE.

Important Note: the predicting model is instructed to bold ONLY its final answer (**<answer>**). \
Base your judgement solely on what is inside the bolded section of the Model Prediction; text \
outside it is not the answer.

Output Format: a single valid JSON object:
{{
  \"is_correct\": boolean,
  \"reason\": \"Concise explanation of the comparison.\"
}}"
        )
    }
}

#[async_trait]
impl Judge for OpenRouterJudge {
    async fn validate(&self, agent_answer: &str, expected_answer: &str, question: &str) -> Verdict {
        let prompt = Self::build_prompt(agent_answer, expected_answer, question);

        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "stream": false,
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "validation_response",
                    "strict": true,
                    "schema": {
                        "type": "object",
                        "additionalProperties": false,
                        "properties": {
                            "is_correct": {
                                "type": "boolean",
                                "description": "Whether the agent's answer is correct."
                            },
                            "reason": {
                                "type": "string",
                                "description": "A short explanation of why the prediction matches or does not match the ground truth."
                            }
                        },
                        "required": ["is_correct", "reason"]
                    }
                }
            }
        });

        let response = match self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                self.logger
                    .error(&format!("[OpenRouterJudge] Request failed: {}", e));
                return Verdict::unavailable("Error with the judge API");
            }
        };

        if !response.status().is_success() {
            self.logger.error(&format!(
                "[OpenRouterJudge] Request failed: status {}",
                response.status()
            ));
            return Verdict::unavailable("Error with the judge API");
        }

        let payload: serde_json::Value = match response.json().await {
            Ok(payload) => payload,
            Err(e) => {
                self.logger
                    .error(&format!("[OpenRouterJudge] Bad response body: {}", e));
                return Verdict::unavailable("Error with the judge API");
            }
        };

        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or(r#"{ "is_correct": false, "reason": "" }"#);

        match serde_json::from_str::<Verdict>(content) {
            Ok(verdict) => {
                self.logger.debug(&format!(
                    "[OpenRouterJudge] is_correct={} reason={}",
                    verdict.is_correct, verdict.reason
                ));
                verdict
            }
            Err(e) => {
                self.logger
                    .error(&format!("[OpenRouterJudge] Unparseable verdict: {}", e));
                Verdict::unavailable("Error with the judge API")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_all_three_inputs() {
        let prompt = OpenRouterJudge::build_prompt("**4**", "4", "2+2?");
        assert!(prompt.contains("Question: 2+2?"));
        assert!(prompt.contains("Ground Truth: 4"));
        assert!(prompt.contains("Model Prediction: **4**"));
    }

    #[test]
    fn test_unavailable_verdict_is_incorrect_with_reason() {
        let verdict = Verdict::unavailable("judge offline");
        assert!(!verdict.is_correct);
        assert_eq!(verdict.reason, "judge offline");
    }

    #[test]
    fn test_verdict_parses_judge_output() {
        let verdict: Verdict =
            serde_json::from_str(r#"{ "is_correct": true, "reason": "exact match" }"#).unwrap();
        assert!(verdict.is_correct);
        assert_eq!(verdict.reason, "exact match");
    }
}
