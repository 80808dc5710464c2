/// AI Client — the single point of entry for all AI collaborator calls.
///
/// ARCHITECTURAL RULE: no other module may call the AI API directly. The
/// dispatch layer decides WHEN to call; this module owns HOW, and every
/// failure here is recoverable — the caller always has the deterministic
/// analysis to fall back on.
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::job_spec::JobSpecification;
use crate::parsing::builder::StructuredResumeRecord;

pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 2048;
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("AI returned empty content")]
    EmptyContent,

    #[error("AI response failed validation: {0}")]
    Invalid(String),
}

/// Advisory analysis from the AI collaborator. Never replaces the
/// deterministic breakdown; the score is reported alongside it and the
/// suggestions are merged in with their origin marked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiAnalysis {
    pub score: u8,
    #[serde(default)]
    pub breakdown: BTreeMap<String, u8>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl AiAnalysis {
    /// Schema validation beyond what serde enforces. A response that fails
    /// here is discarded, not surfaced.
    pub fn validate(&self) -> Result<(), AiError> {
        if self.score > 100 {
            return Err(AiError::Invalid(format!("score {} out of range", self.score)));
        }
        if let Some((name, value)) = self.breakdown.iter().find(|(_, v)| **v > 100) {
            return Err(AiError::Invalid(format!(
                "breakdown component {name} = {value} out of range"
            )));
        }
        if self.suggestions.iter().any(|s| s.trim().is_empty()) {
            return Err(AiError::Invalid("empty suggestion string".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct AiResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl AiResponse {
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Wraps the Messages API with retry logic and structured output helpers.
#[derive(Clone)]
pub struct AiClient {
    client: Client,
    api_key: String,
}

impl AiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .expect("failed to build HTTP client"),
            api_key,
        }
    }

    /// One full resume-versus-job analysis. The caller wraps this in its
    /// own `tokio::time::timeout`; the per-request timeout above only
    /// bounds a single hung connection.
    pub async fn analyze(
        &self,
        record: &StructuredResumeRecord,
        job: &JobSpecification,
    ) -> Result<AiAnalysis, AiError> {
        let prompt = prompts::build_analysis_prompt(record, job)?;
        let analysis: AiAnalysis = self.call_json(&prompt, prompts::SYSTEM).await?;
        analysis.validate()?;
        Ok(analysis)
    }

    /// Raw call with retries on 429 and 5xx, exponential backoff.
    async fn call(&self, prompt: &str, system: &str) -> Result<AiResponse, AiError> {
        let request_body = AnthropicRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut last_error: Option<AiError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // 1s, 2s, 4s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "AI call attempt {} failed, retrying after {}ms",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(AiError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("AI API returned {}: {}", status, body);
                last_error = Some(AiError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<AnthropicError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(AiError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let ai_response: AiResponse = response.json().await?;

            debug!(
                "AI call succeeded: input_tokens={}, output_tokens={}",
                ai_response.usage.input_tokens, ai_response.usage.output_tokens
            );

            return Ok(ai_response);
        }

        Err(last_error.unwrap_or(AiError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }

    async fn call_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: &str,
    ) -> Result<T, AiError> {
        let response = self.call(prompt, system).await?;
        let text = response.text().ok_or(AiError::EmptyContent)?;
        let text = strip_json_fences(text);
        serde_json::from_str(text).map_err(AiError::Parse)
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"score\": 70}\n```";
        assert_eq!(strip_json_fences(input), "{\"score\": 70}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"score\": 70}\n```";
        assert_eq!(strip_json_fences(input), "{\"score\": 70}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"score\": 70}";
        assert_eq!(strip_json_fences(input), "{\"score\": 70}");
    }

    #[test]
    fn test_validation_rejects_out_of_range_score() {
        let analysis = AiAnalysis {
            score: 140,
            breakdown: BTreeMap::new(),
            suggestions: vec![],
        };
        assert!(matches!(analysis.validate(), Err(AiError::Invalid(_))));
    }

    #[test]
    fn test_validation_rejects_empty_suggestion() {
        let analysis = AiAnalysis {
            score: 70,
            breakdown: BTreeMap::new(),
            suggestions: vec!["Add metrics".to_string(), "   ".to_string()],
        };
        assert!(matches!(analysis.validate(), Err(AiError::Invalid(_))));
    }

    #[test]
    fn test_validation_accepts_well_formed_response() {
        let json = r#"{"score": 72, "breakdown": {"keyword": 80}, "suggestions": ["Tighten the summary"]}"#;
        let analysis: AiAnalysis = serde_json::from_str(json).unwrap();
        assert!(analysis.validate().is_ok());
        assert_eq!(analysis.score, 72);
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let analysis: AiAnalysis = serde_json::from_str(r#"{"score": 50}"#).unwrap();
        assert!(analysis.breakdown.is_empty());
        assert!(analysis.suggestions.is_empty());
        assert!(analysis.validate().is_ok());
    }
}
