//! Anthropic Messages API analyzer with forced tool use.
//!
//! The request carries a single user turn (the analysis prompt) plus the
//! `analyze_sentence` tool, and `tool_choice` pins the model to it. The
//! answer is the `input` of the first `tool_use` block with that name; a
//! response without one is an upstream failure. No retries.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::analysis::prompt::{build_prompt, forced_tool_choice, tool_definition, TOOL_NAME};
use crate::analysis::SentenceAnalysis;
use crate::config::ProviderConfig;
use crate::error::{BunkaiError, Result};

use super::{parse_provider_error, Analyzer};

/// Messages API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic-backed [`Analyzer`].
pub struct AnthropicProvider {
    api_key: String,
    model: String,
    max_tokens: u32,
    api_base: String,
    client: Client,
}

impl std::fmt::Debug for AnthropicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicProvider")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl AnthropicProvider {
    /// Build from config. Returns `Ok(None)` when no usable API key is set.
    pub fn from_config(config: &ProviderConfig) -> Result<Option<Self>> {
        let Some(api_key) = config.resolved_api_key() else {
            return Ok(None);
        };
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| BunkaiError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Some(Self {
            api_key: api_key.to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            client,
        }))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.api_base)
    }

    /// Build the Messages API request body for `sentence`.
    pub fn build_request_body(&self, sentence: &str) -> Value {
        json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [{
                "role": "user",
                "content": build_prompt(sentence),
            }],
            "tools": [tool_definition()],
            "tool_choice": forced_tool_choice(),
        })
    }

    /// Pull the `analyze_sentence` tool input out of a Messages API response.
    pub fn extract_tool_input(response: &Value) -> Option<Value> {
        response["content"]
            .as_array()?
            .iter()
            .find(|block| block["type"] == "tool_use" && block["name"] == TOOL_NAME)
            .map(|block| block["input"].clone())
    }
}

#[async_trait]
impl Analyzer for AnthropicProvider {
    async fn analyze(&self, sentence: &str) -> Result<SentenceAnalysis> {
        let body = self.build_request_body(sentence);
        debug!(model = %self.model, chars = sentence.chars().count(), "Anthropic analysis request");

        let response = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| BunkaiError::Upstream(format!("Anthropic request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(parse_provider_error("anthropic", status.as_u16(), &error_text));
        }

        let json: Value = response.json().await.map_err(|e| {
            BunkaiError::Upstream(format!("Failed to parse Anthropic response: {}", e))
        })?;

        let Some(input) = Self::extract_tool_input(&json) else {
            warn!(
                stop_reason = json["stop_reason"].as_str().unwrap_or("unknown"),
                "Anthropic response had no analyze_sentence tool call"
            );
            return Err(BunkaiError::Upstream(
                "no structured analysis returned".to_string(),
            ));
        };

        SentenceAnalysis::from_tool_input(input)
    }
}
