use std::collections::HashMap;

use serde::Deserialize;
use tracing::{instrument, warn};

use crate::catalog::Catalog;
use crate::config::LlmConfig;
use crate::error::{Result, SdqcError};
use crate::intent::{ParsedIntent, TokenUsage, Value};

/// Calls an LLM endpoint to recognize intent + params when the rule pass
/// can't.
pub struct LlmParser {
    client: reqwest::Client,
    cfg: LlmConfig,
}

#[derive(Deserialize)]
struct LlmIntentResponse {
    intent: String,
    confidence: f64,
    #[serde(default)]
    params: HashMap<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
    #[serde(default)]
    prompt_eval_count: u32,
    #[serde(default)]
    eval_count: u32,
}

impl LlmParser {
    pub fn new(cfg: LlmConfig) -> Self {
        LlmParser {
            client: reqwest::Client::builder()
                .timeout(cfg.timeout)
                .build()
                .expect("failed to build LLM http client"),
            cfg,
        }
    }

    fn build_prompt(&self, nlq: &str, catalog: &Catalog) -> String {
        let intents = catalog.intent_names().join(", ");
        format!(
            "You convert a natural-language ERP query into a JSON object \
             {{\"intent\": string, \"confidence\": number, \"params\": object}}. \
             Allowed intents: [{intents}]. \
             Respond with JSON only, no prose.\n\nQuery: {nlq}"
        )
    }

    #[instrument(skip(self, catalog), fields(nlq_len = nlq.len()))]
    pub async fn parse(&self, nlq: &str, catalog: &Catalog) -> Result<ParsedIntent> {
        let prompt = self.build_prompt(nlq, catalog);
        let (raw, token_usage) = self.call_llm(&prompt).await?;

        // Malformed JSON is discarded, not retried.
        let parsed: LlmIntentResponse = match serde_json::from_str(&raw) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "LLM returned non-JSON response, discarding");
                return Ok(ParsedIntent::unknown());
            }
        };

        let params = parsed
            .params
            .into_iter()
            .map(|(k, v)| (k, json_to_value(v)))
            .collect();

        Ok(ParsedIntent {
            intent_name: parsed.intent,
            confidence: parsed.confidence,
            params,
            limit: None,
            offset: None,
            token_usage,
            validation_errors: Vec::new(),
        })
    }

    async fn call_llm(&self, prompt: &str) -> Result<(String, TokenUsage)> {
        let body = serde_json::json!({
            "model": self.cfg.model,
            "prompt": prompt,
            "stream": false,
            "options": { "temperature": 0.03, "num_predict": 256 },
        });

        let resp = self
            .client
            .post(&self.cfg.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| SdqcError::ConnectionError(e.to_string()))?;

        let parsed: OllamaGenerateResponse = resp
            .json()
            .await
            .map_err(|e| SdqcError::ConnectionError(e.to_string()))?;

        let usage = TokenUsage {
            prompt_tokens: parsed.prompt_eval_count,
            completion_tokens: parsed.eval_count,
            cache_hit: false,
        };
        Ok((parsed.response, usage))
    }
}

fn json_to_value(v: serde_json::Value) -> Value {
    match v {
        serde_json::Value::Array(items) => Value::List {
            values: items.into_iter().map(|i| i.as_str().unwrap_or_default().to_string()).collect(),
        },
        other => Value::Scalar { value: other.as_str().map(|s| s.to_string()).unwrap_or_else(|| other.to_string()) },
    }
}
