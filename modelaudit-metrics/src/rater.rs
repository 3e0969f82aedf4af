//! LLM rater: asks an OpenAI-compatible chat completion endpoint to score a
//! README against a bucketed rubric.

use async_trait::async_trait;
use modelaudit_core::MetricError;
use modelaudit_core::config::RaterConfig;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

/// A score in `[0, 1]` plus the rater's explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub score: f64,
    pub justification: String,
}

impl Rating {
    pub fn new(score: f64, justification: impl Into<String>) -> Self {
        Self {
            score,
            justification: justification.into(),
        }
    }

    /// The placeholder recorded when a document could not be found.
    pub fn missing_readme() -> Self {
        Self::new(0.0, "README not found")
    }

    pub fn to_value(&self) -> Value {
        json!({"score": self.score, "justification": self.justification})
    }
}

/// Scores a prompt. Implementations must be shareable across concurrent
/// metric evaluations.
#[async_trait]
pub trait Rater: Send + Sync {
    async fn rate(&self, prompt: &str) -> Result<Rating, MetricError>;
}

/// Rater backed by a chat-completions endpoint.
pub struct GenAiRater {
    client: reqwest::Client,
    url: String,
    model: String,
    temperature: f64,
    api_key: Option<String>,
}

impl GenAiRater {
    pub fn new(config: &RaterConfig) -> Result<Self, MetricError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("modelaudit/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MetricError::rater(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: config.completions_url(),
            model: config.model.clone(),
            temperature: config.temperature,
            api_key: config.api_key(),
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

impl std::fmt::Debug for GenAiRater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenAiRater")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[async_trait]
impl Rater for GenAiRater {
    async fn rate(&self, prompt: &str) -> Result<Rating, MetricError> {
        let Some(api_key) = &self.api_key else {
            return Err(MetricError::rater("Missing API key for the rating service"));
        };

        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": self.temperature,
        });

        debug!(url = %self.url, model = %self.model, "Sending rating request");

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| MetricError::rater(format!("Request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| MetricError::rater(format!("Failed to read response body: {e}")))?;
        if !status.is_success() {
            return Err(MetricError::rater(format!(
                "HTTP {} from rating service: {}",
                status.as_u16(),
                text.chars().take(300).collect::<String>()
            )));
        }

        let json: Value = serde_json::from_str(&text)
            .map_err(|e| MetricError::rater(format!("Invalid JSON: {e}")))?;
        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| MetricError::rater("Response has no message content"))?;

        Ok(parse_rating(content))
    }
}

/// Interpret a model reply. Accepts a JSON object with `score` and
/// `justification` (optionally fenced in a markdown code block), then a bare
/// number, and otherwise scores 0.0. Scores are clamped to `[0, 1]`.
pub fn parse_rating(content: &str) -> Rating {
    let content = content.trim();
    let body = strip_code_fence(content);

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        let score = map.get("score").and_then(number).unwrap_or(0.0);
        let justification = match map.get("justification") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => "No rationale provided".to_string(),
            Some(other) => other.to_string(),
        };
        return Rating::new(clamp_unit(score), justification);
    }

    match body.parse::<f64>() {
        Ok(v) if v.is_finite() => Rating::new(clamp_unit(v), "Raw float only"),
        _ => Rating::new(0.0, format!("Unparsable output: {content}")),
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 }
}

fn strip_code_fence(content: &str) -> &str {
    let Some(rest) = content.strip_prefix("```") else {
        return content;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
