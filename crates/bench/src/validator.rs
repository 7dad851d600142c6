//! Answer validation against reference data
//!
//! The judge itself is an external model. [`ChatCompletionValidator`] talks
//! to any OpenAI-compatible chat-completions endpoint and asks it for a JSON
//! verdict.

use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::dataset::ReferenceDataset;
use crate::error::{BenchError, BenchResult};
use crate::questions::Question;

/// Accuracy judgement with its rationale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    #[serde(rename = "isAccurate")]
    pub is_accurate: bool,
    pub reason: String,
}

impl Verdict {
    pub fn accurate(reason: impl Into<String>) -> Self {
        Self {
            is_accurate: true,
            reason: reason.into(),
        }
    }

    pub fn inaccurate(reason: impl Into<String>) -> Self {
        Self {
            is_accurate: false,
            reason: reason.into(),
        }
    }
}

#[async_trait]
pub trait AnswerValidator: Send + Sync {
    async fn validate(
        &self,
        question: &Question,
        response: &str,
        reference: &ReferenceDataset,
    ) -> BenchResult<Verdict>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Chat-completions endpoint
    pub endpoint: String,

    /// Model name sent in the request body
    pub model: String,

    /// Environment variable holding the bearer token
    pub api_key_env: String,

    pub timeout_secs: u64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 90,
        }
    }
}

const SYSTEM_PROMPT: &str = "You grade answers given by an assistant embedded in a device \
management console. You receive the user's question, the assistant's answer, and the table \
the answer refers to, extracted from the console UI. Decide whether the answer is accurate \
with respect to the table. Reply with a JSON object only: \
{\"isAccurate\": true|false, \"reason\": \"<one or two sentences>\"}.";

/// Validator backed by an OpenAI-compatible chat-completions API
pub struct ChatCompletionValidator {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl ChatCompletionValidator {
    /// Build from config, reading the API key from the configured variable.
    /// A missing key is allowed for local endpoints that need none.
    pub fn from_config(config: &ValidatorConfig) -> BenchResult<Self> {
        let api_key = std::env::var(&config.api_key_env).ok();
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &ValidatorConfig, api_key: Option<String>) -> BenchResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
        })
    }

    fn user_prompt(question: &Question, response: &str, reference: &ReferenceDataset) -> BenchResult<String> {
        let rows = serde_json::to_string_pretty(&reference.rows)?;
        Ok(format!(
            "Question ({key}): {question}\n\nAssistant answer:\n{response}\n\n\
             Reference table \"{header}\" ({count} rows):\n{rows}",
            key = question.key,
            question = question.question,
            header = reference.header,
            count = reference.rows.len(),
        ))
    }
}

#[async_trait]
impl AnswerValidator for ChatCompletionValidator {
    async fn validate(
        &self,
        question: &Question,
        response: &str,
        reference: &ReferenceDataset,
    ) -> BenchResult<Verdict> {
        let body = json!({
            "model": self.model,
            "temperature": 0,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": Self::user_prompt(question, response, reference)? },
            ],
        });

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        debug!("Validating answer for {} against {} rows", question.key, reference.rows.len());
        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(BenchError::Validator(format!("{}: {}", status, text)));
        }

        let payload: serde_json::Value = resp.json().await?;
        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| BenchError::Validator("response has no message content".into()))?;

        parse_verdict(content)
    }
}

/// Parse the judge's reply, tolerating a surrounding markdown code fence.
pub fn parse_verdict(content: &str) -> BenchResult<Verdict> {
    let trimmed = content.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    serde_json::from_str(body)
        .map_err(|e| BenchError::Validator(format!("unparsable verdict ({}): {}", e, body)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json_verdict() {
        let v = parse_verdict(r#"{"isAccurate": true, "reason": "matches"}"#).unwrap();
        assert_eq!(v, Verdict::accurate("matches"));
    }

    #[test]
    fn parses_fenced_verdict() {
        let content = "```json\n{\"isAccurate\": false, \"reason\": \"wrong count\"}\n```";
        let v = parse_verdict(content).unwrap();
        assert!(!v.is_accurate);
        assert_eq!(v.reason, "wrong count");
    }

    #[test]
    fn prose_is_a_validator_error() {
        let err = parse_verdict("The answer looks right to me.").unwrap_err();
        assert!(matches!(err, BenchError::Validator(_)));
    }

    #[test]
    fn prompt_carries_question_answer_and_table() {
        let question = Question {
            key: "Q5".into(),
            question: "What is the top device?".into(),
            notes: None,
        };
        let reference = ReferenceDataset::new(
            "Devices",
            vec![[("Device", "X")].into_iter().collect()],
        );

        let prompt =
            ChatCompletionValidator::user_prompt(&question, "The top device is X", &reference).unwrap();
        assert!(prompt.contains("Question (Q5): What is the top device?"));
        assert!(prompt.contains("The top device is X"));
        assert!(prompt.contains("\"Devices\" (1 rows)"));
        assert!(prompt.contains("\"Device\": \"X\""));
    }
}
