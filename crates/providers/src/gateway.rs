use std::sync::Arc;
use std::time::Duration;

use dexter_core::types::{ChatMessage, LLMResponse};
use dexter_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::retry::with_retry;
use crate::Provider;

const JSON_ONLY_INSTRUCTION: &str =
    "\n\nRespond with a single JSON object only. No prose before or after it.";

/// The sole boundary the agent talks to the language model through.
///
/// Wraps a `Provider` with the retry policy and three call shapes: free
/// text, tool-bound, and schema-coerced structured output. A structured
/// response that fails to parse counts as a failed attempt and is retried.
#[derive(Clone)]
pub struct Gateway {
    provider: Arc<dyn Provider>,
    max_attempts: u32,
    base_delay: Duration,
}

impl Gateway {
    pub fn new(provider: Arc<dyn Provider>, max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            provider,
            max_attempts,
            base_delay,
        }
    }

    fn messages(prompt: &str, system: Option<&str>) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(ChatMessage::system(system));
        }
        messages.push(ChatMessage::user(prompt));
        messages
    }

    /// Free-text call. An empty response is a failed attempt.
    pub async fn text(&self, prompt: &str, system: Option<&str>) -> Result<String> {
        let messages = Self::messages(prompt, system);
        with_retry(self.max_attempts, self.base_delay, || {
            let messages = messages.clone();
            async move {
                let response = self.provider.chat(&messages, &[]).await?;
                match response.content {
                    Some(text) if !text.trim().is_empty() => Ok(text),
                    _ => Err(Error::Provider("Empty response from LLM".to_string())),
                }
            }
        })
        .await
    }

    /// Tool-bound call. The response may carry zero or more tool calls.
    pub async fn with_tools(
        &self,
        prompt: &str,
        system: Option<&str>,
        tools: &[Value],
    ) -> Result<LLMResponse> {
        let messages = Self::messages(prompt, system);
        with_retry(self.max_attempts, self.base_delay, || {
            let messages = messages.clone();
            async move { self.provider.chat(&messages, tools).await }
        })
        .await
    }

    /// Schema-coerced call: the model is told to answer with JSON only, and
    /// the reply is deserialized into `T`. Code fences around the object are
    /// tolerated.
    pub async fn structured<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<T> {
        let prompt = format!("{}{}", prompt, JSON_ONLY_INSTRUCTION);
        let messages = Self::messages(&prompt, system);
        with_retry(self.max_attempts, self.base_delay, || {
            let messages = messages.clone();
            async move {
                let response = self.provider.chat(&messages, &[]).await?;
                let text = response
                    .content
                    .ok_or_else(|| Error::Provider("Empty response from LLM".to_string()))?;
                let json = extract_json(&text).ok_or_else(|| {
                    Error::Provider(format!("No JSON object in response: {}", text))
                })?;
                debug!(json = %json, "Parsing structured output");
                serde_json::from_str::<T>(&json)
                    .map_err(|e| Error::Provider(format!("Structured output mismatch: {}", e)))
            }
        })
        .await
    }
}

/// Pull the first complete JSON object out of a model reply, skipping any
/// surrounding prose or markdown code fences.
fn extract_json(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[start..=i].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde::Deserialize;
    use std::sync::Mutex;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Flag {
        done: bool,
    }

    /// Provider that replays a scripted list of responses.
    struct ScriptedProvider {
        responses: Mutex<Vec<Result<LLMResponse>>>,
    }

    impl ScriptedProvider {
        fn new(responses: Vec<Result<LLMResponse>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses),
            })
        }

        fn text_response(text: &str) -> Result<LLMResponse> {
            Ok(LLMResponse {
                content: Some(text.to_string()),
                ..Default::default()
            })
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        async fn chat(&self, _messages: &[ChatMessage], _tools: &[Value]) -> Result<LLMResponse> {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(Error::Provider("script exhausted".into()));
            }
            responses.remove(0)
        }
    }

    fn gateway(provider: Arc<ScriptedProvider>) -> Gateway {
        Gateway::new(provider, 3, Duration::from_millis(1))
    }

    #[test]
    fn test_extract_json_plain_and_fenced() {
        assert_eq!(
            extract_json(r#"{"done": true}"#).unwrap(),
            r#"{"done": true}"#
        );
        assert_eq!(
            extract_json("Here you go:\n```json\n{\"done\": false}\n```").unwrap(),
            r#"{"done": false}"#
        );
        assert_eq!(
            extract_json(r#"prefix {"a": {"b": "}"}} suffix"#).unwrap(),
            r#"{"a": {"b": "}"}}"#
        );
        assert!(extract_json("no json here").is_none());
        assert!(extract_json("{\"unterminated\": ").is_none());
    }

    #[tokio::test]
    async fn test_structured_parses_fenced_json() {
        let provider =
            ScriptedProvider::new(vec![ScriptedProvider::text_response("```json\n{\"done\": true}\n```")]);
        let flag: Flag = gateway(provider).structured("is it done?", None).await.unwrap();
        assert!(flag.done);
    }

    #[tokio::test]
    async fn test_structured_retries_after_malformed_output() {
        let provider = ScriptedProvider::new(vec![
            ScriptedProvider::text_response("sorry, cannot help"),
            ScriptedProvider::text_response(r#"{"done": false}"#),
        ]);
        let flag: Flag = gateway(provider).structured("is it done?", None).await.unwrap();
        assert!(!flag.done);
    }

    #[tokio::test]
    async fn test_structured_exhaustion_is_provider_error() {
        let provider = ScriptedProvider::new(vec![
            ScriptedProvider::text_response("nope"),
            ScriptedProvider::text_response("still nope"),
            ScriptedProvider::text_response("never"),
        ]);
        let result: Result<Flag> = gateway(provider).structured("is it done?", None).await;
        assert!(matches!(result, Err(Error::Provider(_))));
    }

    #[tokio::test]
    async fn test_text_rejects_empty_content() {
        let provider = ScriptedProvider::new(vec![
            Ok(LLMResponse::default()),
            ScriptedProvider::text_response("an answer"),
        ]);
        let text = gateway(provider).text("question", Some("system")).await.unwrap();
        assert_eq!(text, "an answer");
    }
}
