use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use moveflow_core::config::AiConfig;
use moveflow_core::error::{MoveflowError, Result};
use moveflow_core::traits::AiAnalyzer;

/// OpenAI-compatible chat completions client. Works with OpenAI, Ollama,
/// vLLM, OpenRouter and similar endpoints.
pub struct OpenAiAnalyzer {
    http: Client,
    config: AiConfig,
}

impl OpenAiAnalyzer {
    pub fn new(config: AiConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MoveflowError::Config(format!("HTTP client: {}", e)))?;
        Ok(Self { http, config })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl AiAnalyzer for OpenAiAnalyzer {
    fn analyze<'a>(&'a self, source: &'a str, prompt: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
            let body = ChatRequest {
                model: &self.config.model_id,
                messages: vec![
                    ChatMessage {
                        role: "system",
                        content: prompt,
                    },
                    ChatMessage {
                        role: "user",
                        content: source,
                    },
                ],
                max_tokens: self.config.max_tokens,
                stream: false,
            };

            let mut req = self.http.post(&url).json(&body);
            if let Some(api_key) = &self.config.api_key {
                req = req.header("Authorization", format!("Bearer {}", api_key));
            }

            debug!(model = %self.config.model_id, chars = source.len(), "Requesting AI analysis");
            let response = req
                .send()
                .await
                .map_err(|e| MoveflowError::Analysis(e.to_string()))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_else(|_| "unknown".to_string());
                return Err(MoveflowError::Analysis(format!("HTTP {}: {}", status, body)));
            }

            let parsed: ChatResponse = response
                .json()
                .await
                .map_err(|e| MoveflowError::Analysis(e.to_string()))?;
            first_content(parsed)
        })
    }
}

fn first_content(response: ChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| MoveflowError::Analysis("response contained no message".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_content() {
        let resp: ChatResponse = serde_json::from_str(
            r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"Looks fine."}}]}"#,
        )
        .unwrap();
        assert_eq!(first_content(resp).unwrap(), "Looks fine.");
    }

    #[test]
    fn test_no_choices() {
        let resp: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(first_content(resp).is_err());
    }

    #[test]
    fn test_request_shape() {
        let body = ChatRequest {
            model: "gpt-4o-mini",
            messages: vec![ChatMessage {
                role: "system",
                content: "audit",
            }],
            max_tokens: 100,
            stream: false,
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["stream"], false);
        assert_eq!(v["messages"][0]["role"], "system");
    }
}
