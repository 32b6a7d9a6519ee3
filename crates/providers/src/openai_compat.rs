//! OpenAI-compatible provider implementation.
//!
//! Works with OpenRouter (the default endpoint), OpenAI, Ollama, vLLM and any
//! other server exposing `/chat/completions`. Only non-streaming completions
//! are needed: the director consumes the whole reply at once.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};
use vnchat_config::AppConfig;
use vnchat_core::error::ProviderError;
use vnchat_core::message::PromptMessage;
use vnchat_core::provider::{ChatRequest, ChatResponse, Usage};

const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1";

/// An OpenAI-compatible chat-completions client.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new provider with the default 120s timeout.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self::with_timeout(name, base_url, api_key, Duration::from_secs(120))
    }

    /// Create a new provider with a custom request timeout.
    pub fn with_timeout(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Create an OpenRouter provider (convenience constructor).
    pub fn openrouter(api_key: impl Into<String>) -> Self {
        Self::new("openrouter", OPENROUTER_URL, api_key)
    }

    /// Build a provider from the runtime configuration.
    ///
    /// `story_key` (from the `global` document) takes precedence over the
    /// key in `config`. Fails when neither is set.
    pub fn from_config(
        config: &AppConfig,
        story_key: Option<&str>,
    ) -> Result<Self, ProviderError> {
        let key = story_key
            .filter(|k| !k.is_empty())
            .or(config.api_key.as_deref().filter(|k| !k.is_empty()))
            .ok_or_else(|| {
                ProviderError::NotConfigured(
                    "no API key in the global document, config file or environment".into(),
                )
            })?;

        let name = if config.api_url.contains("openrouter.ai") {
            "openrouter"
        } else {
            "openai-compatible"
        };

        Ok(Self::with_timeout(
            name,
            config.api_url.as_str(),
            key,
            Duration::from_secs(config.request_timeout_secs),
        ))
    }

    fn to_api_messages(messages: &[PromptMessage]) -> Vec<ApiMessage<'_>> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: m.role.as_str(),
                content: &m.content,
            })
            .collect()
    }
}

#[async_trait]
impl vnchat_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        debug!(
            provider = %self.name,
            model = %request.model,
            messages = request.messages.len(),
            "Sending completion request"
        );
        trace!(body = %body, "Request body");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        let content = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        let usage = api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ChatResponse {
            content,
            model: api_response.model.unwrap_or(request.model),
            usage,
        })
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }
}

// --- OpenAI API types ---

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ApiChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use vnchat_core::Provider;

    /// Serve exactly one HTTP response on a random local port.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            // Read headers, then as much body as Content-Length announces.
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf);
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .find_map(|l| {
                            let lower = l.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .and_then(|v| v.trim().parse::<usize>().ok())
                        })
                        .unwrap_or(0);
                    if buf.len() >= end + 4 + length {
                        break;
                    }
                }
            }
            let response = format!(
                "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });

        format!("http://{addr}")
    }

    fn request() -> ChatRequest {
        ChatRequest {
            model: "test-model".into(),
            messages: vec![PromptMessage::system("narrate"), PromptMessage::user("hi")],
            temperature: 0.7,
            max_tokens: Some(64),
        }
    }

    #[test]
    fn openrouter_constructor() {
        let provider = OpenAiCompatProvider::openrouter("sk-test");
        assert_eq!(provider.name(), "openrouter");
        assert!(provider.base_url.contains("openrouter.ai"));
    }

    #[test]
    fn trailing_slash_trimmed() {
        let provider = OpenAiCompatProvider::new("local", "http://localhost:8080/v1/", "k");
        assert_eq!(provider.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn message_conversion_uses_wire_roles() {
        let messages = vec![
            PromptMessage::system("s"),
            PromptMessage::user("u"),
            PromptMessage::assistant("a"),
        ];
        let api = OpenAiCompatProvider::to_api_messages(&messages);
        let roles: Vec<_> = api.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec!["system", "user", "assistant"]);
    }

    #[test]
    fn from_config_prefers_story_key() {
        let config = AppConfig {
            api_key: Some("sk-file".into()),
            ..AppConfig::default()
        };
        let provider = OpenAiCompatProvider::from_config(&config, Some("sk-story")).unwrap();
        assert_eq!(provider.api_key, "sk-story");
        assert_eq!(provider.name(), "openrouter");

        let provider = OpenAiCompatProvider::from_config(&config, Some("")).unwrap();
        assert_eq!(provider.api_key, "sk-file");
    }

    #[test]
    fn from_config_without_key_is_not_configured() {
        let result = OpenAiCompatProvider::from_config(&AppConfig::default(), None);
        assert!(matches!(result, Err(ProviderError::NotConfigured(_))));
    }

    #[test]
    fn parse_response_without_content() {
        let data = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        let parsed: ApiResponse = serde_json::from_str(data).unwrap();
        assert!(parsed.choices[0].message.content.is_none());
        assert!(parsed.model.is_none());
    }

    #[tokio::test]
    async fn complete_reads_first_choice() {
        let url = serve_once(
            "HTTP/1.1 200 OK",
            r#"{"model":"served-model","choices":[{"message":{"content":"<<<Alice>>>Hello!"}}],"usage":{"prompt_tokens":3,"completion_tokens":2,"total_tokens":5}}"#,
        )
        .await;
        let provider = OpenAiCompatProvider::new("local", url, "k");

        let response = provider.complete(request()).await.unwrap();
        assert_eq!(response.content, "<<<Alice>>>Hello!");
        assert_eq!(response.model, "served-model");
        assert_eq!(response.usage.unwrap().total_tokens, 5);
    }

    #[tokio::test]
    async fn empty_choices_yield_empty_content() {
        let url = serve_once("HTTP/1.1 200 OK", r#"{"choices":[]}"#).await;
        let provider = OpenAiCompatProvider::new("local", url, "k");

        let response = provider.complete(request()).await.unwrap();
        assert!(response.is_empty());
        assert_eq!(response.model, "test-model");
    }

    #[tokio::test]
    async fn status_codes_map_to_errors() {
        let url = serve_once("HTTP/1.1 429 Too Many Requests", "{}").await;
        let err = OpenAiCompatProvider::new("local", url, "k")
            .complete(request())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::RateLimited { .. }));

        let url = serve_once("HTTP/1.1 401 Unauthorized", "{}").await;
        let err = OpenAiCompatProvider::new("local", url, "k")
            .complete(request())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::AuthenticationFailed(_)));

        let url = serve_once("HTTP/1.1 500 Internal Server Error", "boom").await;
        let err = OpenAiCompatProvider::new("local", url, "k")
            .complete(request())
            .await
            .unwrap_err();
        match err {
            ProviderError::ApiError {
                status_code,
                message,
            } => {
                assert_eq!(status_code, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("Expected ApiError, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_network_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = OpenAiCompatProvider::new("local", format!("http://{addr}"), "k")
            .complete(request())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Network(_)));
    }
}
