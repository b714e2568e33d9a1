//! Ollama HTTP gateway for local model inference.

use serde::{Deserialize, Serialize};

use crate::cancel::CancelFlag;

use super::{ChatMessage, GatewayError, LlmGateway, Role};

/// Ollama chat client. The blocking HTTP call is bounded by the configured
/// timeout; the cancellation flag is honored before the request goes out.
pub struct OllamaGateway {
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaGateway {
    pub fn new(base_url: &str, model: &str, timeout_secs: u64) -> Result<Self, GatewayError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| GatewayError::ResponseParsing(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
            timeout_secs,
        })
    }

    /// Default Ollama instance at localhost:11434 with a 5-minute timeout.
    pub fn default_local(model: &str) -> Result<Self, GatewayError> {
        Self::new("http://localhost:11434", model, 300)
    }
}

/// Request body for Ollama /api/chat
#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct OllamaMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Response body from Ollama /api/chat
#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaResponseMessage,
}

#[derive(Deserialize)]
struct OllamaResponseMessage {
    content: String,
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

impl LlmGateway for OllamaGateway {
    fn complete(
        &self,
        prompt: &str,
        history: &[ChatMessage],
        cancel: &CancelFlag,
    ) -> Result<String, GatewayError> {
        if cancel.is_cancelled() {
            return Err(GatewayError::Cancelled);
        }

        let mut messages: Vec<OllamaMessage<'_>> = history
            .iter()
            .map(|m| OllamaMessage {
                role: role_str(m.role),
                content: &m.content,
            })
            .collect();
        messages.push(OllamaMessage {
            role: "user",
            content: prompt,
        });

        let url = format!("{}/api/chat", self.base_url);
        let body = OllamaChatRequest {
            model: &self.model,
            messages,
            stream: false,
        };

        let response = self.client.post(&url).json(&body).send().map_err(|e| {
            if e.is_connect() {
                GatewayError::Connection(self.base_url.clone())
            } else if e.is_timeout() {
                GatewayError::Timeout {
                    seconds: self.timeout_secs,
                }
            } else {
                GatewayError::ResponseParsing(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GatewayError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaChatResponse = response
            .json()
            .map_err(|e| GatewayError::ResponseParsing(e.to_string()))?;

        Ok(parsed.message.content)
    }
}
