use std::time::Duration;

use editdesk_contracts::{ChatCompletionRequest, ChatMessage, ChatRole};
use editdesk_kernel::PromptPayload;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::error::GatewayError;

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout: Option<Duration>,
}

impl From<&editdesk_config::Upstream> for UpstreamConfig {
    fn from(cfg: &editdesk_config::Upstream) -> Self {
        Self {
            endpoint: cfg.endpoint.clone(),
            api_key: cfg.api_key().map(str::to_string),
            model: cfg.model.clone(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
            timeout: cfg.timeout_ms.map(Duration::from_millis),
        }
    }
}

/// A completed, successful provider call. Never modified after receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResult {
    pub http_status: u16,
    pub raw_body: String,
}

pub struct UpstreamClient {
    cfg: UpstreamConfig,
    client: Client,
}

impl UpstreamClient {
    pub fn new(cfg: UpstreamConfig) -> Result<Self, String> {
        let client = Client::builder().build().map_err(|e| e.to_string())?;
        Ok(Self { cfg, client })
    }

    pub fn chat_request(&self, payload: &PromptPayload) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.cfg.model.clone(),
            messages: vec![
                ChatMessage {
                    role: ChatRole::System,
                    content: payload.system_instruction.clone(),
                },
                ChatMessage {
                    role: ChatRole::User,
                    content: payload.user_message.clone(),
                },
            ],
            temperature: self.cfg.temperature,
            max_tokens: self.cfg.max_tokens,
        }
    }

    /// One call, no retries. Without a credential nothing is sent.
    pub async fn send(&self, payload: &PromptPayload) -> Result<UpstreamResult, GatewayError> {
        let api_key = self
            .cfg
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(GatewayError::Configuration)?;
        let request = self.chat_request(payload);

        let call = async {
            let response = self
                .client
                .post(&self.cfg.endpoint)
                .bearer_auth(api_key)
                .json(&request)
                .send()
                .await?;
            let status = response.status();
            let body = response.text().await.map_err(|e| e.to_string());
            Ok::<_, reqwest::Error>((status, body))
        };
        let outcome = match self.cfg.timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                GatewayError::UpstreamUnavailable(format!(
                    "no response within {}ms",
                    limit.as_millis()
                ))
            })?,
            None => call.await,
        };
        let (status, body) =
            outcome.map_err(|e| GatewayError::UpstreamUnavailable(e.to_string()))?;
        classify(status, body)
    }
}

/// Sorts a provider reply by status. An error status is kept even when its
/// body could not be read.
fn classify(
    status: StatusCode,
    body: Result<String, String>,
) -> Result<UpstreamResult, GatewayError> {
    let http_status = status.as_u16();
    match body {
        Ok(raw_body) => {
            debug!(
                status = http_status,
                bytes = raw_body.len(),
                "upstream responded"
            );
            if !status.is_success() {
                return Err(GatewayError::Upstream {
                    status: http_status,
                    detail: raw_body,
                });
            }
            Ok(UpstreamResult {
                http_status,
                raw_body,
            })
        }
        Err(detail) if !status.is_success() => Err(GatewayError::Upstream {
            status: http_status,
            detail,
        }),
        Err(detail) => Err(GatewayError::UpstreamUnavailable(detail)),
    }
}

/// Parses the provider envelope and returns it with the first choice's text.
/// A missing choice or content yields empty text.
pub fn assistant_text(result: &UpstreamResult) -> Result<(Value, String), GatewayError> {
    let envelope: Value = serde_json::from_str(&result.raw_body)
        .map_err(|e| GatewayError::MalformedEnvelope(e.to_string()))?;
    let text = envelope
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Ok((envelope, text))
}
