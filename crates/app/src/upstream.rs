//! Forwarding chat-completion bodies to the provider APIs.
//!
//! Every provider is addressed through its `/v1/chat/completions` path on the
//! configured base URL. The proxy never retries: a transport failure is
//! reported once and surfaces as a 502.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::UpstreamConfig;

const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    OpenAi,
    Anthropic,
    OpenRouter,
    Custom,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::OpenRouter => "openrouter",
            Provider::Custom => "custom",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Some(Provider::OpenAi),
            "anthropic" => Some(Provider::Anthropic),
            "openrouter" => Some(Provider::OpenRouter),
            "custom" => Some(Provider::Custom),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub provider: Provider,
    /// Client `Authorization` header, forwarded as-is.
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: u16,
    /// Parsed JSON, or the raw text as a JSON string when it was not JSON.
    pub body: Value,
}

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("failed to build http client: {0}")]
    Client(String),
    #[error("no base url configured for provider {0}")]
    MissingBaseUrl(&'static str),
    #[error("invalid header value: {0}")]
    InvalidHeader(String),
    #[error("upstream request failed: {0}")]
    Transport(String),
    #[error("upstream returned an unreadable body: {0}")]
    InvalidBody(String),
}

#[async_trait]
pub trait Upstream: Send + Sync {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, UpstreamError>;
}

#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
    config: UpstreamConfig,
}

impl HttpUpstream {
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|err| UpstreamError::Client(err.to_string()))?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn base_url(&self, provider: Provider) -> Result<&str, UpstreamError> {
        let base = match provider {
            Provider::OpenAi => self.config.openai_base_url.as_str(),
            Provider::Anthropic => self.config.anthropic_base_url.as_str(),
            Provider::OpenRouter => self.config.openrouter_base_url.as_str(),
            Provider::Custom => self
                .config
                .custom_base_url
                .as_deref()
                .ok_or(UpstreamError::MissingBaseUrl(provider.as_str()))?,
        };
        Ok(base.trim_end_matches('/'))
    }

    fn headers(&self, request: &UpstreamRequest) -> Result<HeaderMap, UpstreamError> {
        let mut headers = HeaderMap::new();
        let Some(authorization) = request.authorization.as_deref() else {
            return Ok(headers);
        };
        headers.insert(AUTHORIZATION, header_value(authorization)?);
        if request.provider == Provider::Anthropic {
            let key = authorization
                .strip_prefix("Bearer ")
                .unwrap_or(authorization);
            headers.insert("x-api-key", header_value(key)?);
            headers.insert(
                "anthropic-version",
                header_value(&self.config.anthropic_version)?,
            );
        }
        Ok(headers)
    }
}

fn header_value(value: &str) -> Result<HeaderValue, UpstreamError> {
    HeaderValue::from_str(value).map_err(|err| UpstreamError::InvalidHeader(err.to_string()))
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, UpstreamError> {
        let url = format!("{}{}", self.base_url(request.provider)?, CHAT_COMPLETIONS_PATH);
        let headers = self.headers(&request)?;
        let response = self
            .client
            .post(&url)
            .headers(headers)
            .json(&request.body)
            .send()
            .await
            .map_err(|err| UpstreamError::Transport(err.to_string()))?;
        let status = response.status().as_u16();
        debug!(provider = request.provider.as_str(), status, "upstream responded");
        let text = response
            .text()
            .await
            .map_err(|err| UpstreamError::InvalidBody(err.to_string()))?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok(UpstreamResponse { status, body })
    }
}
