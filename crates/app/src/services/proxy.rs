use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value, json};
use tracing::warn;
use watchdog_core::{ChatMessage, TokenUsage};

use crate::error::{AppError, Result};
use crate::services::guard::{Assessment, GuardRequest, GuardService, Verdict};
use crate::upstream::{Provider, Upstream, UpstreamError, UpstreamRequest};

pub const DEFAULT_PROJECT_ID: &str = "default";

#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub project_id: String,
    pub provider: Provider,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub status: u16,
    pub body: Value,
    /// Present only for accepted 200 responses.
    pub assessment: Option<Assessment>,
}

/// Owned guard inputs, shared with the blocking tasks of one call.
struct GuardCall {
    project_id: String,
    provider: Provider,
    model: String,
    messages: Vec<ChatMessage>,
}

impl GuardCall {
    fn request(&self) -> GuardRequest<'_> {
        GuardRequest {
            project_id: &self.project_id,
            provider: self.provider,
            model: &self.model,
            messages: &self.messages,
        }
    }
}

#[derive(Clone)]
pub struct ProxyService {
    guard: GuardService,
    upstream: Arc<dyn Upstream>,
}

impl ProxyService {
    pub(super) fn new(guard: GuardService, upstream: Arc<dyn Upstream>) -> Self {
        Self { guard, upstream }
    }

    /// Analyzes, forwards and accounts for one chat-completion call.
    ///
    /// Non-200 upstream answers are passed through untouched and never
    /// recorded. A call pushing the project over its hourly ceiling fails
    /// with [`AppError::RateLimited`] even though the upstream already
    /// answered.
    pub async fn forward(&self, request: ProxyRequest) -> Result<ProxyResponse> {
        let ProxyRequest {
            project_id,
            provider,
            authorization,
            mut body,
        } = request;
        let project_id = normalize_project_id(&project_id);
        let object = body.as_object_mut().ok_or_else(|| {
            AppError::InvalidInput("request body must be a JSON object".to_string())
        })?;
        // Streamed responses carry no usage block to price.
        object.insert("stream".to_string(), Value::Bool(false));
        let model = object
            .get("model")
            .and_then(Value::as_str)
            .filter(|model| !model.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.guard.pricing().default_model.clone());
        let messages = parse_messages(object.get("messages"));

        let call = Arc::new(GuardCall {
            project_id,
            provider,
            model,
            messages,
        });
        let analysis = self
            .run_guard({
                let call = call.clone();
                move |guard| {
                    let analysis = guard.analyze(&call.request(), Utc::now());
                    guard.preflight(&call.project_id, Utc::now())?;
                    Ok(analysis)
                }
            })
            .await?;

        let response = self
            .upstream
            .send(UpstreamRequest {
                provider,
                authorization,
                body,
            })
            .await?;
        if response.status != 200 {
            warn!(
                project_id = %call.project_id,
                provider = provider.as_str(),
                status = response.status,
                "upstream returned an error"
            );
            return Ok(ProxyResponse {
                status: response.status,
                body: json!({ "error": response.body }),
                assessment: None,
            });
        }
        let Value::Object(mut payload) = response.body else {
            return Err(UpstreamError::InvalidBody("expected a JSON object".to_string()).into());
        };

        let usage = extract_usage(&payload);
        let verdict = self
            .run_guard(move |guard| guard.evaluate(&call.request(), &analysis, usage, Utc::now()))
            .await?;
        match verdict {
            Verdict::Rejected(cooldown) => Err(AppError::RateLimited(Box::new(cooldown))),
            Verdict::Accepted(assessment) => {
                annotate(&mut payload, &assessment)?;
                Ok(ProxyResponse {
                    status: 200,
                    body: Value::Object(payload),
                    assessment: Some(assessment),
                })
            }
        }
    }

    /// Guard work touches SQLite and std mutexes, so it runs on the
    /// blocking pool instead of an executor thread.
    async fn run_guard<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&GuardService) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let guard = self.guard.clone();
        tokio::task::spawn_blocking(move || work(&guard))
            .await
            .map_err(|err| AppError::Message(format!("guard task failed: {err}")))?
    }
}

pub fn normalize_project_id(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        DEFAULT_PROJECT_ID.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Reads `{role, content}` pairs. Content given as an array of parts keeps
/// only the text parts, joined by newlines.
pub fn parse_messages(value: Option<&Value>) -> Vec<ChatMessage> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let role = item.get("role")?.as_str()?.to_string();
            let content = match item.get("content") {
                Some(Value::String(text)) => text.clone(),
                Some(Value::Array(parts)) => parts
                    .iter()
                    .filter_map(|part| part.get("text").and_then(Value::as_str))
                    .collect::<Vec<_>>()
                    .join("\n"),
                _ => String::new(),
            };
            Some(ChatMessage { role, content })
        })
        .collect()
}

/// OpenAI-style `prompt_tokens`/`completion_tokens`, falling back to
/// Anthropic-style `input_tokens`/`output_tokens`. Missing counts are zero.
pub fn extract_usage(payload: &Map<String, Value>) -> TokenUsage {
    let Some(usage) = payload.get("usage") else {
        return TokenUsage::default();
    };
    let count = |primary: &str, secondary: &str| {
        usage
            .get(primary)
            .or_else(|| usage.get(secondary))
            .and_then(Value::as_u64)
            .unwrap_or(0)
    };
    TokenUsage::new(
        count("prompt_tokens", "input_tokens"),
        count("completion_tokens", "output_tokens"),
    )
}

fn annotate(payload: &mut Map<String, Value>, assessment: &Assessment) -> Result<()> {
    payload.insert(
        "x_advisor_message".to_string(),
        Value::String(assessment.message.clone()),
    );
    payload.insert("x_advisor_level".to_string(), json!(assessment.level));
    payload.insert("x_total_cost_usd".to_string(), json!(assessment.cost_usd));
    payload.insert("x_total_cost_cny".to_string(), json!(assessment.cost_cny));
    payload.insert(
        "x_similarity_score".to_string(),
        json!(assessment.details.similarity),
    );
    payload.insert(
        "x_analysis_details".to_string(),
        serde_json::to_value(&assessment.details)?,
    );
    payload.insert("x_advisor_reasons".to_string(), json!(assessment.reasons));
    Ok(())
}
