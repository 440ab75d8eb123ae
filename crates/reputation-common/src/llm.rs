use std::sync::OnceLock;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use regex::Regex;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use reputation_core::scorer::SentimentOracle;

use crate::error::{parse_var, CommonError};

const SCORING_INSTRUCTION: &str = "You rate the sentiment of customer reviews. Reply with a \
single number between -1.0 (very negative) and 1.0 (very positive), where 0.0 is neutral. \
Reply with the number only.";

#[derive(Clone, Debug)]
pub struct LlmClientConfig {
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub max_error_body_bytes: usize,
}

impl LlmClientConfig {
    /// `model` is required; everything else falls back to a local OpenAI-compatible host.
    /// Values that are set but malformed are rejected.
    pub fn from_lookup(
        model: String,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, CommonError> {
        let base_url = lookup("OPENAI_BASE_URL").unwrap_or_else(|| "http://localhost:8001/v1".to_string());

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            timeout: Duration::from_secs(parse_var(&lookup, "OPENAI_TIMEOUT_SECS")?.unwrap_or(30)),
            max_retries: parse_var::<u32>(&lookup, "OPENAI_MAX_RETRIES")?.unwrap_or(2),
            initial_backoff: Duration::from_millis(
                parse_var(&lookup, "OPENAI_RETRY_INITIAL_MS")?.unwrap_or(200),
            ),
            max_backoff: Duration::from_millis(parse_var(&lookup, "OPENAI_RETRY_MAX_MS")?.unwrap_or(5_000)),
            max_error_body_bytes: 8 * 1024,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorObject,
}

#[derive(Debug, Deserialize)]
struct ErrorObject {
    message: Option<String>,
}

/// Minimal chat-completions client for an OpenAI-compatible host.
#[derive(Clone)]
pub struct LlmClient {
    config: LlmClientConfig,
    http: reqwest::Client,
}

impl LlmClient {
    pub fn new(config: LlmClientConfig) -> Result<Self, CommonError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("reputation-common/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &LlmClientConfig {
        &self.config
    }

    /// Send `messages` and return the first choice's text.
    pub async fn complete(&self, messages: &[Message]) -> Result<String, CommonError> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let request = ChatRequest {
            model: &self.config.model,
            messages,
            temperature: 0.0,
            max_tokens: 16,
        };

        let mut attempt: u32 = 0;
        loop {
            match self.post_once(&url, &request).await {
                Ok(text) => return Ok(text),
                Err(e) if attempt < self.config.max_retries && is_transient(&e) => {
                    let delay = retry_delay(self.config.initial_backoff, self.config.max_backoff, attempt);
                    attempt += 1;
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "chat completion failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn post_once(&self, url: &str, request: &ChatRequest<'_>) -> Result<String, CommonError> {
        let resp = self
            .http
            .post(url)
            .timeout(self.config.timeout)
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.bytes().await.map(|b| {
                let end = b.len().min(self.config.max_error_body_bytes);
                String::from_utf8_lossy(&b[..end]).to_string()
            })?;
            return Err(upstream_error(status, body));
        }

        let parsed: ChatResponse = resp.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| CommonError::Protocol("missing choices[0].message.content".to_string()))
    }
}

fn upstream_error(status: StatusCode, body: String) -> CommonError {
    match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => CommonError::Upstream {
            status,
            message: envelope
                .error
                .message
                .unwrap_or_else(|| "unknown upstream error".to_string()),
        },
        Err(_) => CommonError::UpstreamBody { status, body },
    }
}

fn is_transient(err: &CommonError) -> bool {
    match err {
        CommonError::Request(e) => e.is_timeout() || e.is_connect(),
        CommonError::Upstream { status, .. } | CommonError::UpstreamBody { status, .. } => {
            *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
        }
        _ => false,
    }
}

/// Exponential backoff from `initial`, capped at `max`, plus up to 25% jitter.
fn retry_delay(initial: Duration, max: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt);
    let base = initial.saturating_mul(factor).min(max);
    let spread = (base.as_millis() as u64 / 4).max(1);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0);
    base + Duration::from_millis(nanos % (spread + 1))
}

/// First signed decimal number in a model reply, e.g. `"Score: -0.75."` -> `-0.75`.
pub fn parse_score(reply: &str) -> Option<f64> {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    let re = NUMBER.get_or_init(|| Regex::new(r"[-+]?\d*\.?\d+").expect("valid regex"));
    re.find(reply)?.as_str().parse::<f64>().ok()
}

/// Sentiment oracle backed by a chat model. Failures degrade to a neutral 0.0.
#[derive(Clone)]
pub struct LlmOracle {
    client: LlmClient,
}

impl LlmOracle {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl SentimentOracle for LlmOracle {
    async fn score(&self, text: &str) -> f64 {
        let messages = [Message::system(SCORING_INSTRUCTION), Message::user(text)];
        match self.client.complete(&messages).await {
            Ok(reply) => match parse_score(&reply) {
                Some(score) => {
                    debug!(score, "model scored review");
                    score
                }
                None => {
                    warn!(reply = %reply, "model reply had no score, using neutral");
                    0.0
                }
            },
            Err(e) => {
                warn!(error = %e, model = %self.client.config().model, "scoring request failed, using neutral");
                0.0
            }
        }
    }

    fn name(&self) -> &'static str {
        "llm"
    }
}
