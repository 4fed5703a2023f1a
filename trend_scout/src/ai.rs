use std::time::{Duration, Instant};

use async_trait::async_trait;
use backoff::backoff::Backoff;
use backoff::future::retry_notify;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::ScoutConfig;
use crate::error::{Result, ScoutError};

/// An image sent alongside a prompt to a vision-capable model.
#[derive(Debug, Clone)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// A text generation backend. One call is one round trip to the service.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    fn model_name(&self) -> &str;

    async fn generate_with_images(&self, prompt: &str, images: &[InlineImage]) -> Result<String>;

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_with_images(prompt, &[]).await
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text {
        text: &'a str,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Client for the Gemini `generateContent` REST endpoint.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, config: &ScoutConfig) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(config.model_timeout)
                .build()?,
            api_key,
            api_base: config.api_base.clone(),
            model: config.model.clone(),
        })
    }

    /// Builds the client from config, or fails with `ConfigMissing` when no key is set.
    pub fn from_config(config: &ScoutConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or(ScoutError::ConfigMissing)?;
        Self::new(api_key, config)
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish()
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    #[instrument(level = "info", skip_all, fields(model = %self.model, images = images.len()))]
    async fn generate_with_images(&self, prompt: &str, images: &[InlineImage]) -> Result<String> {
        let mut parts = vec![RequestPart::Text { text: prompt }];
        parts.extend(images.iter().map(|image| RequestPart::Inline {
            inline_data: InlineData {
                mime_type: image.mime_type.clone(),
                data: STANDARD.encode(&image.data),
            },
        }));
        let payload = GenerateRequest {
            contents: vec![Content { role: "user", parts }],
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(&self.api_key).map_err(|_| ScoutError::InvalidConfig {
                key: "GOOGLE_API_KEY",
                value: "<redacted>".to_string(),
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let t0 = Instant::now();
        let response = self
            .client
            .post(self.endpoint())
            .headers(headers)
            .json(&payload)
            .send()
            .await?;
        let status = response.status();
        debug!(%status, elapsed_ms = t0.elapsed().as_millis() as u64, "Generation call returned");

        match status {
            StatusCode::TOO_MANY_REQUESTS => return Err(ScoutError::RateLimited),
            StatusCode::NOT_FOUND => return Err(ScoutError::ModelNotFound(self.model.clone())),
            s if !s.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(ScoutError::Generation(format!("HTTP {}: {}", s, body)));
            }
            _ => {}
        }

        let body: GenerateResponse = response.json().await?;
        reply_text(body)
    }
}

fn reply_text(body: GenerateResponse) -> Result<String> {
    let text: String = body
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if !text.trim().is_empty() {
        return Ok(text);
    }

    match body.prompt_feedback.and_then(|f| f.block_reason) {
        Some(reason) => Err(ScoutError::Generation(format!("prompt blocked: {}", reason))),
        None => Err(ScoutError::Generation("empty reply".to_string())),
    }
}

/// Delay grows by a fixed step per attempt: step, 2*step, 3*step ...
/// Gives up after `max_attempts` calls in total.
#[derive(Debug, Clone)]
pub struct LinearBackoff {
    step: Duration,
    max_attempts: usize,
    attempt: usize,
}

impl LinearBackoff {
    pub fn new(step: Duration, max_attempts: usize) -> Self {
        Self {
            step,
            max_attempts: max_attempts.max(1),
            attempt: 0,
        }
    }
}

impl Backoff for LinearBackoff {
    fn reset(&mut self) {
        self.attempt = 0;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        self.attempt += 1;
        if self.attempt >= self.max_attempts {
            return None;
        }
        Some(self.step * self.attempt as u32)
    }
}

/// Retries rate-limited calls of the wrapped model. Every other failure is returned at once.
pub struct RetryingModel<M> {
    inner: M,
    step: Duration,
    max_attempts: usize,
}

impl<M: GenerativeModel> RetryingModel<M> {
    pub fn new(inner: M, step: Duration, max_attempts: usize) -> Self {
        Self {
            inner,
            step,
            max_attempts,
        }
    }
}

#[async_trait]
impl<M: GenerativeModel> GenerativeModel for RetryingModel<M> {
    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    async fn generate_with_images(&self, prompt: &str, images: &[InlineImage]) -> Result<String> {
        let total_t0 = Instant::now();
        let policy = LinearBackoff::new(self.step, self.max_attempts);

        let result = retry_notify(
            policy,
            || async move {
                self.inner
                    .generate_with_images(prompt, images)
                    .await
                    .map_err(|e| match e {
                        ScoutError::RateLimited => backoff::Error::transient(e),
                        other => backoff::Error::permanent(other),
                    })
            },
            |e: ScoutError, delay: Duration| {
                warn!(error = %e, ?delay, "Generation call rate limited; backing off");
            },
        )
        .await;

        match &result {
            Ok(_) => info!(elapsed_ms_total = total_t0.elapsed().as_millis() as u64, "Generation succeeded"),
            Err(e) => warn!(elapsed_ms_total = total_t0.elapsed().as_millis() as u64, error = %e, "Generation failed"),
        }
        result
    }
}
