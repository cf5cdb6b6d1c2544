//! Network-backed LLM client with throttle-aware retries.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ConverseOptions, LlmClient, LlmError, LlmMetrics, Message, Usage};
use crate::config::LlmConfig;

const MAX_THROTTLE_RETRIES: u32 = 3;
const MAX_TRANSPORT_RETRIES: u32 = 2;
const BASE_BACKOFF: Duration = Duration::from_millis(250);

#[derive(Serialize)]
struct ConverseRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ConverseResponseBody {
    content: String,
    usage: UsageBody,
}

#[derive(Deserialize)]
struct UsageBody {
    input_tokens: u32,
    output_tokens: u32,
}

enum Classified {
    Ok(ConverseResponseBody),
    Throttled(String),
    Invalid(String),
    Unavailable(String),
}

/// Calls the configured LLM provider once per retry-eligible failure,
/// classifying errors: `Throttled` retries with jittered
/// backoff (<=3), `InvalidInput` surfaces immediately, `UpstreamUnavailable`
/// surfaces after a bounded number of transport retries.
pub struct HttpLlmClient {
    http: reqwest::Client,
    config: LlmConfig,
}

impl HttpLlmClient {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    async fn converse_once(
        &self,
        messages: &[Message],
        options: &ConverseOptions<'_>,
    ) -> Classified {
        let body = ConverseRequest {
            model: &self.config.model_id,
            messages,
            system: options.system,
            max_tokens: options.max_tokens.unwrap_or(self.config.max_tokens),
            temperature: options.temperature.unwrap_or(self.config.temperature),
        };

        let mut request = self.http.post(&self.config.endpoint).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => return Classified::Unavailable(e.to_string()),
        };

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Classified::Throttled(format!("provider returned {status}"));
        }
        if status.is_client_error() {
            return Classified::Invalid(format!("provider returned {status}"));
        }
        if !status.is_success() {
            return Classified::Unavailable(format!("provider returned {status}"));
        }

        match response.json::<ConverseResponseBody>().await {
            Ok(parsed) => Classified::Ok(parsed),
            Err(e) => Classified::Unavailable(e.to_string()),
        }
    }

    fn jittered_backoff(attempt: u32) -> Duration {
        let base = BASE_BACKOFF * 2u32.pow(attempt);
        let jitter_ms = (deterministic_jitter(attempt) % 100) as u64;
        base + Duration::from_millis(jitter_ms)
    }
}

/// Small deterministic jitter source - avoids pulling in a `rand` dependency
/// for a single call site while still spreading retries across clients.
fn deterministic_jitter(seed: u32) -> u32 {
    seed.wrapping_mul(2654435761).rotate_left(13)
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn converse(
        &self,
        messages: &[Message],
        options: ConverseOptions<'_>,
    ) -> Result<(String, Usage, LlmMetrics), LlmError> {
        if messages.is_empty() {
            return Err(LlmError::InvalidInput("no messages supplied".to_string()));
        }

        let total_started = Instant::now();
        let mut throttle_attempt = 0;
        let mut transport_attempt = 0;

        loop {
            let model_started = Instant::now();
            match self.converse_once(messages, &options).await {
                Classified::Ok(body) => {
                    let metrics = LlmMetrics {
                        model_latency_ms: model_started.elapsed().as_millis() as u64,
                        total_latency_ms: total_started.elapsed().as_millis() as u64,
                    };
                    let usage = Usage {
                        input_tokens: body.usage.input_tokens,
                        output_tokens: body.usage.output_tokens,
                    };
                    return Ok((body.content, usage, metrics));
                }
                Classified::Invalid(msg) => return Err(LlmError::InvalidInput(msg)),
                Classified::Throttled(msg) => {
                    if throttle_attempt >= MAX_THROTTLE_RETRIES {
                        return Err(LlmError::Throttled(msg));
                    }
                    tokio::time::sleep(Self::jittered_backoff(throttle_attempt)).await;
                    throttle_attempt += 1;
                }
                Classified::Unavailable(msg) => {
                    if transport_attempt >= MAX_TRANSPORT_RETRIES {
                        return Err(LlmError::UpstreamUnavailable(msg));
                    }
                    tokio::time::sleep(BASE_BACKOFF * 2u32.pow(transport_attempt)).await;
                    transport_attempt += 1;
                }
            }
        }
    }
}
