//! In-process LLM client for tests: either echoes a canned JSON planner
//! result or always fails, to exercise the planner's degradation paths.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{ConverseOptions, LlmClient, LlmError, LlmMetrics, Message, Usage};

pub enum MockBehavior {
    /// Always returns this JSON body as the conversation content.
    Respond(String),
    /// Always fails with `UpstreamUnavailable`, as if the provider were down.
    AlwaysFail,
}

pub struct MockLlmClient {
    behavior: MockBehavior,
    call_count: AtomicUsize,
}

impl MockLlmClient {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn converse(
        &self,
        messages: &[Message],
        _options: ConverseOptions<'_>,
    ) -> Result<(String, Usage, LlmMetrics), LlmError> {
        if messages.is_empty() {
            return Err(LlmError::InvalidInput("no messages supplied".to_string()));
        }
        self.call_count.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            MockBehavior::Respond(body) => Ok((
                body.clone(),
                Usage {
                    input_tokens: 32,
                    output_tokens: 64,
                },
                LlmMetrics {
                    model_latency_ms: 5,
                    total_latency_ms: 5,
                },
            )),
            MockBehavior::AlwaysFail => {
                Err(LlmError::UpstreamUnavailable("mock provider down".to_string()))
            }
        }
    }
}
