/*!
 * Mock model client for testing.
 *
 * - `MockModelClient::working(reply)` always answers with `reply`
 * - `MockModelClient::intermittent(n)` fails every n-th call
 * - `MockModelClient::failing()` always fails with an error
 * - `MockModelClient::sequence(..)` plays back scripted outcomes
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{GenerateRequest, GenerateResponse, ModelClient};
use crate::errors::ProviderError;

/// Behavior mode for the mock client
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a fixed reply
    Working(String),
    /// Returns the prompt unchanged
    Echo,
    /// Fails intermittently (every Nth request)
    Intermittent {
        /// Period of failures
        fail_every: usize,
    },
    /// Always fails with an error
    Failing,
    /// Returns empty text
    Empty,
    /// Sleeps before answering with a fixed reply
    Slow {
        /// Delay before answering
        delay_ms: u64,
    },
}

/// Mock client for testing translation behavior
#[derive(Debug)]
pub struct MockModelClient {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter
    request_count: Arc<AtomicUsize>,
    /// Custom response generator (optional), takes precedence over `Working`
    custom_response: Option<fn(&GenerateRequest) -> String>,
    /// Scripted outcomes consumed before falling back to `behavior`
    script: Arc<Mutex<VecDeque<Result<String, ProviderError>>>>,
    /// Prompts received, in order
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockModelClient {
    /// Create a new mock client with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            custom_response: None,
            script: Arc::new(Mutex::new(VecDeque::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a client that always answers `reply`
    pub fn working(reply: impl Into<String>) -> Self {
        Self::new(MockBehavior::Working(reply.into()))
    }

    /// Create a client that returns its prompt
    pub fn echo() -> Self {
        Self::new(MockBehavior::Echo)
    }

    /// Create an intermittently failing client
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    /// Create a client that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a client that returns empty text
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Create a client that answers after `delay_ms`
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Create a client that plays back `outcomes` and then keeps failing
    pub fn sequence<I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = Result<String, ProviderError>>,
    {
        let client = Self::failing();
        client.script.lock().extend(outcomes);
        client
    }

    /// Set a custom response generator
    pub fn with_custom_response(mut self, generator: fn(&GenerateRequest) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Number of generate calls so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    fn reply_text(&self, request: &GenerateRequest, fallback: &str) -> String {
        match self.custom_response {
            Some(generator) => generator(request),
            None => fallback.to_string(),
        }
    }
}

impl Clone for MockModelClient {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior.clone(),
            request_count: Arc::clone(&self.request_count),
            custom_response: self.custom_response,
            script: Arc::clone(&self.script),
            prompts: Arc::clone(&self.prompts),
        }
    }
}

fn response(text: String) -> GenerateResponse {
    GenerateResponse {
        eval_count: Some(text.split_whitespace().count() as u64),
        text,
        model: "mock".to_string(),
        eval_duration: None,
    }
}

#[async_trait]
impl ModelClient for MockModelClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(request.prompt.clone());

        let scripted = self.script.lock().pop_front();
        if let Some(outcome) = scripted {
            return outcome.map(response);
        }

        match &self.behavior {
            MockBehavior::Working(reply) => Ok(response(self.reply_text(request, reply))),

            MockBehavior::Echo => Ok(response(request.prompt.clone())),

            MockBehavior::Intermittent { fail_every } => {
                if *fail_every > 0 && count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        status_code: 500,
                        message: format!("Simulated intermittent failure on request {}", count + 1),
                    })
                } else {
                    Ok(response(self.reply_text(request, "respuesta simulada")))
                }
            }

            MockBehavior::Failing => Err(ProviderError::ConnectionError(
                "Simulated connection failure".to_string(),
            )),

            MockBehavior::Empty => Err(ProviderError::EmptyResponse),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
                Ok(response(self.reply_text(request, "respuesta lenta")))
            }
        }
    }

    async fn is_healthy(&self) -> bool {
        self.behavior != MockBehavior::Failing || !self.script.lock().is_empty()
    }

    fn name(&self) -> &str {
        "mock"
    }
}
