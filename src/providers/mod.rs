/*!
 * Model backends used by the translation pipeline.
 *
 * - Ollama: local LLM server over HTTP
 * - Mock: scripted client for tests and offline runs
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// One text generation call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    /// Model name as known to the backend
    pub model: String,
    /// Full prompt
    pub prompt: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Nucleus sampling cutoff
    pub top_p: f32,
}

impl GenerateRequest {
    /// Create a request with the pipeline's default sampling settings
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            temperature: 0.3,
            top_p: 0.9,
        }
    }

    /// Set the sampling temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set top-p
    pub fn top_p(mut self, top_p: f32) -> Self {
        self.top_p = top_p;
        self
    }
}

/// Text returned by a backend
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenerateResponse {
    /// Generated text
    pub text: String,
    /// Model that answered
    pub model: String,
    /// Number of generated tokens, when reported
    pub eval_count: Option<u64>,
    /// Generation time in nanoseconds, when reported
    pub eval_duration: Option<u64>,
}

/// Common trait for all model backends
///
/// Implementations do not retry; retry and backoff belong to the pipeline.
#[async_trait]
pub trait ModelClient: Send + Sync + Debug {
    /// Run one generation
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, ProviderError>;

    /// Cheap reachability probe
    async fn is_healthy(&self) -> bool;

    /// Backend name for logs
    fn name(&self) -> &str;
}

pub mod mock;
pub mod ollama;
