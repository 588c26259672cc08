/*!
 * Ollama client.
 *
 * Talks to a local Ollama server: `/api/generate` for non-streaming
 * completions, `/api/tags` for health checks and model listing, and
 * `/api/version`.
 */

use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{GenerateRequest, GenerateResponse, ModelClient};
use crate::errors::ProviderError;

/// Timeout of the health probe
const HEALTH_TIMEOUT_SECS: u64 = 5;

/// Ollama client for interacting with Ollama API
#[derive(Debug, Clone)]
pub struct Ollama {
    /// Base URL of the Ollama API
    base_url: String,
    /// HTTP client for generation calls
    client: Client,
    /// Read timeout in seconds, reported on timeouts
    read_timeout_secs: u64,
    /// Timeout of the health probe
    health_timeout: Duration,
}

/// Generate request for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model name to use for generation
    model: String,
    /// Prompt to generate from
    prompt: String,
    /// Additional model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
    /// Whether to stream the response
    stream: bool,
}

/// Generation options for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Sampling temperature
    temperature: f32,
    /// Top-p sampling
    top_p: f32,
}

/// Generation response from the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Model name
    #[serde(default)]
    pub model: String,
    /// Generated text
    #[serde(default)]
    pub response: String,
    /// Whether the generation is complete
    #[serde(default)]
    pub done: bool,
    /// Number of generated tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,
    /// Duration of generation in nanoseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval_duration: Option<u64>,
}

/// Model entry of `/api/tags`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model name including tag
    pub name: String,
    /// Size on disk in bytes
    #[serde(default)]
    pub size: u64,
    /// Last modification time as reported by the server
    #[serde(default)]
    pub modified_at: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

impl From<&GenerateRequest> for GenerationRequest {
    fn from(request: &GenerateRequest) -> Self {
        Self {
            model: request.model.clone(),
            prompt: request.prompt.clone(),
            options: Some(GenerationOptions {
                temperature: request.temperature,
                top_p: request.top_p,
            }),
            stream: false,
        }
    }
}

impl Ollama {
    /// Create a client for `endpoint` with connect and read timeouts in seconds
    pub fn new(endpoint: impl Into<String>, connect_timeout_secs: u64, read_timeout_secs: u64) -> Self {
        let base_url = endpoint.into().trim_end_matches('/').to_string();

        Self {
            base_url,
            client: Client::builder()
                .connect_timeout(Duration::from_secs(connect_timeout_secs))
                .timeout(Duration::from_secs(read_timeout_secs))
                // Ollama speaks HTTP/1.1
                .http1_only()
                .pool_idle_timeout(Duration::from_secs(90))
                .tcp_keepalive(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            read_timeout_secs,
            health_timeout: Duration::from_secs(HEALTH_TIMEOUT_SECS),
        }
    }

    /// Create a client with default timeouts
    pub fn from_url(url: impl Into<String>) -> Self {
        Self::new(url, 30, 300)
    }

    /// Override the health probe timeout
    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    /// Base URL of the server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_send_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(self.read_timeout_secs)
        } else if e.is_connect() {
            ProviderError::ConnectionError(e.to_string())
        } else {
            ProviderError::RequestFailed(e.to_string())
        }
    }

    /// Call `/api/generate` once
    pub async fn generate_raw(&self, request: &GenerationRequest) -> Result<GenerationResponse, ProviderError> {
        let url = format!("{}/api/generate", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Ollama API error ({}): {}", status, error_text);
            return Err(ProviderError::ApiError {
                status_code: status.as_u16(),
                message: error_text,
            });
        }

        let response_text = response.text().await.map_err(|e| self.map_send_error(e))?;
        parse_generation_response(&response_text)
    }

    /// Names and sizes of locally available models
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(self.health_timeout)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::ApiError {
                status_code: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;
        Ok(tags.models)
    }

    /// Server version string
    pub async fn version(&self) -> Result<String, ProviderError> {
        let url = format!("{}/api/version", self.base_url);
        let response: serde_json::Value = self
            .client
            .get(&url)
            .timeout(self.health_timeout)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        response["version"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::ParseError("Invalid version format in response".to_string()))
    }
}

/// Parse a generate response, accepting a single object or JSONL stream output
pub fn parse_generation_response(response_text: &str) -> Result<GenerationResponse, ProviderError> {
    if let Ok(parsed) = serde_json::from_str::<GenerationResponse>(response_text) {
        return Ok(parsed);
    }

    let preview: String = response_text.chars().take(500).collect();
    debug!("Response is not a single JSON object, trying JSONL: {}", preview);

    let values: Vec<serde_json::Value> = response_text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect();

    let Some(last) = values.last() else {
        error!("Failed to parse Ollama API response. Raw response (first 500 chars): {}", preview);
        return Err(ProviderError::ParseError(
            "Response contains invalid JSON".to_string(),
        ));
    };

    let text: String = values
        .iter()
        .filter_map(|v| v.get("response").and_then(|r| r.as_str()))
        .collect();

    Ok(GenerationResponse {
        model: last
            .get("model")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string(),
        response: text,
        done: last.get("done").and_then(|v| v.as_bool()).unwrap_or(true),
        eval_count: last.get("eval_count").and_then(|v| v.as_u64()),
        eval_duration: last.get("eval_duration").and_then(|v| v.as_u64()),
    })
}

#[async_trait]
impl ModelClient for Ollama {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, ProviderError> {
        let response = self.generate_raw(&GenerationRequest::from(request)).await?;
        if response.response.trim().is_empty() {
            return Err(ProviderError::EmptyResponse);
        }

        Ok(GenerateResponse {
            text: response.response,
            model: response.model,
            eval_count: response.eval_count,
            eval_duration: response.eval_duration,
        })
    }

    async fn is_healthy(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).timeout(self.health_timeout).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Ollama health check failed: {}", e);
                false
            }
        }
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
