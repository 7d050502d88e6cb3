//! Ollama generation client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use super::Generator;
use crate::config::AppConfig;
use crate::errors::CandidateFailureReason;
use crate::errors::Result;
use crate::errors::VedaRagError;

/// Sampling options sent with every request
#[derive(Debug, Clone, Copy, Serialize)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub top_p: f32,
    #[serde(rename = "num_predict")]
    pub max_tokens: u32,
}

/// Client for Ollama's `/api/generate`
pub struct OllamaClient {
    endpoint: String,
    options: GenerationOptions,
    client: Client,
}

impl OllamaClient {
    pub fn new(endpoint: &str, options: GenerationOptions, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VedaRagError::HttpError(e.to_string()))?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            options,
            client,
        })
    }

    /// Create from the `[llm]` config section
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(
            &config.llm.endpoint,
            GenerationOptions {
                temperature: config.llm.temperature,
                top_p: config.llm.top_p,
                max_tokens: config.llm.max_tokens,
            },
            config.generation_timeout(),
        )
    }
}

fn classify_status(status: StatusCode, body: &str) -> CandidateFailureReason {
    if status == StatusCode::NOT_FOUND || body.to_lowercase().contains("not found") {
        CandidateFailureReason::Unavailable(format!("HTTP {status}: {body}"))
    } else {
        CandidateFailureReason::Service(format!("HTTP {status}: {body}"))
    }
}

fn classify_transport(err: &reqwest::Error) -> CandidateFailureReason {
    if err.is_timeout() {
        CandidateFailureReason::Timeout
    } else {
        CandidateFailureReason::Service(err.to_string())
    }
}

#[async_trait]
impl Generator for OllamaClient {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
    ) -> std::result::Result<String, CandidateFailureReason> {
        #[derive(Serialize)]
        struct GenerateRequest<'a> {
            model: &'a str,
            prompt: &'a str,
            stream: bool,
            options: GenerationOptions,
        }

        #[derive(Deserialize)]
        struct GenerateResponse {
            response: Option<String>,
        }

        let url = format!("{}/api/generate", self.endpoint);
        debug!("Calling Ollama generate API with model {}", model);

        let request = GenerateRequest {
            model,
            prompt,
            stream: false,
            options: self.options,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(classify_status(status, &error_text));
        }

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| CandidateFailureReason::MalformedResponse(e.to_string()))?;

        match result.response {
            Some(text) if !text.trim().is_empty() => Ok(text),
            Some(_) => Err(CandidateFailureReason::MalformedResponse(
                "empty response".to_string(),
            )),
            None => Err(CandidateFailureReason::MalformedResponse(
                "missing 'response' field".to_string(),
            )),
        }
    }

    async fn available_models(&self) -> Result<Vec<String>> {
        #[derive(Deserialize)]
        struct TagsResponse {
            #[serde(default)]
            models: Vec<ModelTag>,
        }

        #[derive(Deserialize)]
        struct ModelTag {
            name: String,
        }

        let url = format!("{}/api/tags", self.endpoint);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| VedaRagError::LlmError(format!("Ollama unreachable: {e}")))?;

        if !response.status().is_success() {
            return Err(VedaRagError::LlmError(format!(
                "Ollama is not accessible ({})",
                response.status()
            )));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| VedaRagError::LlmError(format!("Failed to parse response: {e}")))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}
