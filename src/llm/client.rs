//! HTTP client that speaks both local LLM dialects and normalizes their replies.
//!
//! Behaviour:
//! - The dialect comes from an explicit [`ProtocolVariant`] or is inferred from the endpoint.
//! - One attempt per call, no retries; failures surface immediately.
//! - Model listing never fails: any error degrades to an empty list.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use url::Url;

use super::error::{LlmError, LlmResult};
use super::protocol::ProtocolVariant;
use super::types::{
    ChatMessage, OllamaChatRequest, OllamaChatResponse, OllamaOptions, OllamaTagsResponse,
    OpenAiChatRequest, OpenAiChatResponse, OpenAiModelsResponse,
};

/// Upper bound for a chat completion round-trip.
pub const CHAT_TIMEOUT: Duration = Duration::from_secs(120);
/// Upper bound for a model listing round-trip.
pub const MODELS_TIMEOUT: Duration = Duration::from_secs(10);

/// Parameters of a single chat completion.
#[derive(Clone, Copy, Debug)]
pub struct ChatCall<'a> {
    /// Base URL of the runtime, e.g. `http://localhost:11434`.
    pub endpoint: &'a str,
    /// Explicit dialect; inferred from `endpoint` when `None`.
    pub protocol: Option<ProtocolVariant>,
    /// Model name as known by the runtime.
    pub model: &'a str,
    /// Full conversation, system prompt included.
    pub messages: &'a [ChatMessage],
    /// Sampling temperature.
    pub temperature: f64,
}

/// Async client for Ollama and OpenAI-compatible runtimes.
#[derive(Clone, Debug)]
pub struct LlmClient {
    client: Client,
    chat_timeout: Duration,
    models_timeout: Duration,
}

impl LlmClient {
    /// Create a client with the default timeouts.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new() -> LlmResult<Self> {
        Self::with_timeouts(CHAT_TIMEOUT, MODELS_TIMEOUT)
    }

    /// Create a client with custom chat and model-listing timeouts.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_timeouts(chat_timeout: Duration, models_timeout: Duration) -> LlmResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| LlmError::HttpClient(e.to_string()))?;
        Ok(Self {
            client,
            chat_timeout,
            models_timeout,
        })
    }

    /// Send a chat completion and return the reply text.
    ///
    /// # Errors
    /// Returns an error if the model is empty, the endpoint is unusable, the runtime
    /// cannot be reached, answers with a non-200 status, or sends an unreadable body.
    pub async fn send_chat(&self, call: &ChatCall<'_>) -> LlmResult<String> {
        if call.model.trim().is_empty() {
            return Err(LlmError::MissingModel);
        }

        let variant = ProtocolVariant::resolve(call.protocol, call.endpoint);
        let url = endpoint_url(call.endpoint, variant.chat_path())?;
        tracing::info!("Calling {url} with model {}", call.model);

        let request = match variant {
            ProtocolVariant::Ollama => self.client.post(&url).json(&OllamaChatRequest {
                model: call.model,
                messages: call.messages,
                stream: false,
                options: OllamaOptions {
                    temperature: call.temperature,
                },
            }),
            ProtocolVariant::OpenAi => self.client.post(&url).json(&OpenAiChatRequest {
                model: call.model,
                messages: call.messages,
                temperature: call.temperature,
            }),
        };

        let response = request
            .timeout(self.chat_timeout)
            .send()
            .await
            .map_err(|e| log_failure(LlmError::from(e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(log_failure(LlmError::Status {
                status: status.as_u16(),
                body,
            }));
        }

        let body = response
            .text()
            .await
            .map_err(|e| log_failure(LlmError::from(e)))?;
        extract_reply(variant, &body).map_err(log_failure)
    }

    /// List the models the runtime advertises, in the order it returns them.
    ///
    /// Never fails: unreachable runtimes, non-200 answers and malformed bodies all
    /// yield an empty list.
    pub async fn list_models(&self, endpoint: &str, protocol: Option<ProtocolVariant>) -> Vec<String> {
        match self.try_list_models(endpoint, protocol).await {
            Ok(models) => models,
            Err(e) => {
                tracing::error!("Error fetching models: {e}");
                Vec::new()
            }
        }
    }

    async fn try_list_models(
        &self,
        endpoint: &str,
        protocol: Option<ProtocolVariant>,
    ) -> LlmResult<Vec<String>> {
        let variant = ProtocolVariant::resolve(protocol, endpoint);
        let url = endpoint_url(endpoint, variant.models_path())?;

        let response = self
            .client
            .get(&url)
            .timeout(self.models_timeout)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let body = response.text().await?;
        extract_models(variant, &body)
    }
}

/// Join the base endpoint and an API path, rejecting endpoints that are not URLs.
fn endpoint_url(endpoint: &str, path: &str) -> LlmResult<String> {
    let base = endpoint.trim().trim_end_matches('/');
    Url::parse(base).map_err(|source| LlmError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        source,
    })?;
    Ok(format!("{base}{path}"))
}

fn extract_reply(variant: ProtocolVariant, body: &str) -> LlmResult<String> {
    let content = match variant {
        ProtocolVariant::Ollama => {
            let parsed: OllamaChatResponse = serde_json::from_str(body)
                .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;
            parsed.message.content
        }
        ProtocolVariant::OpenAi => {
            let parsed: OpenAiChatResponse = serde_json::from_str(body)
                .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;
            parsed
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| LlmError::MalformedResponse("response has no choices".to_string()))?
                .message
                .content
        }
    };
    Ok(content.unwrap_or_default())
}

fn extract_models(variant: ProtocolVariant, body: &str) -> LlmResult<Vec<String>> {
    let malformed = |e: serde_json::Error| LlmError::MalformedResponse(e.to_string());
    let models = match variant {
        ProtocolVariant::Ollama => serde_json::from_str::<OllamaTagsResponse>(body)
            .map_err(malformed)?
            .models
            .into_iter()
            .map(|m| m.name)
            .collect(),
        ProtocolVariant::OpenAi => serde_json::from_str::<OpenAiModelsResponse>(body)
            .map_err(malformed)?
            .data
            .into_iter()
            .map(|m| m.id)
            .collect(),
    };
    Ok(models)
}

fn log_failure(err: LlmError) -> LlmError {
    tracing::error!("{err}");
    err
}
