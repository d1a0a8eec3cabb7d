//! OpenAI-compatible LLM client: chat completions and embeddings over a
//! single HTTP client, against any `{api_base}` serving the standard
//! `/chat/completions` and `/embeddings` routes (OpenAI, LiteLLM proxies,
//! vLLM, etc).

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use super::templates::PromptTemplateSet;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("failed to parse response: {0}")]
    ParseError(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

/// A message in a chat conversation.
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

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Request for a chat completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
            top_p: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub id: String,
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Usage,
}

impl GenerationResponse {
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub index: u32,
    pub message: Message,
    pub finish_reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatApiRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ChatApiResponse {
    id: String,
    model: String,
    choices: Vec<ApiChoice>,
    usage: ApiUsage,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    index: u32,
    message: ApiMessage,
    finish_reason: String,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Serialize)]
struct EmbeddingApiRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingApiDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingApiDatum {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct ApiErrorDetail {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
    code: Option<String>,
}

/// Client over an OpenAI-compatible API, exposing chat completions and
/// embeddings behind the one HTTP connection pool.
pub struct LlmClient {
    api_base: String,
    api_key: Option<String>,
    chat_model: String,
    embedding_model: String,
    http_client: Client,
    templates: PromptTemplateSet,
}

impl LlmClient {
    pub fn new(
        api_base: String,
        api_key: Option<String>,
        chat_model: String,
        embedding_model: String,
    ) -> Self {
        Self::with_timeout(
            api_base,
            api_key,
            chat_model,
            embedding_model,
            Duration::from_secs(120),
        )
    }

    pub fn with_timeout(
        api_base: String,
        api_key: Option<String>,
        chat_model: String,
        embedding_model: String,
        timeout: Duration,
    ) -> Self {
        Self {
            api_base,
            api_key,
            chat_model,
            embedding_model,
            http_client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("failed to build HTTP client"),
            templates: PromptTemplateSet::defaults(),
        }
    }

    /// Overrides the prompt templates this client hands to callers, e.g.
    /// with a set resolved from a configuration file.
    pub fn with_templates(mut self, templates: PromptTemplateSet) -> Self {
        self.templates = templates;
        self
    }

    pub fn templates(&self) -> &PromptTemplateSet {
        &self.templates
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn chat_model(&self) -> &str {
        &self.chat_model
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("Authorization", format!("Bearer {key}")),
            None => builder,
        }
    }

    /// Request a chat completion. `request.model` falls back to the
    /// configured default when empty.
    pub async fn chat(&self, mut request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        if request.model.is_empty() {
            request.model = self.chat_model.clone();
        }

        let api_request = ChatApiRequest {
            model: request.model,
            messages: request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            top_p: request.top_p,
        };

        let url = format!("{}/chat/completions", self.api_base);
        let builder = self
            .http_client
            .post(&url)
            .header("Content-Type", "application/json");

        let http_response = self
            .authorize(builder)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        let status = http_response.status();
        if !status.is_success() {
            return Err(self.api_error(status.as_u16(), http_response).await);
        }

        let api_response: ChatApiResponse = http_response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(format!("chat response: {e}")))?;

        Ok(GenerationResponse {
            id: api_response.id,
            model: api_response.model,
            choices: api_response
                .choices
                .into_iter()
                .map(|c| Choice {
                    index: c.index,
                    message: Message {
                        role: c.message.role,
                        content: c.message.content,
                    },
                    finish_reason: c.finish_reason,
                })
                .collect(),
            usage: Usage {
                prompt_tokens: api_response.usage.prompt_tokens,
                completion_tokens: api_response.usage.completion_tokens,
                total_tokens: api_response.usage.total_tokens,
            },
        })
    }

    /// Embed a batch of text chunks. Results are returned in the same order
    /// as `inputs`, keyed by the API's `index` field rather than assumed.
    pub async fn embed(&self, inputs: Vec<String>) -> Result<Vec<Vec<f32>>, LlmError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let api_request = EmbeddingApiRequest {
            model: &self.embedding_model,
            input: &inputs,
        };

        let url = format!("{}/embeddings", self.api_base);
        let builder = self
            .http_client
            .post(&url)
            .header("Content-Type", "application/json");

        let http_response = self
            .authorize(builder)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        let status = http_response.status();
        if !status.is_success() {
            return Err(self.api_error(status.as_u16(), http_response).await);
        }

        let mut api_response: EmbeddingApiResponse = http_response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(format!("embedding response: {e}")))?;

        api_response.data.sort_by_key(|d| d.index);

        Ok(api_response.data.into_iter().map(|d| d.embedding).collect())
    }

    async fn api_error(&self, status_code: u16, response: reqwest::Response) -> LlmError {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "failed to read error response".to_string());

        if let Ok(parsed) = serde_json::from_str::<ApiErrorResponse>(&error_text) {
            if status_code == 429 {
                return LlmError::RateLimited(parsed.error.message);
            }
            return LlmError::ApiError {
                code: status_code,
                message: parsed.error.message,
            };
        }

        LlmError::ApiError {
            code: status_code,
            message: error_text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_constructors_set_role() {
        assert_eq!(Message::system("x").role, "system");
        assert_eq!(Message::user("x").role, "user");
        assert_eq!(Message::assistant("x").role, "assistant");
    }

    #[test]
    fn generation_request_builder() {
        let request = GenerationRequest::new("gpt-4", vec![Message::user("test")])
            .with_temperature(0.7)
            .with_max_tokens(1000)
            .with_top_p(0.9);

        assert_eq!(request.model, "gpt-4");
        assert_eq!(request.temperature, Some(0.7));
        assert_eq!(request.max_tokens, Some(1000));
        assert_eq!(request.top_p, Some(0.9));
    }

    #[test]
    fn generation_response_first_content() {
        let response = GenerationResponse {
            id: "id".to_string(),
            model: "gpt-4".to_string(),
            choices: vec![Choice {
                index: 0,
                message: Message::assistant("Hello!"),
                finish_reason: "stop".to_string(),
            }],
            usage: Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            },
        };
        assert_eq!(response.first_content(), Some("Hello!"));
    }

    #[test]
    fn client_tracks_api_key_presence() {
        let with_key = LlmClient::new(
            "http://localhost:4000".to_string(),
            Some("key".to_string()),
            "gpt-4".to_string(),
            "text-embedding-3-small".to_string(),
        );
        assert!(with_key.has_api_key());

        let without_key = LlmClient::new(
            "http://localhost:4000".to_string(),
            None,
            "gpt-4".to_string(),
            "text-embedding-3-small".to_string(),
        );
        assert!(!without_key.has_api_key());
    }

    #[tokio::test]
    async fn chat_against_unreachable_host_returns_request_failed() {
        let client = LlmClient::new(
            "http://127.0.0.1:1".to_string(),
            None,
            "gpt-4".to_string(),
            "text-embedding-3-small".to_string(),
        );

        let result = client.chat(GenerationRequest::new("gpt-4", vec![Message::user("hi")])).await;
        assert!(matches!(result, Err(LlmError::RequestFailed(_))));
    }

    #[tokio::test]
    async fn embed_with_empty_input_short_circuits() {
        let client = LlmClient::new(
            "http://127.0.0.1:1".to_string(),
            None,
            "gpt-4".to_string(),
            "text-embedding-3-small".to_string(),
        );

        let result = client.embed(Vec::new()).await.unwrap();
        assert!(result.is_empty());
    }
}
