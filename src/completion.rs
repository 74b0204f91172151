use crate::logging;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_MODEL_KEY: &str = "qwen-2.5-7b";

const REQUEST_TIMEOUT_SECS: u64 = 60; // bounds the only suspension point of a reply
const CONNECT_TIMEOUT_SECS: u64 = 10;
const API_KEY_PREFIX: &str = "sk-";
const APP_TITLE: &str = "SkillBridge AI Assistant";

// Sampling parameters are fixed, not caller-configurable
const TEMPERATURE: f32 = 0.8;
const TOP_P: f32 = 0.9;
const FREQUENCY_PENALTY: f32 = 0.1;
const PRESENCE_PENALTY: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    pub key: &'static str,
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub max_tokens: u32,
    pub free: bool,
}

/// Free models available on OpenRouter
pub const MODELS: &[ModelInfo] = &[
    ModelInfo {
        key: "llama-3.1-8b",
        id: "meta-llama/llama-3.1-8b-instruct:free",
        name: "Llama 3.1 8B",
        description: "Fast and capable, good for general conversations",
        max_tokens: 2000,
        free: true,
    },
    ModelInfo {
        key: "llama-3.2-3b",
        id: "meta-llama/llama-3.2-3b-instruct:free",
        name: "Llama 3.2 3B",
        description: "Smaller but efficient, good for quick responses",
        max_tokens: 1500,
        free: true,
    },
    ModelInfo {
        key: "qwen-2.5-7b",
        id: "qwen/qwen-2.5-7b-instruct:free",
        name: "Qwen 2.5 7B",
        description: "Excellent for coding and technical discussions",
        max_tokens: 2000,
        free: true,
    },
    ModelInfo {
        key: "mistral-7b",
        id: "mistralai/mistral-7b-instruct:free",
        name: "Mistral 7B",
        description: "Great balance of performance and speed",
        max_tokens: 1800,
        free: true,
    },
];

pub fn find_model(key: &str) -> Option<&'static ModelInfo> {
    MODELS.iter().find(|m| m.key == key)
}

fn default_model() -> &'static ModelInfo {
    // DEFAULT_MODEL_KEY is always in the catalog
    find_model(DEFAULT_MODEL_KEY).unwrap_or(&MODELS[0])
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("API key not configured")]
    NotConfigured,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {body}")]
    Api { status: StatusCode, body: String },

    #[error("no content received from API")]
    EmptyResponse,
}

/// Anything that can turn a list of role/content pairs into one completion.
///
/// `CompletionClient` is the HTTP implementation; tests substitute their own.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Whether remote calls should be attempted at all
    fn is_configured(&self) -> bool;

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, CompletionError>;
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelEntry {
    #[serde(flatten)]
    pub model: ModelInfo,
    pub is_current: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiStatus {
    pub configured: bool,
    pub api_key: String,
    pub api_url: String,
    pub current_model: ModelInfo,
    pub available_models: Vec<ModelEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionTest {
    pub success: bool,
    pub response: Option<String>,
    pub error: Option<String>,
    pub message: String,
}

pub struct CompletionClient {
    client: Client,
    api_key: Option<String>,
    api_url: String,
    current_model: RwLock<&'static ModelInfo>,
}

impl CompletionClient {
    pub fn new(api_key: Option<String>, api_url: &str) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            api_key,
            api_url: api_url.to_string(),
            current_model: RwLock::new(default_model()),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn current_model(&self) -> &'static ModelInfo {
        *self.current_model.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Switch the model used for later calls. Unknown keys change nothing.
    pub fn set_model(&self, key: &str) -> bool {
        match find_model(key) {
            Some(model) => {
                *self.current_model.write().unwrap_or_else(|e| e.into_inner()) = model;
                logging::log_completion(None, &format!("Switched to model: {}", model.name));
                true
            }
            None => {
                logging::log_error(None, &format!("Model {} not found", key));
                false
            }
        }
    }

    pub fn available_models(&self) -> Vec<ModelEntry> {
        let current = self.current_model();
        MODELS
            .iter()
            .map(|m| ModelEntry {
                model: *m,
                is_current: m.id == current.id,
            })
            .collect()
    }

    pub fn api_status(&self) -> ApiStatus {
        let api_key = match &self.api_key {
            Some(key) if !key.is_empty() => {
                format!("{}...", key.chars().take(10).collect::<String>())
            }
            _ => "Not set".to_string(),
        };

        ApiStatus {
            configured: self.is_configured(),
            api_key,
            api_url: self.api_url.clone(),
            current_model: *self.current_model(),
            available_models: self.available_models(),
        }
    }

    /// Send a minimal fixed request and report the outcome. Diagnostic only.
    pub async fn test_connection(&self) -> ConnectionTest {
        if !self.is_configured() {
            return ConnectionTest {
                success: false,
                response: None,
                error: Some(CompletionError::NotConfigured.to_string()),
                message: "API connection failed".to_string(),
            };
        }

        let messages = [
            ChatMessage::system("You are a helpful assistant."),
            ChatMessage::user("Hello, can you respond with just \"API connection successful\"?"),
        ];

        match self.complete(&messages).await {
            Ok(response) => ConnectionTest {
                success: true,
                response: Some(response),
                error: None,
                message: "API connection successful".to_string(),
            },
            Err(e) => ConnectionTest {
                success: false,
                response: None,
                error: Some(e.to_string()),
                message: "API connection failed".to_string(),
            },
        }
    }
}

#[async_trait]
impl CompletionProvider for CompletionClient {
    fn is_configured(&self) -> bool {
        self.api_key
            .as_deref()
            .map(|key| !key.is_empty() && key.starts_with(API_KEY_PREFIX))
            .unwrap_or(false)
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, CompletionError> {
        let api_key = self.api_key.as_deref().ok_or(CompletionError::NotConfigured)?;
        let model = self.current_model();

        let request = ChatCompletionRequest {
            model: model.id,
            messages,
            max_tokens: model.max_tokens,
            temperature: TEMPERATURE,
            top_p: TOP_P,
            frequency_penalty: FREQUENCY_PENALTY,
            presence_penalty: PRESENCE_PENALTY,
            stream: false,
        };

        logging::log_completion(
            None,
            &format!(
                "POST {} model={} messages={}",
                self.api_url,
                model.id,
                messages.len()
            ),
        );

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .header("X-Title", APP_TITLE)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api { status, body });
        }

        let completion: ChatCompletionResponse = response.json().await?;

        completion.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(CompletionError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(key: Option<&str>) -> CompletionClient {
        CompletionClient::new(key.map(str::to_string), DEFAULT_API_URL).unwrap()
    }

    #[test]
    fn credential_must_carry_known_prefix() {
        assert!(client(Some("sk-or-v1-abcdef")).is_configured());
        assert!(!client(Some("pk-abcdef")).is_configured());
        assert!(!client(Some("")).is_configured());
        assert!(!client(None).is_configured());
    }

    #[test]
    fn default_model_is_qwen() {
        let c = client(None);
        assert_eq!(c.current_model().key, "qwen-2.5-7b");
        let current: Vec<_> = c.available_models().into_iter().filter(|m| m.is_current).collect();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].model.key, "qwen-2.5-7b");
    }

    #[test]
    fn unknown_model_key_leaves_selection_alone() {
        let c = client(None);
        assert!(c.set_model("mistral-7b"));
        assert_eq!(c.current_model().max_tokens, 1800);

        assert!(!c.set_model("gpt-17"));
        assert_eq!(c.current_model().key, "mistral-7b");
    }

    #[test]
    fn status_masks_the_key() {
        let status = client(Some("sk-or-v1-0123456789abcdef")).api_status();
        assert!(status.configured);
        assert_eq!(status.api_key, "sk-or-v1-0...");
        assert_eq!(status.available_models.len(), MODELS.len());

        let status = client(None).api_status();
        assert!(!status.configured);
        assert_eq!(status.api_key, "Not set");
    }

    #[test]
    fn request_carries_fixed_sampling_parameters() {
        let messages = [ChatMessage::system("be brief"), ChatMessage::user("hi")];
        let request = ChatCompletionRequest {
            model: "qwen/qwen-2.5-7b-instruct:free",
            messages: &messages,
            max_tokens: 2000,
            temperature: TEMPERATURE,
            top_p: TOP_P,
            frequency_penalty: FREQUENCY_PENALTY,
            presence_penalty: PRESENCE_PENALTY,
            stream: false,
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["max_tokens"], 2000);
        assert_eq!(body["stream"], false);
        assert!((body["top_p"].as_f64().unwrap() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn missing_content_parses_as_none() {
        let parsed: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant"}}]}"#).unwrap();
        assert!(parsed.choices[0].message.content.is_none());

        let parsed: ChatCompletionResponse = serde_json::from_str(r#"{"error":"x"}"#).unwrap();
        assert!(parsed.choices.is_empty());
    }

    #[tokio::test]
    async fn connection_test_without_credential_fails() {
        let result = client(None).test_connection().await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("API key not configured"));
    }
}
