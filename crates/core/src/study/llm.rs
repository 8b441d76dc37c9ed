use crate::error::StudyError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_STUDY_MODEL: &str = "mixtral-8x7b-32768";

/// One-method chat capability the study generators are written against.
/// Production uses [`LlmClient`]; tests script replies.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, StudyError>;
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Full URL of an OpenAI-style chat completions endpoint.
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
}

impl LlmConfig {
    /// Reads `STUDY_LLM_ENDPOINT`, `STUDY_LLM_MODEL`, and
    /// `STUDY_LLM_API_KEY`. No endpoint, or a blank one, means the study
    /// tools are unconfigured.
    pub fn from_env() -> Option<Self> {
        let endpoint = std::env::var("STUDY_LLM_ENDPOINT").ok()?;
        let endpoint = endpoint.trim().to_string();
        if endpoint.is_empty() {
            return None;
        }

        let model = std::env::var("STUDY_LLM_MODEL")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_STUDY_MODEL.to_string());

        let api_key = std::env::var("STUDY_LLM_API_KEY").ok().and_then(|value| {
            let key = value.trim().to_string();
            if key.is_empty() {
                None
            } else {
                Some(key)
            }
        });

        Some(Self {
            endpoint,
            model,
            api_key,
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

pub struct LlmClient {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    client: Client,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self, StudyError> {
        Url::parse(&config.endpoint)?;

        Ok(Self {
            endpoint: config.endpoint,
            model: config.model,
            api_key: config.api_key,
            client: Client::new(),
        })
    }

    pub fn from_env() -> Result<Self, StudyError> {
        let config = LlmConfig::from_env().ok_or_else(|| {
            StudyError::NotConfigured("STUDY_LLM_ENDPOINT is not set".to_string())
        })?;

        Self::new(config)
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionModel for LlmClient {
    async fn complete(
        &self,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, StudyError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature,
            max_tokens,
        };

        let mut call = self.client.post(&self.endpoint).json(&request);
        if let Some(api_key) = &self.api_key {
            call = call.bearer_auth(api_key);
        }

        let response = call.send().await?;

        if !response.status().is_success() {
            return Err(StudyError::BackendResponse {
                backend: "study llm".to_string(),
                details: response.status().to_string(),
            });
        }

        let payload: ChatResponse = response.json().await?;
        let content = payload
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| StudyError::BackendResponse {
                backend: "study llm".to_string(),
                details: "response carried no choices".to_string(),
            })?;

        Ok(content.trim().to_string())
    }
}

/// Slices out the first `[` through the last `]` of a reply whose JSON is
/// wrapped in prose or code fences. Callers still have to parse the slice.
pub fn extract_json_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}
