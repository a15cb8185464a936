//! OpenAI chat-completions script generator.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{parse_script_response, prompt, Cast, DialogueTurn, ScriptGenerator, ScriptStyle};
use crate::{
    article::Article,
    error::{PodcastError, Result},
};

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            temperature: 0.7,
            timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [prompt::ChatMessage],
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiScriptGenerator {
    http: Client,
    api_key: String,
    config: OpenAiConfig,
}

impl OpenAiScriptGenerator {
    pub fn new(api_key: impl Into<String>, config: OpenAiConfig) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(PodcastError::InvalidInput("OpenAI API key is empty".into()));
        }
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PodcastError::Transport(format!("http client build failed: {e}")))?;
        Ok(Self {
            http,
            api_key,
            config,
        })
    }
}

impl ScriptGenerator for OpenAiScriptGenerator {
    fn generate(
        &self,
        article: &Article,
        cast: &Cast,
        style: ScriptStyle,
    ) -> Result<Vec<DialogueTurn>> {
        let messages = prompt::build_messages(article, cast, style);
        let request = ChatRequest {
            model: &self.config.model,
            messages: &messages,
            temperature: self.config.temperature,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };
        let url = format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        debug!(model = %self.config.model, "requesting script");

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .map_err(|e| PodcastError::ScriptGeneration(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            warn!(status = %status, "script request returned non-success status");
            return Err(PodcastError::ScriptGeneration(format!(
                "OpenAI returned {}: {}",
                status.as_u16(),
                body.trim()
            )));
        }

        let payload: ChatResponse = response
            .json()
            .map_err(|e| PodcastError::ScriptGeneration(format!("unreadable response: {e}")))?;
        let content = payload
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| PodcastError::ScriptGeneration("response has no content".into()))?;

        parse_script_response(&content, cast)
    }
}
