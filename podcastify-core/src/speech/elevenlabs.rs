//! ElevenLabs REST client: synthesis, voice catalog, voice preview.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{OutputFormat, SpeechProvider, SpeechRequest, VoiceSettings};
use crate::error::{PodcastError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io";
pub const DEFAULT_MODEL_ID: &str = "eleven_multilingual_v2";
pub const DEFAULT_PREVIEW_TEXT: &str = "G'day! This is a quick voice preview.";

/// Longest provider error body kept in a `RemoteSynthesis` error.
const MAX_ERROR_BODY: usize = 2_000;

#[derive(Debug, Clone)]
pub struct ElevenLabsConfig {
    pub base_url: String,
    pub model_id: String,
    pub voice_settings: VoiceSettings,
    pub timeout: Duration,
}

impl Default for ElevenLabsConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            voice_settings: VoiceSettings::default(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// One entry of the account's voice catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceInfo {
    pub name: String,
    pub voice_id: String,
}

#[derive(Deserialize)]
struct VoicesResponse {
    #[serde(default)]
    voices: Vec<RawVoice>,
}

#[derive(Deserialize)]
struct RawVoice {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    voice_id: Option<String>,
}

#[derive(Serialize)]
struct SynthesisBody<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

pub struct ElevenLabsClient {
    http: Client,
    config: ElevenLabsConfig,
}

impl ElevenLabsClient {
    pub fn new(config: ElevenLabsConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PodcastError::Transport(format!("http client build failed: {e}")))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ElevenLabsConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// `GET /v1/voices`. Entries without an id are dropped; a missing name
    /// falls back to the id.
    pub fn list_voices(&self, credential: &str) -> Result<Vec<VoiceInfo>> {
        if credential.trim().is_empty() {
            return Err(PodcastError::InvalidInput("Missing ElevenLabs API key".into()));
        }
        let response = self
            .http
            .get(self.endpoint("/v1/voices"))
            .header("xi-api-key", credential)
            .send()?;
        let response = check_status(response)?;
        let payload: VoicesResponse = response
            .json()
            .map_err(|e| PodcastError::Transport(format!("voices response: {e}")))?;

        let voices: Vec<VoiceInfo> = payload
            .voices
            .into_iter()
            .filter_map(|v| {
                let voice_id = v.voice_id.filter(|id| !id.is_empty())?;
                let name = v.name.filter(|n| !n.is_empty()).unwrap_or_else(|| voice_id.clone());
                Some(VoiceInfo { name, voice_id })
            })
            .collect();
        info!(count = voices.len(), "voice catalog fetched");
        Ok(voices)
    }

    /// Single-utterance MP3 for auditioning a voice.
    pub fn preview_voice(
        &self,
        credential: &str,
        voice_id: &str,
        sample_text: Option<&str>,
    ) -> Result<Vec<u8>> {
        let text = sample_text
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_PREVIEW_TEXT);
        if credential.trim().is_empty() || voice_id.trim().is_empty() {
            return Err(PodcastError::InvalidInput(
                "Missing elevenlabs_api_key or voice_id".into(),
            ));
        }
        self.synthesize(&SpeechRequest {
            text,
            voice_id,
            credential,
            format: OutputFormat::Mp3_44100_128,
        })
    }
}

impl SpeechProvider for ElevenLabsClient {
    fn synthesize(&self, request: &SpeechRequest<'_>) -> Result<Vec<u8>> {
        let url = self.endpoint(&format!("/v1/text-to-speech/{}", request.voice_id));
        let body = SynthesisBody {
            text: request.text,
            model_id: &self.config.model_id,
            voice_settings: self.config.voice_settings,
        };

        let response = self
            .http
            .post(url)
            .query(&[("output_format", request.format.query_value())])
            .header("xi-api-key", request.credential)
            .header("accept", request.format.accept())
            .json(&body)
            .send()?;
        let response = check_status(response)?;
        let bytes = response.bytes()?;
        Ok(bytes.to_vec())
    }
}

fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let mut body = response.text().unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    warn!(status = status.as_u16(), "ElevenLabs request rejected");
    Err(PodcastError::RemoteSynthesis {
        status: status.as_u16(),
        body,
    })
}
