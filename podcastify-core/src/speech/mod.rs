//! Text-to-speech provider abstraction.
//!
//! `SpeechProvider` decouples the episode pipeline from the remote service.
//! Implementations return the raw response body; decoding is left to the
//! synthesis strategy that asked for a particular [`OutputFormat`].
//!
//! `&self` on `synthesize` reflects that providers are stateless HTTP
//! clients. Sequencing and throttling live in [`LineSynthesizer`].

pub mod elevenlabs;

pub use elevenlabs::{ElevenLabsClient, ElevenLabsConfig, VoiceInfo};

use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PodcastError, Result};

/// Audio encoding requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// MPEG-1 Layer III, 44.1 kHz, 128 kbps.
    Mp3_44100_128,
    /// Headerless signed 16-bit little-endian mono PCM at the given rate.
    Pcm(u32),
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Mp3_44100_128
    }
}

impl OutputFormat {
    /// Value of the provider's `output_format` query parameter.
    pub fn query_value(&self) -> String {
        match self {
            OutputFormat::Mp3_44100_128 => "mp3_44100_128".to_string(),
            OutputFormat::Pcm(rate) => format!("pcm_{rate}"),
        }
    }

    /// `Accept` header for this format.
    pub fn accept(&self) -> &'static str {
        match self {
            OutputFormat::Mp3_44100_128 => "audio/mpeg",
            OutputFormat::Pcm(_) => "audio/pcm",
        }
    }
}

/// Voice-quality tuning sent with every synthesis call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.4,
            similarity_boost: 0.8,
        }
    }
}

/// One line to be spoken.
#[derive(Debug, Clone, Copy)]
pub struct SpeechRequest<'a> {
    pub text: &'a str,
    pub voice_id: &'a str,
    pub credential: &'a str,
    pub format: OutputFormat,
}

/// Contract for text-to-speech backends.
pub trait SpeechProvider: Send + Sync {
    /// Synthesize one line and return the provider's response body.
    ///
    /// # Errors
    /// `RemoteSynthesis` for a non-success response (status and body are
    /// preserved), `Transport` for network failures and timeouts.
    fn synthesize(&self, request: &SpeechRequest<'_>) -> Result<Vec<u8>>;
}

impl<P: SpeechProvider + ?Sized> SpeechProvider for &P {
    fn synthesize(&self, request: &SpeechRequest<'_>) -> Result<Vec<u8>> {
        (**self).synthesize(request)
    }
}

impl<P: SpeechProvider + ?Sized> SpeechProvider for Arc<P> {
    fn synthesize(&self, request: &SpeechRequest<'_>) -> Result<Vec<u8>> {
        (**self).synthesize(request)
    }
}

/// Validating, throttled front end over a provider.
///
/// Sleeps `line_delay` after every successful call as a rate-limit courtesy.
pub struct LineSynthesizer<'p> {
    provider: &'p dyn SpeechProvider,
    line_delay: Duration,
    calls: usize,
}

impl<'p> LineSynthesizer<'p> {
    pub fn new(provider: &'p dyn SpeechProvider, line_delay: Duration) -> Self {
        Self {
            provider,
            line_delay,
            calls: 0,
        }
    }

    /// Number of provider calls made so far.
    pub fn calls(&self) -> usize {
        self.calls
    }

    pub fn synthesize_line(
        &mut self,
        text: &str,
        voice_id: &str,
        credential: &str,
        format: OutputFormat,
    ) -> Result<Vec<u8>> {
        let text = text.trim();
        if text.is_empty() {
            return Err(PodcastError::InvalidInput("line text is empty".into()));
        }
        if voice_id.trim().is_empty() {
            return Err(PodcastError::InvalidInput("voice id is empty".into()));
        }
        if credential.trim().is_empty() {
            return Err(PodcastError::InvalidInput("provider credential is empty".into()));
        }

        self.calls += 1;
        let audio = self.provider.synthesize(&SpeechRequest {
            text,
            voice_id,
            credential,
            format,
        })?;
        debug!(
            voice_id,
            chars = text.len(),
            bytes = audio.len(),
            "line synthesized"
        );

        if audio.is_empty() {
            return Err(PodcastError::Decode("provider returned an empty body".into()));
        }
        if !self.line_delay.is_zero() {
            std::thread::sleep(self.line_delay);
        }
        Ok(audio)
    }
}
