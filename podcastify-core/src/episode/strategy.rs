//! Synthesis strategy capability.
//!
//! A strategy decides which format is requested from the provider, how each
//! response is appended, what a gap looks like, and how the finished episode
//! is containerised. Every pass starts from a fresh [`EpisodeBuilder`], so a
//! fallback run never reuses work from a failed primary run.

use std::{fmt, time::Duration};

use serde::Serialize;

use crate::{error::Result, speech::OutputFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    FullFidelity,
    Basic,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::FullFidelity => "full-fidelity",
            StrategyKind::Basic => "basic",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    Mp3,
    Wav,
}

impl Container {
    pub fn extension(&self) -> &'static str {
        match self {
            Container::Mp3 => "mp3",
            Container::Wav => "wav",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Container::Mp3 => "audio/mpeg",
            Container::Wav => "audio/wav",
        }
    }
}

/// Output of [`EpisodeBuilder::finish`].
#[derive(Debug, Clone)]
pub struct EncodedEpisode {
    pub bytes: Vec<u8>,
    pub container: Container,
    pub format_label: String,
}

pub trait SynthesisStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Format to request from the speech provider for every line.
    fn request_format(&self) -> OutputFormat;

    /// Start a pass with `pause_ms` of silence per gap.
    ///
    /// # Errors
    /// `StrategyUnavailable` when the strategy cannot run in this build or
    /// environment.
    fn begin(&self, pause_ms: i64) -> Result<Box<dyn EpisodeBuilder>>;
}

/// Accumulates one episode. Consumed by `finish`.
pub trait EpisodeBuilder {
    /// Append one provider response; returns the audio duration it added.
    fn append_line(&mut self, audio: Vec<u8>) -> Result<Duration>;

    /// Append the shared inter-turn silence; returns its duration.
    fn append_gap(&mut self) -> Result<Duration>;

    /// Produce the container bytes.
    ///
    /// # Errors
    /// `Encoding` on container failures.
    fn finish(self: Box<Self>) -> Result<EncodedEpisode>;
}
