//! Episode synthesis: script → one playable audio artifact.
//!
//! [`EpisodeSynthesizer`] runs the primary strategy and, if that pass fails
//! for any reason other than container encoding, re-runs the whole episode
//! from turn 1 with the fallback strategy. Nothing synthesized during the
//! failed pass is reused.

pub mod assembler;
pub mod basic;
pub mod full;
pub mod progress;
pub mod strategy;

pub use assembler::{Assembler, AssembledEpisode};
pub use basic::{BasicFormat, BasicStrategy};
pub use full::FullFidelityStrategy;
pub use progress::{ProgressReporter, ProgressSink};
pub use strategy::{Container, EncodedEpisode, EpisodeBuilder, StrategyKind, SynthesisStrategy};

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::{
    error::{PodcastError, Result},
    script::{DialogueTurn, Speaker},
    speech::SpeechProvider,
};

/// Longest gap accepted between turns.
pub const MAX_PAUSE_MS: i64 = 10_000;

/// Provider voice assigned to a script role for a whole episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceBinding {
    pub role: Speaker,
    pub voice_id: String,
}

impl VoiceBinding {
    pub fn host(voice_id: impl Into<String>) -> Self {
        Self {
            role: Speaker::Host,
            voice_id: voice_id.into(),
        }
    }

    pub fn guest(voice_id: impl Into<String>) -> Self {
        Self {
            role: Speaker::Guest,
            voice_id: voice_id.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EpisodeRequest {
    pub script: Vec<DialogueTurn>,
    /// Gap between turns; negative values behave as zero. Values above
    /// [`MAX_PAUSE_MS`] fail validation.
    pub pause_ms: i64,
    pub host: VoiceBinding,
    pub guest: VoiceBinding,
    pub credential: String,
}

impl EpisodeRequest {
    pub fn new(
        script: Vec<DialogueTurn>,
        pause_ms: i64,
        host_voice_id: &str,
        guest_voice_id: &str,
        credential: &str,
    ) -> Self {
        Self {
            script,
            pause_ms,
            host: VoiceBinding::host(host_voice_id),
            guest: VoiceBinding::guest(guest_voice_id),
            credential: credential.to_string(),
        }
    }

    pub fn pause_ms(&self) -> i64 {
        self.pause_ms.clamp(0, MAX_PAUSE_MS)
    }

    pub fn voice_for(&self, speaker: Speaker) -> &str {
        match speaker {
            Speaker::Host => &self.host.voice_id,
            Speaker::Guest => &self.guest.voice_id,
        }
    }

    /// Checks that can fail before any provider call is made.
    pub fn validate(&self) -> Result<()> {
        if self.credential.trim().is_empty() {
            return Err(PodcastError::InvalidInput("missing speech provider credential".into()));
        }
        if self.host.voice_id.trim().is_empty() || self.guest.voice_id.trim().is_empty() {
            return Err(PodcastError::InvalidInput("missing host or guest voice id".into()));
        }
        if self.pause_ms > MAX_PAUSE_MS {
            return Err(PodcastError::InvalidInput(format!(
                "pause_ms must be at most {MAX_PAUSE_MS}, got {}",
                self.pause_ms
            )));
        }
        if !self.script.iter().any(DialogueTurn::is_speakable) {
            return Err(PodcastError::InvalidInput("script has no speakable turns".into()));
        }
        Ok(())
    }
}

/// Where one synthesized turn sits in the finished episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEntry {
    pub ordinal: u32,
    pub speaker: Speaker,
    pub start: Duration,
    pub duration: Duration,
}

/// The finished episode.
#[derive(Debug, Clone)]
pub struct EpisodeArtifact {
    pub bytes: Vec<u8>,
    pub suggested_filename: String,
    pub mime_type: String,
    /// Human-readable container description, e.g. `"MP3 (192 kbps)"`.
    pub format_label: String,
    pub strategy: StrategyKind,
    pub container: Container,
    pub timeline: Vec<TimelineEntry>,
    pub duration: Duration,
}

#[derive(Debug, Clone)]
pub struct SynthesisConfig {
    /// Pause after every provider call.
    pub line_delay: Duration,
    pub target_sample_rate: u32,
    pub bitrate_kbps: u32,
    pub basic_format: BasicFormat,
    /// PCM rate requested by the WAV fallback.
    pub pcm_rate: u32,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            line_delay: Duration::from_millis(200),
            target_sample_rate: 44_100,
            bitrate_kbps: 192,
            basic_format: BasicFormat::Mp3Concat,
            pcm_rate: 22_050,
        }
    }
}

pub struct EpisodeSynthesizer {
    primary: Box<dyn SynthesisStrategy>,
    fallback: Box<dyn SynthesisStrategy>,
    line_delay: Duration,
}

impl EpisodeSynthesizer {
    pub fn new(config: SynthesisConfig) -> Self {
        Self {
            primary: Box::new(FullFidelityStrategy::new(
                config.target_sample_rate,
                config.bitrate_kbps,
            )),
            fallback: Box::new(BasicStrategy::new(config.basic_format, config.pcm_rate)),
            line_delay: config.line_delay,
        }
    }

    pub fn with_strategies(
        primary: Box<dyn SynthesisStrategy>,
        fallback: Box<dyn SynthesisStrategy>,
        line_delay: Duration,
    ) -> Self {
        Self {
            primary,
            fallback,
            line_delay,
        }
    }

    /// Produce an episode, falling back to the secondary strategy on failure.
    ///
    /// # Errors
    /// - `InvalidInput` before any provider call when the request is unusable.
    /// - `Encoding` from the primary pass, unchanged.
    /// - `BothStrategiesFailed` when the fallback pass fails too.
    pub fn synthesize(
        &self,
        provider: &dyn SpeechProvider,
        request: &EpisodeRequest,
        sink: Option<&mut dyn ProgressSink>,
    ) -> Result<EpisodeArtifact> {
        request.validate()?;
        let mut progress = ProgressReporter::new(sink);
        let assembler = Assembler::new(provider, self.line_delay);

        info!(
            turns = request.script.len(),
            pause_ms = request.pause_ms(),
            strategy = %self.primary.kind(),
            "episode synthesis started"
        );
        progress.report(1, "Starting synthesis");

        let (assembled, strategy) =
            match assembler.run(self.primary.as_ref(), request, &mut progress) {
                Ok(done) => (done, self.primary.kind()),
                Err(primary) if primary.triggers_fallback() => {
                    warn!(
                        error = %primary,
                        fallback = %self.fallback.kind(),
                        "primary synthesis failed, re-running episode with fallback"
                    );
                    let last = progress.last();
                    progress.report(
                        last,
                        &format!("Primary synthesis failed ({primary}); retrying with basic fallback"),
                    );
                    match assembler.run(self.fallback.as_ref(), request, &mut progress) {
                        Ok(done) => (done, self.fallback.kind()),
                        Err(fallback) => {
                            error!(primary = %primary, fallback = %fallback, "both strategies failed");
                            return Err(PodcastError::BothStrategiesFailed {
                                primary: Box::new(primary),
                                fallback: Box::new(fallback),
                            });
                        }
                    }
                }
                Err(e) => return Err(e),
            };

        let container = assembled.encoded.container;
        let artifact = EpisodeArtifact {
            suggested_filename: format!("episode.{}", container.extension()),
            mime_type: container.mime_type().to_string(),
            format_label: assembled.encoded.format_label,
            bytes: assembled.encoded.bytes,
            strategy,
            container,
            timeline: assembled.timeline,
            duration: assembled.duration,
        };
        info!(
            strategy = %artifact.strategy,
            format = %artifact.format_label,
            bytes = artifact.bytes.len(),
            secs = artifact.duration.as_secs_f64(),
            "episode ready"
        );
        progress.complete(&format!("Episode ready: {}", artifact.format_label));
        Ok(artifact)
    }
}

/// Synthesize `script` with the default configuration.
pub fn synthesize_episode(
    provider: &dyn SpeechProvider,
    script: Vec<DialogueTurn>,
    pause_ms: i64,
    host_voice_id: &str,
    guest_voice_id: &str,
    credential: &str,
    progress: Option<&mut dyn ProgressSink>,
) -> Result<EpisodeArtifact> {
    let request = EpisodeRequest::new(script, pause_ms, host_voice_id, guest_voice_id, credential);
    EpisodeSynthesizer::new(SynthesisConfig::default()).synthesize(provider, &request, progress)
}

/// Whether audio can be produced this session.
///
/// When it cannot, callers should offer the text transcript instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AudioAvailability {
    pub credential_present: bool,
    pub full_fidelity: bool,
    pub basic: bool,
}

impl AudioAvailability {
    pub fn detect(credential: Option<&str>) -> Self {
        Self {
            credential_present: credential.is_some_and(|c| !c.trim().is_empty()),
            full_fidelity: cfg!(feature = "codec"),
            basic: true,
        }
    }

    pub fn is_available(&self) -> bool {
        self.credential_present && (self.full_fidelity || self.basic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script() -> Vec<DialogueTurn> {
        vec![DialogueTurn::new(1, Speaker::Host, "H", "Hi.")]
    }

    #[test]
    fn validation_rejects_missing_fields() {
        assert!(EpisodeRequest::new(script(), 0, "h", "g", "k").validate().is_ok());
        for req in [
            EpisodeRequest::new(script(), 0, "h", "g", " "),
            EpisodeRequest::new(script(), 0, "", "g", "k"),
            EpisodeRequest::new(script(), 0, "h", "", "k"),
            EpisodeRequest::new(vec![DialogueTurn::new(1, Speaker::Host, "H", " ")], 0, "h", "g", "k"),
            EpisodeRequest::new(Vec::new(), 0, "h", "g", "k"),
        ] {
            assert!(matches!(req.validate(), Err(PodcastError::InvalidInput(_))));
        }
    }

    #[test]
    fn negative_pause_clamps() {
        assert_eq!(EpisodeRequest::new(script(), -20, "h", "g", "k").pause_ms(), 0);
    }

    #[test]
    fn oversized_pause_is_rejected() {
        let at_limit = EpisodeRequest::new(script(), MAX_PAUSE_MS, "h", "g", "k");
        assert!(at_limit.validate().is_ok());
        for pause in [MAX_PAUSE_MS + 1, 1_000_000_000_000_000_000, i64::MAX] {
            let req = EpisodeRequest::new(script(), pause, "h", "g", "k");
            assert!(matches!(req.validate(), Err(PodcastError::InvalidInput(_))));
            assert_eq!(req.pause_ms(), MAX_PAUSE_MS);
        }
    }

    #[test]
    fn voice_resolution_by_role() {
        let req = EpisodeRequest::new(script(), 0, "host-v", "guest-v", "k");
        assert_eq!(req.voice_for(Speaker::Host), "host-v");
        assert_eq!(req.voice_for(Speaker::Guest), "guest-v");
    }

    #[test]
    fn availability_requires_credential() {
        assert!(!AudioAvailability::detect(None).is_available());
        assert!(!AudioAvailability::detect(Some("  ")).is_available());
        let available = AudioAvailability::detect(Some("key"));
        assert!(available.is_available());
        assert_eq!(available.full_fidelity, cfg!(feature = "codec"));
    }
}
