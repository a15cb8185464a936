//! Primary strategy: decode every clip, stitch PCM, encode once.

use crate::{
    episode::strategy::{EpisodeBuilder, StrategyKind, SynthesisStrategy},
    error::Result,
    speech::OutputFormat,
};

/// Decodes provider MP3 to mono PCM at `target_rate`, inserts sample-exact
/// silence and encodes the whole episode as one MP3 at `bitrate_kbps`.
///
/// Requires the `codec` feature. Without it [`SynthesisStrategy::begin`]
/// fails with `StrategyUnavailable`, which hands the episode to the fallback.
#[derive(Debug, Clone)]
pub struct FullFidelityStrategy {
    pub target_rate: u32,
    pub bitrate_kbps: u32,
}

impl Default for FullFidelityStrategy {
    fn default() -> Self {
        Self {
            target_rate: 44_100,
            bitrate_kbps: 192,
        }
    }
}

impl FullFidelityStrategy {
    pub fn new(target_rate: u32, bitrate_kbps: u32) -> Self {
        Self {
            target_rate,
            bitrate_kbps,
        }
    }

    pub fn format_label(&self) -> String {
        format!("MP3 ({} kbps)", self.bitrate_kbps)
    }
}

impl SynthesisStrategy for FullFidelityStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::FullFidelity
    }

    fn request_format(&self) -> OutputFormat {
        OutputFormat::Mp3_44100_128
    }

    #[cfg(feature = "codec")]
    fn begin(&self, pause_ms: i64) -> Result<Box<dyn EpisodeBuilder>> {
        Ok(Box::new(codec::PcmEpisode::new(
            self.target_rate,
            self.bitrate_kbps,
            pause_ms.clamp(0, crate::episode::MAX_PAUSE_MS),
            self.format_label(),
        )))
    }

    #[cfg(not(feature = "codec"))]
    fn begin(&self, _pause_ms: i64) -> Result<Box<dyn EpisodeBuilder>> {
        Err(crate::error::PodcastError::StrategyUnavailable(
            "built without the `codec` feature (no MP3 decoder/encoder)".into(),
        ))
    }
}

#[cfg(feature = "codec")]
mod codec {
    use std::time::Duration;

    use super::*;
    use crate::{
        audio::{decode::decode_clip, encode::encode_mp3, resample::resample_clip, AudioClip},
        episode::strategy::{Container, EncodedEpisode},
    };

    pub(super) struct PcmEpisode {
        pcm: AudioClip,
        gap: AudioClip,
        bitrate_kbps: u32,
        label: String,
    }

    impl PcmEpisode {
        pub(super) fn new(rate: u32, bitrate_kbps: u32, pause_ms: i64, label: String) -> Self {
            Self {
                pcm: AudioClip::new(Vec::new(), rate),
                gap: AudioClip::silence(pause_ms, rate),
                bitrate_kbps,
                label,
            }
        }
    }

    impl EpisodeBuilder for PcmEpisode {
        fn append_line(&mut self, audio: Vec<u8>) -> Result<Duration> {
            let clip = decode_clip(&audio, "mp3")?;
            let clip = resample_clip(clip, self.pcm.sample_rate)?;
            self.pcm.extend_from(&clip);
            Ok(clip.duration())
        }

        fn append_gap(&mut self) -> Result<Duration> {
            self.pcm.extend_from(&self.gap);
            Ok(self.gap.duration())
        }

        fn finish(self: Box<Self>) -> Result<EncodedEpisode> {
            let bytes = encode_mp3(&self.pcm.to_pcm16(), self.pcm.sample_rate, self.bitrate_kbps)?;
            Ok(EncodedEpisode {
                bytes,
                container: Container::Mp3,
                format_label: self.label,
            })
        }
    }
}
