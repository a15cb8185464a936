//! Fallback strategy: no decoder, no encoder.
//!
//! `Mp3Concat` glues provider MPEG frames together byte-wise and represents
//! each gap as whole silent frames, so gap length is quantised to the frame
//! duration (±13 ms at 44.1 kHz). `Wav` asks the provider for raw PCM and
//! writes a 16-bit mono WAV with sample-exact gaps.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    audio::{
        clip::{samples_duration, samples_for_ms},
        mp3::{scan_frames, silent_frames, ChannelMode, FrameHeader, MpegVersion},
        resample::resample_clip,
        wav::{is_wav, read_wav, WavBuffer},
    },
    episode::{
        strategy::{Container, EncodedEpisode, EpisodeBuilder, StrategyKind, SynthesisStrategy},
        MAX_PAUSE_MS,
    },
    error::{PodcastError, Result},
    speech::OutputFormat,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BasicFormat {
    #[default]
    Mp3Concat,
    Wav,
}

#[derive(Debug, Clone)]
pub struct BasicStrategy {
    pub format: BasicFormat,
    /// Sample rate requested in `Wav` mode.
    pub pcm_rate: u32,
}

impl Default for BasicStrategy {
    fn default() -> Self {
        Self {
            format: BasicFormat::Mp3Concat,
            pcm_rate: 22_050,
        }
    }
}

impl BasicStrategy {
    pub fn new(format: BasicFormat, pcm_rate: u32) -> Self {
        Self { format, pcm_rate }
    }
}

impl SynthesisStrategy for BasicStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Basic
    }

    fn request_format(&self) -> OutputFormat {
        match self.format {
            BasicFormat::Mp3Concat => OutputFormat::Mp3_44100_128,
            BasicFormat::Wav => OutputFormat::Pcm(self.pcm_rate),
        }
    }

    fn begin(&self, pause_ms: i64) -> Result<Box<dyn EpisodeBuilder>> {
        let pause_ms = pause_ms.clamp(0, MAX_PAUSE_MS);
        match self.format {
            BasicFormat::Mp3Concat => Ok(Box::new(FrameConcat::new(pause_ms)?)),
            BasicFormat::Wav => Ok(Box::new(PcmConcat::new(self.pcm_rate, pause_ms)?)),
        }
    }
}

/// Frame header matching the provider's default `mp3_44100_128` output.
fn provider_default_header() -> Result<FrameHeader> {
    FrameHeader::layer3(MpegVersion::V1, 44_100, 128, ChannelMode::Mono)
        .ok_or_else(|| PodcastError::StrategyUnavailable("invalid default MPEG header".into()))
}

struct FrameConcat {
    out: Vec<u8>,
    pause_ms: i64,
    header: FrameHeader,
    locked: bool,
    gap: Vec<u8>,
    gap_duration: Duration,
}

impl FrameConcat {
    fn new(pause_ms: i64) -> Result<Self> {
        let header = provider_default_header()?;
        let (gap, gap_duration) = silent_frames(&header, pause_ms);
        Ok(Self {
            out: Vec::new(),
            pause_ms,
            header,
            locked: false,
            gap,
            gap_duration,
        })
    }
}

impl EpisodeBuilder for FrameConcat {
    fn append_line(&mut self, audio: Vec<u8>) -> Result<Duration> {
        let run = scan_frames(&audio)?;

        if !self.locked {
            // the first clip fixes the stream format
            if !run.header.is_compatible(&self.header)
                || run.header.bitrate_kbps != self.header.bitrate_kbps
            {
                let (gap, gap_duration) = silent_frames(&run.header, self.pause_ms);
                self.gap = gap;
                self.gap_duration = gap_duration;
            }
            self.header = run.header;
            self.locked = true;
        } else if !self.header.is_compatible(&run.header) {
            return Err(PodcastError::Decode(format!(
                "clip format changed mid-episode ({} Hz {:?} → {} Hz {:?})",
                self.header.sample_rate,
                self.header.channel_mode,
                run.header.sample_rate,
                run.header.channel_mode
            )));
        }

        debug!(frames = run.frames, bytes = run.payload.len(), "frames appended");
        self.out.extend_from_slice(run.payload);
        Ok(run.duration())
    }

    fn append_gap(&mut self) -> Result<Duration> {
        self.out.extend_from_slice(&self.gap);
        Ok(self.gap_duration)
    }

    fn finish(self: Box<Self>) -> Result<EncodedEpisode> {
        if self.out.is_empty() {
            return Err(PodcastError::Encoding("no audio frames to write".into()));
        }
        Ok(EncodedEpisode {
            bytes: self.out,
            container: Container::Mp3,
            format_label: "MP3 (basic concat)".to_string(),
        })
    }
}

struct PcmConcat {
    wav: WavBuffer,
    gap_samples: usize,
}

impl PcmConcat {
    fn new(rate: u32, pause_ms: i64) -> Result<Self> {
        Ok(Self {
            wav: WavBuffer::new(rate)?,
            gap_samples: samples_for_ms(pause_ms.max(0) as u64, rate),
        })
    }

    fn rate(&self) -> u32 {
        self.wav.sample_rate()
    }

    fn samples_duration(&self, samples: usize) -> Duration {
        samples_duration(samples, self.rate())
    }
}

impl EpisodeBuilder for PcmConcat {
    fn append_line(&mut self, audio: Vec<u8>) -> Result<Duration> {
        if audio.starts_with(b"ID3") {
            return Err(PodcastError::Decode(
                "expected raw PCM but the provider returned MP3".into(),
            ));
        }

        let samples: Vec<i16> = if is_wav(&audio) {
            let clip = read_wav(&audio)?;
            resample_clip(clip, self.rate())?.to_pcm16()
        } else {
            let pairs = audio.chunks_exact(2);
            if !pairs.remainder().is_empty() {
                debug!(bytes = audio.len(), "odd-length PCM body, trailing byte dropped");
            }
            pairs
                .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
                .collect()
        };
        if samples.is_empty() {
            return Err(PodcastError::Decode("provider returned no samples".into()));
        }

        self.wav.write_pcm16(&samples)?;
        Ok(self.samples_duration(samples.len()))
    }

    fn append_gap(&mut self) -> Result<Duration> {
        self.wav.write_silence(self.gap_samples)?;
        Ok(self.samples_duration(self.gap_samples))
    }

    fn finish(self: Box<Self>) -> Result<EncodedEpisode> {
        Ok(EncodedEpisode {
            bytes: self.wav.finish()?,
            container: Container::Wav,
            format_label: "WAV (basic)".to_string(),
        })
    }
}
