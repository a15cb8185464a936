//! Owned mono PCM clip, the unit the full-fidelity strategy stitches together.

use std::time::Duration;

/// A contiguous block of mono PCM samples at a known sample rate.
///
/// Produced by decoding a provider response or by [`AudioClip::silence`];
/// consumed once when appended to an episode buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    /// Mono f32 samples in [-1.0, 1.0].
    pub samples: Vec<f32>,
    /// Sample rate in Hz (e.g. 22050, 44100).
    pub sample_rate: u32,
}

impl AudioClip {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// A zero-signal clip of `duration_ms` milliseconds.
    ///
    /// Negative durations clamp to zero; zero yields an empty clip.
    pub fn silence(duration_ms: i64, sample_rate: u32) -> Self {
        let ms = duration_ms.max(0) as u64;
        let frames = samples_for_ms(ms, sample_rate);
        Self::new(vec![0.0; frames], sample_rate)
    }

    /// Returns the duration of this clip.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        samples_duration(self.samples.len(), self.sample_rate)
    }

    /// Returns true if the clip contains no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Append another clip recorded at the same rate.
    pub fn extend_from(&mut self, other: &AudioClip) {
        debug_assert_eq!(self.sample_rate, other.sample_rate);
        self.samples.extend_from_slice(&other.samples);
    }

    /// Samples quantised to signed 16-bit, clipping out-of-range values.
    pub fn to_pcm16(&self) -> Vec<i16> {
        self.samples
            .iter()
            .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16)
            .collect()
    }
}

/// Duration of `samples` frames at `sample_rate`, truncated to the nanosecond.
pub fn samples_duration(samples: usize, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos((samples as u128 * 1_000_000_000 / sample_rate as u128) as u64)
}

/// Sample count for `ms` milliseconds at `sample_rate`, rounded to nearest.
///
/// Saturates rather than overflowing; callers bound `ms` before allocating.
pub fn samples_for_ms(ms: u64, sample_rate: u32) -> usize {
    let scaled = ms.saturating_mul(sample_rate as u64).saturating_add(500) / 1000;
    usize::try_from(scaled).unwrap_or(usize::MAX)
}
