//! Whole-clip sample-rate conversion with rubato's `FastFixedIn`.
//!
//! Provider clips arrive at whatever rate the provider chose; the episode is
//! built at one rate. A clip is converted in one go: full chunks, then the
//! partial tail, then zero-fed calls until the filter delay has drained.
//! The result is trimmed to exactly `len * target / source` samples.

use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use tracing::debug;

use crate::audio::clip::AudioClip;
use crate::error::{PodcastError, Result};

/// Input frames per rubato call.
const CHUNK_FRAMES: usize = 1024;

/// Resample `clip` to `target_rate`, keeping its duration.
///
/// Equal rates return the clip untouched.
pub fn resample_clip(clip: AudioClip, target_rate: u32) -> Result<AudioClip> {
    let source_rate = clip.sample_rate;
    if source_rate == target_rate {
        return Ok(clip);
    }
    if source_rate == 0 || target_rate == 0 {
        return Err(PodcastError::Decode(format!(
            "cannot resample {source_rate} Hz -> {target_rate} Hz"
        )));
    }
    if clip.samples.is_empty() {
        return Ok(AudioClip::new(Vec::new(), target_rate));
    }

    let expected = target_len(clip.samples.len(), source_rate, target_rate);
    let mut resampler = FastFixedIn::<f32>::new(
        target_rate as f64 / source_rate as f64,
        1.0,
        PolynomialDegree::Cubic,
        CHUNK_FRAMES,
        1,
    )
    .map_err(|e| PodcastError::Decode(format!("resampler init: {e}")))?;

    let delay = resampler.output_delay();
    let mut out_buf = vec![vec![0f32; resampler.output_frames_max()]];
    let mut converted = Vec::with_capacity(expected + delay);

    let mut chunks = clip.samples.chunks_exact(CHUNK_FRAMES);
    for chunk in &mut chunks {
        let (_, produced) = resampler
            .process_into_buffer(&[chunk], &mut out_buf, None)
            .map_err(rubato_error)?;
        converted.extend_from_slice(&out_buf[0][..produced]);
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        let (_, produced) = resampler
            .process_partial_into_buffer(Some(&[tail]), &mut out_buf, None)
            .map_err(rubato_error)?;
        converted.extend_from_slice(&out_buf[0][..produced]);
    }

    while converted.len() < expected + delay {
        let (_, produced) = resampler
            .process_partial_into_buffer(None::<&[&[f32]]>, &mut out_buf, None)
            .map_err(rubato_error)?;
        if produced == 0 {
            break;
        }
        converted.extend_from_slice(&out_buf[0][..produced]);
    }

    let mut samples = converted.split_off(delay.min(converted.len()));
    samples.resize(expected, 0.0);
    debug!(source_rate, target_rate, samples = samples.len(), "clip resampled");

    Ok(AudioClip::new(samples, target_rate))
}

fn target_len(source_len: usize, source_rate: u32, target_rate: u32) -> usize {
    (source_len as u64 * target_rate as u64 / source_rate as u64) as usize
}

fn rubato_error(e: impl std::fmt::Display) -> PodcastError {
    PodcastError::Decode(format!("resampler: {e}"))
}
