//! 16-bit mono WAV container handling.

use std::io::Cursor;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::{
    audio::clip::AudioClip,
    error::{PodcastError, Result},
};

/// Incremental WAV body over an in-memory buffer.
///
/// Samples accumulate until [`WavBuffer::finish`] writes the RIFF header
/// with the final length.
pub struct WavBuffer {
    samples: Vec<i16>,
    sample_rate: u32,
}

impl WavBuffer {
    pub fn new(sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(PodcastError::Encoding("wav sample rate must be non-zero".into()));
        }
        Ok(Self {
            samples: Vec::new(),
            sample_rate,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Append raw signed 16-bit samples.
    pub fn write_pcm16(&mut self, samples: &[i16]) -> Result<()> {
        self.samples.extend_from_slice(samples);
        Ok(())
    }

    /// Append `count` zero samples.
    pub fn write_silence(&mut self, count: usize) -> Result<()> {
        self.samples.resize(self.samples.len() + count, 0);
        Ok(())
    }

    pub fn finish(self) -> Result<Vec<u8>> {
        let spec = WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::with_capacity(44 + self.samples.len() * 2));
        {
            let mut writer = WavWriter::new(&mut cursor, spec)
                .map_err(|e| PodcastError::Encoding(format!("wav header: {e}")))?;
            for &s in &self.samples {
                writer
                    .write_sample(s)
                    .map_err(|e| PodcastError::Encoding(format!("wav sample: {e}")))?;
            }
            writer
                .finalize()
                .map_err(|e| PodcastError::Encoding(format!("wav finalize: {e}")))?;
        }
        Ok(cursor.into_inner())
    }
}

/// Whether `bytes` starts with a RIFF/WAVE header.
pub fn is_wav(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WAVE"
}

/// Read a WAV body into a mono clip. Multi-channel input is averaged.
pub fn read_wav(bytes: &[u8]) -> Result<AudioClip> {
    let mut reader = WavReader::new(Cursor::new(bytes))
        .map_err(|e| PodcastError::Decode(format!("wav: {e}")))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| PodcastError::Decode(format!("wav: {e}")))?,
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| PodcastError::Decode(format!("wav: {e}")))?
        }
    };

    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };
    Ok(AudioClip::new(samples, spec.sample_rate))
}
