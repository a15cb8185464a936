//! Whole-episode MP3 encoding with LAME.

use mp3lame_encoder::{max_required_buffer_size, Bitrate, Builder, FlushNoGap, MonoPcm, Quality};
use tracing::debug;

use crate::error::{PodcastError, Result};

/// Samples handed to LAME per call. A multiple of the MPEG-1 frame size.
const ENCODE_BLOCK: usize = 1152 * 64;

fn bitrate(kbps: u32) -> Result<Bitrate> {
    Ok(match kbps {
        96 => Bitrate::Kbps96,
        112 => Bitrate::Kbps112,
        128 => Bitrate::Kbps128,
        160 => Bitrate::Kbps160,
        192 => Bitrate::Kbps192,
        224 => Bitrate::Kbps224,
        256 => Bitrate::Kbps256,
        320 => Bitrate::Kbps320,
        other => {
            return Err(PodcastError::Encoding(format!(
                "unsupported bitrate {other} kbps"
            )))
        }
    })
}

/// Encode mono 16-bit PCM to a constant-bitrate MP3 stream.
///
/// # Errors
/// `PodcastError::Encoding` for an unsupported rate/bitrate or any LAME
/// failure. Encoding errors never trigger the basic fallback.
pub fn encode_mp3(samples: &[i16], sample_rate: u32, bitrate_kbps: u32) -> Result<Vec<u8>> {
    let mut builder =
        Builder::new().ok_or_else(|| PodcastError::Encoding("LAME init failed".into()))?;
    builder
        .set_num_channels(1)
        .map_err(|e| PodcastError::Encoding(format!("channels: {e:?}")))?;
    builder
        .set_sample_rate(sample_rate)
        .map_err(|e| PodcastError::Encoding(format!("sample rate {sample_rate}: {e:?}")))?;
    builder
        .set_brate(bitrate(bitrate_kbps)?)
        .map_err(|e| PodcastError::Encoding(format!("bitrate: {e:?}")))?;
    builder
        .set_quality(Quality::Best)
        .map_err(|e| PodcastError::Encoding(format!("quality: {e:?}")))?;
    let mut encoder = builder
        .build()
        .map_err(|e| PodcastError::Encoding(format!("LAME build: {e:?}")))?;

    let mut out = Vec::new();
    for block in samples.chunks(ENCODE_BLOCK) {
        out.reserve(max_required_buffer_size(block.len()));
        encoder
            .encode_to_vec(MonoPcm(block), &mut out)
            .map_err(|e| PodcastError::Encoding(format!("encode: {e:?}")))?;
    }
    out.reserve(7200);
    encoder
        .flush_to_vec::<FlushNoGap>(&mut out)
        .map_err(|e| PodcastError::Encoding(format!("flush: {e:?}")))?;

    debug!(
        samples = samples.len(),
        sample_rate,
        bitrate_kbps,
        bytes = out.len(),
        "episode encoded"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::mp3::scan_frames;

    #[test]
    fn encodes_parseable_cbr_stream() {
        let tone: Vec<i16> = (0..44_100)
            .map(|i| ((i as f32 * 440.0 * std::f32::consts::TAU / 44_100.0).sin() * 8_000.0) as i16)
            .collect();
        let bytes = encode_mp3(&tone, 44_100, 192).expect("encode");
        let run = scan_frames(&bytes).expect("frames");
        assert_eq!(run.header.sample_rate, 44_100);
        assert_eq!(run.header.bitrate_kbps, 192);
        let secs = run.duration().as_secs_f64();
        assert!((0.95..1.2).contains(&secs), "duration {secs}");
    }

    #[test]
    fn rejects_odd_bitrate() {
        assert!(matches!(
            encode_mp3(&[0; 10], 44_100, 100),
            Err(PodcastError::Encoding(_))
        ));
    }
}
