//! Provider MP3 → mono PCM via symphonia.

use std::io::Cursor;

use symphonia::core::{
    audio::SampleBuffer,
    codecs::{DecoderOptions, CODEC_TYPE_NULL},
    errors::Error as SymphoniaError,
    formats::FormatOptions,
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
};
use tracing::debug;

use crate::{
    audio::clip::AudioClip,
    error::{PodcastError, Result},
};

/// Decode a complete compressed clip held in memory.
///
/// `extension` is a probe hint ("mp3", "wav"); the container is still
/// sniffed from the bytes. Multi-channel audio is averaged to mono.
///
/// # Errors
/// `PodcastError::Decode` if the bytes are not a supported audio stream or
/// contain no decodable samples.
pub fn decode_clip(bytes: &[u8], extension: &str) -> Result<AudioClip> {
    if bytes.is_empty() {
        return Err(PodcastError::Decode("empty audio body".into()));
    }

    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());
    let mut hint = Hint::new();
    hint.with_extension(extension);

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| PodcastError::Decode(format!("probe: {e}")))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| PodcastError::Decode("no decodable audio track".into()))?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| PodcastError::Decode(format!("unsupported codec: {e}")))?;

    let mut samples = Vec::new();
    let mut skipped = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(PodcastError::Decode(format!("read packet: {e}"))),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(buf) => buf,
            Err(SymphoniaError::DecodeError(msg)) => {
                skipped += 1;
                debug!(reason = msg, "skipping corrupt packet");
                continue;
            }
            Err(e) => return Err(PodcastError::Decode(format!("decode: {e}"))),
        };

        let spec = *decoded.spec();
        sample_rate = spec.rate;
        let channels = spec.channels.count().max(1);

        let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buf.copy_interleaved_ref(decoded);

        if channels == 1 {
            samples.extend_from_slice(buf.samples());
        } else {
            samples.extend(
                buf.samples()
                    .chunks_exact(channels)
                    .map(|frame| frame.iter().sum::<f32>() / channels as f32),
            );
        }
    }

    if samples.is_empty() || sample_rate == 0 {
        return Err(PodcastError::Decode(format!(
            "no audio decoded ({skipped} corrupt packets)"
        )));
    }

    debug!(
        samples = samples.len(),
        sample_rate, skipped, "decoded provider clip"
    );
    Ok(AudioClip::new(samples, sample_rate))
}
