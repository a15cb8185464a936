//! MPEG audio Layer III frame handling for byte-level concatenation.
//!
//! The basic strategy never decodes audio. It walks frame headers to find the
//! audio payload of each provider response, drops container metadata that
//! would confuse a player once several responses are glued together, and
//! synthesises silent frames for the gaps.
//!
//! ## Frame layout
//!
//! | Bytes | Content |
//! |-------|---------|
//! | 0–3   | header: sync, version, layer, CRC flag, bitrate, rate, padding, mode |
//! | 4–5   | CRC (only when the protection bit is 0) |
//! | …     | side information (9, 17 or 32 bytes) |
//! | …     | main data |
//!
//! A frame whose side information is all zero (`part2_3_length = 0`,
//! `big_values = 0`) carries no spectral data and decodes to silence.
//! Silence is therefore quantised to whole frames: 1152 samples
//! (≈26.1 ms at 44.1 kHz) for MPEG-1, 576 for MPEG-2/2.5.

use std::time::Duration;

use crate::{
    audio::clip::samples_duration,
    error::{PodcastError, Result},
};

const BITRATES_V1_L3: [u32; 16] = [
    0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 0,
];
const BITRATES_V2_L3: [u32; 16] = [
    0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 0,
];
const SAMPLE_RATES_V1: [u32; 3] = [44_100, 48_000, 32_000];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpegVersion {
    V1,
    V2,
    V25,
}

impl MpegVersion {
    fn bits(self) -> u8 {
        match self {
            MpegVersion::V1 => 0b11,
            MpegVersion::V2 => 0b10,
            MpegVersion::V25 => 0b00,
        }
    }

    fn rate_divisor(self) -> u32 {
        match self {
            MpegVersion::V1 => 1,
            MpegVersion::V2 => 2,
            MpegVersion::V25 => 4,
        }
    }

    fn bitrate_table(self) -> &'static [u32; 16] {
        match self {
            MpegVersion::V1 => &BITRATES_V1_L3,
            _ => &BITRATES_V2_L3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMode {
    Stereo,
    JointStereo,
    DualChannel,
    Mono,
}

impl ChannelMode {
    fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => ChannelMode::Stereo,
            0b01 => ChannelMode::JointStereo,
            0b10 => ChannelMode::DualChannel,
            _ => ChannelMode::Mono,
        }
    }

    fn bits(self) -> u8 {
        match self {
            ChannelMode::Stereo => 0b00,
            ChannelMode::JointStereo => 0b01,
            ChannelMode::DualChannel => 0b10,
            ChannelMode::Mono => 0b11,
        }
    }
}

/// A parsed Layer III frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub version: MpegVersion,
    pub protected: bool,
    pub bitrate_kbps: u32,
    pub sample_rate: u32,
    pub padding: bool,
    pub channel_mode: ChannelMode,
    raw: [u8; 4],
}

impl FrameHeader {
    /// Parse the four header bytes at the start of `bytes`.
    ///
    /// Returns `None` for anything that is not a Layer III frame with a
    /// concrete bitrate and sample rate.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let raw: [u8; 4] = bytes.get(..4)?.try_into().ok()?;
        if raw[0] != 0xFF || raw[1] & 0xE0 != 0xE0 {
            return None;
        }

        let version = match (raw[1] >> 3) & 0b11 {
            0b11 => MpegVersion::V1,
            0b10 => MpegVersion::V2,
            0b00 => MpegVersion::V25,
            _ => return None,
        };
        if (raw[1] >> 1) & 0b11 != 0b01 {
            return None; // Layer I/II are not produced by any TTS provider we target
        }
        let protected = raw[1] & 0x01 == 0;

        let bitrate_kbps = version.bitrate_table()[(raw[2] >> 4) as usize];
        if bitrate_kbps == 0 {
            return None;
        }
        let rate_index = ((raw[2] >> 2) & 0b11) as usize;
        if rate_index == 3 {
            return None;
        }
        let sample_rate = SAMPLE_RATES_V1[rate_index] / version.rate_divisor();
        let padding = (raw[2] >> 1) & 0x01 == 1;
        let channel_mode = ChannelMode::from_bits(raw[3] >> 6);

        Some(Self {
            version,
            protected,
            bitrate_kbps,
            sample_rate,
            padding,
            channel_mode,
            raw,
        })
    }

    /// Build an unprotected, unpadded header from its parameters.
    pub fn layer3(
        version: MpegVersion,
        sample_rate: u32,
        bitrate_kbps: u32,
        channel_mode: ChannelMode,
    ) -> Option<Self> {
        let bitrate_index = version
            .bitrate_table()
            .iter()
            .position(|&b| b == bitrate_kbps && b != 0)?;
        let rate_index = SAMPLE_RATES_V1
            .iter()
            .position(|&r| r / version.rate_divisor() == sample_rate)?;

        let raw = [
            0xFF,
            0xE0 | (version.bits() << 3) | (0b01 << 1) | 0x01,
            ((bitrate_index as u8) << 4) | ((rate_index as u8) << 2),
            channel_mode.bits() << 6,
        ];
        Self::parse(&raw)
    }

    /// Samples per channel carried by one frame.
    pub fn samples_per_frame(&self) -> u32 {
        match self.version {
            MpegVersion::V1 => 1152,
            _ => 576,
        }
    }

    /// Total frame length in bytes, header included.
    pub fn frame_len(&self) -> usize {
        let coefficient = match self.version {
            MpegVersion::V1 => 144,
            _ => 72,
        };
        (coefficient * self.bitrate_kbps * 1000 / self.sample_rate) as usize
            + usize::from(self.padding)
    }

    pub fn frame_duration(&self) -> Duration {
        samples_duration(self.samples_per_frame() as usize, self.sample_rate)
    }

    fn side_info_len(&self) -> usize {
        match (self.version, self.channel_mode) {
            (MpegVersion::V1, ChannelMode::Mono) => 17,
            (MpegVersion::V1, _) => 32,
            (_, ChannelMode::Mono) => 9,
            (_, _) => 17,
        }
    }

    /// Whether two headers can share one concatenated stream.
    pub fn is_compatible(&self, other: &FrameHeader) -> bool {
        self.version == other.version
            && self.sample_rate == other.sample_rate
            && self.channel_mode == other.channel_mode
    }

    /// Header bytes for a silent frame in the same format: no CRC, no
    /// padding, no mode extension or flags.
    fn silent_raw(&self) -> [u8; 4] {
        [
            self.raw[0],
            self.raw[1] | 0x01,
            self.raw[2] & !0b11,
            self.raw[3] & 0xC0,
        ]
    }
}

/// The audio frames found in one provider response.
#[derive(Debug, Clone, Copy)]
pub struct FrameRun<'a> {
    /// Header of the first audio frame.
    pub header: FrameHeader,
    /// Number of complete audio frames in `payload`.
    pub frames: usize,
    /// Contiguous frame bytes with tags and the Xing/Info frame removed.
    pub payload: &'a [u8],
}

impl FrameRun<'_> {
    pub fn duration(&self) -> Duration {
        self.header.frame_duration() * self.frames as u32
    }
}

/// Locate the run of complete audio frames in an MP3 byte stream.
///
/// # Errors
/// `PodcastError::Decode` when no Layer III frame can be found.
pub fn scan_frames(bytes: &[u8]) -> Result<FrameRun<'_>> {
    let body = strip_tags(bytes);

    let start = (0..body.len().saturating_sub(3))
        .find(|&i| {
            FrameHeader::parse(&body[i..])
                .map(|h| i + h.frame_len() <= body.len())
                .unwrap_or(false)
        })
        .ok_or_else(|| PodcastError::Decode("no MPEG Layer III frame found".into()))?;

    let mut pos = start;
    let mut first: Option<(FrameHeader, usize)> = None;
    let mut frames = 0usize;

    while let Some(header) = FrameHeader::parse(&body[pos..]) {
        let len = header.frame_len();
        if pos + len > body.len() {
            break; // truncated tail
        }
        if first.is_none() {
            if is_info_frame(&body[pos..pos + len], &header) {
                pos += len;
                continue;
            }
            first = Some((header, pos));
        }
        frames += 1;
        pos += len;
    }

    let (header, audio_start) =
        first.ok_or_else(|| PodcastError::Decode("MPEG stream contains no audio frames".into()))?;

    Ok(FrameRun {
        header,
        frames,
        payload: &body[audio_start..pos],
    })
}

/// Whether `frame` carries a Xing/Info/VBRI header rather than audio.
fn is_info_frame(frame: &[u8], header: &FrameHeader) -> bool {
    let offset = 4 + if header.protected { 2 } else { 0 } + header.side_info_len();
    let tag = frame.get(offset..offset + 4);
    matches!(tag, Some(b"Xing") | Some(b"Info")) || frame.get(36..40) == Some(&b"VBRI"[..])
}

/// Strip a leading ID3v2 tag and a trailing ID3v1 tag.
pub fn strip_tags(bytes: &[u8]) -> &[u8] {
    let mut body = bytes;

    if body.len() >= 10 && &body[..3] == b"ID3" {
        let size = body[6..10]
            .iter()
            .fold(0usize, |acc, &b| (acc << 7) | (b & 0x7F) as usize);
        let footer = if body[5] & 0x10 != 0 { 10 } else { 0 };
        let skip = (10 + size + footer).min(body.len());
        body = &body[skip..];
    }

    if body.len() >= 128 && &body[body.len() - 128..body.len() - 125] == b"TAG" {
        body = &body[..body.len() - 128];
    }

    body
}

/// One silent frame in the format described by `header`.
pub fn silent_frame(header: &FrameHeader) -> Vec<u8> {
    let raw = header.silent_raw();
    let silent = FrameHeader::parse(&raw).unwrap_or(*header);
    let mut frame = vec![0u8; silent.frame_len()];
    frame[..4].copy_from_slice(&raw);
    frame
}

/// Silent frames approximating `duration_ms`, rounded to the nearest frame.
///
/// Returns the bytes and the exact duration they represent. Negative
/// durations clamp to zero.
pub fn silent_frames(header: &FrameHeader, duration_ms: i64) -> (Vec<u8>, Duration) {
    let ms = duration_ms.max(0) as f64;
    let frame_ms = header.frame_duration().as_secs_f64() * 1000.0;
    let count = (ms / frame_ms).round() as usize;

    let frame = silent_frame(header);
    let bytes = frame.repeat(count);
    let frames = u32::try_from(count).unwrap_or(u32::MAX);
    (bytes, header.frame_duration().saturating_mul(frames))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mono_44k_128() -> FrameHeader {
        FrameHeader::layer3(MpegVersion::V1, 44_100, 128, ChannelMode::Mono).unwrap()
    }

    /// A stream of `n` silent frames, optionally behind an ID3v2 tag.
    fn stream(n: usize, with_id3: bool) -> Vec<u8> {
        let mut out = Vec::new();
        if with_id3 {
            out.extend_from_slice(b"ID3\x04\x00\x00\x00\x00\x00\x05");
            out.extend_from_slice(&[0u8; 5]);
        }
        out.extend(silent_frame(&mono_44k_128()).repeat(n));
        out
    }

    #[test]
    fn builds_and_parses_mpeg1_header() {
        let h = mono_44k_128();
        assert_eq!(h.version, MpegVersion::V1);
        assert_eq!(h.sample_rate, 44_100);
        assert_eq!(h.bitrate_kbps, 128);
        assert_eq!(h.channel_mode, ChannelMode::Mono);
        assert!(!h.protected);
        assert_eq!(h.frame_len(), 417);
        assert_eq!(h.samples_per_frame(), 1152);
    }

    #[test]
    fn rejects_non_layer3_and_garbage() {
        assert!(FrameHeader::parse(b"RIFF").is_none());
        // Layer II header
        assert!(FrameHeader::parse(&[0xFF, 0xFD, 0x90, 0xC0]).is_none());
        // free-format bitrate
        assert!(FrameHeader::parse(&[0xFF, 0xFB, 0x00, 0xC0]).is_none());
    }

    #[test]
    fn scan_skips_id3_and_counts_frames() {
        let bytes = stream(10, true);
        let run = scan_frames(&bytes).unwrap();
        assert_eq!(run.frames, 10);
        assert_eq!(run.payload.len(), 10 * 417);
        assert_eq!(run.payload[0], 0xFF);
    }

    #[test]
    fn scan_drops_info_frame_and_truncated_tail() {
        let h = mono_44k_128();
        let mut info = silent_frame(&h);
        info[4 + 17..4 + 21].copy_from_slice(b"Info");
        let mut bytes = info;
        bytes.extend(stream(3, false));
        bytes.extend_from_slice(&[0xFF, 0xFB, 0x90]); // cut-off header

        let run = scan_frames(&bytes).unwrap();
        assert_eq!(run.frames, 3);
        assert_eq!(run.payload.len(), 3 * 417);
    }

    #[test]
    fn scan_fails_without_frames() {
        assert!(scan_frames(b"{\"detail\":\"not audio\"}").is_err());
        assert!(scan_frames(&[]).is_err());
    }

    #[test]
    fn silent_frames_round_to_whole_frames() {
        let h = mono_44k_128();
        let (bytes, dur) = silent_frames(&h, 500);
        // 500 ms / 26.122 ms ≈ 19.14 → 19 frames
        assert_eq!(bytes.len(), 19 * 417);
        let err_ms = (dur.as_secs_f64() * 1000.0 - 500.0).abs();
        assert!(err_ms <= h.frame_duration().as_secs_f64() * 500.0);

        let (none, zero) = silent_frames(&h, 0);
        assert!(none.is_empty());
        assert_eq!(zero, Duration::ZERO);
    }

    #[test]
    fn silent_frame_clears_padding_and_crc() {
        let padded_crc = FrameHeader::parse(&[0xFF, 0xFA, 0x92, 0xC4]).unwrap();
        assert!(padded_crc.protected);
        assert!(padded_crc.padding);
        let frame = silent_frame(&padded_crc);
        let h = FrameHeader::parse(&frame).unwrap();
        assert!(!h.protected);
        assert!(!h.padding);
        assert_eq!(frame.len(), 417);
        assert!(h.is_compatible(&padded_crc));
    }
}
