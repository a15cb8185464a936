//! Audio primitives shared by both synthesis strategies.
//!
//! # Layout
//!
//! - [`clip`]: owned mono f32 PCM, the unit the full-fidelity path stitches.
//! - [`resample`]: rubato-backed rate conversion to the episode rate.
//! - [`mp3`]: MPEG frame walking and silent-frame generation for byte-level
//!   concatenation. No decoding involved.
//! - [`wav`]: 16-bit mono RIFF read/write via hound.
//! - `decode` / `encode` (feature `codec`): symphonia decode of provider
//!   MP3 and LAME encode of the finished episode.
//!
//! Nothing here performs I/O beyond in-memory cursors.

pub mod clip;
pub mod mp3;
pub mod resample;
pub mod wav;

#[cfg(feature = "codec")]
pub mod decode;
#[cfg(feature = "codec")]
pub mod encode;

pub use clip::AudioClip;
