//! # podcastify-core
//!
//! Turns a web article into a two-speaker podcast episode.
//!
//! ## Architecture
//!
//! ```text
//! URL → ArticleSource::fetch → ScriptGenerator::generate → Vec<DialogueTurn>
//!                                                              │
//!                                       EpisodeSynthesizer::synthesize
//!                                                              │
//!                       ┌────────── primary: FullFidelityStrategy ──────────┐
//!                       │ per turn: SpeechProvider → decode → resample → PCM │
//!                       │ gaps: exact silence    finish: one MP3 encode      │
//!                       └──────────────┬─────────────────────────────────────┘
//!                              any failure except encoding
//!                                      │
//!                       ┌──────── fallback: BasicStrategy ──────────┐
//!                       │ MPEG frame concat + silent frames, or WAV │
//!                       └───────────────────────────────────────────┘
//!                                      │
//!                                EpisodeArtifact
//! ```
//!
//! Everything here is synchronous and single-threaded per episode. Hosts
//! that run an async runtime call into it from a blocking task.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod article;
pub mod audio;
pub mod episode;
pub mod error;
pub mod script;
pub mod speech;
pub mod transcript;

// Convenience re-exports for downstream crates
pub use article::{Article, ArticleSource, FetcherConfig, HttpArticleFetcher};
pub use episode::{
    synthesize_episode, AudioAvailability, BasicFormat, BasicStrategy, Container, EpisodeArtifact,
    EpisodeRequest, EpisodeSynthesizer, FullFidelityStrategy, ProgressSink, StrategyKind,
    SynthesisConfig, SynthesisStrategy, TimelineEntry, VoiceBinding, MAX_PAUSE_MS,
};
pub use error::{PodcastError, Result};
pub use script::{
    draft_script, Cast, DialogueTurn, OpenAiConfig, OpenAiScriptGenerator, ScriptDraft,
    ScriptGenerator, ScriptStyle, Speaker,
};
pub use speech::{
    ElevenLabsClient, ElevenLabsConfig, OutputFormat, SpeechProvider, SpeechRequest, VoiceInfo,
};
pub use transcript::{render_transcript, transcript_filename};
