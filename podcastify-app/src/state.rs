//! Shared server state.
//!
//! `AppState` lives behind an `Arc` and is handed to every axum handler via
//! `State<SharedState>`. It holds configuration only; the blocking HTTP
//! clients of the core are built per request on the blocking pool.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use parking_lot::RwLock;
use podcastify_core::{
    ElevenLabsConfig, FetcherConfig, OpenAiConfig, StrategyKind, SynthesisConfig, VoiceInfo,
};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::settings::AppSettings;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    /// Settings after file load and environment overrides.
    pub settings: AppSettings,
    /// Absolute path to `settings.json`.
    pub settings_path: PathBuf,
    /// Voice catalogs keyed by SHA-256 of the ElevenLabs key.
    pub voice_cache: RwLock<HashMap<String, Vec<VoiceInfo>>>,
    /// Episodes produced by the full-fidelity strategy.
    pub episodes_full: AtomicUsize,
    /// Episodes that needed the basic fallback.
    pub episodes_basic: AtomicUsize,
    /// Episode requests that ended in an error.
    pub episodes_failed: AtomicUsize,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct EpisodeStats {
    pub full_fidelity: usize,
    pub basic: usize,
    pub failed: usize,
}

impl AppState {
    pub fn new(settings: AppSettings, settings_path: PathBuf) -> Self {
        Self {
            settings,
            settings_path,
            voice_cache: RwLock::new(HashMap::new()),
            episodes_full: AtomicUsize::new(0),
            episodes_basic: AtomicUsize::new(0),
            episodes_failed: AtomicUsize::new(0),
        }
    }

    pub fn shared(self) -> SharedState {
        Arc::new(self)
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.request_timeout_secs)
    }

    pub fn elevenlabs_config(&self) -> ElevenLabsConfig {
        ElevenLabsConfig {
            base_url: self.settings.elevenlabs_base_url.clone(),
            timeout: self.request_timeout(),
            ..ElevenLabsConfig::default()
        }
    }

    /// `model` from the request wins over the configured model.
    pub fn openai_config(&self, model: Option<&str>) -> OpenAiConfig {
        let model = model
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.settings.openai_model);
        OpenAiConfig {
            base_url: self.settings.openai_base_url.clone(),
            model: model.to_string(),
            ..OpenAiConfig::default()
        }
    }

    pub fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig::default()
    }

    pub fn synthesis_config(&self) -> SynthesisConfig {
        SynthesisConfig {
            line_delay: Duration::from_millis(self.settings.line_delay_ms),
            basic_format: self.settings.basic_format,
            ..SynthesisConfig::default()
        }
    }

    /// Key from the request, else the configured one.
    pub fn elevenlabs_key(&self, supplied: Option<&str>) -> Option<String> {
        resolve_key(supplied, self.settings.elevenlabs_api_key.as_deref())
    }

    pub fn openai_key(&self, supplied: Option<&str>) -> Option<String> {
        resolve_key(supplied, self.settings.openai_api_key.as_deref())
    }

    pub fn cached_voices(&self, key: &str) -> Option<Vec<VoiceInfo>> {
        self.voice_cache.read().get(&key_fingerprint(key)).cloned()
    }

    pub fn cache_voices(&self, key: &str, voices: Vec<VoiceInfo>) {
        self.voice_cache.write().insert(key_fingerprint(key), voices);
    }

    pub fn record_episode(&self, strategy: StrategyKind) {
        let counter = match strategy {
            StrategyKind::FullFidelity => &self.episodes_full,
            StrategyKind::Basic => &self.episodes_basic,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.episodes_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn episode_stats(&self) -> EpisodeStats {
        EpisodeStats {
            full_fidelity: self.episodes_full.load(Ordering::Relaxed),
            basic: self.episodes_basic.load(Ordering::Relaxed),
            failed: self.episodes_failed.load(Ordering::Relaxed),
        }
    }
}

fn resolve_key(supplied: Option<&str>, configured: Option<&str>) -> Option<String> {
    supplied
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .or(configured)
        .map(str::to_string)
}

/// Hex SHA-256 of a credential, so raw keys never sit in the cache.
pub fn key_fingerprint(key: &str) -> String {
    format!("{:x}", Sha256::digest(key.trim().as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AppState {
        let settings = AppSettings {
            elevenlabs_api_key: Some("configured".into()),
            line_delay_ms: 0,
            ..AppSettings::default()
        };
        AppState::new(settings, PathBuf::from("settings.json"))
    }

    #[test]
    fn supplied_key_wins_over_configured() {
        let s = state();
        assert_eq!(s.elevenlabs_key(Some(" mine ")).as_deref(), Some("mine"));
        assert_eq!(s.elevenlabs_key(Some("")).as_deref(), Some("configured"));
        assert_eq!(s.elevenlabs_key(None).as_deref(), Some("configured"));
        assert_eq!(s.openai_key(None), None);
    }

    #[test]
    fn voice_cache_is_keyed_by_fingerprint() {
        let s = state();
        let voices = vec![VoiceInfo {
            name: "Ava".into(),
            voice_id: "v1".into(),
        }];
        s.cache_voices("secret", voices.clone());
        assert_eq!(s.cached_voices("secret"), Some(voices));
        assert_eq!(s.cached_voices("other"), None);
        assert!(!s.voice_cache.read().contains_key("secret"));
        assert_eq!(key_fingerprint("secret").len(), 64);
    }

    #[test]
    fn episode_counters() {
        let s = state();
        s.record_episode(StrategyKind::FullFidelity);
        s.record_episode(StrategyKind::Basic);
        s.record_episode(StrategyKind::Basic);
        s.record_failure();
        assert_eq!(
            s.episode_stats(),
            EpisodeStats {
                full_fidelity: 1,
                basic: 2,
                failed: 1
            }
        );
    }

    #[test]
    fn request_model_overrides_configured_model() {
        let s = state();
        assert_eq!(s.openai_config(Some("gpt-4o")).model, "gpt-4o");
        assert_eq!(s.openai_config(Some(" ")).model, "gpt-4o-mini");
        assert_eq!(s.synthesis_config().line_delay, Duration::ZERO);
    }
}
