//! Persistent server settings (JSON file in the app data directory).
//!
//! Environment variables win over the file; they are applied after loading
//! and never written back.

use std::fs;
use std::path::{Path, PathBuf};

use podcastify_core::{
    episode::{BasicFormat, MAX_PAUSE_MS},
    script::openai::DEFAULT_OPENAI_MODEL,
    speech::elevenlabs::DEFAULT_BASE_URL,
};
use serde::{Deserialize, Serialize};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct AppSettings {
    pub bind_addr: String,
    pub port: u16,
    pub openai_model: String,
    pub openai_base_url: String,
    pub elevenlabs_base_url: String,
    pub default_pause_ms: i64,
    pub line_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub basic_format: BasicFormat,
    pub elevenlabs_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub frontend_dist: Option<PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.into(),
            port: DEFAULT_PORT,
            openai_model: DEFAULT_OPENAI_MODEL.into(),
            openai_base_url: DEFAULT_OPENAI_BASE_URL.into(),
            elevenlabs_base_url: DEFAULT_BASE_URL.into(),
            default_pause_ms: 400,
            line_delay_ms: 200,
            request_timeout_secs: 60,
            basic_format: BasicFormat::Mp3Concat,
            elevenlabs_api_key: None,
            openai_api_key: None,
            frontend_dist: None,
        }
    }
}

impl AppSettings {
    pub fn normalize(&mut self) {
        self.bind_addr = non_empty_or(&self.bind_addr, DEFAULT_BIND_ADDR);
        if self.port == 0 {
            self.port = DEFAULT_PORT;
        }
        self.openai_model = non_empty_or(&self.openai_model, DEFAULT_OPENAI_MODEL);
        self.openai_base_url = normalize_base_url(&self.openai_base_url, DEFAULT_OPENAI_BASE_URL);
        self.elevenlabs_base_url = normalize_base_url(&self.elevenlabs_base_url, DEFAULT_BASE_URL);
        self.default_pause_ms = self.default_pause_ms.clamp(0, MAX_PAUSE_MS);
        self.line_delay_ms = self.line_delay_ms.min(5_000);
        self.request_timeout_secs = self.request_timeout_secs.clamp(5, 600);
        self.elevenlabs_api_key = normalize_secret(self.elevenlabs_api_key.as_deref());
        self.openai_api_key = normalize_secret(self.openai_api_key.as_deref());
        self.frontend_dist = self
            .frontend_dist
            .take()
            .filter(|p| !p.as_os_str().is_empty());
    }

    /// Overlay process environment variables.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Overlay values from `lookup`; unparsable values are ignored.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(port) = lookup("PORT").and_then(|v| v.trim().parse().ok()) {
            self.port = port;
        }
        if let Some(addr) = lookup("PODCASTIFY_BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Some(model) = lookup("OPENAI_MODEL") {
            self.openai_model = model;
        }
        if let Some(dist) = lookup("FRONTEND_DIST") {
            self.frontend_dist = Some(PathBuf::from(dist));
        }
        if let Some(key) = lookup("ELEVENLABS_API_KEY") {
            self.elevenlabs_api_key = Some(key);
        }
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.openai_api_key = Some(key);
        }
        if let Some(pause) = lookup("PODCASTIFY_PAUSE_MS").and_then(|v| v.trim().parse().ok()) {
            self.default_pause_ms = pause;
        }
        if let Some(delay) = lookup("PODCASTIFY_LINE_DELAY_MS").and_then(|v| v.trim().parse().ok()) {
            self.line_delay_ms = delay;
        }
        if let Some(format) = lookup("PODCASTIFY_BASIC_FORMAT").and_then(|v| parse_basic_format(&v)) {
            self.basic_format = format;
        }
        self.normalize();
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn non_empty_or(raw: &str, fallback: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        fallback.into()
    } else {
        trimmed.into()
    }
}

fn normalize_base_url(raw: &str, fallback: &str) -> String {
    non_empty_or(raw, fallback).trim_end_matches('/').to_string()
}

fn normalize_secret(raw: Option<&str>) -> Option<String> {
    raw.map(|k| k.trim().to_string()).filter(|k| !k.is_empty())
}

pub fn parse_basic_format(raw: &str) -> Option<BasicFormat> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "mp3" | "mp3_concat" | "concat" => Some(BasicFormat::Mp3Concat),
        "wav" | "pcm" => Some(BasicFormat::Wav),
        _ => None,
    }
}

pub fn default_settings_path() -> PathBuf {
    if let Some(explicit) = std::env::var_os("PODCASTIFY_SETTINGS") {
        return PathBuf::from(explicit);
    }
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Podcastify")
            .join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".local")
                    .join("share")
            })
            .join("podcastify")
            .join("settings.json")
    }
}

pub fn load_settings(path: &Path) -> AppSettings {
    let mut settings = fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<AppSettings>(&raw).ok())
        .unwrap_or_default();
    settings.normalize();
    settings
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(std::io::Error::other)?;
    fs::write(path, json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn normalize_repairs_out_of_range_values() {
        let mut s = AppSettings {
            bind_addr: "  ".into(),
            port: 0,
            openai_model: "".into(),
            elevenlabs_base_url: "http://localhost:9000/".into(),
            default_pause_ms: -50,
            request_timeout_secs: 0,
            elevenlabs_api_key: Some("   ".into()),
            openai_api_key: Some(" sk-test ".into()),
            ..AppSettings::default()
        };
        s.normalize();
        assert_eq!(s.bind_addr, "0.0.0.0");
        assert_eq!(s.port, 8080);
        assert_eq!(s.openai_model, "gpt-4o-mini");
        assert_eq!(s.elevenlabs_base_url, "http://localhost:9000");
        assert_eq!(s.default_pause_ms, 0);
        assert_eq!(s.request_timeout_secs, 5);
        assert_eq!(s.elevenlabs_api_key, None);
        assert_eq!(s.openai_api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn oversized_pause_clamps_to_cap() {
        let mut s = AppSettings::default();
        s.apply_overrides_from(|name| (name == "PODCASTIFY_PAUSE_MS").then(|| i64::MAX.to_string()));
        assert_eq!(s.default_pause_ms, MAX_PAUSE_MS);
    }

    #[test]
    fn env_overrides_take_precedence() {
        let env: HashMap<&str, &str> = [
            ("PORT", "9090"),
            ("OPENAI_MODEL", "gpt-4o"),
            ("ELEVENLABS_API_KEY", "xi-key"),
            ("PODCASTIFY_PAUSE_MS", "250"),
            ("PODCASTIFY_BASIC_FORMAT", "WAV"),
            ("PODCASTIFY_LINE_DELAY_MS", "not-a-number"),
        ]
        .into_iter()
        .collect();
        let mut s = AppSettings::default();
        s.apply_overrides_from(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(s.port, 9090);
        assert_eq!(s.openai_model, "gpt-4o");
        assert_eq!(s.elevenlabs_api_key.as_deref(), Some("xi-key"));
        assert_eq!(s.default_pause_ms, 250);
        assert_eq!(s.basic_format, BasicFormat::Wav);
        assert_eq!(s.line_delay_ms, 200);
        assert_eq!(s.listen_addr(), "0.0.0.0:9090");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let s: AppSettings = serde_json::from_str(r#"{"port": 3000, "basicFormat": "wav"}"#).unwrap();
        assert_eq!(s.port, 3000);
        assert_eq!(s.basic_format, BasicFormat::Wav);
        assert_eq!(s.default_pause_ms, 400);
    }

    #[test]
    fn save_then_load() {
        let dir = std::env::temp_dir().join(format!("podcastify-settings-{}", std::process::id()));
        let path = dir.join("nested").join("settings.json");
        let mut s = AppSettings::default();
        s.port = 8181;
        s.openai_api_key = Some("sk".into());
        save_settings(&path, &s).unwrap();

        let loaded = load_settings(&path);
        assert_eq!(loaded.port, 8181);
        assert_eq!(loaded.openai_api_key.as_deref(), Some("sk"));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn unreadable_file_yields_defaults() {
        let loaded = load_settings(Path::new("/nonexistent/podcastify/settings.json"));
        assert_eq!(loaded.port, 8080);
    }
}
