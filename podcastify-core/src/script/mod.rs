//! Dialogue script model and the script-generation collaborator.
//!
//! The assembler only ever sees [`DialogueTurn`] with a strict [`Speaker`].
//! Loose model output (any-case speaker labels, missing ids or names) is
//! normalised here, at the parsing boundary.

pub mod openai;
pub mod prompt;

pub use openai::{OpenAiConfig, OpenAiScriptGenerator};

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, info};

use crate::{
    article::{Article, ArticleSource},
    error::{PodcastError, Result},
};

/// Script role of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Speaker {
    Host,
    Guest,
}

impl Speaker {
    /// `"host"` in any case is the host; everything else is the guest.
    pub fn from_label(label: &str) -> Self {
        if label.trim().eq_ignore_ascii_case("host") {
            Speaker::Host
        } else {
            Speaker::Guest
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::Host => "Host",
            Speaker::Guest => "Guest",
        }
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Speaker {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Speaker {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let label = Option::<String>::deserialize(deserializer)?;
        Ok(label.as_deref().map(Speaker::from_label).unwrap_or(Speaker::Guest))
    }
}

/// One line of dialogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueTurn {
    /// 1-based sequence position.
    #[serde(rename = "id")]
    pub ordinal: u32,
    pub speaker: Speaker,
    #[serde(rename = "name", default)]
    pub display_name: String,
    #[serde(default)]
    pub text: String,
}

impl DialogueTurn {
    pub fn new(ordinal: u32, speaker: Speaker, display_name: &str, text: &str) -> Self {
        Self {
            ordinal,
            speaker,
            display_name: display_name.to_string(),
            text: text.to_string(),
        }
    }

    /// Whether the turn has anything to speak.
    pub fn is_speakable(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// Host and guest display names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cast {
    pub host_name: String,
    pub guest_name: String,
}

impl Default for Cast {
    fn default() -> Self {
        Self {
            host_name: "Host".to_string(),
            guest_name: "Guest".to_string(),
        }
    }
}

impl Cast {
    pub fn new(host_name: Option<&str>, guest_name: Option<&str>) -> Self {
        let pick = |name: Option<&str>, fallback: &str| {
            name.map(str::trim)
                .filter(|n| !n.is_empty())
                .unwrap_or(fallback)
                .to_string()
        };
        Self {
            host_name: pick(host_name, "Host"),
            guest_name: pick(guest_name, "Guest"),
        }
    }

    pub fn name_for(&self, speaker: Speaker) -> &str {
        match speaker {
            Speaker::Host => &self.host_name,
            Speaker::Guest => &self.guest_name,
        }
    }
}

/// Language register of the generated dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScriptStyle {
    #[default]
    Aussie,
    Neutral,
}

impl ScriptStyle {
    pub fn from_flag(aussie: bool) -> Self {
        if aussie {
            ScriptStyle::Aussie
        } else {
            ScriptStyle::Neutral
        }
    }
}

/// Contract for script-generation backends.
pub trait ScriptGenerator: Send + Sync {
    /// # Errors
    /// `ScriptGeneration` for upstream API failures or a malformed response.
    fn generate(&self, article: &Article, cast: &Cast, style: ScriptStyle)
        -> Result<Vec<DialogueTurn>>;
}

/// An article together with the script generated from it.
#[derive(Debug, Clone, Serialize)]
pub struct ScriptDraft {
    pub article: Article,
    pub url: String,
    pub script: Vec<DialogueTurn>,
}

/// Fetch `url` and turn the article into a script.
///
/// Scrape and generation errors surface unmodified.
pub fn draft_script(
    source: &dyn ArticleSource,
    generator: &dyn ScriptGenerator,
    url: &str,
    cast: &Cast,
    style: ScriptStyle,
) -> Result<ScriptDraft> {
    let article = source.fetch(url)?;
    info!(title = %article.title, chars = article.text.len(), "article fetched");
    let script = generator.generate(&article, cast, style)?;
    info!(turns = script.len(), "script generated");
    Ok(ScriptDraft {
        article,
        url: url.to_string(),
        script,
    })
}

#[derive(Deserialize)]
struct RawTurn {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    speaker: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

impl RawTurn {
    fn normalize(self, position: usize, cast: &Cast) -> DialogueTurn {
        let ordinal = self
            .id
            .as_ref()
            .and_then(|v| match v {
                serde_json::Value::Number(n) => n.as_u64(),
                serde_json::Value::String(s) => s.trim().parse().ok(),
                _ => None,
            })
            .and_then(|n| u32::try_from(n).ok())
            .filter(|&n| n > 0)
            .unwrap_or(position as u32 + 1);
        let speaker = Speaker::from_label(self.speaker.as_deref().unwrap_or_default());
        let display_name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| cast.name_for(speaker).to_string());
        DialogueTurn {
            ordinal,
            speaker,
            display_name,
            text: self.text.unwrap_or_default().trim().to_string(),
        }
    }
}

/// Validate a model response into strict turns.
///
/// Accepts the JSON object optionally wrapped in a markdown code fence.
pub fn parse_script_response(content: &str, cast: &Cast) -> Result<Vec<DialogueTurn>> {
    let body = strip_code_fence(content);
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| PodcastError::ScriptGeneration(format!("model returned invalid JSON: {e}")))?;

    let entries = value
        .get("script")
        .and_then(|s| s.as_array())
        .ok_or_else(|| PodcastError::ScriptGeneration("response has no \"script\" array".into()))?;
    if entries.is_empty() {
        return Err(PodcastError::ScriptGeneration("script is empty".into()));
    }

    let mut turns = Vec::with_capacity(entries.len());
    for (position, entry) in entries.iter().enumerate() {
        let raw: RawTurn = serde_json::from_value(entry.clone()).map_err(|e| {
            PodcastError::ScriptGeneration(format!("turn {} is malformed: {e}", position + 1))
        })?;
        turns.push(raw.normalize(position, cast));
    }

    if !turns.iter().any(DialogueTurn::is_speakable) {
        return Err(PodcastError::ScriptGeneration(
            "script has no speakable lines".into(),
        ));
    }
    debug!(turns = turns.len(), "script response parsed");
    Ok(turns)
}

/// Normalise a client-supplied script (HTTP body) the same way.
pub fn normalize_turns(value: serde_json::Value, cast: &Cast) -> Result<Vec<DialogueTurn>> {
    let entries: Vec<RawTurn> = serde_json::from_value(value)
        .map_err(|e| PodcastError::InvalidInput(format!("script must be a list of turns: {e}")))?;
    Ok(entries
        .into_iter()
        .enumerate()
        .map(|(i, raw)| raw.normalize(i, cast))
        .collect())
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speaker_labels_are_case_insensitive() {
        assert_eq!(Speaker::from_label("host"), Speaker::Host);
        assert_eq!(Speaker::from_label(" HOST "), Speaker::Host);
        assert_eq!(Speaker::from_label("Guest"), Speaker::Guest);
        assert_eq!(Speaker::from_label("co-host"), Speaker::Guest);
        assert_eq!(Speaker::from_label(""), Speaker::Guest);
    }

    #[test]
    fn turn_wire_shape() {
        let turn: DialogueTurn =
            serde_json::from_str(r#"{"id":3,"speaker":"hOsT","name":"Mia","text":"G'day"}"#)
                .expect("parse");
        assert_eq!(turn, DialogueTurn::new(3, Speaker::Host, "Mia", "G'day"));
        let json = serde_json::to_value(&turn).expect("serialize");
        assert_eq!(json["speaker"], "Host");
        assert_eq!(json["id"], 3);
    }

    #[test]
    fn parses_fenced_response_and_fills_gaps() {
        let cast = Cast::new(Some("Mia"), Some("Sam"));
        let content = "```json\n{\"script\":[\
            {\"speaker\":\"Host\",\"text\":\" Welcome! \"},\
            {\"id\":\"7\",\"speaker\":\"guest\",\"name\":\"\",\"text\":\"Thanks.\"}]}\n```";
        let turns = parse_script_response(content, &cast).expect("parse");
        assert_eq!(turns[0], DialogueTurn::new(1, Speaker::Host, "Mia", "Welcome!"));
        assert_eq!(turns[1], DialogueTurn::new(7, Speaker::Guest, "Sam", "Thanks."));
    }

    #[test]
    fn rejects_unusable_responses() {
        let cast = Cast::default();
        for bad in [
            "not json",
            r#"{"lines":[]}"#,
            r#"{"script":[]}"#,
            r#"{"script":[{"speaker":"Host","text":"   "}]}"#,
        ] {
            let err = parse_script_response(bad, &cast).unwrap_err();
            assert!(matches!(err, PodcastError::ScriptGeneration(_)), "{bad}");
        }
    }

    #[test]
    fn cast_defaults_blank_names() {
        let cast = Cast::new(Some("  "), None);
        assert_eq!(cast, Cast::default());
        assert_eq!(cast.name_for(Speaker::Guest), "Guest");
    }

    struct FixedSource;
    impl ArticleSource for FixedSource {
        fn fetch(&self, url: &str) -> Result<Article> {
            if url.contains("broken") {
                return Err(PodcastError::Scrape("404".into()));
            }
            Ok(Article {
                title: "Koalas".into(),
                text: "Koalas sleep a lot.".into(),
            })
        }
    }

    struct EchoGenerator;
    impl ScriptGenerator for EchoGenerator {
        fn generate(
            &self,
            article: &Article,
            cast: &Cast,
            _style: ScriptStyle,
        ) -> Result<Vec<DialogueTurn>> {
            Ok(vec![DialogueTurn::new(1, Speaker::Host, &cast.host_name, &article.title)])
        }
    }

    #[test]
    fn draft_script_chains_collaborators() {
        let draft = draft_script(
            &FixedSource,
            &EchoGenerator,
            "https://example.com/koalas",
            &Cast::default(),
            ScriptStyle::Aussie,
        )
        .expect("draft");
        assert_eq!(draft.article.title, "Koalas");
        assert_eq!(draft.script[0].text, "Koalas");
    }

    #[test]
    fn draft_script_surfaces_scrape_error() {
        let err = draft_script(
            &FixedSource,
            &EchoGenerator,
            "https://example.com/broken",
            &Cast::default(),
            ScriptStyle::Neutral,
        )
        .unwrap_err();
        assert!(matches!(err, PodcastError::Scrape(_)));
    }
}
