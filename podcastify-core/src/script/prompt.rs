//! Producer prompt for the chat-completions script request.

use serde::Serialize;

use super::{Cast, ScriptStyle};
use crate::article::Article;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

fn style_phrase(style: ScriptStyle) -> &'static str {
    match style {
        ScriptStyle::Aussie => "Australian English with natural Aussie expressions and cadence",
        ScriptStyle::Neutral => "natural, conversational English",
    }
}

/// System and user messages asking for a JSON dialogue script.
pub fn build_messages(article: &Article, cast: &Cast, style: ScriptStyle) -> Vec<ChatMessage> {
    let system = format!(
        r#"You are a veteran podcast producer. Create a two-speaker conversational script between a host and a guest.
Write in {style}. Keep it lively, insightful, and easy to follow.
Return ONLY valid JSON with this shape:
{{
  "script": [
    {{"id": 1, "speaker": "Host", "name": "{host}", "text": "..."}},
    {{"id": 2, "speaker": "Guest", "name": "{guest}", "text": "..."}}
  ]
}}
Rules:
- Alternate speakers each turn (Host then Guest then Host, etc.).
- Keep lines 1–4 sentences each, no emojis.
- Use the article to drive the discussion (summary + key insights + 1–2 thoughtful takes).
- Include a short intro and a crisp outro.
- No markdown, no backticks.
- Keep it under ~120 turns total."#,
        style = style_phrase(style),
        host = cast.host_name,
        guest = cast.guest_name,
    );
    let user = format!(
        "ARTICLE TITLE: {}\n\nARTICLE CONTENT:\n{}\n\nTask: Produce the JSON script now.",
        article.title.trim(),
        article.text.trim()
    );

    vec![
        ChatMessage {
            role: "system",
            content: system,
        },
        ChatMessage {
            role: "user",
            content: user,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article() -> Article {
        Article {
            title: "Reef Survey".into(),
            text: "Coral cover rose this year.".into(),
        }
    }

    #[test]
    fn system_prompt_names_cast_and_style() {
        let cast = Cast::new(Some("Mia"), Some("Dr Lee"));
        let messages = build_messages(&article(), &cast, ScriptStyle::Aussie);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert!(messages[0].content.contains("\"name\": \"Mia\""));
        assert!(messages[0].content.contains("\"name\": \"Dr Lee\""));
        assert!(messages[0].content.contains("Aussie expressions"));
    }

    #[test]
    fn neutral_style_and_user_payload() {
        let messages = build_messages(&article(), &Cast::default(), ScriptStyle::Neutral);
        assert!(messages[0].content.contains("natural, conversational English"));
        assert_eq!(
            messages[1].content,
            "ARTICLE TITLE: Reef Survey\n\nARTICLE CONTENT:\nCoral cover rose this year.\n\nTask: Produce the JSON script now."
        );
    }
}
