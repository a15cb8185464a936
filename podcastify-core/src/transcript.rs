//! Plain-text transcript, offered for download when audio is unavailable.

use chrono::NaiveDateTime;

use crate::script::DialogueTurn;

const RULE_WIDTH: usize = 60;

/// Render `script` as a readable text document.
///
/// Turns are listed in ordinal order and numbered from 1; blank turns are
/// kept so the numbering matches the script shown to the user.
pub fn render_transcript(script: &[DialogueTurn], title: &str, generated_at: NaiveDateTime) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut turns: Vec<&DialogueTurn> = script.iter().collect();
    turns.sort_by_key(|t| t.ordinal);

    let mut out = Vec::with_capacity(turns.len() * 3 + 10);
    out.push(rule.clone());
    out.push("PODCAST SCRIPT".to_string());
    out.push(rule.clone());
    out.push(format!("Title: {}", title.trim()));
    out.push(format!("Generated: {}", generated_at.format("%Y-%m-%d %H:%M:%S")));
    out.push(rule.clone());
    out.push(String::new());

    for (i, turn) in turns.iter().enumerate() {
        let role = turn.speaker.as_str().to_uppercase();
        let name = turn.display_name.trim();
        if name.is_empty() || name.eq_ignore_ascii_case(&role) {
            out.push(format!("[{:02}] {role}:", i + 1));
        } else {
            out.push(format!("[{:02}] {role} ({name}):", i + 1));
        }
        out.push(format!("    {}", turn.text.trim()));
        out.push(String::new());
    }

    out.push(rule.clone());
    out.push("END OF SCRIPT".to_string());
    out.push(rule);
    out.join("\n")
}

/// `podcast_script_<title>.txt`, with the title reduced to at most 50
/// filename-safe characters.
pub fn transcript_filename(title: &str) -> String {
    let stem: String = title
        .trim()
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('_'),
            c if c.is_alphanumeric() || c == '-' || c == '_' => Some(c),
            _ => None,
        })
        .take(50)
        .collect();
    if stem.is_empty() {
        "podcast_script.txt".to_string()
    } else {
        format!("podcast_script_{stem}.txt")
    }
}
