//! One synthesis pass over a script with a single strategy.

use std::time::Duration;

use tracing::debug;

use crate::{
    episode::{
        progress::ProgressReporter,
        strategy::{EncodedEpisode, SynthesisStrategy},
        EpisodeRequest, TimelineEntry,
    },
    error::{PodcastError, Result},
    script::DialogueTurn,
    speech::{LineSynthesizer, SpeechProvider},
};

/// Share of the progress bar covered by line synthesis.
const LINES_START: u8 = 5;
const LINES_SPAN: usize = 85;
const ENCODING_PERCENT: u8 = 92;

#[derive(Debug, Clone)]
pub struct AssembledEpisode {
    pub encoded: EncodedEpisode,
    pub timeline: Vec<TimelineEntry>,
    pub duration: Duration,
}

pub struct Assembler<'p> {
    provider: &'p dyn SpeechProvider,
    line_delay: Duration,
}

impl<'p> Assembler<'p> {
    pub fn new(provider: &'p dyn SpeechProvider, line_delay: Duration) -> Self {
        Self {
            provider,
            line_delay,
        }
    }

    /// Synthesize every speakable turn in ordinal order and containerise.
    ///
    /// Gaps go between synthesized turns only; there is no trailing silence.
    pub fn run(
        &self,
        strategy: &dyn SynthesisStrategy,
        request: &EpisodeRequest,
        progress: &mut ProgressReporter<'_>,
    ) -> Result<AssembledEpisode> {
        let mut builder = strategy.begin(request.pause_ms())?;
        let format = strategy.request_format();
        let turns = speakable_in_order(&request.script);
        if turns.is_empty() {
            return Err(PodcastError::InvalidInput("script has no speakable turns".into()));
        }

        let mut lines = LineSynthesizer::new(self.provider, self.line_delay);
        let mut timeline = Vec::with_capacity(turns.len());
        let mut cursor = Duration::ZERO;
        let total = turns.len();

        for (i, turn) in turns.iter().enumerate() {
            if i > 0 {
                cursor += builder.append_gap()?;
            }
            let voice_id = request.voice_for(turn.speaker);
            let audio = lines.synthesize_line(&turn.text, voice_id, &request.credential, format)?;
            let duration = builder.append_line(audio)?;

            timeline.push(TimelineEntry {
                ordinal: turn.ordinal,
                speaker: turn.speaker,
                start: cursor,
                duration,
            });
            cursor += duration;

            debug!(
                strategy = %strategy.kind(),
                ordinal = turn.ordinal,
                speaker = %turn.speaker,
                ms = duration.as_millis() as u64,
                "line appended"
            );
            let percent = LINES_START as usize + (i + 1) * LINES_SPAN / total;
            progress.report(
                percent as u8,
                &format!("Synthesized line {}/{} ({})", i + 1, total, turn.display_name),
            );
        }

        progress.report(ENCODING_PERCENT, "Encoding episode");
        let encoded = builder.finish()?;

        Ok(AssembledEpisode {
            encoded,
            timeline,
            duration: cursor,
        })
    }
}

/// Non-blank turns, stably sorted by ordinal.
pub fn speakable_in_order(script: &[DialogueTurn]) -> Vec<&DialogueTurn> {
    let mut turns: Vec<&DialogueTurn> = script.iter().filter(|t| t.is_speakable()).collect();
    turns.sort_by_key(|t| t.ordinal);
    turns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::Speaker;

    #[test]
    fn orders_by_ordinal_and_drops_blank_turns() {
        let script = vec![
            DialogueTurn::new(3, Speaker::Host, "H", "third"),
            DialogueTurn::new(1, Speaker::Guest, "G", "first"),
            DialogueTurn::new(2, Speaker::Host, "H", "  "),
            DialogueTurn::new(1, Speaker::Host, "H", "first-dup"),
        ];
        let texts: Vec<&str> = speakable_in_order(&script)
            .iter()
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(texts, vec!["first", "first-dup", "third"]);
    }
}
