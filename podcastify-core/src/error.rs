use thiserror::Error;

/// All errors produced by podcastify-core.
#[derive(Debug, Error)]
pub enum PodcastError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("speech provider returned {status}: {body}")]
    RemoteSynthesis { status: u16, body: String },

    #[error("article scrape failed: {0}")]
    Scrape(String),

    #[error("script generation failed: {0}")]
    ScriptGeneration(String),

    #[error("audio decode error: {0}")]
    Decode(String),

    #[error("audio encoding error: {0}")]
    Encoding(String),

    #[error("synthesis strategy unavailable: {0}")]
    StrategyUnavailable(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("full-fidelity synthesis failed ({primary}); basic fallback failed ({fallback})")]
    BothStrategiesFailed {
        primary: Box<PodcastError>,
        fallback: Box<PodcastError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PodcastError {
    /// Whether a failure in the primary pass hands the episode to the fallback.
    ///
    /// Container encoding failures surface directly.
    pub fn triggers_fallback(&self) -> bool {
        !matches!(self, PodcastError::Encoding(_))
    }

    /// HTTP status carried by a provider rejection, if any.
    ///
    /// For a combined failure the fallback's status wins.
    pub fn provider_status(&self) -> Option<u16> {
        match self {
            PodcastError::RemoteSynthesis { status, .. } => Some(*status),
            PodcastError::BothStrategiesFailed { primary, fallback } => fallback
                .provider_status()
                .or_else(|| primary.provider_status()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for PodcastError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            PodcastError::Transport(format!("request timed out: {e}"))
        } else {
            PodcastError::Transport(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, PodcastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_errors_do_not_trigger_fallback() {
        assert!(!PodcastError::Encoding("lame".into()).triggers_fallback());
        assert!(PodcastError::Decode("bad frame".into()).triggers_fallback());
        assert!(PodcastError::Transport("reset".into()).triggers_fallback());
        assert!(PodcastError::StrategyUnavailable("no codec".into()).triggers_fallback());
    }

    #[test]
    fn combined_failure_mentions_both_causes() {
        let err = PodcastError::BothStrategiesFailed {
            primary: Box::new(PodcastError::Decode("decoder exploded".into())),
            fallback: Box::new(PodcastError::RemoteSynthesis {
                status: 500,
                body: "upstream down".into(),
            }),
        };
        let msg = err.to_string();
        assert!(msg.contains("decoder exploded"));
        assert!(msg.contains("500"));
        assert_eq!(err.provider_status(), Some(500));
    }

    #[test]
    fn remote_synthesis_exposes_status() {
        let err = PodcastError::RemoteSynthesis {
            status: 401,
            body: "invalid api key".into(),
        };
        assert_eq!(err.provider_status(), Some(401));
        assert!(err.to_string().contains("401"));
    }
}
