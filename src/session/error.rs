use thiserror::Error;

/// Failure classes surfaced by the exchange session and its adapters
#[derive(Debug, Error)]
pub enum SessionError {
    /// Microphone permission refused or device unavailable. Terminal for the
    /// current question; only an explicit user retry re-enters the session.
    #[error("microphone access denied: {0}")]
    DeviceDenied(String),

    /// Prompt could not be loaded or played. Terminal for the attempt;
    /// retry re-runs the prompt from the start.
    #[error("prompt playback failed: {0}")]
    Playback(String),

    /// Artifact was not accepted by the submission channel. Non-fatal: the
    /// session still completes and the failure is surfaced as a warning.
    #[error("submission failed: {0}")]
    Submission(String),

    /// Caller drove an adapter outside its contract (e.g. double start).
    /// Programming-error class; fails fast and is never swallowed.
    #[error("protocol misuse: {0}")]
    ProtocolMisuse(String),

    /// Question fetch failed or returned an empty set; terminal for the
    /// sequencer.
    #[error("no questions available: {0}")]
    NoQuestions(String),
}

impl SessionError {
    /// Whether the containing flow may still treat the question as answered
    pub fn is_warning(&self) -> bool {
        matches!(self, SessionError::Submission(_))
    }
}
