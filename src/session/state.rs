/// Phases of the per-question exchange
///
/// Transitions run forward only, except the explicit replay reset from
/// `PromptDone`/`Recording` back through `ReplayPlaying`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    PromptPlaying,
    PromptDone,
    ReplayPlaying,
    Recording,
    Saving,
    Complete,
    Error,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Complete | Phase::Error)
    }
}

/// Snapshot of one exchange session's mutable state
///
/// Owned exclusively by its session; emitted on every phase change so
/// observers never touch live state.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub phase: Phase,
    /// Seconds left on the response countdown
    pub time_remaining_secs: u32,
    /// Replays consumed so far (never exceeds the question's allowance)
    pub replays_used: u32,
    /// Most recent error, if any
    pub last_error: Option<String>,
}

impl SessionState {
    pub fn new(time_limit_secs: u32) -> Self {
        Self {
            phase: Phase::Idle,
            time_remaining_secs: time_limit_secs,
            replays_used: 0,
            last_error: None,
        }
    }
}
