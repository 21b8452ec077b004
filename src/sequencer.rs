use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tracing::{info, warn};

use crate::audio::{CaptureAdapter, FrameSource, PromptPlayer};
use crate::question::{Question, QuestionSet};
use crate::session::{
    ExchangeSession, SessionError, SessionEvent, SessionOptions, SessionOutcome,
    SubmissionChannel,
};

/// Cursor over an ordered question set with an advance gate
///
/// The cursor may only move forward once the current question's session
/// reached `Complete`, or when the user explicitly skips past an error.
/// Retries are user-initiated; the sequencer never retries on its own.
pub struct QuestionSequencer {
    set: QuestionSet,
    cursor: usize,
    gate_open: bool,
    last_failure: Option<String>,
}

impl QuestionSequencer {
    /// Build a sequencer over a loaded question set
    ///
    /// An empty set is terminal: there is nothing to administer.
    pub fn new(set: QuestionSet) -> Result<Self, SessionError> {
        if set.is_empty() {
            return Err(SessionError::NoQuestions("question set is empty".into()));
        }

        info!("Sequencer ready: {} questions", set.len());

        Ok(Self {
            set,
            cursor: 0,
            gate_open: false,
            last_failure: None,
        })
    }

    /// The active question, or `None` once the set is exhausted
    pub fn current(&self) -> Option<&Question> {
        self.set.get(self.cursor)
    }

    /// 0-based position of the cursor
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Whether the cursor has moved past the last question
    pub fn is_complete(&self) -> bool {
        self.cursor >= self.set.len()
    }

    /// Unlock the advance gate: the current question's session completed
    pub fn complete_current(&mut self) {
        self.gate_open = true;
        self.last_failure = None;
    }

    /// Record a terminal session error for the current question
    pub fn record_failure(&mut self, reason: impl Into<String>) {
        self.last_failure = Some(reason.into());
    }

    /// Clear a recorded failure so a fresh session may run (user retry)
    pub fn retry_current(&mut self) -> Option<&Question> {
        self.last_failure = None;
        self.current()
    }

    pub fn last_failure(&self) -> Option<&str> {
        self.last_failure.as_deref()
    }

    /// User override: move past a question stuck in an error state
    pub fn skip_current(&mut self) {
        if let Some(q) = self.current() {
            warn!("Skipping question: {}", q.id);
        }
        self.gate_open = true;
    }

    /// Move the cursor forward by one; `false` means the set is complete
    ///
    /// Calling this without a completed or skipped current question is a
    /// caller error.
    pub fn advance(&mut self) -> Result<bool, SessionError> {
        if !self.gate_open {
            return Err(SessionError::ProtocolMisuse(
                "advance before the current question completed".into(),
            ));
        }

        self.gate_open = false;
        self.last_failure = None;
        self.cursor += 1;

        if self.is_complete() {
            info!("Question set complete ({} questions)", self.set.len());
            Ok(false)
        } else {
            Ok(true)
        }
    }
}

/// Per-question results from a full section run
#[derive(Debug, Clone)]
pub struct SectionReport {
    /// Outcomes of sessions that ran to `Complete` or were cancelled
    pub outcomes: Vec<SessionOutcome>,
    /// Question IDs skipped after a terminal session error
    pub skipped: Vec<String>,
}

/// Drive a whole section: one exchange session per question, in order
///
/// Adapters are built fresh per question so no playback or capture state
/// leaks across questions; the single mic permit guarantees at most one
/// outstanding acquisition across the run. Questions whose session fails
/// terminally are skipped via the sequencer's override so the batch run can
/// finish; interactive flows would surface the retry instead.
pub async fn run_section(
    set: QuestionSet,
    options: SessionOptions,
    submission: Arc<dyn SubmissionChannel>,
    mut make_player: impl FnMut(&Question) -> Box<dyn PromptPlayer>,
    mut make_source: impl FnMut(&Question) -> Box<dyn FrameSource>,
    events: mpsc::Sender<SessionEvent>,
) -> Result<SectionReport, SessionError> {
    let mut sequencer = QuestionSequencer::new(set)?;
    let mic = Arc::new(Semaphore::new(1));

    let mut report = SectionReport {
        outcomes: Vec::new(),
        skipped: Vec::new(),
    };

    while let Some(question) = sequencer.current().cloned() {
        let capture = CaptureAdapter::new(&question.id, make_source(&question));
        let session = ExchangeSession::new(
            question.clone(),
            options.clone(),
            make_player(&question),
            capture,
            Arc::clone(&mic),
            Arc::clone(&submission),
            events.clone(),
        );

        // No interactive commands in a batch run; keep the sender alive so
        // the session doesn't read a closed channel as cancellation
        let (_cmd_tx, cmd_rx) = mpsc::channel(8);

        match session.run(cmd_rx).await {
            Ok(outcome) => {
                report.outcomes.push(outcome);
                sequencer.complete_current();
            }
            Err(e) => {
                warn!("Question {} failed: {}", question.id, e);
                sequencer.record_failure(e.to_string());
                report.skipped.push(question.id.clone());
                sequencer.skip_current();
            }
        }

        if !sequencer.advance()? {
            break;
        }
    }

    Ok(report)
}
