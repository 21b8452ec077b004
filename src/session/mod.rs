//! Per-question exchange session
//!
//! This module provides the `ExchangeSession` state machine that manages:
//! - Prompt playback and the bounded replay allowance
//! - The one-second-tick response countdown
//! - Microphone capture and artifact handoff to the submission channel
//! - Resource cleanup on every exit path, including cancellation

mod error;
mod session;
mod state;

pub use error::SessionError;
pub use session::{
    ExchangeSession, SessionCommand, SessionEvent, SessionOptions, SessionOutcome,
    SubmissionChannel,
};
pub use state::{Phase, SessionState};
