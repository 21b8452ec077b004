pub mod api;
pub mod audio;
pub mod config;
pub mod question;
pub mod sequencer;
pub mod session;
pub mod timer;

pub use api::{ApiClient, QuestionDefaults, QuestionSource};
pub use audio::{
    AudioFrame, CaptureAdapter, ClockedPlayer, FrameSource, PlaybackEvent, PromptAudio,
    PromptPlayer, RecordingArtifact, SilenceSource,
};
pub use config::Config;
pub use question::{PromptRef, Question, QuestionSet, ReplayBudget};
pub use sequencer::{run_section, QuestionSequencer, SectionReport};
pub use session::{
    ExchangeSession, Phase, SessionCommand, SessionError, SessionEvent, SessionOptions,
    SessionOutcome, SessionState, SubmissionChannel,
};
pub use timer::{TimerEngine, TimerEvent};
