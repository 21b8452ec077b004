use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Prompt stimulus for a question: text, audio, or both
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptRef {
    /// Prompt text shown to the test-taker, if any
    pub text: Option<String>,

    /// Opaque locator for the prompt audio (resolved by the API layer)
    pub audio: Option<String>,
}

impl PromptRef {
    pub fn audio_only(locator: impl Into<String>) -> Self {
        Self {
            text: None,
            audio: Some(locator.into()),
        }
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }
}

/// A single timed spoken-response question
///
/// Immutable once loaded; the per-question session keeps its own mutable
/// state separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// Unique, stable question identifier
    pub id: String,

    /// Prompt stimulus
    pub prompt: PromptRef,

    /// Response time limit in seconds (must be positive)
    pub time_limit_secs: u32,

    /// How many times the prompt may be replayed (default: 2)
    pub replay_allowance: u32,

    /// Pause between prompt end and recording start (default: 1s)
    pub post_prompt_delay: Duration,
}

impl Question {
    pub fn new(id: impl Into<String>, prompt: PromptRef, time_limit_secs: u32) -> Self {
        Self {
            id: id.into(),
            prompt,
            time_limit_secs,
            replay_allowance: 2,
            post_prompt_delay: Duration::from_secs(1),
        }
    }

    pub fn time_limit(&self) -> Duration {
        Duration::from_secs(self.time_limit_secs as u64)
    }
}

/// Ordered, read-only set of questions for one test section
#[derive(Debug, Clone, Default)]
pub struct QuestionSet {
    questions: Vec<Question>,
}

impl QuestionSet {
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }
}

/// Bounded counter gating prompt replays
///
/// Decrements only when a replay is granted; never goes negative.
#[derive(Debug, Clone)]
pub struct ReplayBudget {
    allowance: u32,
    used: u32,
}

impl ReplayBudget {
    pub fn new(allowance: u32) -> Self {
        Self { allowance, used: 0 }
    }

    /// Try to consume one replay; returns whether the replay was granted
    pub fn try_consume(&mut self) -> bool {
        if self.used < self.allowance {
            self.used += 1;
            true
        } else {
            false
        }
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn remaining(&self) -> u32 {
        self.allowance - self.used
    }
}
