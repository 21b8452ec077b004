use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tracing::{info, warn};

use super::error::SessionError;
use super::state::{Phase, SessionState};
use crate::audio::{CaptureAdapter, PlaybackEvent, PromptPlayer, RecordingArtifact};
use crate::question::{Question, ReplayBudget};
use crate::timer::{TimerEngine, TimerEvent};

/// Sink for finished recordings
///
/// Asynchronous and fire-and-forget from the session's perspective: a
/// failure is reported upward as a warning, never retried here.
#[async_trait::async_trait]
pub trait SubmissionChannel: Send + Sync {
    async fn submit(&self, artifact: RecordingArtifact) -> Result<(), SessionError>;
}

/// User-driven inputs to a running session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// Begin prompt playback (manual-start sessions wait for this in Idle)
    Start,
    /// Replay the prompt, subject to the replay budget
    Replay,
    /// End the recording early
    StopRecording,
    /// Tear the session down; resources are released in one step and any
    /// partial recording is discarded
    Cancel,
}

/// Notifications emitted while a session runs
#[derive(Debug, Clone)]
pub enum SessionEvent {
    PhaseChanged(SessionState),
    Tick { remaining_secs: u32 },
    ReplayGranted { remaining: u32 },
    ReplayDenied,
    SubmissionWarning(String),
}

/// Per-session configuration
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Play the prompt immediately instead of waiting for `Start`
    pub auto_start: bool,
}

/// Result of one completed (or cancelled) session run
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub question_id: String,
    /// Whether the session reached `Complete`
    pub completed: bool,
    /// Set when the artifact was produced but the submission channel
    /// reported failure (non-fatal)
    pub submission_warning: Option<String>,
    pub replays_used: u32,
}

enum Flow {
    Cancelled,
}

enum RecordOutcome {
    Artifact(RecordingArtifact),
    Replay,
    Cancelled,
}

/// The per-question exchange: prompt playback, bounded replays, countdown,
/// capture, and handoff to the submission channel
///
/// Owns every device resource it touches; all of them are released before
/// `run` returns, on every path including cancellation and error.
pub struct ExchangeSession {
    question: Question,
    options: SessionOptions,
    state: SessionState,
    budget: ReplayBudget,
    timer: TimerEngine,
    player: Box<dyn PromptPlayer>,
    capture: CaptureAdapter,
    mic: Arc<Semaphore>,
    submission: Arc<dyn SubmissionChannel>,
    events: mpsc::Sender<SessionEvent>,
}

impl ExchangeSession {
    pub fn new(
        question: Question,
        options: SessionOptions,
        player: Box<dyn PromptPlayer>,
        capture: CaptureAdapter,
        mic: Arc<Semaphore>,
        submission: Arc<dyn SubmissionChannel>,
        events: mpsc::Sender<SessionEvent>,
    ) -> Self {
        let state = SessionState::new(question.time_limit_secs);
        let budget = ReplayBudget::new(question.replay_allowance);

        Self {
            question,
            options,
            state,
            budget,
            timer: TimerEngine::new(),
            player,
            capture,
            mic,
            submission,
            events,
        }
    }

    /// Drive the session to completion
    ///
    /// Returns the outcome on `Complete` or cancellation; adapter failures
    /// map to the error taxonomy and leave the session in `Error`.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<SessionCommand>,
    ) -> Result<SessionOutcome, SessionError> {
        info!(
            "Session starting: {} (limit {}s, {} replays)",
            self.question.id, self.question.time_limit_secs, self.question.replay_allowance
        );

        let result = self.drive(&mut commands).await;
        self.cleanup().await;

        match result {
            Ok(Some(Flow::Cancelled)) => {
                info!("Session cancelled: {}", self.question.id);
                Ok(SessionOutcome {
                    question_id: self.question.id.clone(),
                    completed: false,
                    submission_warning: None,
                    replays_used: self.budget.used(),
                })
            }
            Ok(None) => {
                info!("Session complete: {}", self.question.id);
                Ok(SessionOutcome {
                    question_id: self.question.id.clone(),
                    completed: true,
                    submission_warning: self.state.last_error.clone(),
                    replays_used: self.budget.used(),
                })
            }
            Err(e) => {
                self.state.last_error = Some(e.to_string());
                self.set_phase(Phase::Error).await;
                warn!("Session failed: {}: {}", self.question.id, e);
                Err(e)
            }
        }
    }

    async fn drive(
        &mut self,
        commands: &mut mpsc::Receiver<SessionCommand>,
    ) -> Result<Option<Flow>, SessionError> {
        self.set_phase(Phase::Idle).await;

        if !self.options.auto_start {
            loop {
                match commands.recv().await {
                    Some(SessionCommand::Start) => break,
                    Some(SessionCommand::Cancel) | None => return Ok(Some(Flow::Cancelled)),
                    Some(cmd) => {
                        warn!("Ignoring {:?} while idle", cmd);
                    }
                }
            }
        }

        let prompt_audio = self.question.prompt.audio.clone();

        if let Some(resource) = &prompt_audio {
            self.player.load(resource).await?;
            if let Some(flow) = self.play_prompt(commands, Phase::PromptPlaying).await? {
                return Ok(Some(flow));
            }
        }

        let artifact = loop {
            // PromptDone: wait out the post-prompt delay, still accepting
            // replay requests
            self.set_phase(Phase::PromptDone).await;
            let delay = tokio::time::sleep(self.question.post_prompt_delay);
            tokio::pin!(delay);

            let mut replay = false;
            loop {
                tokio::select! {
                    _ = &mut delay => break,
                    cmd = commands.recv() => match cmd {
                        Some(SessionCommand::Replay) => {
                            if !self.question.prompt.has_audio() {
                                warn!("Ignoring replay for a text-only prompt");
                            } else if self.try_grant_replay().await {
                                replay = true;
                                break;
                            }
                        }
                        Some(SessionCommand::Cancel) | None => return Ok(Some(Flow::Cancelled)),
                        Some(cmd) => {
                            warn!("Ignoring {:?} before recording", cmd);
                        }
                    }
                }
            }

            if replay {
                self.player.seek_to_start();
                if let Some(flow) = self.play_prompt(commands, Phase::ReplayPlaying).await? {
                    return Ok(Some(flow));
                }
                continue;
            }

            match self.record(commands).await? {
                RecordOutcome::Artifact(artifact) => break artifact,
                RecordOutcome::Cancelled => return Ok(Some(Flow::Cancelled)),
                RecordOutcome::Replay => {
                    self.player.seek_to_start();
                    if let Some(flow) = self.play_prompt(commands, Phase::ReplayPlaying).await? {
                        return Ok(Some(flow));
                    }
                }
            }
        };

        self.save(artifact).await;

        Ok(None)
    }

    /// Play the loaded prompt through to its `Ended` event
    async fn play_prompt(
        &mut self,
        commands: &mut mpsc::Receiver<SessionCommand>,
        phase: Phase,
    ) -> Result<Option<Flow>, SessionError> {
        self.set_phase(phase).await;
        let mut playback = self.player.play()?;

        loop {
            tokio::select! {
                event = playback.recv() => match event {
                    Some(PlaybackEvent::Started) => {}
                    Some(PlaybackEvent::Ended) => return Ok(None),
                    Some(PlaybackEvent::Failed(reason)) => {
                        return Err(SessionError::Playback(reason));
                    }
                    None => {
                        return Err(SessionError::Playback(
                            "playback ended without an event".into(),
                        ));
                    }
                },
                cmd = commands.recv() => match cmd {
                    Some(SessionCommand::Cancel) | None => {
                        self.player.stop().await;
                        return Ok(Some(Flow::Cancelled));
                    }
                    Some(cmd) => {
                        warn!("Ignoring {:?} during prompt playback", cmd);
                    }
                }
            }
        }
    }

    /// Recording phase: exclusive mic, countdown at the full limit
    ///
    /// The microphone is acquired before the timer starts, so an acquisition
    /// denial can never leave a countdown running.
    async fn record(
        &mut self,
        commands: &mut mpsc::Receiver<SessionCommand>,
    ) -> Result<RecordOutcome, SessionError> {
        self.capture.acquire(Arc::clone(&self.mic)).await?;
        self.capture.start()?;

        let mut timer_rx = self.timer.start(self.question.time_limit_secs)?;
        self.state.time_remaining_secs = self.question.time_limit_secs;
        self.set_phase(Phase::Recording).await;

        loop {
            tokio::select! {
                event = timer_rx.recv() => match event {
                    Some(TimerEvent::Tick { remaining_secs }) => {
                        self.state.time_remaining_secs = remaining_secs;
                        self.emit(SessionEvent::Tick { remaining_secs }).await;
                    }
                    Some(TimerEvent::Expired) | None => {
                        self.state.time_remaining_secs = 0;
                        return self.finish_take().await;
                    }
                },
                cmd = commands.recv() => match cmd {
                    Some(SessionCommand::StopRecording) => {
                        return self.finish_take().await;
                    }
                    Some(SessionCommand::Replay) => {
                        if !self.question.prompt.has_audio() {
                            warn!("Ignoring replay for a text-only prompt");
                        } else if self.try_grant_replay().await {
                            // Discard the in-flight take; it is never submitted
                            self.timer.cancel();
                            self.capture.release().await;
                            self.state.time_remaining_secs = self.question.time_limit_secs;
                            return Ok(RecordOutcome::Replay);
                        }
                    }
                    Some(SessionCommand::Cancel) | None => {
                        self.timer.cancel();
                        self.capture.release().await;
                        return Ok(RecordOutcome::Cancelled);
                    }
                    Some(cmd) => {
                        warn!("Ignoring {:?} while recording", cmd);
                    }
                }
            }
        }
    }

    /// Stop the timer and capture, yielding the finished artifact
    async fn finish_take(&mut self) -> Result<RecordOutcome, SessionError> {
        self.timer.cancel();

        let artifact = self.capture.stop().await?;
        self.capture.release().await;

        match artifact {
            Some(artifact) => Ok(RecordOutcome::Artifact(artifact)),
            None => Err(SessionError::ProtocolMisuse(
                "recording stopped without an active take".into(),
            )),
        }
    }

    /// Hand the artifact to the submission channel
    ///
    /// Failure is non-fatal: the session still completes and the warning is
    /// surfaced for the containing flow to act on.
    async fn save(&mut self, artifact: RecordingArtifact) {
        self.set_phase(Phase::Saving).await;

        info!(
            "Submitting recording: {} ({:.1}s, {} bytes)",
            artifact.question_id,
            artifact.duration.as_secs_f64(),
            artifact.wav_bytes.len()
        );

        match self.submission.submit(artifact).await {
            Ok(()) => {
                self.state.last_error = None;
            }
            Err(e) => {
                warn!("Submission failed for {}: {}", self.question.id, e);
                self.state.last_error = Some(e.to_string());
                self.emit(SessionEvent::SubmissionWarning(e.to_string())).await;
            }
        }

        self.set_phase(Phase::Complete).await;
    }

    async fn try_grant_replay(&mut self) -> bool {
        if self.budget.try_consume() {
            self.state.replays_used = self.budget.used();
            info!(
                "Replay granted: {} ({} remaining)",
                self.question.id,
                self.budget.remaining()
            );
            self.emit(SessionEvent::ReplayGranted {
                remaining: self.budget.remaining(),
            })
            .await;
            true
        } else {
            info!("Replay denied: {} (budget exhausted)", self.question.id);
            self.emit(SessionEvent::ReplayDenied).await;
            false
        }
    }

    /// Release everything the session may still hold, in one step
    async fn cleanup(&mut self) {
        self.timer.cancel();
        self.player.stop().await;
        self.capture.release().await;
    }

    async fn set_phase(&mut self, phase: Phase) {
        info!("Session {}: -> {:?}", self.question.id, phase);
        self.state.phase = phase;
        self.emit(SessionEvent::PhaseChanged(self.state.clone())).await;
    }

    async fn emit(&self, event: SessionEvent) {
        // Observers may have gone away; that never blocks the session
        let _ = self.events.send(event).await;
    }
}
