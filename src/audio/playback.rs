use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::info;

use super::probe::PromptAudio;
use crate::session::SessionError;

/// Events emitted by one play attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    Started,
    /// Natural completion; emitted exactly once per play, never alongside
    /// `Failed`
    Ended,
    Failed(String),
}

/// Prompt playback seam
///
/// Every `play` hands back a fresh event receiver, so dropping the previous
/// one disposes its subscription and no stale `Ended`/`Failed` can reach the
/// caller. `stop` is idempotent and safe in any state.
#[async_trait::async_trait]
pub trait PromptPlayer: Send + Sync {
    /// Load a prompt resource, invalidating any in-flight play
    async fn load(&mut self, resource: &str) -> Result<(), SessionError>;

    /// Begin playback from the current position
    fn play(&mut self) -> Result<mpsc::Receiver<PlaybackEvent>, SessionError>;

    /// Halt playback; no further events are delivered
    async fn stop(&mut self);

    /// Rewind to position zero
    fn seek_to_start(&mut self);
}

/// Wall-clock prompt player
///
/// Probes the resource for its duration at load time, then models playback
/// as a timed wait: `play` emits `Started`, sleeps out the remaining
/// duration, and emits `Ended`. The hosting layer is responsible for the
/// actual audio output; the controller only needs the timing contract.
pub struct ClockedPlayer {
    loaded: Option<PromptAudio>,
    position: Duration,
    play_started: Option<Instant>,
    task: Option<JoinHandle<()>>,
}

impl ClockedPlayer {
    pub fn new() -> Self {
        Self {
            loaded: None,
            position: Duration::ZERO,
            play_started: None,
            task: None,
        }
    }

    fn abort_play(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if let (Some(started), Some(audio)) = (self.play_started.take(), self.loaded.as_ref()) {
            self.position = (self.position + started.elapsed()).min(audio.duration);
        }
    }
}

impl Default for ClockedPlayer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PromptPlayer for ClockedPlayer {
    async fn load(&mut self, resource: &str) -> Result<(), SessionError> {
        self.abort_play();
        self.position = Duration::ZERO;
        self.play_started = None;

        let audio = PromptAudio::probe(resource)
            .map_err(|e| SessionError::Playback(format!("{:#}", e)))?;

        info!(
            "Prompt loaded: {} ({:.1}s)",
            resource,
            audio.duration.as_secs_f64()
        );
        self.loaded = Some(audio);

        Ok(())
    }

    fn play(&mut self) -> Result<mpsc::Receiver<PlaybackEvent>, SessionError> {
        let duration = self
            .loaded
            .as_ref()
            .ok_or_else(|| SessionError::ProtocolMisuse("play without a loaded prompt".into()))?
            .duration;

        self.abort_play();

        let remaining = duration.saturating_sub(self.position);
        let (tx, rx) = mpsc::channel(4);

        let task = tokio::spawn(async move {
            let _ = tx.send(PlaybackEvent::Started).await;
            tokio::time::sleep(remaining).await;
            let _ = tx.send(PlaybackEvent::Ended).await;
        });

        self.play_started = Some(Instant::now());
        self.task = Some(task);

        Ok(rx)
    }

    async fn stop(&mut self) {
        self.abort_play();
    }

    fn seek_to_start(&mut self) {
        self.abort_play();
        self.position = Duration::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn fixture(dir: &TempDir, secs: u32) -> PathBuf {
        let path = dir.path().join("prompt.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..(secs * 16000) {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
        path
    }

    #[tokio::test(start_paused = true)]
    async fn play_emits_started_then_ended() {
        let dir = TempDir::new().unwrap();
        let path = fixture(&dir, 2);

        let mut player = ClockedPlayer::new();
        player.load(path.to_str().unwrap()).await.unwrap();
        let mut events = player.play().unwrap();

        assert_eq!(events.recv().await, Some(PlaybackEvent::Started));
        assert_eq!(events.recv().await, Some(PlaybackEvent::Ended));
        assert_eq!(events.recv().await, None, "exactly one ended per play");
    }

    #[tokio::test(start_paused = true)]
    async fn play_while_playing_supersedes_the_first_attempt() {
        let dir = TempDir::new().unwrap();
        let path = fixture(&dir, 2);

        let mut player = ClockedPlayer::new();
        player.load(path.to_str().unwrap()).await.unwrap();

        let mut first = player.play().unwrap();
        assert_eq!(first.recv().await, Some(PlaybackEvent::Started));

        // Second play without an intervening stop aborts the first attempt
        let mut second = player.play().unwrap();
        assert_eq!(first.recv().await, None, "superseded stream goes silent");
        assert_eq!(second.recv().await, Some(PlaybackEvent::Started));
        assert_eq!(second.recv().await, Some(PlaybackEvent::Ended));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_disposes_the_event_stream() {
        let dir = TempDir::new().unwrap();
        let path = fixture(&dir, 30);

        let mut player = ClockedPlayer::new();
        player.load(path.to_str().unwrap()).await.unwrap();
        let mut events = player.play().unwrap();

        assert_eq!(events.recv().await, Some(PlaybackEvent::Started));
        player.stop().await;

        // No late `Ended` after stop
        assert_eq!(events.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn seek_restarts_from_position_zero() {
        let dir = TempDir::new().unwrap();
        let path = fixture(&dir, 3);

        let mut player = ClockedPlayer::new();
        player.load(path.to_str().unwrap()).await.unwrap();

        let mut events = player.play().unwrap();
        assert_eq!(events.recv().await, Some(PlaybackEvent::Started));
        tokio::time::advance(Duration::from_secs(1)).await;
        player.stop().await;

        player.seek_to_start();
        let start = tokio::time::Instant::now();
        let mut events = player.play().unwrap();
        assert_eq!(events.recv().await, Some(PlaybackEvent::Started));
        assert_eq!(events.recv().await, Some(PlaybackEvent::Ended));
        assert_eq!(
            start.elapsed(),
            Duration::from_secs(3),
            "replay covers the full prompt"
        );
    }

    #[tokio::test]
    async fn load_missing_resource_is_a_playback_error() {
        let mut player = ClockedPlayer::new();
        assert!(matches!(
            player.load("/nonexistent/prompt.wav").await,
            Err(SessionError::Playback(_))
        ));
    }

    #[tokio::test]
    async fn play_without_load_fails_fast() {
        let mut player = ClockedPlayer::new();
        assert!(matches!(
            player.play(),
            Err(SessionError::ProtocolMisuse(_))
        ));
    }
}
