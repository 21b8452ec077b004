use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Semaphore};
use tokio::sync::OwnedSemaphorePermit;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};

use super::frame::{AudioFrame, FrameSource};
use crate::session::SessionError;

/// Finished recording for one question
///
/// Ownership moves into the submission channel on handoff; the session must
/// not retain it.
#[derive(Debug, Clone)]
pub struct RecordingArtifact {
    /// Question this recording answers
    pub question_id: String,
    /// WAV-encoded audio payload
    pub wav_bytes: Vec<u8>,
    /// Wall-clock capture duration
    pub duration: Duration,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Microphone capture adapter
///
/// Lifecycle: `acquire` → `start` → `stop` → `release`. Exactly one
/// start/stop cycle is permitted per acquire; `stop` is safe to repeat (the
/// second call yields no new artifact) and `release` frees the device from
/// any state, discarding an unfinished take.
pub struct CaptureAdapter {
    question_id: String,
    source: Box<dyn FrameSource>,
    permit: Option<OwnedSemaphorePermit>,
    task: Option<JoinHandle<(Vec<i16>, u32, u16)>>,
    stop_tx: Option<oneshot::Sender<()>>,
    started_at: Option<Instant>,
    cycle_done: bool,
}

impl CaptureAdapter {
    pub fn new(question_id: impl Into<String>, source: Box<dyn FrameSource>) -> Self {
        Self {
            question_id: question_id.into(),
            source,
            permit: None,
            task: None,
            stop_tx: None,
            started_at: None,
            cycle_done: false,
        }
    }

    /// Request device access
    ///
    /// Waits for the exclusive microphone permit (at most one acquisition
    /// system-wide), then opens the underlying source. Open failures map to
    /// `DeviceDenied`.
    pub async fn acquire(&mut self, mic: Arc<Semaphore>) -> Result<(), SessionError> {
        if self.permit.is_some() {
            return Err(SessionError::ProtocolMisuse(
                "capture acquired while already holding the device".into(),
            ));
        }

        let permit = mic
            .acquire_owned()
            .await
            .map_err(|_| SessionError::DeviceDenied("microphone gate closed".into()))?;

        if let Err(e) = self.source.open().await {
            drop(permit);
            return Err(SessionError::DeviceDenied(format!("{:#}", e)));
        }

        info!("Microphone acquired ({})", self.source.name());
        self.permit = Some(permit);

        Ok(())
    }

    /// Begin accumulating frames from the device
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.permit.is_none() {
            return Err(SessionError::ProtocolMisuse(
                "capture started before acquire".into(),
            ));
        }
        if self.task.is_some() || self.cycle_done {
            return Err(SessionError::ProtocolMisuse(
                "capture started twice for one acquire".into(),
            ));
        }

        let frames = self.source.frames().ok_or_else(|| {
            SessionError::ProtocolMisuse("frame stream unavailable for this acquire".into())
        })?;

        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(accumulate(frames, stop_rx));

        self.stop_tx = Some(stop_tx);
        self.task = Some(task);
        self.started_at = Some(Instant::now());

        info!("Recording started: {}", self.question_id);

        Ok(())
    }

    /// Stop recording and finalize the artifact
    ///
    /// First call yields the finished artifact; repeat calls are no-ops
    /// returning `None`.
    pub async fn stop(&mut self) -> Result<Option<RecordingArtifact>, SessionError> {
        let Some(task) = self.task.take() else {
            return Ok(None);
        };

        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }

        let (samples, sample_rate, channels) = task.await.map_err(|e| {
            SessionError::ProtocolMisuse(format!("capture task failed: {}", e))
        })?;

        let duration = self
            .started_at
            .take()
            .map(|t| t.elapsed())
            .unwrap_or_default();
        self.cycle_done = true;

        let wav_bytes = encode_wav(&samples, sample_rate, channels)
            .map_err(|e| SessionError::ProtocolMisuse(format!("WAV encode failed: {:#}", e)))?;

        info!(
            "Recording stopped: {} ({:.1}s, {} samples)",
            self.question_id,
            duration.as_secs_f64(),
            samples.len()
        );

        Ok(Some(RecordingArtifact {
            question_id: self.question_id.clone(),
            wav_bytes,
            duration,
            sample_rate,
            channels,
        }))
    }

    /// Free the device regardless of state, discarding any unfinished take
    pub async fn release(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            warn!("Recording discarded: {}", self.question_id);
        }
        self.stop_tx = None;
        self.started_at = None;
        self.cycle_done = false;
        self.source.close().await;
        if self.permit.take().is_some() {
            info!("Microphone released ({})", self.source.name());
        }
    }

    pub fn is_recording(&self) -> bool {
        self.task.is_some()
    }
}

async fn accumulate(
    mut frames: mpsc::Receiver<AudioFrame>,
    mut stop_rx: oneshot::Receiver<()>,
) -> (Vec<i16>, u32, u16) {
    let mut samples = Vec::new();
    let mut sample_rate = 16000;
    let mut channels = 1;

    loop {
        tokio::select! {
            maybe_frame = frames.recv() => {
                match maybe_frame {
                    Some(frame) => {
                        sample_rate = frame.sample_rate;
                        channels = frame.channels;
                        samples.extend_from_slice(&frame.samples);
                    }
                    None => break, // Source closed
                }
            }
            _ = &mut stop_rx => break,
        }
    }

    (samples, sample_rate, channels)
}

/// Encode captured samples as an in-memory WAV payload
fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> anyhow::Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SilenceSource;

    fn adapter() -> CaptureAdapter {
        CaptureAdapter::new("q1", Box::new(SilenceSource::new(16000, 1)))
    }

    #[tokio::test]
    async fn start_before_acquire_fails_fast() {
        let mut capture = adapter();
        assert!(matches!(
            capture.start(),
            Err(SessionError::ProtocolMisuse(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn double_start_is_a_caller_error() {
        let mic = Arc::new(Semaphore::new(1));
        let mut capture = adapter();
        capture.acquire(mic).await.unwrap();
        capture.start().unwrap();

        assert!(matches!(
            capture.start(),
            Err(SessionError::ProtocolMisuse(_))
        ));

        capture.release().await;
    }

    #[tokio::test(start_paused = true)]
    async fn second_stop_yields_no_new_artifact() {
        let mic = Arc::new(Semaphore::new(1));
        let mut capture = adapter();
        capture.acquire(mic).await.unwrap();
        capture.start().unwrap();

        tokio::time::advance(Duration::from_millis(500)).await;

        let first = capture.stop().await.unwrap();
        assert!(first.is_some());
        assert!(!first.unwrap().wav_bytes.is_empty());

        let second = capture.stop().await.unwrap();
        assert!(second.is_none());

        capture.release().await;
    }

    #[tokio::test(start_paused = true)]
    async fn permit_is_exclusive_until_released() {
        let mic = Arc::new(Semaphore::new(1));
        let mut first = adapter();
        first.acquire(Arc::clone(&mic)).await.unwrap();

        let mut second = adapter();
        tokio::select! {
            _ = second.acquire(Arc::clone(&mic)) => {
                panic!("second acquire must wait for the first release")
            }
            _ = tokio::time::sleep(Duration::from_secs(5)) => {}
        }

        first.release().await;
        second.acquire(mic).await.unwrap();
        second.release().await;
    }

    #[tokio::test(start_paused = true)]
    async fn release_discards_an_unfinished_take() {
        let mic = Arc::new(Semaphore::new(1));
        let mut capture = adapter();
        capture.acquire(Arc::clone(&mic)).await.unwrap();
        capture.start().unwrap();

        tokio::time::advance(Duration::from_millis(300)).await;
        capture.release().await;

        assert!(!capture.is_recording());
        assert_eq!(mic.available_permits(), 1);
        assert!(capture.stop().await.unwrap().is_none());
    }
}
