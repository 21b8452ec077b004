use anyhow::Result;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Raw microphone samples (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Microphone input seam
///
/// `open` models device acquisition and is where permission or
/// device-unavailable failures surface; `frames` hands out the frame stream
/// exactly once per open; `close` frees the device.
#[async_trait::async_trait]
pub trait FrameSource: Send + Sync {
    /// Request access to the device; may fail with permission denied or
    /// device unavailable
    async fn open(&mut self) -> Result<()>;

    /// Take the frame stream for this open; `None` if not open or already
    /// taken
    fn frames(&mut self) -> Option<mpsc::Receiver<AudioFrame>>;

    /// Free the device regardless of state
    async fn close(&mut self);

    /// Source name for logging
    fn name(&self) -> &str;
}

/// Frame source emitting zeroed samples on a fixed cadence
///
/// Stands in for a real microphone in tests and the CLI dry-run mode.
pub struct SilenceSource {
    sample_rate: u32,
    channels: u16,
    frame_interval: Duration,
    task: Option<JoinHandle<()>>,
    rx: Option<mpsc::Receiver<AudioFrame>>,
}

impl SilenceSource {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            frame_interval: Duration::from_millis(100),
            task: None,
            rx: None,
        }
    }
}

#[async_trait::async_trait]
impl FrameSource for SilenceSource {
    async fn open(&mut self) -> Result<()> {
        let (tx, rx) = mpsc::channel(32);
        let sample_rate = self.sample_rate;
        let channels = self.channels;
        let frame_interval = self.frame_interval;
        let samples_per_frame =
            (sample_rate as u64 * frame_interval.as_millis() as u64 / 1000) as usize
                * channels as usize;

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(frame_interval);
            interval.tick().await;

            let mut timestamp_ms = 0u64;
            loop {
                interval.tick().await;
                timestamp_ms += frame_interval.as_millis() as u64;

                let frame = AudioFrame {
                    samples: vec![0i16; samples_per_frame],
                    sample_rate,
                    channels,
                    timestamp_ms,
                };

                if tx.send(frame).await.is_err() {
                    break; // Capture side closed
                }
            }
        });

        self.task = Some(task);
        self.rx = Some(rx);

        Ok(())
    }

    fn frames(&mut self) -> Option<mpsc::Receiver<AudioFrame>> {
        self.rx.take()
    }

    async fn close(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.rx = None;
    }

    fn name(&self) -> &str {
        "silence"
    }
}
