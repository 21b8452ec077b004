#![allow(dead_code)]

use anyhow::{anyhow, Result};
use std::path::Path;
use tokio::sync::{mpsc, Mutex};

use vocala::{AudioFrame, FrameSource, RecordingArtifact, SessionError, SubmissionChannel};

/// Write a silent 16kHz mono WAV of the given length for playback fixtures
pub fn write_silence_wav(path: &Path, secs: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for _ in 0..(secs * 16000) {
        writer.write_sample(0i16)?;
    }
    writer.finalize()?;

    Ok(())
}

/// Submission sink that records every artifact it receives
pub struct CollectingSink {
    pub submitted: Mutex<Vec<RecordingArtifact>>,
    pub fail: bool,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self {
            submitted: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            submitted: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub async fn count(&self) -> usize {
        self.submitted.lock().await.len()
    }
}

#[async_trait::async_trait]
impl SubmissionChannel for CollectingSink {
    async fn submit(&self, artifact: RecordingArtifact) -> Result<(), SessionError> {
        if self.fail {
            return Err(SessionError::Submission("backend unavailable".into()));
        }
        self.submitted.lock().await.push(artifact);
        Ok(())
    }
}

/// Frame source whose device access is always refused
pub struct DeniedSource;

#[async_trait::async_trait]
impl FrameSource for DeniedSource {
    async fn open(&mut self) -> Result<()> {
        Err(anyhow!("microphone permission refused"))
    }

    fn frames(&mut self) -> Option<mpsc::Receiver<AudioFrame>> {
        None
    }

    async fn close(&mut self) {}

    fn name(&self) -> &str {
        "denied"
    }
}
