use anyhow::{Context, Result};
use hound::WavReader;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Format and duration of a prompt audio resource
#[derive(Debug, Clone)]
pub struct PromptAudio {
    pub path: String,
    pub duration: Duration,
    pub sample_rate: u32,
    pub channels: u16,
}

impl PromptAudio {
    /// Read a WAV resource's header and compute its play duration
    pub fn probe(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let reader = WavReader::open(path)
            .with_context(|| format!("Failed to open prompt audio: {}", path.display()))?;

        let spec = reader.spec();
        let sample_count = reader.len() as u64;
        let frames = sample_count / spec.channels as u64;
        let duration =
            Duration::from_secs_f64(frames as f64 / spec.sample_rate as f64);

        info!(
            "Prompt audio probed: {} ({:.1}s, {}Hz, {}ch)",
            path.display(),
            duration.as_secs_f64(),
            spec.sample_rate,
            spec.channels
        );

        Ok(Self {
            path: path.display().to_string(),
            duration,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
        })
    }
}
