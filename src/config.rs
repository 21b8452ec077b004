use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub audio: AudioConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the assessment backend
    pub base_url: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionConfig {
    /// Play the prompt without waiting for an explicit start
    pub auto_start: bool,
    /// Default response time limit when the backend serves none
    pub time_limit_secs: u32,
    /// Default replay allowance per question
    pub replay_allowance: u32,
    /// Pause between prompt end and recording start, in seconds
    pub post_prompt_delay_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
