use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use super::types::{SectionQuestionsResponse, SubmissionMeta};
use crate::audio::RecordingArtifact;
use crate::question::{PromptRef, Question, QuestionSet};
use crate::session::{SessionError, SubmissionChannel};

/// Per-question settings the backend does not serve
#[derive(Debug, Clone)]
pub struct QuestionDefaults {
    pub time_limit_secs: u32,
    pub replay_allowance: u32,
    pub post_prompt_delay: Duration,
}

impl Default for QuestionDefaults {
    fn default() -> Self {
        Self {
            time_limit_secs: 27,
            replay_allowance: 2,
            post_prompt_delay: Duration::from_secs(1),
        }
    }
}

/// Ordered question list provider
#[async_trait::async_trait]
pub trait QuestionSource: Send + Sync {
    /// Fetch the ordered questions for one test section
    ///
    /// A fetch failure or an empty list is terminal for the sequencer.
    async fn fetch_questions(
        &self,
        test_id: &str,
        section_type: &str,
    ) -> Result<QuestionSet, SessionError>;
}

/// HTTP client for the assessment backend
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    defaults: QuestionDefaults,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, defaults: QuestionDefaults) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            defaults,
        }
    }

    /// URL serving a question's prompt audio; opaque to the core
    pub fn resolve_prompt_url(&self, question_id: &str) -> String {
        format!("{}/get_audio/{}", self.base_url, question_id)
    }

    /// Fetch a question's prompt audio to a local file so the playback
    /// adapter can probe it
    pub async fn download_prompt(&self, question_id: &str, dest_dir: &Path) -> Result<PathBuf> {
        let url = self.resolve_prompt_url(question_id);
        info!("Downloading prompt: {}", url);

        let bytes = self
            .http
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("Failed to fetch prompt audio for {}", question_id))?
            .bytes()
            .await
            .context("Failed to read prompt audio body")?;

        let dest = dest_dir.join(format!("{}.wav", question_id));
        tokio::fs::write(&dest, &bytes)
            .await
            .with_context(|| format!("Failed to write prompt audio to {}", dest.display()))?;

        Ok(dest)
    }
}

#[async_trait::async_trait]
impl QuestionSource for ApiClient {
    async fn fetch_questions(
        &self,
        test_id: &str,
        section_type: &str,
    ) -> Result<QuestionSet, SessionError> {
        let url = format!("{}/get_question/{}/{}", self.base_url, test_id, section_type);
        info!("Fetching questions: {}", url);

        let response: SectionQuestionsResponse = self
            .http
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| SessionError::NoQuestions(e.to_string()))?
            .json()
            .await
            .map_err(|e| SessionError::NoQuestions(format!("malformed question list: {}", e)))?;

        let questions: Vec<Question> = response
            .questions
            .into_iter()
            .map(|entry| Question {
                id: entry.question_id,
                prompt: PromptRef::audio_only(entry.audio_file),
                time_limit_secs: self.defaults.time_limit_secs,
                replay_allowance: self.defaults.replay_allowance,
                post_prompt_delay: self.defaults.post_prompt_delay,
            })
            .collect();

        if questions.is_empty() {
            return Err(SessionError::NoQuestions(format!(
                "section {}/{} has no questions",
                test_id, section_type
            )));
        }

        info!("Fetched {} questions for {}/{}", questions.len(), test_id, section_type);

        Ok(QuestionSet::new(questions))
    }
}

#[async_trait::async_trait]
impl SubmissionChannel for ApiClient {
    async fn submit(&self, artifact: RecordingArtifact) -> Result<(), SessionError> {
        let url = format!("{}/save_recording", self.base_url);

        let meta = SubmissionMeta {
            question_id: artifact.question_id.clone(),
            attempt_id: uuid::Uuid::new_v4().to_string(),
            recorded_at: chrono::Utc::now().to_rfc3339(),
            duration_ms: artifact.duration.as_millis() as u64,
            sample_rate: artifact.sample_rate,
            channels: artifact.channels,
        };

        let meta_json = serde_json::to_string(&meta)
            .map_err(|e| SessionError::Submission(format!("metadata encode failed: {}", e)))?;

        let form = reqwest::multipart::Form::new()
            .part(
                "audio",
                reqwest::multipart::Part::bytes(artifact.wav_bytes)
                    .file_name(format!("{}.wav", meta.question_id))
                    .mime_str("audio/wav")
                    .map_err(|e| SessionError::Submission(e.to_string()))?,
            )
            .text("meta", meta_json);

        self.http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| SessionError::Submission(e.to_string()))?;

        info!(
            "Recording submitted: {} (attempt {})",
            meta.question_id, meta.attempt_id
        );

        Ok(())
    }
}
