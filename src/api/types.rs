use serde::{Deserialize, Serialize};

/// Response body of `GET /get_question/{test_id}/{section_type}`
#[derive(Debug, Serialize, Deserialize)]
pub struct SectionQuestionsResponse {
    pub questions: Vec<QuestionEntry>,
}

/// One question as served by the assessment backend
#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionEntry {
    pub question_id: String,
    pub audio_file: String,
}

/// Metadata part attached to a recording upload
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmissionMeta {
    pub question_id: String,
    /// Unique ID for this upload attempt
    pub attempt_id: String,
    /// RFC3339 capture timestamp
    pub recorded_at: String,
    /// Capture duration in milliseconds
    pub duration_ms: u64,
    pub sample_rate: u32,
    pub channels: u16,
}
