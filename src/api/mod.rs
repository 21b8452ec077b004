pub mod client;
pub mod types;

pub use client::{ApiClient, QuestionDefaults, QuestionSource};
pub use types::{QuestionEntry, SectionQuestionsResponse, SubmissionMeta};
