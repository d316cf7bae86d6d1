use thiserror::Error;

#[derive(Error, Debug)]
pub enum VidquizError {
    #[error("Invalid plan input: {reason}")]
    InvalidPlanInput { reason: String },

    #[error("Transcript request failed for {url} (status {status}): {reason}")]
    TranscriptFailed {
        url: String,
        status: u16,
        reason: String,
    },

    #[error("Quiz request failed for {url} (status {status}): {reason}")]
    QuizFailed {
        url: String,
        status: u16,
        reason: String,
    },

    #[error("Invalid video URL: {url}")]
    InvalidVideoUrl { url: String },

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidConfig { key: String, value: String },

    #[error("Reward store unavailable: {reason}")]
    RewardStore { reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VidquizError {
    /// Errors that move the content pipeline to `failed`.
    pub fn is_pipeline_failure(&self) -> bool {
        matches!(
            self,
            VidquizError::TranscriptFailed { .. }
                | VidquizError::QuizFailed { .. }
                | VidquizError::Http(_)
                | VidquizError::Json(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, VidquizError>;
