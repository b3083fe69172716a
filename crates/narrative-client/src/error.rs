use thiserror::Error;

#[derive(Error, Debug)]
pub enum NarrativeError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Narrative provider not configured")]
    NotConfigured,

    #[error("Timeout")]
    Timeout,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type NarrativeResult<T> = Result<T, NarrativeError>;
