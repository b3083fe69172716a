use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    #[error("Invalid description: {0}")]
    InvalidDescription(String),

    #[error("Invalid probability: {0}")]
    InvalidProbability(String),

    #[error("Resolve-by date must be in the future")]
    ResolveByInPast,

    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    #[error("Prediction {0} not found")]
    NotFound(Uuid),

    #[error("Prediction {0} is already resolved")]
    AlreadyResolved(Uuid),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl ForecastError {
    /// Whether the caller can fix this by changing the request.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ForecastError::Storage(_))
    }
}

pub type ForecastResult<T> = Result<T, ForecastError>;
