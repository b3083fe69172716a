//! Input validation for prediction and profile writes.
//!
//! Every check returns a descriptive `ForecastError` so the HTTP layer can
//! hand the reason straight back to the caller.

use chrono::{DateTime, Utc};

use crate::error::{ForecastError, ForecastResult};

pub const DESCRIPTION_MIN_CHARS: usize = 10;
pub const DESCRIPTION_MAX_CHARS: usize = 500;
pub const PROFILE_NAME_MAX_CHARS: usize = 200;

/// Trim and length-check a prediction description.
///
/// Returns the trimmed text, which is what gets stored.
pub fn validate_description(description: &str) -> ForecastResult<String> {
    let trimmed = description.trim();
    let len = trimmed.chars().count();

    if len < DESCRIPTION_MIN_CHARS {
        return Err(ForecastError::InvalidDescription(format!(
            "must be at least {} characters after trimming (got {})",
            DESCRIPTION_MIN_CHARS, len
        )));
    }
    if len > DESCRIPTION_MAX_CHARS {
        return Err(ForecastError::InvalidDescription(format!(
            "must be at most {} characters (got {})",
            DESCRIPTION_MAX_CHARS, len
        )));
    }

    Ok(trimmed.to_string())
}

/// Probability must be a finite value in the closed interval [0, 1].
pub fn validate_probability(probability: f64) -> ForecastResult<f64> {
    if !probability.is_finite() {
        return Err(ForecastError::InvalidProbability(
            "must be a finite number".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&probability) {
        return Err(ForecastError::InvalidProbability(format!(
            "must be between 0.0 and 1.0 (got {})",
            probability
        )));
    }
    Ok(probability)
}

/// A resolve-by date, when given, must be strictly after `now`.
pub fn validate_resolve_by(
    resolve_by: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> ForecastResult<Option<DateTime<Utc>>> {
    match resolve_by {
        Some(deadline) if deadline <= now => Err(ForecastError::ResolveByInPast),
        other => Ok(other),
    }
}

pub fn validate_profile_name(name: &str) -> ForecastResult<String> {
    let len = name.chars().count();
    if len > PROFILE_NAME_MAX_CHARS {
        return Err(ForecastError::InvalidProfile(format!(
            "name must be at most {} characters (got {})",
            PROFILE_NAME_MAX_CHARS, len
        )));
    }
    Ok(name.to_string())
}
