use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ForecastError, ForecastResult};
use crate::validation;

/// Fixed key of the single user profile.
pub const PROFILE_ID: i64 = 1;

/// A logged probabilistic prediction.
///
/// `outcome` is `Some` exactly when `resolved` is true. Records are immutable
/// once created except for the one-way `resolve` transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Prediction {
    pub id: Uuid,
    pub description: String,
    pub probability: f64, // 0.0 to 1.0
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub resolve_by: Option<DateTime<Utc>>,
    pub resolved: bool,
    #[serde(default)]
    pub outcome: Option<bool>,
    /// When the outcome was recorded
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Prediction {
    /// Validate a create request and build a pending prediction.
    pub fn new(request: NewPrediction, now: DateTime<Utc>) -> ForecastResult<Self> {
        let description = validation::validate_description(&request.description)?;
        let probability = validation::validate_probability(request.probability)?;
        let resolve_by = validation::validate_resolve_by(request.resolve_by, now)?;

        Ok(Self {
            id: Uuid::new_v4(),
            description,
            probability,
            created_at: now,
            resolve_by,
            resolved: false,
            outcome: None,
            resolved_at: None,
        })
    }

    /// Resolved with a recorded outcome, so it counts towards calibration.
    pub fn is_scoreable(&self) -> bool {
        self.resolved && self.outcome.is_some()
    }

    pub fn status(&self) -> PredictionStatus {
        if self.resolved {
            PredictionStatus::Resolved
        } else {
            PredictionStatus::Pending
        }
    }

    /// Pending -> Resolved. A second resolution is rejected and leaves the
    /// original outcome untouched.
    pub fn resolve(&mut self, outcome: bool, at: DateTime<Utc>) -> ForecastResult<()> {
        if self.resolved {
            return Err(ForecastError::AlreadyResolved(self.id));
        }
        self.resolved = true;
        self.outcome = Some(outcome);
        self.resolved_at = Some(at);
        Ok(())
    }
}

impl std::fmt::Display for Prediction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let short: String = self.description.chars().take(50).collect();
        write!(f, "{} ({:.0}%)", short, self.probability * 100.0)
    }
}

/// Request body for creating a prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NewPrediction {
    pub description: String,
    pub probability: f64,
    #[serde(default)]
    pub resolve_by: Option<DateTime<Utc>>,
}

/// Lifecycle state of a prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionStatus {
    Pending,
    Resolved,
}

/// Which predictions a listing should include
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum PredictionFilter {
    #[default]
    All,
    Pending,
    Resolved,
}

/// The single user's profile, stored under [`PROFILE_ID`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Profile {
    pub id: i64,
    pub name: String,
    pub notes: String,
}

/// Partial profile update; absent fields are left as they are.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ProfileUpdate {
    pub fn apply(self, profile: &mut Profile) -> ForecastResult<()> {
        if let Some(name) = self.name {
            profile.name = validation::validate_profile_name(&name)?;
        }
        if let Some(notes) = self.notes {
            profile.notes = notes;
        }
        Ok(())
    }
}
