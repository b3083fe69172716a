use anyhow::{anyhow, Context};
use chrono::{DateTime, SecondsFormat, Utc};
use forecast_core::{
    ForecastError, ForecastResult, NewPrediction, Prediction, PredictionFilter, Profile,
    ProfileUpdate, PROFILE_ID,
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteExecutor, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

use crate::demo::demo_predictions;

const PREDICTION_COLUMNS: &str =
    "id, description, probability, created_at, resolve_by, resolved, outcome, resolved_at";

/// Internal DB row type with String ids and dates
#[derive(Debug, FromRow)]
struct PredictionRow {
    id: String,
    description: String,
    probability: f64,
    created_at: String,
    resolve_by: Option<String>,
    resolved: bool,
    outcome: Option<bool>,
    resolved_at: Option<String>,
}

impl PredictionRow {
    fn into_prediction(self) -> anyhow::Result<Prediction> {
        let id = Uuid::parse_str(&self.id)
            .with_context(|| format!("malformed prediction id '{}'", self.id))?;

        Ok(Prediction {
            id,
            description: self.description,
            probability: self.probability,
            created_at: parse_timestamp(&self.created_at)?,
            resolve_by: self.resolve_by.as_deref().map(parse_timestamp).transpose()?,
            resolved: self.resolved,
            outcome: self.outcome,
            resolved_at: self.resolved_at.as_deref().map(parse_timestamp).transpose()?,
        })
    }
}

#[derive(Debug, FromRow)]
struct ProfileRow {
    id: i64,
    name: String,
    notes: String,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Profile {
            id: row.id,
            name: row.name,
            notes: row.notes,
        }
    }
}

/// Fixed-width RFC 3339 so that lexical order in SQL matches time order.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .with_context(|| format!("malformed timestamp '{}'", raw))
}

async fn insert_prediction<'e, E>(executor: E, prediction: &Prediction) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO predictions (
            id, description, probability, created_at,
            resolve_by, resolved, outcome, resolved_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(prediction.id.to_string())
    .bind(&prediction.description)
    .bind(prediction.probability)
    .bind(format_timestamp(prediction.created_at))
    .bind(prediction.resolve_by.map(format_timestamp))
    .bind(prediction.resolved)
    .bind(prediction.outcome)
    .bind(prediction.resolved_at.map(format_timestamp))
    .execute(executor)
    .await?;

    Ok(())
}

fn storage_error(err: impl std::fmt::Display) -> ForecastError {
    ForecastError::Storage(err.to_string())
}

/// Record store for predictions and the profile
#[derive(Clone)]
pub struct PredictionStore {
    pool: SqlitePool,
}

impl PredictionStore {
    /// Open (creating if missing) the database and apply the schema
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;

        tracing::info!("Prediction store ready at {}", database_url);
        Ok(store)
    }

    /// Private in-memory database. A single long-lived connection keeps the
    /// data alive for the lifetime of the pool.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Initialize database schema
    async fn init_schema(&self) -> anyhow::Result<()> {
        let schema = include_str!("../schema.sql");

        // sqlx executes one statement per query
        for statement in schema.split(';') {
            let stmt = statement.trim();
            if !stmt.is_empty() {
                sqlx::query(stmt).execute(&self.pool).await?;
            }
        }

        Ok(())
    }

    /// Validate and persist a new prediction
    pub async fn create(&self, request: NewPrediction) -> ForecastResult<Prediction> {
        let prediction = Prediction::new(request, Utc::now())?;
        insert_prediction(&self.pool, &prediction)
            .await
            .map_err(storage_error)?;

        tracing::info!("Created prediction {}: {}", prediction.id, prediction);
        Ok(prediction)
    }

    /// Look up a prediction, `None` when it does not exist
    pub async fn find(&self, id: Uuid) -> ForecastResult<Option<Prediction>> {
        let row: Option<PredictionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM predictions WHERE id = ?",
            PREDICTION_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        row.map(PredictionRow::into_prediction)
            .transpose()
            .map_err(storage_error)
    }

    pub async fn get(&self, id: Uuid) -> ForecastResult<Prediction> {
        self.find(id).await?.ok_or(ForecastError::NotFound(id))
    }

    /// Predictions matching `filter`, newest first
    pub async fn list(&self, filter: PredictionFilter) -> ForecastResult<Vec<Prediction>> {
        let condition = match filter {
            PredictionFilter::All => "",
            PredictionFilter::Pending => "WHERE resolved = 0",
            PredictionFilter::Resolved => "WHERE resolved = 1",
        };

        let rows: Vec<PredictionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM predictions {} ORDER BY created_at DESC, id ASC",
            PREDICTION_COLUMNS, condition
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.into_iter()
            .map(PredictionRow::into_prediction)
            .collect::<anyhow::Result<Vec<_>>>()
            .map_err(storage_error)
    }

    /// Record the outcome of a pending prediction.
    ///
    /// The update only matches unresolved rows, so of two racing calls exactly
    /// one wins and the other sees `AlreadyResolved`. The first outcome is kept.
    pub async fn resolve(&self, id: Uuid, outcome: bool) -> ForecastResult<Prediction> {
        let row: Option<PredictionRow> = sqlx::query_as(&format!(
            r#"
            UPDATE predictions
            SET resolved = 1, outcome = ?, resolved_at = ?
            WHERE id = ? AND resolved = 0
            RETURNING {}
            "#,
            PREDICTION_COLUMNS
        ))
        .bind(outcome)
        .bind(format_timestamp(Utc::now()))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        let Some(row) = row else {
            if self.find(id).await?.is_none() {
                return Err(ForecastError::NotFound(id));
            }
            tracing::warn!("Rejected second resolution of prediction {}", id);
            return Err(ForecastError::AlreadyResolved(id));
        };

        let prediction = row.into_prediction().map_err(storage_error)?;
        tracing::info!("Resolved prediction {} with outcome {}", id, outcome);
        Ok(prediction)
    }

    /// Remove a prediction in any state
    pub async fn delete(&self, id: Uuid) -> ForecastResult<()> {
        let result = sqlx::query("DELETE FROM predictions WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;

        if result.rows_affected() == 0 {
            return Err(ForecastError::NotFound(id));
        }

        tracing::info!("Deleted prediction {}", id);
        Ok(())
    }

    pub async fn get_profile(&self) -> ForecastResult<Profile> {
        let row: Option<ProfileRow> =
            sqlx::query_as("SELECT id, name, notes FROM profile WHERE id = ?")
                .bind(PROFILE_ID)
                .fetch_optional(&self.pool)
                .await
                .map_err(storage_error)?;

        row.map(Profile::from)
            .ok_or_else(|| storage_error(anyhow!("profile row {} is missing", PROFILE_ID)))
    }

    /// Apply a partial update to the profile
    pub async fn update_profile(&self, update: ProfileUpdate) -> ForecastResult<Profile> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        let row: Option<ProfileRow> =
            sqlx::query_as("SELECT id, name, notes FROM profile WHERE id = ?")
                .bind(PROFILE_ID)
                .fetch_optional(&mut *tx)
                .await
                .map_err(storage_error)?;

        let mut profile = row
            .map(Profile::from)
            .ok_or_else(|| storage_error(anyhow!("profile row {} is missing", PROFILE_ID)))?;
        update.apply(&mut profile)?;

        sqlx::query("UPDATE profile SET name = ?, notes = ? WHERE id = ?")
            .bind(&profile.name)
            .bind(&profile.notes)
            .bind(PROFILE_ID)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;

        tx.commit().await.map_err(storage_error)?;
        Ok(profile)
    }

    /// Replace every prediction with the demo set. Returns how many were loaded.
    pub async fn load_demo_data(&self) -> ForecastResult<usize> {
        let predictions = demo_predictions(Utc::now())?;

        let mut tx = self.pool.begin().await.map_err(storage_error)?;
        sqlx::query("DELETE FROM predictions")
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;
        for prediction in &predictions {
            insert_prediction(&mut *tx, prediction)
                .await
                .map_err(storage_error)?;
        }
        tx.commit().await.map_err(storage_error)?;

        tracing::info!("Loaded {} demo predictions", predictions.len());
        Ok(predictions.len())
    }
}
