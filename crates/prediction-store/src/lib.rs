//! Prediction Store
//!
//! SQLite-backed record store for predictions and the single user profile.
//! The resolve transition is a single conditional update, so concurrent
//! resolutions of the same prediction cannot both succeed.

pub mod demo;
pub mod store;

pub use demo::demo_predictions;
pub use store::PredictionStore;
