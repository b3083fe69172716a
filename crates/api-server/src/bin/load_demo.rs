//! Replace every stored prediction with the demo dataset.
//!
//! Usage: `load-demo` (reads `DATABASE_URL`, default `sqlite:calibration.db`)

use anyhow::Context;
use api_server::{init_tracing, ServerConfig};
use prediction_store::PredictionStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env()?;
    let store = PredictionStore::connect(&config.database_url)
        .await
        .with_context(|| format!("failed to open {}", config.database_url))?;

    let loaded = store
        .load_demo_data()
        .await
        .context("failed to load demo data")?;

    tracing::info!("Loaded {} demo predictions into {}", loaded, config.database_url);
    println!("Loaded {} demo predictions", loaded);
    Ok(())
}
