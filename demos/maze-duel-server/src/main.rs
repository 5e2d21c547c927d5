//! Runs a Maze Duel server.
//!
//! Environment:
//! - `MAZEDUEL_BIND`: listen address, default `0.0.0.0:8080`
//! - `MAZEDUEL_TICK_RATE`: ticks per second, default 15
//! - `MAZEDUEL_QUESTIONS`: path to a JSON question catalog; the built-in
//!   set is used when unset
//! - `RUST_LOG`: log filter, default `info`

use mazeduel::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let bind = std::env::var("MAZEDUEL_BIND").unwrap_or_else(|_| "0.0.0.0:8080".into());

    let mut room_config = RoomConfig::default();
    if let Ok(rate) = std::env::var("MAZEDUEL_TICK_RATE") {
        room_config.tick_rate = rate.parse()?;
    }

    let mut builder = MazeDuelServer::builder().bind(&bind).room_config(room_config);
    if let Ok(path) = std::env::var("MAZEDUEL_QUESTIONS") {
        let bytes = std::fs::read(&path)?;
        let catalog = QuestionCatalog::from_json(&bytes).map_err(MazeDuelError::from)?;
        tracing::info!(%path, questions = catalog.len(), "loaded question catalog");
        builder = builder.catalog(catalog);
    }

    let server = builder.build().await?;
    tracing::info!(addr = %server.local_addr()?, "starting maze duel server");
    server.run().await?;
    Ok(())
}
