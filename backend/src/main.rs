use std::net::SocketAddr;
use std::sync::Arc;

use listing_feed::app::{self, AppState};
use listing_feed::config::AppConfig;
use listing_feed::db;
use listing_feed::repository::{MemoryRepository, PgRepository};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let config = AppConfig::load()?;
    log::info!(
        "Loaded config: port={}, page_size={}, default_plan={}, database={}",
        config.port,
        config.page_size,
        config.default_plan,
        if config.database_url.is_some() { "postgres" } else { "memory" }
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    let state = match config.database_url.clone() {
        Some(url) => {
            let pool = db::establish_pool(&url)?;
            AppState::new(config, Arc::new(PgRepository::new(pool)))
        }
        None => {
            log::warn!("DATABASE_URL not set, using the in-memory store");
            AppState::new(config, Arc::new(MemoryRepository::with_default_plans()))
        }
    };

    log::info!("Starting server on {}", addr);
    let app = app::router(state);
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app.into_make_service()).await?;

    Ok(())
}
