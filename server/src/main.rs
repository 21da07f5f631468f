use std::error::Error;
use std::sync::Arc;

use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use eventhub_server::config::{Config, StoreBackend};
use eventhub_server::handlers::AppState;
use eventhub_server::routes::create_routes;
use eventhub_server::store::{MemoryStore, PgStore, Store};
use eventhub_server::ticketing::{SystemClock, Ticketing};

async fn connect_store(config: &Config) -> Result<Arc<dyn Store>, Box<dyn Error>> {
    match config.store_backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(config.max_connections)
                .connect(&config.database_url)
                .await?;
            tracing::info!("Successfully connected to database");

            sqlx::migrate!().run(&pool).await?;
            tracing::info!("Migrations run successfully");

            Ok(Arc::new(PgStore::new(pool)))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let store = connect_store(&config).await?;
    let state = AppState {
        ticketing: Ticketing::new(store, Arc::new(SystemClock)),
    };
    let app = create_routes(state, &config);

    tracing::info!("🚀 Server running at http://{}", config.bind_addr);
    let listener = TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
