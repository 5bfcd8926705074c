use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use preferences_api::{api, config::StoreBackend, is_production, state::AppState};

#[derive(Debug, Parser)]
#[command(name = "preferences-api", version, about = "Profile preferences API server")]
struct Args {
    /// Address to bind (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides PREFERENCES_API_PORT / PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Rights store backend: postgres or memory (overrides PREFERENCES_STORE)
    #[arg(long)]
    store: Option<StoreBackend>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, ADMIN_ADDRESSES, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("preferences_api=info,tower_http=info")),
        )
        .init();

    let args = Args::parse();

    let mut config = preferences_api::config::config().clone();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(store) = args.store {
        config.server.store = store;
    }

    tracing::info!("Starting Preferences API in {:?} mode", config.environment);
    if is_production!() && config.server.store == StoreBackend::Memory {
        tracing::warn!("In-memory rights store selected in production");
    }

    let state = AppState::from_config(&config).await?;
    let app = api::app(state, &config);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Preferences API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
