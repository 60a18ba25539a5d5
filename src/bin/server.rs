use clap::Parser;
use tracing::info;

use tictactoe_sync::{server::ServerConfig, store::GameStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = ServerConfig::parse();

    // One game per process, shared by every client
    let store = GameStore::default();
    let app = tictactoe_sync::server::router(store, &config)?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    info!("The server is listening on http://{}", listener.local_addr()?);
    info!("Accepting browser requests from {}", config.frontend_url);

    axum::serve(listener, app).await?;

    Ok(())
}
