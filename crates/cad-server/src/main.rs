use std::net::SocketAddr;

use anyhow::Context;
use cad_ai::GeminiConfig;
use cad_server::{AppState, app};

const DEFAULT_ADDRESS: &str = "127.0.0.1:3000";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = GeminiConfig::from_env()?;
    let address: SocketAddr = std::env::var("CAD_SERVER_ADDR")
        .unwrap_or_else(|_| DEFAULT_ADDRESS.to_string())
        .parse()
        .context("CAD_SERVER_ADDR must be a socket address such as 127.0.0.1:3000")?;

    let listener = tokio::net::TcpListener::bind(address).await?;
    log::info!("serving on http://{address} using {}", config.model);
    axum::serve(listener, app(AppState::gemini(config))).await?;
    Ok(())
}
