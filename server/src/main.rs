mod handlers;
mod middleware;
mod routes;
mod state;

use std::env;
use std::time::Duration;

use axum::http::{header, HeaderValue, Method};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use trend_scout::{Dashboard, ScoutConfig};

use state::AppState;

const SESSION_MAX_IDLE_HOURS: i64 = 12;

fn cors_layer() -> Result<CorsLayer, Box<dyn std::error::Error>> {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];
    match env::var("CLIENT_URL") {
        Ok(client_url) => Ok(CorsLayer::new()
            .allow_origin(client_url.parse::<HeaderValue>()?)
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::COOKIE])
            .allow_credentials(true)),
        Err(_) => Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("server=info,trend_scout=info,tower_http=info")),
        )
        .init();

    let config = ScoutConfig::from_env()?;
    info!(?config, "Configuration loaded");

    let dashboard = Dashboard::from_config(config)?;
    if let Some(notice) = dashboard.startup_notice() {
        warn!("{}", notice);
    }

    let state = AppState::new(dashboard);

    let pruner = state.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(600));
        loop {
            tick.tick().await;
            let dropped = pruner.prune_sessions(chrono::Duration::hours(SESSION_MAX_IDLE_HOURS));
            if dropped > 0 {
                info!(dropped, "Idle sessions pruned");
            }
        }
    });

    let app = routes::app(state).layer(cors_layer()?);

    let addr = env::var("SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "Listening");
    axum::serve(listener, app).await?;
    Ok(())
}
