mod config;
mod handlers;
mod plugin;
mod services;
mod state;
mod traits;

use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ServerConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "sovits_bridge=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = match ServerConfig::new() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Creates the audio directory and loads configured models
    let app_state = match AppState::new(config).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to initialize: {:#}", e);
            std::process::exit(1);
        }
    };

    let trace_layer = TraceLayer::new_for_http()
        .on_request(|request: &axum::extract::Request, _span: &tracing::Span| {
            tracing::info!("Started request: {} {}", request.method(), request.uri());
        })
        .on_response(
            |response: &axum::response::Response,
             latency: std::time::Duration,
             _span: &tracing::Span| {
                tracing::info!(
                    "Finished request: {:?} in {:?}ms",
                    response.status(),
                    latency.as_millis()
                );
            },
        );

    let app = handlers::router(app_state.clone()).layer(trace_layer);

    let port = app_state.config.server.port;
    let host = &app_state.config.server.host;
    let addr: SocketAddr = match format!("{}:{}", host, port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            eprintln!("Invalid host/port {}:{}: {}", host, port, e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Listening on {}, SoVITS API at {}",
        addr,
        app_state.settings.snapshot().api_url
    );

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
