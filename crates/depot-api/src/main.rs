//! # depot-api: Binary Entry Point
//!
//! Starts the Axum HTTP server for the depot file service.
//! Binds to `0.0.0.0:$PORT` (default 8080).

use depot_api::{AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("Configuration invalid: {e}");
        e
    })?;
    tracing::info!(
        upload_dir = %config.upload_dir.display(),
        max_file_size = config.max_file_size,
        max_files = config.max_files,
        mime_check = config.mime_policy.is_enabled(),
        record_content_hash = config.record_content_hash,
        "configuration loaded"
    );
    let port = config.port;

    let state = AppState::from_config(config).await.map_err(|e| {
        tracing::error!("Content store initialization failed: {e}");
        e
    })?;

    let app = depot_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("depot API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// `RUST_LOG` filter (default `info`); `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
