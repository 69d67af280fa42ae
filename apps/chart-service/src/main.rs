//! Chart Service Binary
//!
//! Starts the candlestick subscription service.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin chart-service
//! ```
//!
//! # Environment Variables
//!
//! - `CHART_SERVICE_GRPC_PORT`: gRPC server port (default: 50051)
//! - `CHART_SERVICE_HEALTH_PORT`: Health check HTTP port, 0 disables (default: 8081)
//! - `CHART_SERVICE_STREAM_BUFFER`: Per-call response buffer (default: 64)
//! - `CHART_SERVICE_SYMBOLS`: Comma-separated recognized symbols (default: built-in list)
//! - `CHART_SERVICE_DUPLICATE_POLICY`: preserve | collapse (default: preserve)
//! - `CHART_SERVICE_BASE_PRICE_MIN` / `CHART_SERVICE_BASE_PRICE_MAX`: Opening price range
//! - `CHART_SERVICE_MAX_SPREAD_PCT`: Maximum bar spread as a fraction of the open
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: true)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4317>)
//! - `OTEL_SERVICE_NAME`: Service name (default: chart-service)
//! - `RUST_LOG`: Log level (default: info)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chart_service::infrastructure::generator::RandomBarSource;
use chart_service::infrastructure::grpc::proto::chart::v1::chart_service_server::ChartServiceServer;
use chart_service::infrastructure::grpc::{ChartServer, ChartServerConfig};
use chart_service::infrastructure::health::{HealthServer, HealthServerState};
use chart_service::infrastructure::telemetry;
use chart_service::{ServiceConfig, SubscriptionService, init_metrics};
use tokio::net::TcpListener;
use tokio::signal;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_dotenv();

    // Initialize telemetry (OpenTelemetry + tracing)
    let telemetry_guard = telemetry::init();

    tracing::info!(
        otlp_export = telemetry_guard.is_exporting(),
        "Starting Chart Service"
    );

    // Initialize Prometheus metrics
    let _metrics_handle = init_metrics()?;

    let config = ServiceConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    // Registry is built once and shared read-only by every call
    let registry = Arc::new(config.registry());
    let registry_size = registry.len();

    let source = Arc::new(RandomBarSource::new(config.generator.into())?);
    let service = Arc::new(SubscriptionService::new(
        registry,
        source,
        config.stream.duplicate_policy,
    ));

    // Initialize gRPC server
    let grpc_server = Arc::new(ChartServer::new(
        ChartServerConfig {
            version: env!("CARGO_PKG_VERSION").to_string(),
            stream_buffer: config.stream.buffer,
        },
        service,
        shutdown_token.clone(),
    ));
    let stats = grpc_server.stats();

    // Spawn health server
    if config.server.health_port == 0 {
        tracing::info!("Health server disabled");
    } else {
        let health_state = Arc::new(HealthServerState::new(
            env!("CARGO_PKG_VERSION").to_string(),
            registry_size,
            Arc::clone(&stats),
        ));
        let health_server = HealthServer::new(
            config.server.health_port,
            health_state,
            shutdown_token.clone(),
        );
        tokio::spawn(async move {
            if let Err(e) = health_server.run().await {
                tracing::error!(error = %e, "Health server error");
            }
        });
    }

    // Spawn gRPC server
    let grpc_addr = SocketAddr::from(([0, 0, 0, 0], config.server.grpc_port));
    let listener = TcpListener::bind(grpc_addr).await?;
    let grpc_service = ChartServiceServer::from_arc(grpc_server);
    let grpc_shutdown = shutdown_token.clone();
    let grpc_stats = Arc::clone(&stats);

    let grpc_handle = tokio::spawn(async move {
        tracing::info!(addr = %grpc_addr, "gRPC server listening");
        grpc_stats.set_serving(true);
        if let Err(e) = Server::builder()
            .add_service(grpc_service)
            .serve_with_incoming_shutdown(
                TcpListenerStream::new(listener),
                grpc_shutdown.cancelled(),
            )
            .await
        {
            tracing::error!(error = %e, "gRPC server error");
        }
        grpc_stats.set_serving(false);
        tracing::info!("gRPC server stopped");
    });

    tracing::info!("Chart service ready");

    await_shutdown(shutdown_token).await;

    if tokio::time::timeout(SHUTDOWN_TIMEOUT, grpc_handle).await.is_err() {
        tracing::warn!(
            timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
            "gRPC server did not drain before timeout"
        );
    }

    let snapshot = stats.snapshot();
    tracing::info!(
        calls_served = snapshot.calls_served(),
        records_sent = snapshot.records_sent,
        "Chart service stopped"
    );
    Ok(())
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_err() {
        load_dotenv_from_ancestors();
    }
}

/// Log the parsed configuration.
fn log_config(config: &ServiceConfig) {
    tracing::info!(
        grpc_port = config.server.grpc_port,
        health_port = config.server.health_port,
        stream_buffer = config.stream.buffer,
        duplicate_policy = %config.stream.duplicate_policy,
        custom_symbols = config.symbols.is_some(),
        "Configuration loaded"
    );
    tracing::debug!(
        base_price_min = config.generator.base_price_min,
        base_price_max = config.generator.base_price_max,
        max_spread_pct = config.generator.max_spread_pct,
        "Generator settings"
    );
}

/// Load .env file from any ancestor of the current directory.
fn load_dotenv_from_ancestors() {
    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
