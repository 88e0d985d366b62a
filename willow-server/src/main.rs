//! willow-server binary

use tokio_util::sync::CancellationToken;
use willow_server::tasks::SweepScheduler;
use willow_server::{AppState, BoxError, Config, api, logger};

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;
    logger::init_logger(config.log_json);

    tracing::info!(
        environment = %config.environment,
        version = env!("CARGO_PKG_VERSION"),
        "Starting willow-server"
    );
    if config.auth_test_mode {
        tracing::warn!("AUTH_TEST_MODE is on: init data 'test' authenticates as the test user");
    }

    let http_addr = format!("0.0.0.0:{}", config.http_port);
    let sweep_interval = config.sweep_interval;
    let state = AppState::new(config).await?;

    let shutdown = CancellationToken::new();
    let sweeper = match sweep_interval {
        Some(interval) => Some(tokio::spawn(
            SweepScheduler::new(state.orders.clone(), interval, shutdown.clone()).run(),
        )),
        None => {
            tracing::info!("In-process sweep disabled, expecting POST /api/admin/sweep");
            None
        }
    };

    let app = api::build_app(state);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("willow-server HTTP listening on {http_addr}");

    let signal_token = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            signal_token.cancel();
        })
        .await?;

    shutdown.cancel();
    if let Some(handle) = sweeper {
        let _ = handle.await;
    }
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
