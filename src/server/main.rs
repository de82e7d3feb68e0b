use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use vet_license::config::get_config;
use vet_license::errors::{LicenseError, LicenseResult};
use vet_license::registry::LicenseRegistry;
use vet_license::server::{build_router, AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Server exited with error: {e}");
        eprintln!("vet_license_server: {e}");
        std::process::exit(1);
    }
}

async fn run() -> LicenseResult<()> {
    let config = get_config()?;

    if config.logging.enabled {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.logging.level.to_lowercase()));
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let registry = LicenseRegistry::from_config(config)?;
    let state = AppState::new(registry);
    let app = build_router(state.clone());

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| LicenseError::Config(format!("failed to bind {addr}: {e}")))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Final flush so the file matches memory on the way out.
    state.registry.lock().await.flush()?;
    info!("License registry flushed, shutting down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
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
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
