//! Process plumbing shared by the conference service binaries
use eyre::WrapErr;
use tokio::signal;
use tracing::info;

pub mod logging;

/// Load environment variables from a .env file, if it exists.
pub fn dotenv() -> eyre::Result<()> {
    match dotenvy::dotenv() {
        Err(error) if !error.not_found() => Err(error).wrap_err("failed to load .env"),
        _ => Ok(()),
    }
}

/// Resolves once the process is asked to stop with SIGINT (ctrl+c) or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install ctrl+c handler")
    };
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install sigterm handler")
            .recv()
            .await
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown requested");
}
