// Server loop module
// Accepts connections until the process is asked to stop

use std::error::Error;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use crate::config::Config;
use crate::gateway::Application;

/// Accept connections on `listener` and serve them with `app` until Ctrl-C
pub async fn run(
    listener: TcpListener,
    app: Arc<Application>,
    config: Arc<Config>,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let active_connections = Arc::new(AtomicUsize::new(0));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &app, &config, &active_connections);
                    }
                    Err(e) => tracing::error!(error = %e, "Failed to accept connection"),
                }
            }

            signal = &mut shutdown => {
                signal?;
                tracing::info!("Shutdown signal received, no longer accepting connections");
                return Ok(());
            }
        }
    }
}
