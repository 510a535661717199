use std::error::Error;
use std::sync::Arc;

use gateway_pages::config::{Config, DEFAULT_CONFIG_PATH};
use gateway_pages::gateway::Application;
use gateway_pages::{logger, server};

fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    // Optional first argument: config file path without extension
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let cfg = Config::load_from(&config_path)?;

    logger::init(&cfg.logging)?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
        tracing::info!("Using {workers} worker threads");
    } else {
        tracing::info!("Using default worker threads (CPU cores)");
    }

    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn Error + Send + Sync>> {
    let addr = cfg.get_socket_addr()?;
    let listener = server::create_reusable_listener(addr)?;

    let app = Arc::new(Application::from_config(&cfg));
    tracing::debug!(routes = ?app.dispatcher().routes().paths(), "Routes registered");

    logger::log_server_start(&addr, &cfg);

    server::run(listener, app, Arc::new(cfg)).await
}
