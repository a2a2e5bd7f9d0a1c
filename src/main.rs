use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use reel::MovieStore;
use reel::config::Config;
use reel::seed;
use reel::server::ReelServer;

fn main() {
    let config = Config::parse();

    tracing_subscriber::fmt()
    .with_env_filter(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,reel=info,warp=info")),
    )
    .with_target(false)
    .with_level(true)
    .init();

    if let Err(e) = run(config) {
        error!("Fatal: {}", e);
        std::process::exit(1);
    }
}

fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config.socket_addr()?;
    let workers = config.worker_threads()?;

    info!("--- Reel Movie Service ---");
    info!("Worker Threads: {}", workers);

    tokio::runtime::Builder::new_multi_thread()
    .worker_threads(workers)
    .enable_all()
    .build()?
    .block_on(async_main(config, addr))
}

async fn async_main(config: Config, addr: std::net::SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    info!("Loading seed dataset...");
    let movies = seed::load(config.seed.as_deref())?;
    let store = Arc::new(MovieStore::from_seed(movies));
    info!("Store ready with {} movies.", store.len());

    let server = ReelServer::new(store);
    server
    .run(addr, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Could not listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutting down.");
    })
    .await?;

    Ok(())
}
