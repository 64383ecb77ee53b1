mod api;
mod app;
mod classifier;
mod config;
mod domain;
mod feed;
mod infrastructure;
mod tasks;

use anyhow::Result;
use infrastructure::{directories, logging, shutdown};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = config::load_config()?;
    let paths = directories::resolve_paths(&config)?;
    logging::init_tracing(&config, &paths)?;

    let (shutdown, _) = shutdown::Shutdown::new();
    shutdown::install_signal_handlers(shutdown.clone());

    let app = app::FirefighterApp::initialize(config, paths, shutdown)?;
    app.run().await
}
