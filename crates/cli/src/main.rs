mod app;

use std::fs::{self, OpenOptions};
use std::sync::Arc;

use anyhow::Result;
use tapmint_core::{
    clock::SystemClock,
    config::{self, AppConfig},
    contract::LocalBackend,
    engine::GameEngine,
    luck::{EntropyLuck, Luck, SeededLuck},
    rollover::RolloverWatcher,
    store::StateStore,
};
use tokio::sync::mpsc;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    config::ensure_default_config()?;
    let config = AppConfig::load()?;

    let store = StateStore::open(config.state_dir());
    let clock = Arc::new(SystemClock);
    let luck: Box<dyn Luck> = match config.luck_seed {
        Some(seed) => Box::new(SeededLuck::new(seed)),
        None => Box::new(EntropyLuck::new()),
    };
    let engine = Arc::new(GameEngine::new(store.clone(), config, clock.clone(), luck));
    let backend = LocalBackend::new(engine.clone());

    let (rollover_tx, rollover_rx) = mpsc::channel(8);
    tokio::spawn(RolloverWatcher::new(store, clock).run(rollover_tx));

    let mut app = app::TapmintApp::new(engine, backend);
    app.attach_rollover(rollover_rx);
    app.run().await
}

fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("tapmint.log");

    let env_filter = EnvFilter::from_default_env();

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(std::io::stdout);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .compact()
        .with_writer(move || {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
                .expect("failed to open log file")
        });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    Ok(())
}
