mod app;

use anyhow::Result;
use std::fs::{self, OpenOptions};

use tracing_subscriber::{prelude::*, EnvFilter};
use steamlib_core::{
    config::{self, AppConfig},
    net::Throttler,
    prefs::PrefsStore,
    LibraryClient,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    config::ensure_default_config()?;
    let config = AppConfig::load()?;

    let throttler = Throttler::new();
    let client = LibraryClient::new(&config, throttler)?;
    let prefs = PrefsStore::new(PrefsStore::default_root());

    // An optional share query on the command line restores a shared view,
    // e.g. `steamlib "steamid=76561197960435530&sortBy=playtime&page=3"`.
    let share_query = std::env::args().nth(1);

    let mut app = app::SteamlibApp::new(config, client, prefs, share_query);
    app.run().await
}

fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("steamlib.log");

    let env_filter = EnvFilter::from_default_env();

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
        .with(file_layer)
        .init();

    Ok(())
}
