use std::{fs::OpenOptions, sync::Mutex};

mod app;
mod client;
mod config;
mod error;
mod local_state;
mod ui;

use crate::error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load()?;

    // The terminal belongs to the UI, so logs go to a file.
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)?;
    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "spendlog={level},engine={level}",
            level = config.log_level
        ))
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .init();

    let backend = client::HttpBackend::new(&config.endpoint, &config.project_id)?
        .with_state_file(&config.state_file)?;
    tracing::info!(
        endpoint = %config.endpoint,
        stored_session = backend.has_secret(),
        "starting"
    );

    let mut app = app::App::new(&config, backend)?;
    app.run().await?;
    Ok(())
}
