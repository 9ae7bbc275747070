mod ui;

use anyhow::Result;
use gtk4::Application;
use gtk4::prelude::*;
use tether::config::Config;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Tether hotspot panel");

    let config = Config::load()?;
    info!(backend = ?config.backend, interval_ms = config.refresh.interval_ms, "Loaded configuration");

    let app = Application::builder()
        .application_id("com.tether.app")
        .build();

    app.connect_activate(move |app| ui::build_ui(app, &config));
    app.run();
    Ok(())
}
