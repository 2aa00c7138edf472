//! # Meridian
//!
//! Headless driver for the Meridian terrain streamer.
//!
//! Loads a TOML configuration, moves a viewpoint along a straight path while
//! ticking the streamer, logs streaming statistics and optionally exports
//! map previews as PNG files.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod app;
mod config;
mod export;
mod headless;
mod path;
mod timing;

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{EngineConfig, CONFIG_FILE};

/// Main entry point.
fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("meridian=info".parse()?))
        .init();

    info!("Meridian starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from);
    let mut config = EngineConfig::load_from(&config_path);
    config.validate();

    let summary = app::run(&config)?;

    info!("Meridian shutdown complete (settled: {})", summary.settled);
    Ok(())
}
