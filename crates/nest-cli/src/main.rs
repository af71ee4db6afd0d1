#![doc = include_str!("../README.md")]

mod config;
mod mint;
mod telemetry;

use std::{
    io::{self, BufWriter, Write},
    sync::{Arc, Mutex},
    time::Instant,
};

use anyhow::Context;
use clap::Parser;
use config::{AppConfig, CliArgs};
use nest::SnowflakeGenerator;
use telemetry::init_telemetry;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = AppConfig::try_from(args)?;

    // Flushes buffered file logs on drop.
    let _log_guard = init_telemetry(config.mode, &config.log_level, &config.log_sink)?;

    // Built once and handed to every minting thread; nothing else holds it.
    let generator = Arc::new(
        SnowflakeGenerator::new(config.datacenter_id, config.worker_id, config.epoch)
            .context("invalid node identity")?,
    );

    log_startup_info(&config);

    let out = Mutex::new(BufWriter::new(io::stdout()));
    let start = Instant::now();
    let count = mint::run(&generator, &config, &out)?;
    let elapsed = start.elapsed();

    out.into_inner()
        .map_err(|_| anyhow::anyhow!("output lock poisoned"))?
        .flush()
        .context("failed to write ids")?;

    tracing::info!(
        count,
        elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        "minting finished"
    );
    Ok(())
}

fn log_startup_info(config: &AppConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting nest with full config: {:#?}", config);
    } else {
        tracing::info!(
            datacenter_id = config.datacenter_id,
            worker_id = config.worker_id,
            threads = config.threads,
            "Starting nest"
        );
    }
}
