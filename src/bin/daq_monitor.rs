// src/bin/daq_monitor.rs
//! Runs a simulated acquisition and logs per-batch statistics
//!
//! Usage: `daq-monitor [config.toml] [batches]`
//! Log verbosity follows `RUST_LOG` (default `info`).

use myo_daq::{ConfigLoader, DaqConfig, MyoDaq, SimulatedHub};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_BATCHES: usize = 10;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_thread_names(true))
        .try_init();
}

fn load_config(path: Option<PathBuf>) -> Result<DaqConfig, Box<dyn std::error::Error>> {
    let loader = match path {
        Some(path) => ConfigLoader::with_paths(vec![path]),
        None => ConfigLoader::new(),
    };
    Ok(loader.load()?)
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let config_path = args.next().map(PathBuf::from);
    let batches = match args.next() {
        Some(value) => value.parse::<usize>()?,
        None => DEFAULT_BATCHES,
    };

    let config = load_config(config_path)?;
    let hubs = SimulatedHub::factory(config.simulator_config())?;
    let daq = MyoDaq::from_config(&config, hubs)?;

    info!(
        class = %daq.class(),
        rate_hz = daq.rate_hz(),
        channels = ?daq.channels(),
        samples_per_read = daq.samples_per_read(),
        "starting monitor"
    );
    daq.start()?;

    for index in 0..batches {
        let batch = match daq.read() {
            Ok(batch) => batch,
            Err(err) => {
                error!(batch = index, error = %err, "read failed");
                continue;
            }
        };

        let means: Vec<f32> = batch
            .rows()
            .into_iter()
            .map(|row| row.mean().unwrap_or_default())
            .collect();
        info!(batch = index, shape = ?batch.shape(), ?means, "batch");
    }

    daq.stop()?;
    println!("{}", serde_json::to_string_pretty(&daq.stats())?);
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "monitor failed");
            ExitCode::FAILURE
        }
    }
}
