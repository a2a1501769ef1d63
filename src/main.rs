//! Fluorologger - Main Daemon
//!
//! A shipboard daemon that continuously:
//! 1. Reads the fluorometer's averaged analog voltage
//! 2. Converts it to a dye concentration under the configured calibration
//! 3. Optionally tags the reading with a GPS fix
//! 4. Fans the record out to SQLite, CSV, and the log
//! 5. Adjusts amplifier gain with hysteresis between cycles
//!
//! Usage:
//!   cargo run --release -- --simulate             # Bench run, no DAQ attached
//!   cargo run --release -- --config /etc/fl.toml  # Explicit config path
//!
//! The SQLite store must be pre-initialized by the external data manager;
//! the daemon exits non-zero when the expected tables are missing.

use std::env;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::exit;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{error, info};

use fluorologger::calibration::CalibrationModel;
use fluorologger::config::{self, Config};
use fluorologger::cycle::AcquisitionCycle;
use fluorologger::db;
use fluorologger::gain::GainController;
use fluorologger::gps::{GpsSource, SerialGps};
use fluorologger::hardware::{SimulatedGainLines, SimulatedVoltageSource};
use fluorologger::model::GainLevel;
use fluorologger::scheduler::Scheduler;
use fluorologger::sink::{ConsoleSink, CsvSink, RecordSink, SinkFanout, StoreSink};

fn main() {
    // Parse command-line arguments
    let args: Vec<String> = env::args().collect();
    let mut config_path = PathBuf::from("config.toml");
    let mut simulate = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                if i + 1 < args.len() {
                    config_path = PathBuf::from(&args[i + 1]);
                    i += 2;
                } else {
                    eprintln!("Error: --config requires a path");
                    exit(1);
                }
            }
            "--simulate" => {
                simulate = true;
                i += 1;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                eprintln!("Usage: {} [--config PATH] [--simulate]", args[0]);
                exit(1);
            }
        }
    }

    let config = match config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            exit(1);
        }
    };

    init_logging(config.file.log.as_deref());

    // Validate calibration and gain before touching any hardware: every
    // conversion-related error is fatal here, never mid-cycle.
    let converter = match CalibrationModel::from_config(&config.cal) {
        Ok(converter) => converter,
        Err(e) => {
            error!("{}", e);
            exit(1);
        }
    };
    let initial_gain = match GainLevel::from_int(config.gain.gain) {
        Ok(gain) => gain,
        Err(e) => {
            error!("{}", e);
            exit(1);
        }
    };

    let gps_enabled = config.gps_port.is_some();
    let conn = match db::open_and_verify(&config.db.filename, &config.db.table, gps_enabled) {
        Ok(conn) => conn,
        Err(e) => {
            error!("{}", e);
            exit(1);
        }
    };

    if !simulate {
        error!(
            "no DAQ backend is linked into this build; \
             run with --simulate for a bench run without the instrument"
        );
        exit(1);
    }

    let gain = match GainController::new(
        Box::new(SimulatedGainLines),
        config.gain.auto,
        initial_gain,
    ) {
        Ok(gain) => gain,
        Err(e) => {
            error!("failed to set initial gain: {}", e);
            exit(1);
        }
    };

    let gps: Option<Box<dyn GpsSource>> = match &config.gps_port {
        Some(port) => {
            info!("GPS enabled on port {}", port);
            Some(Box::new(SerialGps::new(
                port,
                Duration::from_secs_f64(config.gps_timeout),
            )))
        }
        None => {
            info!("GPS disabled - no GPS port configured");
            None
        }
    };

    let sinks: Vec<Box<dyn RecordSink>> = vec![
        Box::new(StoreSink::new(conn, &config.db.table)),
        Box::new(CsvSink::new(&config.file.data)),
        Box::new(ConsoleSink),
    ];

    let mut cycle = AcquisitionCycle::new(
        Box::new(SimulatedVoltageSource::new()),
        converter,
        gain,
        gps,
        SinkFanout::new(sinks),
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        if let Err(e) = ctrlc::set_handler(move || {
            shutdown.store(true, Ordering::SeqCst);
        }) {
            error!("failed to install interrupt handler: {}", e);
            exit(1);
        }
    }

    log_startup(&config, simulate);

    let scheduler = Scheduler::new(Duration::from_secs_f64(config.read_time), shutdown);
    scheduler.run(|| {
        cycle.run_once();
    });

    // Dropping the cycle releases the hardware handle and closes the store.
    drop(cycle);
    info!("program terminated");
}

/// Routes log output to `file.log` when configured, otherwise stderr.
fn init_logging(log_file: Option<&Path>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.format_timestamp_secs();

    if let Some(path) = log_file {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => {
                eprintln!(
                    "failed to open log file {}: {}; logging to stderr",
                    path.display(),
                    e
                );
            }
        }
    }

    builder.init();
}

fn log_startup(config: &Config, simulate: bool) {
    info!(
        "starting acquisition loop: period {:.1}s, autogain {}, store {} (table '{}'), data file {}{}",
        config.read_time,
        if config.gain.auto { "on" } else { "off" },
        config.db.filename.display(),
        config.db.table,
        config.file.data.display(),
        if simulate { ", simulated hardware" } else { "" },
    );
}
