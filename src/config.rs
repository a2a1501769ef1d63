/// Configuration loader - parses config.toml
///
/// Separates deployment-specific settings (serial ports, calibration
/// parameters, file and database paths) from code, so a recalibration or a
/// port change never requires recompiling the service.
///
/// Loading returns `Result` rather than panicking: every startup failure
/// must reach the operator as a clear message and a non-zero exit.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::FluorError;

/// Root configuration, mirroring the layout of `config.example.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Seconds between acquisition cycles.
    pub read_time: f64,

    /// Serial port for the GPS NMEA stream. Absent disables GPS entirely.
    pub gps_port: Option<String>,

    /// Seconds to wait for a GGA fix before giving up on a cycle's GPS read.
    #[serde(default = "default_gps_timeout")]
    pub gps_timeout: f64,

    pub cal: CalibrationConfig,
    pub gain: GainConfig,
    pub file: FileConfig,
    pub db: DbConfig,
}

/// Calibration parameters. Exactly one model must be fully specified:
/// three-point (all slopes and offsets) or standard-ratio (standard
/// concentration/voltage/gain plus all three blanks). Resolution and
/// ambiguity rejection happen in [`crate::calibration`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CalibrationConfig {
    pub slope_1x: Option<f64>,
    pub slope_10x: Option<f64>,
    pub slope_100x: Option<f64>,
    pub offset_1x: Option<f64>,
    pub offset_10x: Option<f64>,
    pub offset_100x: Option<f64>,

    pub std_concentration: Option<f64>,
    pub std_voltage: Option<f64>,
    pub std_gain: Option<i64>,
    pub blank_1x: Option<f64>,
    pub blank_10x: Option<f64>,
    pub blank_100x: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GainConfig {
    /// When false, gain is fixed at `gain` for the whole run.
    pub auto: bool,
    /// Initial gain, and the fixed gain when `auto` is false. One of 1, 10, 100.
    pub gain: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileConfig {
    /// Log output file. Absent logs to stderr.
    pub log: Option<PathBuf>,
    /// CSV data file, created with a header on first write.
    pub data: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    /// SQLite database file. Must be pre-initialized with the expected tables.
    pub filename: PathBuf,
    /// Measurement table name.
    pub table: String,
}

fn default_gps_timeout() -> f64 {
    5.0
}

/// Loads and validates the configuration file.
pub fn load(path: &Path) -> Result<Config, FluorError> {
    let contents = fs::read_to_string(path).map_err(|e| {
        FluorError::Configuration(format!("failed to read {}: {}", path.display(), e))
    })?;

    let config: Config = toml::from_str(&contents).map_err(|e| {
        FluorError::Configuration(format!("failed to parse {}: {}", path.display(), e))
    })?;

    if config.read_time <= 0.0 {
        return Err(FluorError::Configuration(format!(
            "read_time must be positive, got {}",
            config.read_time
        )));
    }
    if config.gps_timeout <= 0.0 {
        return Err(FluorError::Configuration(format!(
            "gps_timeout must be positive, got {}",
            config.gps_timeout
        )));
    }

    Ok(config)
}
