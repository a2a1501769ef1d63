/// fluorologger: shipboard fluorescent dye tracer logging service.
///
/// # Module structure
///
/// ```text
/// fluorologger
/// ├── model       — shared data types (GainLevel, Fix, Sample, SinkOutcome)
/// ├── error       — error taxonomy (fatal startup vs recoverable per-cycle)
/// ├── config      — configuration loader (config.toml)
/// ├── calibration — voltage→concentration: three-point | standard-ratio
/// ├── gain        — hysteretic gain controller with settling delay
/// ├── hardware    — VoltageSource / GainLines seams + simulated rig
/// ├── gps         — serial NMEA GGA fix acquisition
/// ├── db          — SQLite store open + schema verification
/// ├── sink        — store/CSV/console sinks and the per-cycle fan-out
/// ├── cycle       — one acquisition cycle: read → convert → tag → persist
/// └── scheduler   — fixed-period loop with cooperative shutdown
/// ```

/// Public modules
pub mod calibration;
pub mod config;
pub mod cycle;
pub mod db;
pub mod error;
pub mod gain;
pub mod gps;
pub mod hardware;
pub mod model;
pub mod scheduler;
pub mod sink;
