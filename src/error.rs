//! Error taxonomy for the fluorologger service.
//!
//! Two layers:
//!
//! - [`FluorError`] — the crate-level error. `Configuration`, `InvalidGain`
//!   and `Calibration` are fatal and only ever raised during startup
//!   validation; `Hardware` and `Gps` are per-cycle and recoverable (the
//!   cycle logs them and carries on with null fields).
//! - [`SinkError`] — a single sink's write failure, wrapped per sink by the
//!   fan-out so one broken sink never blocks the others.
//!
//! Store open/verify failures have their own error type in [`crate::db`],
//! mirroring where they surface (before the loop ever starts).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FluorError {
    /// Missing, malformed, or contradictory configuration. Fatal, startup only.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Voltage-source read failure. Recoverable; the cycle records a null
    /// measurement and continues.
    #[error("hardware error: {0}")]
    Hardware(String),

    /// No fix or parse failure within the GPS timeout. Recoverable; the
    /// cycle records null location fields and continues.
    #[error("GPS error: {0}")]
    Gps(String),

    /// A gain value outside {1, 10, 100}. With gains typed as
    /// [`crate::model::GainLevel`] this can only arise at the configuration
    /// boundary.
    #[error("invalid gain setting {0} (expected 1, 10, or 100)")]
    InvalidGain(i64),

    /// Degenerate calibration parameters, e.g. a standard voltage equal to
    /// its blank. Checked at construction; must not occur mid-cycle.
    #[error("calibration error: {0}")]
    Calibration(String),
}

/// A single sink's write failure.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("database write failed: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("csv write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("file I/O failed: {0}")]
    Io(#[from] std::io::Error),
}
