/// Shared data types for the fluorologger service.
///
/// Everything here is plain data: the gain level ladder, a parsed GPS fix,
/// the per-cycle measurement record, and the per-sink write outcome.

use chrono::{DateTime, Utc};

use crate::error::{FluorError, SinkError};

// ---------------------------------------------------------------------------
// Gain levels
// ---------------------------------------------------------------------------

/// Amplifier gain level: one of ×1, ×10, ×100.
///
/// Variant order matches amplification factor, so the derived `Ord` is the
/// total order by gain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum GainLevel {
    X1,
    X10,
    X100,
}

impl GainLevel {
    /// Amplification factor as a multiplier (1, 10, or 100).
    pub fn factor(self) -> f64 {
        match self {
            GainLevel::X1 => 1.0,
            GainLevel::X10 => 10.0,
            GainLevel::X100 => 100.0,
        }
    }

    /// The raw integer used in configuration files and persisted records.
    pub fn as_int(self) -> u32 {
        match self {
            GainLevel::X1 => 1,
            GainLevel::X10 => 10,
            GainLevel::X100 => 100,
        }
    }

    /// Parses the raw integer form. Anything outside {1, 10, 100} is an
    /// `InvalidGain` error.
    pub fn from_int(raw: i64) -> Result<Self, FluorError> {
        match raw {
            1 => Ok(GainLevel::X1),
            10 => Ok(GainLevel::X10),
            100 => Ok(GainLevel::X100),
            other => Err(FluorError::InvalidGain(other)),
        }
    }

    /// One level more amplification, saturating at ×100.
    pub fn step_up(self) -> Self {
        match self {
            GainLevel::X1 => GainLevel::X10,
            GainLevel::X10 | GainLevel::X100 => GainLevel::X100,
        }
    }

    /// One level less amplification, saturating at ×1.
    pub fn step_down(self) -> Self {
        match self {
            GainLevel::X100 => GainLevel::X10,
            GainLevel::X10 | GainLevel::X1 => GainLevel::X1,
        }
    }

    /// Index into per-gain parameter arrays (`[f64; 3]`).
    pub fn index(self) -> usize {
        match self {
            GainLevel::X1 => 0,
            GainLevel::X10 => 1,
            GainLevel::X100 => 2,
        }
    }
}

impl std::fmt::Display for GainLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "x{}", self.as_int())
    }
}

// ---------------------------------------------------------------------------
// GPS fix
// ---------------------------------------------------------------------------

/// A resolved position/time reading from an NMEA GGA sentence.
#[derive(Debug, Clone, PartialEq)]
pub struct Fix {
    /// Decimal degrees, negative south.
    pub latitude: f64,
    /// Decimal degrees, negative west.
    pub longitude: f64,
    /// Raw NMEA UTC time field (hhmmss[.sss]).
    pub time: String,
}

// ---------------------------------------------------------------------------
// Measurement record
// ---------------------------------------------------------------------------

/// One acquisition cycle's record, assembled once and immutable afterwards.
///
/// Null fields are meaningful: a `None` voltage means the instrument read
/// failed this cycle, which downstream consumers must be able to tell apart
/// from a zero measurement.
#[derive(Debug, Clone)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub voltage: Option<f64>,
    /// The gain that was active when `voltage` was read.
    pub gain: GainLevel,
    pub concentration: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub nmea_time: Option<String>,
}

impl Sample {
    /// Assembles a record. A sample without a voltage never carries a
    /// concentration, regardless of what the caller passes.
    pub fn new(
        timestamp: DateTime<Utc>,
        voltage: Option<f64>,
        gain: GainLevel,
        concentration: Option<f64>,
        fix: Option<Fix>,
    ) -> Self {
        let concentration = if voltage.is_some() { concentration } else { None };
        let (latitude, longitude, nmea_time) = match fix {
            Some(fix) => (Some(fix.latitude), Some(fix.longitude), Some(fix.time)),
            None => (None, None, None),
        };
        Self {
            timestamp,
            voltage,
            gain,
            concentration,
            latitude,
            longitude,
            nmea_time,
        }
    }

    /// True when this cycle obtained a GPS fix.
    pub fn has_fix(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

// ---------------------------------------------------------------------------
// Sink outcomes
// ---------------------------------------------------------------------------

/// Result of one sink's write attempt, produced by the fan-out and consumed
/// by logging.
#[derive(Debug)]
pub struct SinkOutcome {
    pub sink: &'static str,
    pub result: Result<(), SinkError>,
}

impl SinkOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gain_total_order() {
        assert!(GainLevel::X1 < GainLevel::X10);
        assert!(GainLevel::X10 < GainLevel::X100);
    }

    #[test]
    fn test_gain_from_int() {
        assert_eq!(GainLevel::from_int(1).unwrap(), GainLevel::X1);
        assert_eq!(GainLevel::from_int(10).unwrap(), GainLevel::X10);
        assert_eq!(GainLevel::from_int(100).unwrap(), GainLevel::X100);
        assert!(GainLevel::from_int(50).is_err());
        assert!(GainLevel::from_int(0).is_err());
    }

    #[test]
    fn test_gain_steps_saturate() {
        assert_eq!(GainLevel::X1.step_up(), GainLevel::X10);
        assert_eq!(GainLevel::X10.step_up(), GainLevel::X100);
        assert_eq!(GainLevel::X100.step_up(), GainLevel::X100);

        assert_eq!(GainLevel::X100.step_down(), GainLevel::X10);
        assert_eq!(GainLevel::X10.step_down(), GainLevel::X1);
        assert_eq!(GainLevel::X1.step_down(), GainLevel::X1);
    }

    #[test]
    fn test_sample_without_voltage_never_carries_concentration() {
        let sample = Sample::new(Utc::now(), None, GainLevel::X10, Some(4.2), None);
        assert!(sample.voltage.is_none());
        assert!(sample.concentration.is_none());
    }

    #[test]
    fn test_sample_fix_fields() {
        let fix = Fix {
            latitude: 41.5,
            longitude: -70.7,
            time: "123519".to_string(),
        };
        let sample = Sample::new(Utc::now(), Some(1.0), GainLevel::X1, Some(2.0), Some(fix));
        assert!(sample.has_fix());
        assert_eq!(sample.latitude, Some(41.5));
        assert_eq!(sample.longitude, Some(-70.7));
        assert_eq!(sample.nmea_time.as_deref(), Some("123519"));

        let bare = Sample::new(Utc::now(), Some(1.0), GainLevel::X1, Some(2.0), None);
        assert!(!bare.has_fix());
    }
}
