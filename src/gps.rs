/// GPS fix acquisition over a serial NMEA stream.
///
/// Each cycle opens the configured port, scans the stream for a GGA
/// sentence, and parses position and time out of it. The whole read is
/// bounded by a deadline so a dead antenna can never stall the acquisition
/// loop; the caller treats a timeout as a recoverable per-cycle error and
/// records null location fields.

use std::io::{BufRead, BufReader};
use std::time::{Duration, Instant};

use crate::error::FluorError;
use crate::model::Fix;

const GPS_BAUD: u32 = 9600;
/// Per-line serial timeout; the overall deadline spans several of these.
const LINE_TIMEOUT: Duration = Duration::from_secs(1);

/// Source of GPS fixes. One call per acquisition cycle.
pub trait GpsSource {
    /// Reads until a valid GGA fix or the configured timeout. Timeout and
    /// parse failures surface as `FluorError::Gps`.
    fn read_fix(&mut self) -> Result<Fix, FluorError>;
}

/// Reads fixes from a serial NMEA stream, opening the port per call so a
/// receiver unplugged mid-run fails one cycle rather than wedging a handle.
pub struct SerialGps {
    port: String,
    timeout: Duration,
}

impl SerialGps {
    pub fn new(port: &str, timeout: Duration) -> Self {
        Self {
            port: port.to_string(),
            timeout,
        }
    }
}

impl GpsSource for SerialGps {
    fn read_fix(&mut self) -> Result<Fix, FluorError> {
        let stream = serialport::new(&self.port, GPS_BAUD)
            .timeout(LINE_TIMEOUT)
            .open()
            .map_err(|e| {
                FluorError::Gps(format!("failed to open GPS port {}: {}", self.port, e))
            })?;

        let mut reader = BufReader::new(stream);
        let deadline = Instant::now() + self.timeout;
        let mut line = String::new();

        while Instant::now() < deadline {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => continue,
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                // Interleaved binary output from some receivers
                Err(e) if e.kind() == std::io::ErrorKind::InvalidData => continue,
                Err(e) => return Err(FluorError::Gps(format!("serial read failed: {}", e))),
            }
            let sentence = line.trim();
            if !sentence.starts_with('$') {
                continue;
            }
            if let Some(fix) = parse_gga(sentence) {
                return Ok(fix);
            }
        }

        Err(FluorError::Gps(format!(
            "no GGA fix on {} within {:.1}s",
            self.port,
            self.timeout.as_secs_f64()
        )))
    }
}

// ---------------------------------------------------------------------------
// NMEA parsing
// ---------------------------------------------------------------------------

/// Parses an NMEA GGA sentence into a [`Fix`].
///
/// Returns `None` for non-GGA sentences, checksum mismatches, sentences
/// without a position solution (fix quality 0), and empty position fields.
pub fn parse_gga(sentence: &str) -> Option<Fix> {
    let body = sentence.strip_prefix('$')?;
    let (data, checksum) = match body.split_once('*') {
        Some((data, checksum)) => (data, Some(checksum)),
        None => (body, None),
    };

    if let Some(checksum) = checksum {
        let expected = u8::from_str_radix(checksum.trim(), 16).ok()?;
        let actual = data.bytes().fold(0u8, |acc, b| acc ^ b);
        if actual != expected {
            return None;
        }
    }

    let fields: Vec<&str> = data.split(',').collect();
    // Talker prefix varies (GPGGA, GNGGA, ...); match on the sentence id.
    if !fields.first()?.ends_with("GGA") || fields.len() < 7 {
        return None;
    }
    // Fix quality 0 means no position solution yet.
    if fields[6] == "0" {
        return None;
    }

    let latitude = parse_coordinate(fields[2], fields[3])?;
    let longitude = parse_coordinate(fields[4], fields[5])?;

    Some(Fix {
        latitude,
        longitude,
        time: fields[1].to_string(),
    })
}

/// Converts an NMEA ddmm.mmmm / dddmm.mmmm coordinate plus hemisphere into
/// signed decimal degrees.
fn parse_coordinate(raw: &str, hemisphere: &str) -> Option<f64> {
    if raw.is_empty() {
        return None;
    }
    let value: f64 = raw.parse().ok()?;
    let degrees = (value / 100.0).trunc();
    let minutes = value - degrees * 100.0;
    let decimal = degrees + minutes / 60.0;
    match hemisphere {
        "N" | "E" => Some(decimal),
        "S" | "W" => Some(-decimal),
        _ => None,
    }
}
