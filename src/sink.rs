/// Persistence sinks and the per-cycle fan-out.
///
/// One [`Sample`] per cycle is written to every configured sink. Each
/// sink's write is wrapped independently: a failure is captured in its
/// [`SinkOutcome`] and never prevents the remaining sinks from being
/// attempted. Sink order carries no correctness meaning.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use log::info;
use rusqlite::{params, Connection};

use crate::db::GPS_TABLE;
use crate::error::SinkError;
use crate::model::{Sample, SinkOutcome};

/// A single persistence target for measurement records.
pub trait RecordSink {
    fn name(&self) -> &'static str;
    fn append(&mut self, sample: &Sample) -> Result<(), SinkError>;
}

// ---------------------------------------------------------------------------
// Fan-out
// ---------------------------------------------------------------------------

pub struct SinkFanout {
    sinks: Vec<Box<dyn RecordSink>>,
}

impl SinkFanout {
    pub fn new(sinks: Vec<Box<dyn RecordSink>>) -> Self {
        Self { sinks }
    }

    /// Writes one record to every sink, isolating each sink's failure.
    pub fn write(&mut self, sample: &Sample) -> Vec<SinkOutcome> {
        self.sinks
            .iter_mut()
            .map(|sink| SinkOutcome {
                sink: sink.name(),
                result: sink.append(sample),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// SQLite store sink
// ---------------------------------------------------------------------------

/// Writes to the relational store: a GPS-table row when the cycle obtained
/// a fix, a measurement-table row when concentration is non-null. Both
/// inserts run in one transaction committed exactly once per cycle, and a
/// failure in one insert does not block the other.
pub struct StoreSink {
    conn: Connection,
    measurement_table: String,
}

impl StoreSink {
    /// The connection must come from [`crate::db::open_and_verify`], which
    /// also validates the table name used here in interpolated SQL.
    pub fn new(conn: Connection, measurement_table: &str) -> Self {
        Self {
            conn,
            measurement_table: measurement_table.to_string(),
        }
    }
}

impl RecordSink for StoreSink {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn append(&mut self, sample: &Sample) -> Result<(), SinkError> {
        let tx = self.conn.transaction()?;

        let gps_result = if sample.has_fix() {
            tx.execute(
                &format!(
                    "INSERT INTO {} (datetime_utc, nmea_time, latitude, longitude) \
                     VALUES (?1, ?2, ?3, ?4)",
                    GPS_TABLE
                ),
                params![
                    sample.timestamp,
                    sample.nmea_time,
                    sample.latitude,
                    sample.longitude
                ],
            )
            .map(|_| ())
        } else {
            Ok(())
        };

        let measurement_result = if sample.concentration.is_some() {
            tx.execute(
                &format!(
                    "INSERT INTO {} (datetime_utc, gain, voltage, concentration) \
                     VALUES (?1, ?2, ?3, ?4)",
                    self.measurement_table
                ),
                params![
                    sample.timestamp,
                    sample.gain.as_int(),
                    sample.voltage,
                    sample.concentration
                ],
            )
            .map(|_| ())
        } else {
            Ok(())
        };

        // The single per-cycle commit covers whichever inserts succeeded.
        tx.commit()?;

        gps_result?;
        measurement_result?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// CSV flat-file sink
// ---------------------------------------------------------------------------

/// Appends every record to a CSV file, writing the header when the file is
/// first created. Null fields serialize as empty.
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

const CSV_HEADER: [&str; 6] = [
    "timestamp",
    "latitude",
    "longitude",
    "gain",
    "voltage",
    "concentration",
];

impl RecordSink for CsvSink {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn append(&mut self, sample: &Sample) -> Result<(), SinkError> {
        let write_header = !self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if write_header {
            writer.write_record(CSV_HEADER)?;
        }
        writer.write_record([
            sample.timestamp.to_rfc3339(),
            empty_if_null(sample.latitude),
            empty_if_null(sample.longitude),
            sample.gain.as_int().to_string(),
            empty_if_null(sample.voltage),
            empty_if_null(sample.concentration),
        ])?;
        writer.flush()?;
        Ok(())
    }
}

fn empty_if_null(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Console sink
// ---------------------------------------------------------------------------

/// Logs one structured line per record with explicit null markers, so a
/// failed sub-read is distinguishable from a zero measurement downstream.
pub struct ConsoleSink;

impl RecordSink for ConsoleSink {
    fn name(&self) -> &'static str {
        "console"
    }

    fn append(&mut self, sample: &Sample) -> Result<(), SinkError> {
        info!(
            "timestamp={} gain={} voltage={} concentration={} latitude={} longitude={}",
            sample.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            sample.gain,
            null_marker(sample.voltage),
            null_marker(sample.concentration),
            null_marker(sample.latitude),
            null_marker(sample.longitude),
        );
        Ok(())
    }
}

fn null_marker(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.3}", v),
        None => "null".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Fix, GainLevel};
    use chrono::Utc;

    fn full_sample() -> Sample {
        Sample::new(
            Utc::now(),
            Some(1.234),
            GainLevel::X10,
            Some(5.678),
            Some(Fix {
                latitude: 41.52,
                longitude: -70.67,
                time: "123519".to_string(),
            }),
        )
    }

    fn store_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE rhodamine (
                 datetime_utc TEXT, gain INTEGER, voltage REAL, concentration REAL
             );
             CREATE TABLE gps (
                 datetime_utc TEXT, nmea_time TEXT, latitude REAL, longitude REAL
             );",
        )
        .unwrap();
        conn
    }

    struct BrokenSink;

    impl RecordSink for BrokenSink {
        fn name(&self) -> &'static str {
            "broken"
        }
        fn append(&mut self, _sample: &Sample) -> Result<(), SinkError> {
            Err(SinkError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk on fire",
            )))
        }
    }

    struct CountingSink {
        writes: std::rc::Rc<std::cell::Cell<usize>>,
    }

    impl RecordSink for CountingSink {
        fn name(&self) -> &'static str {
            "counting"
        }
        fn append(&mut self, _sample: &Sample) -> Result<(), SinkError> {
            self.writes.set(self.writes.get() + 1);
            Ok(())
        }
    }

    #[test]
    fn test_store_sink_writes_both_tables() {
        let mut sink = StoreSink::new(store_conn(), "rhodamine");
        sink.append(&full_sample()).unwrap();

        let measurements: i64 = sink
            .conn
            .query_row("SELECT COUNT(*) FROM rhodamine", [], |row| row.get(0))
            .unwrap();
        let fixes: i64 = sink
            .conn
            .query_row("SELECT COUNT(*) FROM gps", [], |row| row.get(0))
            .unwrap();
        assert_eq!(measurements, 1);
        assert_eq!(fixes, 1);
    }

    #[test]
    fn test_store_sink_skips_gps_without_fix() {
        let mut sink = StoreSink::new(store_conn(), "rhodamine");
        let sample = Sample::new(Utc::now(), Some(1.0), GainLevel::X1, Some(2.0), None);
        sink.append(&sample).unwrap();

        let fixes: i64 = sink
            .conn
            .query_row("SELECT COUNT(*) FROM gps", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fixes, 0);
    }

    #[test]
    fn test_store_sink_skips_measurement_without_concentration() {
        let mut sink = StoreSink::new(store_conn(), "rhodamine");
        let sample = Sample::new(Utc::now(), None, GainLevel::X1, None, None);
        sink.append(&sample).unwrap();

        let measurements: i64 = sink
            .conn
            .query_row("SELECT COUNT(*) FROM rhodamine", [], |row| row.get(0))
            .unwrap();
        assert_eq!(measurements, 0);
    }

    #[test]
    fn test_store_sink_gps_failure_does_not_block_measurement() {
        // No gps table at all: the GPS insert fails, the measurement insert
        // and the commit must still go through.
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE rhodamine (
                 datetime_utc TEXT, gain INTEGER, voltage REAL, concentration REAL
             );",
        )
        .unwrap();
        let mut sink = StoreSink::new(conn, "rhodamine");

        let result = sink.append(&full_sample());
        assert!(result.is_err(), "the GPS insert failure must be reported");

        let measurements: i64 = sink
            .conn
            .query_row("SELECT COUNT(*) FROM rhodamine", [], |row| row.get(0))
            .unwrap();
        assert_eq!(measurements, 1, "measurement row must survive the commit");
    }

    #[test]
    fn test_csv_sink_header_once_and_null_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let mut sink = CsvSink::new(&path);

        sink.append(&full_sample()).unwrap();
        let null_sample = Sample::new(Utc::now(), None, GainLevel::X10, None, None);
        sink.append(&null_sample).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "timestamp,latitude,longitude,gain,voltage,concentration"
        );
        assert!(lines[1].contains("1.234"));
        // Null voltage/concentration/location serialize as empty fields
        assert!(lines[2].ends_with(",,10,,"));
    }

    #[test]
    fn test_console_sink_always_succeeds() {
        let mut sink = ConsoleSink;
        assert!(sink.append(&full_sample()).is_ok());
        let null_sample = Sample::new(Utc::now(), None, GainLevel::X1, None, None);
        assert!(sink.append(&null_sample).is_ok());
    }

    #[test]
    fn test_fanout_isolates_failures() {
        let writes = std::rc::Rc::new(std::cell::Cell::new(0));
        let mut fanout = SinkFanout::new(vec![
            Box::new(BrokenSink),
            Box::new(CountingSink {
                writes: std::rc::Rc::clone(&writes),
            }),
        ]);

        let outcomes = fanout.write(&full_sample());
        assert_eq!(outcomes.len(), 2);
        assert!(!outcomes[0].succeeded());
        assert!(outcomes[1].succeeded());
        assert_eq!(writes.get(), 1, "later sinks must still be attempted");
    }
}
