/// One full measurement-log cycle.
///
/// Orchestration order matters:
///
/// 1. read the averaged voltage,
/// 2. convert with the gain that was active during the read,
/// 3. optionally read a GPS fix,
/// 4. assemble the record,
/// 5. fan it out to the sinks,
/// 6. decide and apply the *next* cycle's gain from *this* cycle's voltage.
///
/// Step 6 running last guarantees the logged gain always matches the
/// voltage and concentration it produced: gain never changes between read
/// and convert within a cycle.
///
/// Hardware and GPS failures are recoverable per cycle: the record is still
/// assembled with null fields and written, so downstream consumers can tell
/// "no measurement" apart from "zero measurement".

use std::time::Instant;

use chrono::Utc;
use log::{error, warn};

use crate::calibration::CalibrationModel;
use crate::gain::GainController;
use crate::gps::GpsSource;
use crate::hardware::VoltageSource;
use crate::model::{Sample, SinkOutcome};
use crate::sink::SinkFanout;

pub struct AcquisitionCycle {
    voltage_source: Box<dyn VoltageSource>,
    converter: CalibrationModel,
    gain: GainController,
    gps: Option<Box<dyn GpsSource>>,
    fanout: SinkFanout,
}

/// What one cycle produced, for logging and tests. The cycle itself has no
/// result value beyond its side effects.
pub struct CycleReport {
    pub sample: Sample,
    pub outcomes: Vec<SinkOutcome>,
}

impl AcquisitionCycle {
    pub fn new(
        voltage_source: Box<dyn VoltageSource>,
        converter: CalibrationModel,
        gain: GainController,
        gps: Option<Box<dyn GpsSource>>,
        fanout: SinkFanout,
    ) -> Self {
        Self {
            voltage_source,
            converter,
            gain,
            gps,
            fanout,
        }
    }

    pub fn run_once(&mut self) -> CycleReport {
        let voltage = match self.voltage_source.read_average_voltage() {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("{}; recording a null measurement", e);
                None
            }
        };
        let gain = self.gain.current();

        let concentration = voltage.and_then(|v| match self.converter.convert(v, gain) {
            Ok(c) => Some(c),
            Err(e) => {
                // Converter validity is proven at startup; reaching this is
                // an invariant violation, logged loudly rather than crashing
                // a running deployment.
                error!("conversion failed after startup validation: {}", e);
                None
            }
        });

        let fix = self.gps.as_mut().and_then(|gps| match gps.read_fix() {
            Ok(fix) => Some(fix),
            Err(e) => {
                warn!("{}", e);
                None
            }
        });

        let sample = Sample::new(Utc::now(), voltage, gain, concentration, fix);

        let outcomes = self.fanout.write(&sample);
        for outcome in &outcomes {
            if let Err(e) = &outcome.result {
                warn!("sink '{}' write failed: {}", outcome.sink, e);
            }
        }

        // Gain for the next cycle, chosen from this cycle's voltage. A cycle
        // without a voltage has nothing to decide from.
        if let Some(v) = voltage {
            let next = self.gain.decide(v, Instant::now());
            if let Err(e) = self.gain.apply(next) {
                warn!("gain change failed: {}", e);
            }
        }

        CycleReport { sample, outcomes }
    }

    pub fn current_gain(&self) -> crate::model::GainLevel {
        self.gain.current()
    }
}
