/// Hysteretic amplifier gain control.
///
/// The controller owns the current gain and the time of the last transition.
/// Deciding a gain change and applying it are split: `decide` is a pure
/// function of (voltage, now, state) so the threshold and settling logic is
/// testable without hardware or real time; `apply` performs the digital-line
/// write, updates state, and blocks for the settling delay so the next
/// voltage read reflects the new, settled gain.
///
/// Thresholds form a hysteresis dead zone: a voltage inside
/// [0.15 V, 2.25 V] never changes gain, which prevents oscillation at a
/// boundary.

use std::thread;
use std::time::{Duration, Instant};

use log::info;

use crate::error::FluorError;
use crate::hardware::GainLines;
use crate::model::GainLevel;

/// Below this, the signal is under-amplified: step gain up one level.
pub const LOW_THRESHOLD_VOLTS: f64 = 0.15;
/// Above this, the amplifier is near saturation: step gain down one level.
pub const HIGH_THRESHOLD_VOLTS: f64 = 2.25;
/// Pause after a gain change before trusting voltage readings again.
pub const SETTLING_DELAY: Duration = Duration::from_secs(3);

/// Digital output pattern per gain level. Fixed lookup, not computed: the
/// two relay lines do not encode the gain in binary.
pub const fn line_pattern(gain: GainLevel) -> [bool; 2] {
    match gain {
        GainLevel::X1 => [true, true],
        GainLevel::X10 => [false, true],
        GainLevel::X100 => [true, false],
    }
}

pub struct GainController {
    lines: Box<dyn GainLines>,
    autogain: bool,
    settling_delay: Duration,
    current: GainLevel,
    last_change: Instant,
}

impl GainController {
    /// Creates the controller and drives the lines to the initial gain.
    pub fn new(
        mut lines: Box<dyn GainLines>,
        autogain: bool,
        initial: GainLevel,
    ) -> Result<Self, FluorError> {
        lines.write_lines(line_pattern(initial))?;
        Ok(Self {
            lines,
            autogain,
            settling_delay: SETTLING_DELAY,
            current: initial,
            last_change: Instant::now(),
        })
    }

    /// Overrides the settling delay. Intended for tests, where a real 3 s
    /// pause per transition is unaffordable.
    pub fn with_settling_delay(mut self, delay: Duration) -> Self {
        self.settling_delay = delay;
        self
    }

    pub fn current(&self) -> GainLevel {
        self.current
    }

    /// Chooses the gain for the next cycle from a freshly measured average
    /// voltage. Pure: no hardware access, no state mutation.
    ///
    /// Returns the current gain unchanged when autogain is disabled, when
    /// the settling window since the last transition is still open, or when
    /// the voltage sits inside the hysteresis dead zone.
    pub fn decide(&self, avg_voltage: f64, now: Instant) -> GainLevel {
        if !self.autogain {
            return self.current;
        }
        if now.duration_since(self.last_change) < self.settling_delay {
            // A reading taken this soon after a transition is unsettled;
            // acting on it would chase transients.
            return self.current;
        }
        if avg_voltage < LOW_THRESHOLD_VOLTS {
            self.current.step_up()
        } else if avg_voltage > HIGH_THRESHOLD_VOLTS {
            self.current.step_down()
        } else {
            self.current
        }
    }

    /// Applies a gain choice to the hardware.
    ///
    /// No-op when the gain is unchanged. Otherwise writes the looked-up line
    /// pattern, records the transition, and blocks for the settling delay.
    /// If the line write fails, state is left unchanged so the next cycle
    /// retries naturally.
    pub fn apply(&mut self, new_gain: GainLevel) -> Result<(), FluorError> {
        if new_gain == self.current {
            return Ok(());
        }
        self.lines.write_lines(line_pattern(new_gain))?;
        info!("gain changed: {} -> {}", self.current, new_gain);
        self.current = new_gain;
        self.last_change = Instant::now();
        thread::sleep(self.settling_delay);
        Ok(())
    }
}
