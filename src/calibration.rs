/// Voltage-to-concentration conversion under a selected calibration model.
///
/// Two incompatible models are supported:
///
/// - **Three-point**: an independent slope/offset pair per gain level,
///   derived from dilution-series measurements at each gain.
/// - **Standard-ratio**: a single-point standard of known concentration
///   measured at a reference gain, plus one blank voltage per gain level
///   (Turner technical note S-0243).
///
/// The model is resolved once from configuration. Ambiguity is rejected:
/// a config that fully specifies both models is as much an error as one
/// that specifies neither.

use crate::config::CalibrationConfig;
use crate::error::FluorError;
use crate::model::GainLevel;

/// Slopes are calibrated in volts against a milli-unit (ppb) reference, so
/// the three-point formula scales the voltage term by 1000.
const MILLI_SCALE: f64 = 1000.0;

#[derive(Debug, Clone)]
pub enum CalibrationModel {
    ThreePoint {
        /// Slope per gain level, indexed by [`GainLevel::index`].
        slope: [f64; 3],
        /// Offset per gain level.
        offset: [f64; 3],
    },
    StandardRatio {
        standard_concentration: f64,
        standard_voltage: f64,
        /// Gain the standard was measured at.
        standard_gain: GainLevel,
        /// Blank (dye-free) voltage per gain level.
        blank: [f64; 3],
    },
}

impl CalibrationModel {
    /// Resolves the calibration model from configuration.
    ///
    /// Exactly one model must be fully specified. Both fully specified or
    /// neither is a `Configuration` error; a standard-ratio config whose
    /// standard is indistinguishable from its blank is a `Calibration`
    /// error caught here, before any cycle runs.
    pub fn from_config(cal: &CalibrationConfig) -> Result<Self, FluorError> {
        let three_point = three_point_params(cal);
        let standard = standard_params(cal);

        match (three_point, standard) {
            (Some(_), Some(_)) => Err(FluorError::Configuration(
                "both three-point and standard-ratio calibration are fully specified; \
                 remove one set of [cal] parameters"
                    .to_string(),
            )),
            (None, None) => Err(FluorError::Configuration(
                "no complete calibration model in [cal]: provide either all of \
                 slope_1x/10x/100x + offset_1x/10x/100x, or all of std_concentration, \
                 std_voltage, std_gain + blank_1x/10x/100x"
                    .to_string(),
            )),
            (Some((slope, offset)), None) => Ok(CalibrationModel::ThreePoint { slope, offset }),
            (None, Some((standard_concentration, standard_voltage, raw_gain, blank))) => {
                let standard_gain = GainLevel::from_int(raw_gain)?;
                if standard_voltage == blank[standard_gain.index()] {
                    return Err(FluorError::Calibration(format!(
                        "standard voltage {} equals the blank at gain {}; \
                         the standard is indistinguishable from the blank",
                        standard_voltage, standard_gain
                    )));
                }
                Ok(CalibrationModel::StandardRatio {
                    standard_concentration,
                    standard_voltage,
                    standard_gain,
                    blank,
                })
            }
        }
    }

    /// Converts a voltage measured at `gain` to a concentration.
    ///
    /// The standard-ratio model normalizes the blank-subtracted,
    /// gain-descaled signal against the blank-subtracted, gain-descaled
    /// standard.
    pub fn convert(&self, voltage: f64, gain: GainLevel) -> Result<f64, FluorError> {
        match self {
            CalibrationModel::ThreePoint { slope, offset } => {
                let i = gain.index();
                Ok(slope[i] * voltage * MILLI_SCALE + offset[i])
            }
            CalibrationModel::StandardRatio {
                standard_concentration,
                standard_voltage,
                standard_gain,
                blank,
            } => {
                let denominator = standard_voltage - blank[standard_gain.index()];
                if denominator == 0.0 {
                    // Rejected at construction; failing loudly here guards
                    // against a model built by other means.
                    return Err(FluorError::Calibration(
                        "standard voltage equals blank at the standard gain".to_string(),
                    ));
                }
                Ok((voltage - blank[gain.index()]) / gain.factor() * standard_concentration
                    / denominator
                    / standard_gain.factor())
            }
        }
    }
}

fn three_point_params(cal: &CalibrationConfig) -> Option<([f64; 3], [f64; 3])> {
    Some((
        [cal.slope_1x?, cal.slope_10x?, cal.slope_100x?],
        [cal.offset_1x?, cal.offset_10x?, cal.offset_100x?],
    ))
}

fn standard_params(cal: &CalibrationConfig) -> Option<(f64, f64, i64, [f64; 3])> {
    Some((
        cal.std_concentration?,
        cal.std_voltage?,
        cal.std_gain?,
        [cal.blank_1x?, cal.blank_10x?, cal.blank_100x?],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_point_config() -> CalibrationConfig {
        CalibrationConfig {
            slope_1x: Some(1.0),
            slope_10x: Some(1.0),
            slope_100x: Some(1.0),
            offset_1x: Some(0.0),
            offset_10x: Some(0.0),
            offset_100x: Some(0.0),
            ..Default::default()
        }
    }

    fn standard_config() -> CalibrationConfig {
        CalibrationConfig {
            std_concentration: Some(10.0),
            std_voltage: Some(1.0),
            std_gain: Some(10),
            blank_1x: Some(0.0),
            blank_10x: Some(0.0),
            blank_100x: Some(0.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_three_point_round_trip() {
        // slope=[1,1,1], offset=[0,0,0]: 0.001 V at x1 is exactly 1.0 ppb
        let model = CalibrationModel::from_config(&three_point_config()).unwrap();
        let concentration = model.convert(0.001, GainLevel::X1).unwrap();
        assert!((concentration - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_three_point_uses_per_gain_parameters() {
        let mut cal = three_point_config();
        cal.slope_100x = Some(0.5);
        cal.offset_100x = Some(2.0);
        let model = CalibrationModel::from_config(&cal).unwrap();

        let at_100x = model.convert(0.002, GainLevel::X100).unwrap();
        assert!((at_100x - (0.5 * 0.002 * 1000.0 + 2.0)).abs() < 1e-12);

        let at_1x = model.convert(0.002, GainLevel::X1).unwrap();
        assert!((at_1x - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_standard_ratio_example() {
        // std 10 ppb at 1.0 V, gain x10, zero blanks:
        // (1.0-0)/10 * 10/(1.0-0)/10 = 0.1
        let model = CalibrationModel::from_config(&standard_config()).unwrap();
        let concentration = model.convert(1.0, GainLevel::X10).unwrap();
        assert!((concentration - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_standard_ratio_blank_subtraction() {
        let mut cal = standard_config();
        cal.blank_1x = Some(0.05);
        cal.blank_10x = Some(0.10);
        cal.blank_100x = Some(0.20);
        let model = CalibrationModel::from_config(&cal).unwrap();

        // (1.10 - 0.10)/10 * 10 / (1.0 - 0.10) / 10
        let concentration = model.convert(1.10, GainLevel::X10).unwrap();
        let expected = (1.10 - 0.10) / 10.0 * 10.0 / (1.0 - 0.10) / 10.0;
        assert!((concentration - expected).abs() < 1e-12);
    }

    #[test]
    fn test_no_parameters_is_configuration_error() {
        let result = CalibrationModel::from_config(&CalibrationConfig::default());
        assert!(matches!(result, Err(FluorError::Configuration(_))));
    }

    #[test]
    fn test_partial_parameters_is_configuration_error() {
        let mut cal = three_point_config();
        cal.offset_100x = None;
        let result = CalibrationModel::from_config(&cal);
        assert!(matches!(result, Err(FluorError::Configuration(_))));
    }

    #[test]
    fn test_both_models_is_ambiguous() {
        let mut cal = three_point_config();
        let standard = standard_config();
        cal.std_concentration = standard.std_concentration;
        cal.std_voltage = standard.std_voltage;
        cal.std_gain = standard.std_gain;
        cal.blank_1x = standard.blank_1x;
        cal.blank_10x = standard.blank_10x;
        cal.blank_100x = standard.blank_100x;

        let result = CalibrationModel::from_config(&cal);
        assert!(matches!(result, Err(FluorError::Configuration(_))));
    }

    #[test]
    fn test_invalid_standard_gain_rejected() {
        let mut cal = standard_config();
        cal.std_gain = Some(50);
        let result = CalibrationModel::from_config(&cal);
        assert!(matches!(result, Err(FluorError::InvalidGain(50))));
    }

    #[test]
    fn test_degenerate_standard_rejected_at_construction() {
        let mut cal = standard_config();
        cal.blank_10x = Some(1.0); // equals std_voltage at std_gain
        let result = CalibrationModel::from_config(&cal);
        assert!(matches!(result, Err(FluorError::Calibration(_))));
    }
}
