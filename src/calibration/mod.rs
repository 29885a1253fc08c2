// Calibration module - the formula creation kernel
//
// The kernel turns operator-supplied (tilt angle, gravity) points into the
// quadratic formula the device uses to convert live tilt readings:
// 1. CalibrationPointSet: up to 10 slots, zero angle = unused
// 2. PolynomialFitter: least-squares quadratic through the valid points
// 3. DeviationValidator: max deviation in gravity points vs. a threshold
// 4. FormulaFormatter: canonical `a*tilt^2+b*tilt+c` string
//
// FormulaState holds the last accepted formula and the last error.

pub mod correction;
pub mod fitter;
pub mod formula;
pub mod points;
pub mod state;
pub mod units;
pub mod validation;

pub use correction::gravity_temperature_correction_c;
pub use fitter::PolynomialFitter;
pub use formula::{Formula, FormulaFormatter, FormulaParseError};
pub use points::{CalibrationPoint, CalibrationPointSet, PointSetError, RawSlot, CALIBRATION_SLOTS};
pub use state::FormulaState;
pub use units::UnitModel;
pub use validation::{DeviationValidator, FitReport, PointDeviation};
