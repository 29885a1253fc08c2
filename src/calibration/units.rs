// Gravity units
//
// Calibration gravities may be entered in SG or Plato. The fit and the
// deviation check always run on SG, so Plato inputs are converted first
// and the stored formula yields SG.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Gravity representation used by the calibration points
///
/// Serialized as the device's gravity-format letters (`"G"` for SG,
/// `"P"` for Plato).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnitModel {
    #[default]
    #[serde(rename = "G")]
    SpecificGravity,
    #[serde(rename = "P")]
    Plato,
}

impl UnitModel {
    /// Convert a gravity value in this unit to specific gravity
    pub fn to_sg(&self, gravity: f64) -> f64 {
        match self {
            UnitModel::SpecificGravity => gravity,
            UnitModel::Plato => plato_to_sg(gravity),
        }
    }

    /// Convert a specific gravity value into this unit
    pub fn from_sg(&self, sg: f64) -> f64 {
        match self {
            UnitModel::SpecificGravity => sg,
            UnitModel::Plato => sg_to_plato(sg),
        }
    }
}

impl fmt::Display for UnitModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitModel::SpecificGravity => write!(f, "SG"),
            UnitModel::Plato => write!(f, "Plato"),
        }
    }
}

/// `(sg - 1.0) * 1000`, the scale deviations are measured on
pub fn sg_points(sg: f64) -> f64 {
    (sg - 1.0) * 1000.0
}

/// Convert specific gravity to degrees Plato
///
/// Returns 0 for a zero SG rather than dividing by zero.
pub fn sg_to_plato(sg: f64) -> f64 {
    if sg == 0.0 {
        return 0.0;
    }
    259.0 - (259.0 / sg)
}

/// Convert degrees Plato to specific gravity
pub fn plato_to_sg(plato: f64) -> f64 {
    259.0 / (259.0 - plato)
}
