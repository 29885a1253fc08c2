// CalibrationPointSet - the operator-supplied (angle, gravity) pairs
//
// The set always has exactly 10 slots. Internally an unused slot is `None`;
// on the wire an unused slot is a zero angle with gravity 1.0, which is
// what the configuration API and the stored configuration exchange.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::calibration::units::UnitModel;

/// Number of calibration slots on the device
pub const CALIBRATION_SLOTS: usize = 10;

/// Gravity reported for an unused slot on the wire
pub const UNUSED_SLOT_GRAVITY: f64 = 1.0;

/// A single (tilt angle, gravity) calibration measurement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationPoint {
    pub angle: f64,
    pub gravity: f64,
}

impl CalibrationPoint {
    pub const fn new(angle: f64, gravity: f64) -> Self {
        Self { angle, gravity }
    }
}

/// Wire form of a slot: `{ "a": angle, "g": gravity }`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawSlot {
    pub a: f64,
    #[serde(default = "default_slot_gravity")]
    pub g: f64,
}

fn default_slot_gravity() -> f64 {
    UNUSED_SLOT_GRAVITY
}

impl Default for RawSlot {
    fn default() -> Self {
        Self {
            a: 0.0,
            g: UNUSED_SLOT_GRAVITY,
        }
    }
}

/// Rejected wire point set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointSetError {
    /// More entries than the device has slots
    TooManyPoints { supplied: usize, capacity: usize },
}

impl fmt::Display for PointSetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointSetError::TooManyPoints { supplied, capacity } => write!(
                f,
                "Too many calibration points: got {}, capacity is {}",
                supplied, capacity
            ),
        }
    }
}

impl std::error::Error for PointSetError {}

/// Fixed-capacity set of 10 calibration slots
///
/// Slot order is preserved so iteration is deterministic; the fit does not
/// depend on it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<RawSlot>", into = "Vec<RawSlot>")]
pub struct CalibrationPointSet {
    slots: [Option<CalibrationPoint>; CALIBRATION_SLOTS],
}

impl CalibrationPointSet {
    /// Create an empty set (all slots unused)
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from wire slots
    ///
    /// Slots beyond the ones supplied default to unused. A zero angle marks
    /// a slot as unused regardless of its gravity value.
    ///
    /// # Errors
    /// `TooManyPoints` when more than 10 slots are supplied.
    pub fn from_raw(raw: &[RawSlot]) -> Result<Self, PointSetError> {
        if raw.len() > CALIBRATION_SLOTS {
            return Err(PointSetError::TooManyPoints {
                supplied: raw.len(),
                capacity: CALIBRATION_SLOTS,
            });
        }

        let mut set = Self::new();
        for (slot, entry) in set.slots.iter_mut().zip(raw) {
            if entry.a != 0.0 {
                *slot = Some(CalibrationPoint::new(entry.a, entry.g));
            }
        }
        Ok(set)
    }

    /// Build a set from `(angle, gravity)` pairs using the wire convention
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self, PointSetError> {
        let raw: Vec<RawSlot> = pairs.iter().map(|&(a, g)| RawSlot { a, g }).collect();
        Self::from_raw(&raw)
    }

    /// Wire form of all 10 slots
    pub fn to_raw(&self) -> Vec<RawSlot> {
        self.slots
            .iter()
            .map(|slot| match slot {
                Some(point) => RawSlot {
                    a: point.angle,
                    g: point.gravity,
                },
                None => RawSlot::default(),
            })
            .collect()
    }

    /// Valid points in slot order
    pub fn valid_points(&self) -> Vec<CalibrationPoint> {
        self.slots.iter().flatten().copied().collect()
    }

    /// Valid points with their gravity converted from `unit` to SG
    pub fn valid_points_sg(&self, unit: UnitModel) -> Vec<CalibrationPoint> {
        self.valid_points()
            .into_iter()
            .map(|point| CalibrationPoint::new(point.angle, unit.to_sg(point.gravity)))
            .collect()
    }

    /// Number of valid points
    pub fn count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

impl TryFrom<Vec<RawSlot>> for CalibrationPointSet {
    type Error = PointSetError;

    fn try_from(raw: Vec<RawSlot>) -> Result<Self, Self::Error> {
        Self::from_raw(&raw)
    }
}

impl From<CalibrationPointSet> for Vec<RawSlot> {
    fn from(set: CalibrationPointSet) -> Self {
        set.to_raw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_angle_is_unused() {
        let set =
            CalibrationPointSet::from_pairs(&[(0.0, 1.0), (25.0, 1.0), (0.0, 1.02), (30.0, 1.01)])
                .unwrap();
        assert_eq!(set.count(), 2);
        assert_eq!(
            set.valid_points(),
            vec![
                CalibrationPoint::new(25.0, 1.0),
                CalibrationPoint::new(30.0, 1.01)
            ]
        );
    }

    #[test]
    fn test_omitted_slots_default() {
        let set = CalibrationPointSet::from_pairs(&[(25.0, 1.0)]).unwrap();
        let raw = set.to_raw();
        assert_eq!(raw.len(), CALIBRATION_SLOTS);
        assert_eq!(raw[0], RawSlot { a: 25.0, g: 1.0 });
        assert!(raw[1..].iter().all(|slot| *slot == RawSlot::default()));
    }

    #[test]
    fn test_too_many_slots_rejected() {
        let pairs: Vec<(f64, f64)> = (1..=11).map(|i| (i as f64, 1.0)).collect();
        let err = CalibrationPointSet::from_pairs(&pairs).unwrap_err();
        assert_eq!(
            err,
            PointSetError::TooManyPoints {
                supplied: 11,
                capacity: CALIBRATION_SLOTS
            }
        );
        assert!(err.to_string().contains("11"));

        let json: String = format!("[{}]", vec![r#"{"a": 30, "g": 1.0}"#; 11].join(","));
        let parsed: Result<CalibrationPointSet, _> = serde_json::from_str(&json);
        assert!(parsed.unwrap_err().to_string().contains("Too many calibration points"));
    }

    #[test]
    fn test_plato_points_convert_to_sg() {
        let set = CalibrationPointSet::from_pairs(&[(0.0, 5.0), (25.0, 0.0), (30.0, 12.5)])
            .unwrap();
        let sg = set.valid_points_sg(UnitModel::Plato);
        assert_eq!(sg.len(), 2);
        assert_eq!(sg[0], CalibrationPoint::new(25.0, 1.0));
        assert!((sg[1].gravity - 259.0 / 246.5).abs() < 1e-12);

        assert_eq!(
            set.valid_points_sg(UnitModel::SpecificGravity),
            set.valid_points()
        );
    }

    #[test]
    fn test_wire_json() {
        let set: CalibrationPointSet =
            serde_json::from_str(r#"[{"a": 25.0, "g": 1.0}, {"a": 0}, {"a": 35.5, "g": 1.02}]"#)
                .unwrap();
        assert_eq!(set.count(), 2);
        assert_eq!(set.valid_points()[1], CalibrationPoint::new(35.5, 1.02));

        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json.as_array().map(|a| a.len()), Some(CALIBRATION_SLOTS));
        assert_eq!(json[1]["g"], 1.0);
    }
}
