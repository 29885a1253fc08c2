// Deviation validation for fitted formulas
//
// Compares the fitted curve against every calibration point on the SG
// gravity-points scale. Points are already in SG here. The largest absolute
// difference is the deviation score; a fit is accepted when the score does
// not exceed the caller's threshold.

use log::{debug, warn};
use serde::Serialize;

use crate::calibration::formula::Formula;
use crate::calibration::points::CalibrationPoint;
use crate::calibration::units::sg_points;
use crate::error::FormulaError;

/// Residual of the fitted curve at one calibration point
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PointDeviation {
    pub angle: f64,
    /// Calibration gravity in SG
    pub gravity: f64,
    /// Formula output in SG
    pub predicted: f64,
    /// Absolute difference in gravity points
    pub deviation: f64,
}

/// Per-point residuals plus the overall deviation score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitReport {
    pub points: Vec<PointDeviation>,
    /// Maximum per-point deviation in gravity points
    pub deviation_score: f64,
}

impl FitReport {
    /// Build the report for a fit without judging it
    pub fn evaluate(formula: &Formula, points: &[CalibrationPoint]) -> Self {
        let points: Vec<PointDeviation> = points
            .iter()
            .map(|point| {
                let predicted = formula.gravity_at(point.angle);
                PointDeviation {
                    angle: point.angle,
                    gravity: point.gravity,
                    predicted,
                    deviation: (sg_points(predicted) - sg_points(point.gravity)).abs(),
                }
            })
            .collect();

        let deviation_score = points
            .iter()
            .map(|p| p.deviation)
            .fold(0.0_f64, |acc, d| if d.is_nan() || d > acc { d } else { acc });

        Self {
            points,
            deviation_score,
        }
    }
}

/// Validator for fitted formulas
pub struct DeviationValidator;

impl DeviationValidator {
    /// Reject thresholds no fit can be judged against
    ///
    /// # Errors
    /// `InvalidThreshold` when `max_deviation` is NaN, infinite or negative
    pub fn check_threshold(max_deviation: f64) -> Result<(), FormulaError> {
        if max_deviation.is_finite() && max_deviation >= 0.0 {
            Ok(())
        } else {
            Err(FormulaError::InvalidThreshold { max_deviation })
        }
    }

    /// Validate a fit against a maximum deviation
    ///
    /// # Arguments
    /// * `formula` - Fitted polynomial
    /// * `points` - Valid calibration points (SG) the polynomial was fitted to
    /// * `max_deviation` - Threshold in gravity points
    ///
    /// # Returns
    /// * `Ok(FitReport)` - Fit accepted
    /// * `Err(FormulaError::PoorFit)` - Some point deviates more than `max_deviation`
    /// * `Err(FormulaError::InvalidThreshold)` - `max_deviation` is not a usable threshold
    pub fn validate(
        formula: &Formula,
        points: &[CalibrationPoint],
        max_deviation: f64,
    ) -> Result<FitReport, FormulaError> {
        Self::check_threshold(max_deviation)?;
        let report = FitReport::evaluate(formula, points);

        for point in report.points.iter().filter(|p| p.deviation > max_deviation) {
            warn!(
                "[Validator] Angle {:.3}: expected {:.4}, formula gives {:.4} ({:.2} points > {:.2})",
                point.angle, point.gravity, point.predicted, point.deviation, max_deviation
            );
        }

        // A NaN score never passes
        if report.deviation_score.is_nan() || report.deviation_score > max_deviation {
            return Err(FormulaError::PoorFit {
                deviation: report.deviation_score,
                max_deviation,
            });
        }

        debug!(
            "[Validator] Fit accepted: deviation {:.3} <= {:.3} points",
            report.deviation_score, max_deviation
        );
        Ok(report)
    }
}
