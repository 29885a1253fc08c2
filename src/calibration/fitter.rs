// PolynomialFitter - least-squares quadratic fit of gravity against angle
//
// Builds the 3x3 normal matrix from power sums of the angles and solves it
// with Gaussian elimination (partial pivoting). With at most 10 points the
// direct solve is exact enough and runs in constant time.

use log::debug;

use crate::calibration::formula::Formula;
use crate::calibration::points::CalibrationPoint;
use crate::error::FormulaError;

/// Minimum number of distinct angles needed to constrain a quadratic
pub const MIN_DISTINCT_ANGLES: usize = 3;

/// Pivots smaller than this fraction of the largest matrix entry are
/// treated as zero.
const PIVOT_TOLERANCE: f64 = 1e-12;

/// Least-squares quadratic fitter
pub struct PolynomialFitter;

impl PolynomialFitter {
    /// Fit a quadratic through the valid calibration points
    ///
    /// # Returns
    /// * `Ok(Formula)` - finite coefficients minimizing the squared residuals
    /// * `Err(FormulaError::InsufficientData)` - fewer than 3 distinct angles,
    ///   or the normal matrix is singular
    pub fn fit(points: &[CalibrationPoint]) -> Result<Formula, FormulaError> {
        let distinct_angles = count_distinct_angles(points);
        let insufficient = || FormulaError::InsufficientData {
            valid_points: points.len(),
            distinct_angles,
        };

        if distinct_angles < MIN_DISTINCT_ANGLES {
            debug!(
                "[Fitter] Refusing fit: {} points, {} distinct angles",
                points.len(),
                distinct_angles
            );
            return Err(insufficient());
        }

        let (matrix, rhs) = normal_equations(points);
        let [c, b, a] = solve_3x3(matrix, rhs).ok_or_else(insufficient)?;

        if !(a.is_finite() && b.is_finite() && c.is_finite()) {
            return Err(insufficient());
        }

        debug!(
            "[Fitter] Fitted {} points: a={:e}, b={:e}, c={:e}",
            points.len(),
            a,
            b,
            c
        );
        Ok(Formula::new(a, b, c))
    }
}

fn count_distinct_angles(points: &[CalibrationPoint]) -> usize {
    let mut angles: Vec<f64> = points.iter().map(|p| p.angle).collect();
    angles.sort_by(|x, y| x.total_cmp(y));
    angles.dedup();
    angles.len()
}

/// Normal equations for unknowns ordered `[c, b, a]`
///
/// `matrix[i][j] = Σ angle^(i+j)`, `rhs[i] = Σ gravity * angle^i`
fn normal_equations(points: &[CalibrationPoint]) -> ([[f64; 3]; 3], [f64; 3]) {
    let mut sums = [0.0_f64; 5];
    let mut rhs = [0.0_f64; 3];

    for point in points {
        let mut power = 1.0;
        for (k, sum) in sums.iter_mut().enumerate() {
            *sum += power;
            if k < 3 {
                rhs[k] += point.gravity * power;
            }
            power *= point.angle;
        }
    }

    let matrix = [
        [sums[0], sums[1], sums[2]],
        [sums[1], sums[2], sums[3]],
        [sums[2], sums[3], sums[4]],
    ];
    (matrix, rhs)
}

/// Solve `Ax = b` by Gaussian elimination with partial pivoting
///
/// Returns None if the matrix is singular.
fn solve_3x3(mut a: [[f64; 3]; 3], mut b: [f64; 3]) -> Option<[f64; 3]> {
    let scale = a
        .iter()
        .flatten()
        .fold(0.0_f64, |acc, value| acc.max(value.abs()));
    if scale == 0.0 || !scale.is_finite() {
        return None;
    }
    let tolerance = scale * PIVOT_TOLERANCE;

    for col in 0..3 {
        let pivot_row =
            (col..3).max_by(|&r1, &r2| a[r1][col].abs().total_cmp(&a[r2][col].abs()))?;
        if a[pivot_row][col].abs() <= tolerance {
            return None;
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        for row in (col + 1)..3 {
            let factor = a[row][col] / a[col][col];
            for k in col..3 {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = [0.0_f64; 3];
    for row in (0..3).rev() {
        let tail: f64 = ((row + 1)..3).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn points(pairs: &[(f64, f64)]) -> Vec<CalibrationPoint> {
        pairs
            .iter()
            .map(|&(angle, gravity)| CalibrationPoint::new(angle, gravity))
            .collect()
    }

    #[test]
    fn test_exact_quadratic_recovered() {
        // gravity = 0.0001*x^2 - 0.002*x + 1.01
        let truth = Formula::new(0.0001, -0.002, 1.01);
        let pts: Vec<CalibrationPoint> = [20.0, 30.0, 40.0, 50.0, 60.0]
            .iter()
            .map(|&x| CalibrationPoint::new(x, truth.gravity_at(x)))
            .collect();

        let fit = PolynomialFitter::fit(&pts).unwrap();
        assert_relative_eq!(fit.a, truth.a, epsilon = 1e-10);
        assert_relative_eq!(fit.b, truth.b, epsilon = 1e-8);
        assert_relative_eq!(fit.c, truth.c, epsilon = 1e-7);
    }

    #[test]
    fn test_three_points_interpolate() {
        let pts = points(&[(25.0, 1.0), (45.0, 1.04), (65.0, 1.08)]);
        let fit = PolynomialFitter::fit(&pts).unwrap();
        for p in &pts {
            assert_relative_eq!(fit.gravity_at(p.angle), p.gravity, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_fewer_than_three_points() {
        let pts = points(&[(25.0, 1.0), (30.0, 1.01)]);
        let err = PolynomialFitter::fit(&pts).unwrap_err();
        assert_eq!(
            err,
            FormulaError::InsufficientData {
                valid_points: 2,
                distinct_angles: 2
            }
        );
    }

    #[test]
    fn test_identical_angles_are_singular() {
        let pts = points(&[(25.0, 1.0), (25.0, 1.01), (25.0, 1.02), (25.0, 1.03)]);
        assert!(matches!(
            PolynomialFitter::fit(&pts),
            Err(FormulaError::InsufficientData {
                valid_points: 4,
                distinct_angles: 1
            })
        ));
    }

    #[test]
    fn test_two_distinct_angles_are_singular() {
        let pts = points(&[(25.0, 1.0), (25.0, 1.01), (40.0, 1.02), (40.0, 1.03)]);
        assert!(matches!(
            PolynomialFitter::fit(&pts),
            Err(FormulaError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_order_independent() {
        let forward = points(&[(25.0, 1.0), (35.0, 1.02), (50.0, 1.05), (70.0, 1.1)]);
        let mut reversed = forward.clone();
        reversed.reverse();

        let f1 = PolynomialFitter::fit(&forward).unwrap();
        let f2 = PolynomialFitter::fit(&reversed).unwrap();
        assert_relative_eq!(f1.a, f2.a, epsilon = 1e-12);
        assert_relative_eq!(f1.b, f2.b, epsilon = 1e-10);
        assert_relative_eq!(f1.c, f2.c, epsilon = 1e-9);
    }

    #[test]
    fn test_solve_3x3_identity() {
        let a = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let x = solve_3x3(a, [1.0, 2.0, 3.0]).unwrap();
        assert_relative_eq!(x[0], 1.0);
        assert_relative_eq!(x[1], 2.0);
        assert_relative_eq!(x[2], 3.0);
    }

    #[test]
    fn test_solve_3x3_needs_pivoting() {
        let a = [[0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 2.0]];
        let x = solve_3x3(a, [5.0, 7.0, 4.0]).unwrap();
        assert_relative_eq!(x[0], 7.0);
        assert_relative_eq!(x[1], 5.0);
        assert_relative_eq!(x[2], 2.0);
    }

    #[test]
    fn test_solve_3x3_singular() {
        let a = [[1.0, 2.0, 3.0], [2.0, 4.0, 6.0], [1.0, 1.0, 1.0]];
        assert!(solve_3x3(a, [1.0, 2.0, 3.0]).is_none());
        assert!(solve_3x3([[0.0; 3]; 3], [0.0; 3]).is_none());
    }
}
