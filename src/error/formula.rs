// Formula creation error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Formula error code constants
///
/// Single source of truth for the numeric codes reported to the
/// configuration API alongside the fixed error messages.
///
/// Error code range: 3001-3005
pub struct FormulaErrorCodes {}

impl FormulaErrorCodes {
    /// Fewer than 3 distinct calibration angles
    pub const INSUFFICIENT_DATA: i32 = 3001;

    /// Fitted curve deviates too far from a calibration point
    pub const POOR_FIT: i32 = 3002;

    /// Formula state RwLock was poisoned
    pub const STATE_POISONED: i32 = 3003;

    /// Persisting or loading the formula state failed
    pub const STORAGE: i32 = 3004;

    /// Maximum deviation is NaN, infinite or negative
    pub const INVALID_THRESHOLD: i32 = 3005;
}

/// Message surfaced when the point set cannot constrain a quadratic
pub const INSUFFICIENT_DATA_MESSAGE: &str =
    "Not enough values to create formula, need at least 3 angles.";

/// Message surfaced when the fitted curve misses a point by more than the threshold
pub const POOR_FIT_MESSAGE: &str =
    "Unable to find an accurate formula based on input, check error log and graph below.";

/// Log a formula error with structured context
///
/// Logs the numeric code, the fixed message and the operation in which
/// the error occurred. Never panics.
pub fn log_formula_error(err: &FormulaError, context: &str) {
    error!(
        "Formula error in {}: code={}, component=CalibrationService, message={}, detail={:?}",
        context,
        err.code(),
        err.message(),
        err
    );
}

/// Formula creation errors
///
/// `InsufficientData` and `PoorFit` are the two user-facing outcomes of a
/// rejected calibration; both leave the stored formula untouched. The
/// remaining variants report failures of the shared state or of the
/// persistence collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaError {
    /// Fewer than 3 distinct angles, or a singular normal matrix
    InsufficientData {
        valid_points: usize,
        distinct_angles: usize,
    },

    /// Deviation score (gravity points) exceeded the configured maximum
    PoorFit { deviation: f64, max_deviation: f64 },

    /// Formula state RwLock was poisoned
    StatePoisoned,

    /// Persistence collaborator failed
    Storage { reason: String },

    /// Maximum deviation cannot be compared against
    InvalidThreshold { max_deviation: f64 },
}

impl FormulaError {
    /// True for the two recoverable calibration outcomes that are stored as
    /// the last error message.
    pub fn is_calibration_error(&self) -> bool {
        matches!(
            self,
            FormulaError::InsufficientData { .. } | FormulaError::PoorFit { .. }
        )
    }
}

impl ErrorCode for FormulaError {
    fn code(&self) -> i32 {
        match self {
            FormulaError::InsufficientData { .. } => FormulaErrorCodes::INSUFFICIENT_DATA,
            FormulaError::PoorFit { .. } => FormulaErrorCodes::POOR_FIT,
            FormulaError::StatePoisoned => FormulaErrorCodes::STATE_POISONED,
            FormulaError::Storage { .. } => FormulaErrorCodes::STORAGE,
            FormulaError::InvalidThreshold { .. } => FormulaErrorCodes::INVALID_THRESHOLD,
        }
    }

    fn message(&self) -> String {
        match self {
            FormulaError::InsufficientData { .. } => INSUFFICIENT_DATA_MESSAGE.to_string(),
            FormulaError::PoorFit { .. } => POOR_FIT_MESSAGE.to_string(),
            FormulaError::StatePoisoned => "Formula state lock poisoned".to_string(),
            FormulaError::Storage { reason } => {
                format!("Failed to persist formula state: {}", reason)
            }
            FormulaError::InvalidThreshold { max_deviation } => format!(
                "Maximum deviation must be a finite, non-negative number of gravity points, got {}",
                max_deviation
            ),
        }
    }
}

impl fmt::Display for FormulaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FormulaError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for FormulaError {}

impl From<std::io::Error> for FormulaError {
    fn from(err: std::io::Error) -> Self {
        FormulaError::Storage {
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for FormulaError {
    fn from(err: serde_json::Error) -> Self {
        FormulaError::Storage {
            reason: err.to_string(),
        }
    }
}
