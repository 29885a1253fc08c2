// Formula errors and their numeric codes
//
// Rejected submissions surface two fixed operator messages; everything else
// is an infrastructure failure. Each variant carries a code in the 3001-3005
// range that the configuration API and the CLI report next to the message.

mod formula;

pub use formula::{
    log_formula_error, FormulaError, FormulaErrorCodes, INSUFFICIENT_DATA_MESSAGE,
    POOR_FIT_MESSAGE,
};

/// Numeric code plus operator-facing text
///
/// `message()` is exactly what ends up in the stored "last error" for a
/// rejected calibration, so it must not include per-call details for those
/// variants.
pub trait ErrorCode {
    fn code(&self) -> i32;

    fn message(&self) -> String;
}
