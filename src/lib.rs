// Gravity Formula Engine
// Turns (tilt angle, gravity) calibration points into the device's
// angle-to-gravity formula, with validation and persisted state.

// Module declarations
pub mod calibration;
pub mod config;
pub mod error;
pub mod service;
pub mod store;

// Re-exports for convenience
pub use calibration::{
    CalibrationPoint, CalibrationPointSet, FitReport, Formula, FormulaState, UnitModel,
};
pub use config::FormulaConfig;
pub use error::{ErrorCode, FormulaError};
pub use service::{CalibrationService, FormulaUpdate};
pub use store::{FormulaStore, JsonFileStore, MemoryStore};
