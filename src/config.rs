//! Configuration for formula creation
//!
//! Runtime configuration is loaded from a JSON file. Missing files or
//! invalid JSON fall back to defaults so a fresh device still boots. The
//! deviation threshold and gravity unit are owned here and handed to the
//! calibration service on every submission.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::calibration::correction::DEFAULT_CALIBRATION_TEMP_C;
use crate::calibration::UnitModel;

/// Default location of the config file
pub const DEFAULT_CONFIG_PATH: &str = "formula_config.json";

/// Formula creation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormulaConfig {
    /// Maximum allowed deviation between the formula and any calibration
    /// point, in gravity points
    pub max_deviation: f64,
    /// Unit the calibration gravities are entered in
    pub gravity_unit: UnitModel,
    /// Temperature the hydrometer readings were calibrated at (°C)
    pub calibration_temp_c: f64,
    /// Where the formula state is persisted
    pub state_path: PathBuf,
}

impl Default for FormulaConfig {
    fn default() -> Self {
        Self {
            max_deviation: 6.0,
            gravity_unit: UnitModel::SpecificGravity,
            calibration_temp_c: DEFAULT_CALIBRATION_TEMP_C,
            state_path: PathBuf::from("formula_state.json"),
        }
    }
}

impl FormulaConfig {
    /// Load configuration from a JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The loaded configuration; defaults if the file doesn't exist or the
    /// JSON is invalid. Keys absent from the file keep their default values.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the default location
    pub fn load() -> Self {
        Self::load_from_file(DEFAULT_CONFIG_PATH)
    }
}
