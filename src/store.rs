// Formula state persistence
//
// The kernel only needs a load/save contract; where the state lives is up
// to the embedding system. Two implementations are provided: an in-memory
// store for tests and embedding, and a JSON file store.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{debug, info, warn};

use crate::calibration::FormulaState;
use crate::error::FormulaError;

/// Load/save contract for the formula state
pub trait FormulaStore: Send {
    /// Load the persisted state; a store with nothing saved yields the default state
    fn load_formula_state(&self) -> Result<FormulaState, FormulaError>;

    /// Persist the state, replacing whatever was stored before
    fn save_formula_state(&self, state: &FormulaState) -> Result<(), FormulaError>;
}

/// Volatile store
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<FormulaState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with a state
    pub fn with_state(state: FormulaState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }
}

impl FormulaStore for MemoryStore {
    fn load_formula_state(&self) -> Result<FormulaState, FormulaError> {
        self.state
            .lock()
            .map(|guard| guard.clone())
            .map_err(|_| FormulaError::StatePoisoned)
    }

    fn save_formula_state(&self, state: &FormulaState) -> Result<(), FormulaError> {
        let mut guard = self.state.lock().map_err(|_| FormulaError::StatePoisoned)?;
        *guard = state.clone();
        Ok(())
    }
}

/// JSON file store
///
/// Writes go to a sibling temporary file that is then renamed over the
/// target, so a reader never observes a half-written file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl FormulaStore for JsonFileStore {
    fn load_formula_state(&self) -> Result<FormulaState, FormulaError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let state: FormulaState = serde_json::from_str(&contents)?;
                info!("[Store] Loaded formula state from {:?}", self.path);
                Ok(state)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("[Store] No formula state at {:?}, starting empty", self.path);
                Ok(FormulaState::new_default())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn save_formula_state(&self, state: &FormulaState) -> Result<(), FormulaError> {
        let json = serde_json::to_string_pretty(state)?;
        let temp = self.temp_path();
        fs::write(&temp, json)?;
        if let Err(err) = fs::rename(&temp, &self.path) {
            let _ = fs::remove_file(&temp);
            warn!("[Store] Failed to replace {:?}: {}", self.path, err);
            return Err(err.into());
        }
        debug!("[Store] Saved formula state to {:?}", self.path);
        Ok(())
    }
}
