// CalibrationService: formula creation and stored-formula management
//
// Orchestrates point filtering, fitting, validation and formatting, and
// owns the shared "last formula / last error" state. Submissions are
// serialized; reads take a shared lock and always see a complete state.

use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{debug, info, warn};
use tokio::sync::broadcast;

use crate::calibration::{
    CalibrationPointSet, DeviationValidator, FitReport, Formula, FormulaState, PolynomialFitter,
    UnitModel,
};
use crate::config::FormulaConfig;
use crate::error::{log_formula_error, ErrorCode, FormulaError};
use crate::store::{FormulaStore, MemoryStore};

/// Capacity of the formula update broadcast channel
const UPDATE_CHANNEL_CAPACITY: usize = 16;

/// Notification sent after every submission
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaUpdate {
    /// State after the submission
    pub state: FormulaState,
    /// Whether the submission produced a new formula
    pub accepted: bool,
}

/// Manages formula creation and the stored formula state
///
/// This service handles:
/// - Computing a formula from a calibration point set
/// - Keeping the last accepted formula and last error message
/// - Persisting the state through a [`FormulaStore`]
/// - Broadcasting [`FormulaUpdate`]s to interested components
///
/// # Example
/// ```ignore
/// let service = CalibrationService::new();
/// let formula = service.compute_formula(&points, UnitModel::SpecificGravity, 3.0)?;
/// let gravity = service.gravity_at(42.0)?;
/// ```
pub struct CalibrationService {
    state: Arc<RwLock<FormulaState>>,
    store: Arc<Mutex<Box<dyn FormulaStore>>>,
    updates: broadcast::Sender<FormulaUpdate>,
}

impl CalibrationService {
    /// Create a service backed by a volatile in-memory store
    pub fn new() -> Self {
        Self::from_parts(FormulaState::new_default(), Box::new(MemoryStore::new()))
    }

    /// Create a service backed by `store`, restoring the state it holds
    ///
    /// # Errors
    /// - The store failed to load its state
    pub fn with_store(store: Box<dyn FormulaStore>) -> Result<Self, FormulaError> {
        let state = store.load_formula_state().inspect_err(|err| {
            log_formula_error(err, "load_formula_state");
        })?;
        if state.has_formula() {
            info!("[Formula] Restored formula {}", state.formula);
        }
        Ok(Self::from_parts(state, store))
    }

    fn from_parts(state: FormulaState, store: Box<dyn FormulaStore>) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            state: Arc::new(RwLock::new(state)),
            store: Arc::new(Mutex::new(store)),
            updates,
        }
    }

    /// Compute a formula from the calibration points
    ///
    /// On success the formula becomes the stored formula and the stored error
    /// is cleared. On `InsufficientData` / `PoorFit` the stored formula is
    /// kept and the error message is recorded as the last error.
    ///
    /// Plato gravities are converted to SG before fitting, so the stored
    /// formula always yields SG.
    ///
    /// # Arguments
    /// * `points` - Calibration point set (unused slots ignored)
    /// * `unit` - Unit of the calibration gravities
    /// * `max_deviation` - Acceptance threshold in gravity points
    ///
    /// # Returns
    /// * `Ok(String)` - Canonical formula string
    /// * `Err(FormulaError)` - Rejected submission, or a state/storage failure
    ///
    /// # Errors
    /// - Fewer than 3 distinct angles (`InsufficientData`)
    /// - Deviation score above `max_deviation` (`PoorFit`)
    /// - NaN, infinite or negative `max_deviation` (`InvalidThreshold`)
    /// - Lock poisoning or persistence failure
    ///
    /// Nothing is changed for the last two.
    pub fn compute_formula(
        &self,
        points: &CalibrationPointSet,
        unit: UnitModel,
        max_deviation: f64,
    ) -> Result<String, FormulaError> {
        let store = self.lock_store()?;

        let outcome = Self::fit_and_validate(points, unit, max_deviation);
        let current = self.read_state()?.clone();
        let next = match &outcome {
            Ok(formula) => FormulaState::accepted(formula),
            Err(err) if err.is_calibration_error() => current.with_error(err.message()),
            Err(err) => {
                log_formula_error(err, "compute_formula");
                return Err(err.clone());
            }
        };

        store.save_formula_state(&next).inspect_err(|err| {
            log_formula_error(err, "save_formula_state");
        })?;
        *self.write_state()? = next.clone();

        // Sent under the submission lock so subscribers see saves in order.
        // No subscribers is fine
        let _ = self.updates.send(FormulaUpdate {
            state: next,
            accepted: outcome.is_ok(),
        });
        drop(store);

        match outcome {
            Ok(formula) => {
                let rendered = formula.render();
                info!("[Formula] Accepted formula {}", rendered);
                Ok(rendered)
            }
            Err(err) => {
                log_formula_error(&err, "compute_formula");
                Err(err)
            }
        }
    }

    /// Compute a formula using the unit and threshold from configuration
    pub fn compute_formula_with_config(
        &self,
        points: &CalibrationPointSet,
        config: &FormulaConfig,
    ) -> Result<String, FormulaError> {
        self.compute_formula(points, config.gravity_unit, config.max_deviation)
    }

    /// Fit and report per-point deviations without judging or storing anything
    ///
    /// Used to draw the calibration graph next to a rejected submission.
    pub fn preview(
        points: &CalibrationPointSet,
        unit: UnitModel,
    ) -> Result<FitReport, FormulaError> {
        let valid = points.valid_points_sg(unit);
        let formula = PolynomialFitter::fit(&valid)?;
        Ok(FitReport::evaluate(&formula, &valid))
    }

    fn fit_and_validate(
        points: &CalibrationPointSet,
        unit: UnitModel,
        max_deviation: f64,
    ) -> Result<Formula, FormulaError> {
        DeviationValidator::check_threshold(max_deviation)?;
        debug!(
            "[Formula] Fitting {} calibration points entered in {}",
            points.count(),
            unit
        );
        let valid = points.valid_points_sg(unit);
        let formula = PolynomialFitter::fit(&valid)?;
        DeviationValidator::validate(&formula, &valid, max_deviation)?;
        Ok(formula)
    }

    /// Last accepted formula, or an empty string if none was ever accepted
    pub fn current_formula(&self) -> Result<String, FormulaError> {
        Ok(self.read_state()?.formula.clone())
    }

    /// Message of the last rejected submission, empty after an accept
    pub fn last_error(&self) -> Result<String, FormulaError> {
        Ok(self.read_state()?.error.clone())
    }

    /// Snapshot of the stored state
    pub fn get_state(&self) -> Result<FormulaState, FormulaError> {
        let state_guard = self.read_state().inspect_err(|err| {
            log_formula_error(err, "get_formula_state");
        })?;
        Ok(state_guard.clone())
    }

    /// Replace the stored state, e.g. when restoring a configuration backup
    ///
    /// # Errors
    /// - Lock poisoning or persistence failure
    pub fn restore_state(&self, state: FormulaState) -> Result<(), FormulaError> {
        let store = self.lock_store()?;
        store.save_formula_state(&state).inspect_err(|err| {
            log_formula_error(err, "restore_formula_state");
        })?;
        *self.write_state()? = state;
        Ok(())
    }

    /// Convert a tilt angle to specific gravity with the stored formula
    ///
    /// # Returns
    /// * `Ok(Some(sg))` - Stored formula evaluated at `angle`
    /// * `Ok(None)` - No formula stored, or the stored one is not in canonical form
    pub fn gravity_at(&self, angle: f64) -> Result<Option<f64>, FormulaError> {
        let state = self.read_state()?;
        match state.parsed_formula() {
            Ok(formula) => Ok(formula.map(|f| f.gravity_at(angle))),
            Err(err) => {
                warn!("[Formula] {}", err);
                Ok(None)
            }
        }
    }

    /// Subscribe to formula updates
    pub fn subscribe(&self) -> broadcast::Receiver<FormulaUpdate> {
        self.updates.subscribe()
    }

    // ========================================================================
    // HELPER METHODS - Lock management
    // ========================================================================

    /// Acquire the submission lock (also guards the store)
    fn lock_store(&self) -> Result<MutexGuard<'_, Box<dyn FormulaStore>>, FormulaError> {
        self.store.lock().map_err(|_| FormulaError::StatePoisoned)
    }

    /// Safely acquire read lock on formula state
    fn read_state(&self) -> Result<RwLockReadGuard<'_, FormulaState>, FormulaError> {
        self.state.read().map_err(|_| FormulaError::StatePoisoned)
    }

    /// Safely acquire write lock on formula state
    fn write_state(&self) -> Result<RwLockWriteGuard<'_, FormulaState>, FormulaError> {
        self.state.write().map_err(|_| FormulaError::StatePoisoned)
    }
}

impl Default for CalibrationService {
    fn default() -> Self {
        Self::new()
    }
}
