// FormulaState - the last accepted formula and the last error message
//
// This is the state the configuration API reports and the persistence
// collaborator stores. Both fields are plain strings so the stored form
// matches what the device exposes: an empty formula means "never
// calibrated", an empty error means the last submission was accepted.

use serde::{Deserialize, Serialize};

use crate::calibration::formula::{Formula, FormulaParseError};

/// Stored formula state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaState {
    /// Canonical formula string, empty when none was ever accepted
    #[serde(default)]
    pub formula: String,
    /// Message of the last failed submission, empty after an accept
    #[serde(default)]
    pub error: String,
}

impl FormulaState {
    /// State with no formula and no error
    pub fn new_default() -> Self {
        Self::default()
    }

    /// State after an accepted fit
    pub fn accepted(formula: &Formula) -> Self {
        Self {
            formula: formula.render(),
            error: String::new(),
        }
    }

    /// Whether a formula has been accepted
    pub fn has_formula(&self) -> bool {
        !self.formula.is_empty()
    }

    /// Record a failed submission, keeping the formula untouched
    pub fn with_error(&self, message: impl Into<String>) -> Self {
        Self {
            formula: self.formula.clone(),
            error: message.into(),
        }
    }

    /// Parse the stored formula
    ///
    /// # Returns
    /// * `Ok(None)` - No formula stored
    /// * `Ok(Some(Formula))` - Stored formula in canonical form
    /// * `Err(FormulaParseError)` - Stored string is not a canonical formula
    pub fn parsed_formula(&self) -> Result<Option<Formula>, FormulaParseError> {
        if !self.has_formula() {
            return Ok(None);
        }
        self.formula.parse().map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_default() {
        let state = FormulaState::new_default();
        assert!(!state.has_formula());
        assert!(state.error.is_empty());
        assert_eq!(state.parsed_formula(), Ok(None));
    }

    #[test]
    fn test_accepted_clears_error() {
        let formula = Formula::new(0.00000909, 0.00124545, 0.96445455);
        let state = FormulaState::accepted(&formula);
        assert_eq!(state.formula, "0.00000909*tilt^2+0.00124545*tilt+0.96445455");
        assert!(state.error.is_empty());
        assert_eq!(state.parsed_formula(), Ok(Some(formula)));
    }

    #[test]
    fn test_with_error_keeps_formula() {
        let state = FormulaState::accepted(&Formula::new(0.0, 0.001, 1.0));
        let failed = state.with_error("bad input");
        assert_eq!(failed.formula, state.formula);
        assert_eq!(failed.error, "bad input");
    }

    #[test]
    fn test_foreign_formula_does_not_parse() {
        let state = FormulaState {
            formula: "my-formula".to_string(),
            error: String::new(),
        };
        assert!(state.has_formula());
        assert!(state.parsed_formula().is_err());
    }

    #[test]
    fn test_json_defaults() {
        let state: FormulaState = serde_json::from_str("{}").unwrap();
        assert_eq!(state, FormulaState::default());

        let state: FormulaState =
            serde_json::from_str(r#"{"formula": "0.1*tilt^2+0.2*tilt+0.3"}"#).unwrap();
        assert!(state.has_formula());
        assert!(state.error.is_empty());
    }
}
