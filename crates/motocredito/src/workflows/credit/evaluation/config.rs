use serde::{Deserialize, Serialize};

/// Weights and thresholds of the client evaluation rubric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    pub documentary_weight: f64,
    pub bureau_weight: f64,
    pub income_weight: f64,
    pub approve_threshold: f64,
    pub conditional_threshold: f64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            documentary_weight: 0.40,
            bureau_weight: 0.40,
            income_weight: 0.20,
            approve_threshold: 80.0,
            conditional_threshold: 65.0,
        }
    }
}
