//! Exploration budgets.

use crate::error::CheckError;

/// Default bound on transitions fired in one execution.
pub const DEFAULT_MAX_DEPTH: usize = 1_000;
/// Default bound on executions (re-runs from the initial state).
pub const DEFAULT_MAX_EXECUTIONS: usize = 100_000;

/// Budgets for one exploration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExplorationConfig {
    /// Transitions fired per execution before the branch is cut.
    /// Default: 1000.
    pub max_depth: usize,
    /// Executions before the exploration gives up. Default: 100 000.
    pub max_executions: usize,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_executions: DEFAULT_MAX_EXECUTIONS,
        }
    }
}

impl ExplorationConfig {
    /// Check that both budgets are non-zero.
    pub fn validate(&self) -> Result<(), CheckError> {
        if self.max_depth == 0 {
            return Err(CheckError::ZeroBudget { field: "max_depth" });
        }
        if self.max_executions == 0 {
            return Err(CheckError::ZeroBudget {
                field: "max_executions",
            });
        }
        Ok(())
    }
}
