//! Registry configuration parameters.

use crate::error::ArenaError;

/// Configuration for an activity [`Registry`](crate::Registry).
///
/// Validated at construction; immutable afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Number of slots reserved up front. Default: 64.
    pub initial_capacity: usize,

    /// Maximum number of simultaneously live entries. Default: 1_048_576.
    ///
    /// Guards against runaway simulations that leak activities.
    /// Must be at least 1.
    pub max_live: u32,
}

impl RegistryConfig {
    /// Default number of pre-reserved slots.
    pub const DEFAULT_INITIAL_CAPACITY: usize = 64;

    /// Default live-entry cap.
    pub const DEFAULT_MAX_LIVE: u32 = 1 << 20;

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ArenaError> {
        if self.max_live == 0 {
            return Err(ArenaError::InvalidConfig {
                reason: "max_live must be at least 1".into(),
            });
        }
        Ok(())
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            initial_capacity: Self::DEFAULT_INITIAL_CAPACITY,
            max_live: Self::DEFAULT_MAX_LIVE,
        }
    }
}
