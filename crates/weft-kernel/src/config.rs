//! Kernel configuration, validation, and error types.
//!
//! [`KernelConfig`] is the input for constructing a [`Kernel`](crate::Kernel).
//! [`validate()`](KernelConfig::validate) checks structural invariants
//! before any state is allocated.

use std::error::Error;
use std::fmt;

use weft_arena::{ArenaError, RegistryConfig};

/// Default engine seed.
pub const DEFAULT_SEED: u64 = 0;

/// Default bound on the values one random draw may offer the verifier.
pub const DEFAULT_MAX_RANDOM_BRANCHING: u32 = 4096;

// ── ControlMode ────────────────────────────────────────────────────

/// Who drives scheduling choices and random draws.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ControlMode {
    /// The kernel services every request itself and advances the clock.
    #[default]
    Standalone,
    /// An external verifier fires visible requests and supplies random
    /// values. Computations complete instantly.
    Verifier,
    /// Standalone scheduling, with random draws served from a recorded log.
    /// Computations complete instantly, as under a verifier.
    Replay(Vec<i32>),
}

impl ControlMode {
    /// Whether an external verifier fires visible requests.
    pub fn is_verifier(&self) -> bool {
        matches!(self, Self::Verifier)
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`KernelConfig::validate()`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Registry configuration is invalid.
    Arena(ArenaError),
    /// `max_rounds` was set to zero.
    ZeroRoundLimit,
    /// `max_random_branching` was set to zero.
    ZeroRandomBranching,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Arena(e) => write!(f, "arena: {e}"),
            Self::ZeroRoundLimit => write!(f, "max_rounds must be at least 1"),
            Self::ZeroRandomBranching => write!(f, "max_random_branching must be at least 1"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Arena(e) => Some(e),
            Self::ZeroRoundLimit | Self::ZeroRandomBranching => None,
        }
    }
}

impl From<ArenaError> for ConfigError {
    fn from(e: ArenaError) -> Self {
        Self::Arena(e)
    }
}

// ── KernelConfig ───────────────────────────────────────────────────

/// Complete configuration for constructing a kernel.
#[derive(Clone, Debug, PartialEq)]
pub struct KernelConfig {
    /// Seed of the free-mode random engine. Default: 0.
    pub seed: u64,
    /// Scheduling control. Default: standalone.
    pub control: ControlMode,
    /// Report a communication wait as enabled whenever either side has a
    /// timeout, since the timeout guarantees the wait eventually returns.
    /// Default: true.
    pub timeouts_always_enabled: bool,
    /// Report semaphore acquisitions and condition waits as always
    /// enabled. When false they are reported disabled. Default: true.
    pub experimental_sync_enabled: bool,
    /// Upper bound on scheduling rounds; `None` is unbounded.
    pub max_rounds: Option<u64>,
    /// Most values a random draw may span under verifier control, where
    /// each value is a separate transition. Wider draws are a protocol
    /// violation. Default: [`DEFAULT_MAX_RANDOM_BRANCHING`].
    pub max_random_branching: u32,
    /// Activity registry sizing.
    pub registry: RegistryConfig,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            control: ControlMode::Standalone,
            timeouts_always_enabled: true,
            experimental_sync_enabled: true,
            max_rounds: None,
            max_random_branching: DEFAULT_MAX_RANDOM_BRANCHING,
            registry: RegistryConfig::default(),
        }
    }
}

impl KernelConfig {
    /// Default configuration with verifier control.
    pub fn verifier() -> Self {
        Self {
            control: ControlMode::Verifier,
            ..Self::default()
        }
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.registry.validate()?;
        if self.max_rounds == Some(0) {
            return Err(ConfigError::ZeroRoundLimit);
        }
        if self.max_random_branching == 0 {
            return Err(ConfigError::ZeroRandomBranching);
        }
        Ok(())
    }
}
