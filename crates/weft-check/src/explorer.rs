//! Stateless depth-first exploration of interleavings.
//!
//! The kernel cannot be snapshotted, so every execution starts over from
//! a freshly built kernel, replays the current choice prefix, and then
//! extends it greedily with the first enabled transition until a
//! terminal state. Backtracking advances the deepest choice that still
//! has untried alternatives.
//!
//! ```text
//! depth 0   [1/0, 2/0]        ← next = 1
//! depth 1   [2/0, 3/0]        ← next = 0
//! depth 2   [3/0]             ← exhausted, popped on backtrack
//! ```
//!
//! Alternatives at each depth are the kernel's enabled transitions,
//! ordered by actor id then value. Two executions that fire the same
//! prefix must see the same alternatives; a mismatch is reported as
//! [`CheckError::Divergence`].

use tracing::{debug, info, warn};
use weft_core::ActorId;
use weft_kernel::{ConfigError, Kernel};
use weft_replay::{RecordTrace, Transition};

use crate::config::ExplorationConfig;
use crate::error::CheckError;

/// How an exploration ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Every interleaving was explored; no deadlock, every terminal
    /// state satisfied the property.
    Exhausted,
    /// An execution reached a state where live actors remain but no
    /// transition is enabled.
    Deadlock {
        /// Reproducer.
        trace: RecordTrace,
        /// Actors still alive at the deadlock, in id order.
        blocked: Vec<ActorId>,
    },
    /// The property failed on a terminal state.
    PropertyViolation {
        /// Reproducer.
        trace: RecordTrace,
        /// The property's message.
        message: String,
    },
    /// Exploration finished, but some executions were cut at
    /// `max_depth`.
    DepthLimit {
        /// The first cut execution.
        trace: RecordTrace,
    },
    /// `max_executions` ran out before the search space did.
    ExecutionLimit,
}

impl Outcome {
    /// Whether a deadlock or a property violation was found.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Deadlock { .. } | Self::PropertyViolation { .. })
    }

    /// The reproducer, when the outcome has one.
    pub fn trace(&self) -> Option<&RecordTrace> {
        match self {
            Self::Deadlock { trace, .. }
            | Self::PropertyViolation { trace, .. }
            | Self::DepthLimit { trace } => Some(trace),
            Self::Exhausted | Self::ExecutionLimit => None,
        }
    }
}

/// Statistics and outcome of one exploration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report {
    /// How it ended.
    pub outcome: Outcome,
    /// Executions run.
    pub executions: usize,
    /// Executions that reached a terminal state.
    pub terminal_states: usize,
    /// Longest execution, in fired transitions.
    pub max_depth: usize,
}

/// One depth of the search stack: the alternatives seen there and the
/// one currently explored.
#[derive(Debug)]
struct Frame {
    choices: Vec<Transition>,
    next: usize,
}

impl Frame {
    fn current(&self) -> Transition {
        self.choices[self.next]
    }
}

/// What one execution ended in.
enum Leaf {
    Terminal,
    Cut,
    Failure(Outcome),
}

/// Depth-first interleaving explorer.
#[derive(Clone, Debug, Default)]
pub struct Explorer {
    config: ExplorationConfig,
}

impl Explorer {
    /// Build an explorer with validated budgets.
    pub fn new(config: ExplorationConfig) -> Result<Self, CheckError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The budgets in use.
    pub fn config(&self) -> &ExplorationConfig {
        &self.config
    }

    /// Explore every interleaving of the system `factory` builds, looking
    /// for deadlocks only.
    pub fn explore_deadlocks<F>(&self, factory: F) -> Result<Report, CheckError>
    where
        F: FnMut() -> Result<Kernel, ConfigError>,
    {
        self.explore(factory, |_: &Kernel| Ok(()))
    }

    /// Explore every interleaving of the system `factory` builds.
    ///
    /// `factory` must build the same system each time, under verifier
    /// control. `property` is checked on every terminal state in which
    /// all actors exited; returning `Err(message)` stops the search with
    /// [`Outcome::PropertyViolation`].
    ///
    /// # Errors
    ///
    /// Fails when the factory does, when a kernel halts, or when
    /// re-execution diverges from an earlier run.
    pub fn explore<F, P>(&self, mut factory: F, mut property: P) -> Result<Report, CheckError>
    where
        F: FnMut() -> Result<Kernel, ConfigError>,
        P: FnMut(&Kernel) -> Result<(), String>,
    {
        let mut stack: Vec<Frame> = Vec::new();
        let mut report = Report {
            outcome: Outcome::Exhausted,
            executions: 0,
            terminal_states: 0,
            max_depth: 0,
        };
        let mut first_cut: Option<RecordTrace> = None;
        info!(
            max_depth = self.config.max_depth,
            max_executions = self.config.max_executions,
            "exploration started"
        );

        loop {
            if report.executions == self.config.max_executions {
                info!(executions = report.executions, "execution budget spent");
                report.outcome = Outcome::ExecutionLimit;
                return Ok(report);
            }
            report.executions += 1;

            let mut kernel = fresh_kernel(&mut factory)?;
            replay_prefix(&mut kernel, &stack)?;
            let leaf = self.extend(&mut kernel, &mut stack, &mut property)?;
            report.max_depth = report.max_depth.max(stack.len());
            debug!(execution = report.executions, depth = stack.len(), "execution done");

            match leaf {
                Leaf::Terminal => report.terminal_states += 1,
                Leaf::Cut => {
                    if first_cut.is_none() {
                        first_cut = Some(kernel.record_trace());
                    }
                }
                Leaf::Failure(outcome) => {
                    warn!(
                        execution = report.executions,
                        path = %outcome.trace().map(RecordTrace::to_path_string).unwrap_or_default(),
                        "exploration found a failure"
                    );
                    report.outcome = outcome;
                    return Ok(report);
                }
            }

            if !backtrack(&mut stack) {
                break;
            }
        }

        report.outcome = match first_cut {
            Some(trace) => Outcome::DepthLimit { trace },
            None => Outcome::Exhausted,
        };
        info!(
            executions = report.executions,
            terminal_states = report.terminal_states,
            "exploration finished"
        );
        Ok(report)
    }

    /// Fire first-choice transitions from the end of the prefix until a
    /// terminal state, a failure or the depth bound.
    fn extend<P>(
        &self,
        kernel: &mut Kernel,
        stack: &mut Vec<Frame>,
        property: &mut P,
    ) -> Result<Leaf, CheckError>
    where
        P: FnMut(&Kernel) -> Result<(), String>,
    {
        loop {
            let choices = kernel.enabled_transitions();
            if choices.is_empty() {
                return Ok(judge(kernel, property));
            }
            if stack.len() >= self.config.max_depth {
                return Ok(Leaf::Cut);
            }
            let frame = Frame { choices, next: 0 };
            let t = frame.current();
            stack.push(frame);
            kernel.fire(t.actor, t.value)?;
        }
    }
}

fn fresh_kernel<F>(factory: &mut F) -> Result<Kernel, CheckError>
where
    F: FnMut() -> Result<Kernel, ConfigError>,
{
    let mut kernel = factory()?;
    if !kernel.config().control.is_verifier() {
        return Err(CheckError::NotVerifier);
    }
    kernel.wait_for_requests()?;
    Ok(kernel)
}

fn replay_prefix(kernel: &mut Kernel, stack: &[Frame]) -> Result<(), CheckError> {
    for (step, frame) in stack.iter().enumerate() {
        let transition = frame.current();
        if kernel.enabled_transitions() != frame.choices {
            return Err(CheckError::Divergence { step, transition });
        }
        kernel.fire(transition.actor, transition.value)?;
    }
    Ok(())
}

/// Classify a state with no enabled transition.
fn judge<P>(kernel: &Kernel, property: &mut P) -> Leaf
where
    P: FnMut(&Kernel) -> Result<(), String>,
{
    let blocked = kernel.live_actors();
    if !blocked.is_empty() {
        return Leaf::Failure(Outcome::Deadlock {
            trace: kernel.record_trace(),
            blocked,
        });
    }
    match property(kernel) {
        Ok(()) => Leaf::Terminal,
        Err(message) => Leaf::Failure(Outcome::PropertyViolation {
            trace: kernel.record_trace(),
            message,
        }),
    }
}

/// Advance the deepest frame with an untried alternative, dropping
/// exhausted ones. False once the whole tree is explored.
fn backtrack(stack: &mut Vec<Frame>) -> bool {
    while let Some(top) = stack.last_mut() {
        top.next += 1;
        if top.next < top.choices.len() {
            return true;
        }
        stack.pop();
    }
    false
}
