//! A resource model driven by the test.
//!
//! Every computation the [`ManualModel`] creates is a [`ManualAction`]
//! that never completes on its own. The test keeps a [`ManualControl`]
//! and decides when each one finishes.

use std::cell::RefCell;
use std::rc::Rc;

use weft_core::{Action, ResourceModel};

/// Which model entry point created a computation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    Communicate,
    Execute,
    Sleep,
}

#[derive(Debug)]
struct ManualState {
    origin: Origin,
    started: f64,
    finish_at: Option<f64>,
    cancelled: bool,
    suspended: bool,
    suspensions: u32,
}

/// A computation whose completion time is set from outside.
#[derive(Clone, Debug)]
pub struct ManualAction {
    state: Rc<RefCell<ManualState>>,
}

impl ManualAction {
    fn new(origin: Origin, started: f64) -> Self {
        Self {
            state: Rc::new(RefCell::new(ManualState {
                origin,
                started,
                finish_at: None,
                cancelled: false,
                suspended: false,
                suspensions: 0,
            })),
        }
    }

    /// Make it complete at `at`.
    pub fn complete_at(&self, at: f64) {
        self.state.borrow_mut().finish_at = Some(at);
    }

    pub fn origin(&self) -> Origin {
        self.state.borrow().origin
    }

    pub fn started(&self) -> f64 {
        self.state.borrow().started
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.borrow().cancelled
    }

    pub fn is_suspended(&self) -> bool {
        self.state.borrow().suspended
    }

    /// How many times it was suspended.
    pub fn suspensions(&self) -> u32 {
        self.state.borrow().suspensions
    }
}

impl Action for ManualAction {
    fn completion_time(&self) -> Option<f64> {
        let state = self.state.borrow();
        if state.cancelled || state.suspended {
            None
        } else {
            state.finish_at
        }
    }

    fn remaining(&self, now: f64) -> f64 {
        self.state
            .borrow()
            .finish_at
            .map_or(f64::INFINITY, |t| (t - now).max(0.0))
    }

    fn cancel(&mut self) {
        self.state.borrow_mut().cancelled = true;
    }

    fn suspend(&mut self, _now: f64) {
        let mut state = self.state.borrow_mut();
        state.suspended = true;
        state.suspensions += 1;
    }

    fn resume(&mut self, _now: f64) {
        self.state.borrow_mut().suspended = false;
    }
}

/// Test-side view of every computation a [`ManualModel`] created.
#[derive(Clone, Debug, Default)]
pub struct ManualControl {
    created: Rc<RefCell<Vec<ManualAction>>>,
}

impl ManualControl {
    /// The `index`-th computation created, in creation order.
    pub fn action(&self, index: usize) -> Option<ManualAction> {
        self.created.borrow().get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.created.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.created.borrow().is_empty()
    }
}

/// Resource model handing out [`ManualAction`]s.
#[derive(Debug, Default)]
pub struct ManualModel {
    control: ManualControl,
}

impl ManualModel {
    /// A model and the control to drive its computations.
    pub fn new() -> (Self, ManualControl) {
        let control = ManualControl::default();
        (
            Self {
                control: control.clone(),
            },
            control,
        )
    }

    fn create(&mut self, origin: Origin, now: f64) -> Box<dyn Action> {
        let action = ManualAction::new(origin, now);
        self.control.created.borrow_mut().push(action.clone());
        Box::new(action)
    }
}

impl ResourceModel for ManualModel {
    fn communicate(&mut self, now: f64, _size: u64) -> Box<dyn Action> {
        self.create(Origin::Communicate, now)
    }

    fn execute(&mut self, now: f64, _flops: f64) -> Box<dyn Action> {
        self.create(Origin::Execute, now)
    }

    fn sleep(&mut self, now: f64, _duration: f64) -> Box<dyn Action> {
        self.create(Origin::Sleep, now)
    }
}
