//! Activity lifecycle observers.

use weft_core::ActivityId;

use crate::activity::Activity;

/// Read-only hook into activity lifecycle events.
///
/// Observers see `&Activity` only and cannot influence scheduling.
/// Every method defaults to a no-op.
pub trait KernelObserver {
    /// The activity's backing computation was paused.
    fn on_suspended(&mut self, _id: ActivityId, _activity: &Activity) {}

    /// The activity's backing computation was resumed.
    fn on_resumed(&mut self, _id: ActivityId, _activity: &Activity) {}

    /// The activity reached a terminal state and its waiters were answered.
    fn on_finished(&mut self, _id: ActivityId, _activity: &Activity) {}

    /// The last owner released the activity; its slot is gone.
    fn on_destroyed(&mut self, _id: ActivityId) {}
}
