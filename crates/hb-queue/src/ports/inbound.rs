//! # Inbound Port - QueueApi
//!
//! Primary driving port exposing the consultation queue to patient pages and
//! staff tools.
//!
//! ## Failure Semantics
//!
//! | Situation | Result |
//! |-----------|--------|
//! | Unknown patient id | `QueueOutcome::NotFound`, queue untouched, no notification |
//! | Duplicate id on add, move past either end | `QueueOutcome::Rejected` |
//! | Position of unknown id | `0` |
//! | Notify check of unknown id | `false` |

use crate::domain::{
    MoveDirection, NewQueueEntry, PatientId, Priority, QueueEntry, QueueOutcome, QueueStats,
    QueueStatus,
};
use crate::service::{Listener, ListenerHandle};

/// Primary API for the queue subsystem.
///
/// Every applied mutation recomputes wait times and then notifies each
/// listener exactly once with the new snapshot. Mutations that do not apply
/// notify nobody; callers are free to ignore the returned `QueueOutcome`.
///
/// # Example
///
/// ```rust,ignore
/// use hb_queue::{QueueApi, QueueStatus};
///
/// fn arrive(queue: &impl QueueApi, id: &PatientId) {
///     queue.check_in(id);
///     if queue.should_notify_patient(id) {
///         // patient is close to being called
///     }
///     queue.update_patient_status(id, QueueStatus::Completed);
/// }
/// ```
pub trait QueueApi: Send + Sync {
    /// Registers a listener and invokes it once, synchronously, with the
    /// current snapshot (even when the queue is empty).
    fn subscribe(&self, listener: Listener) -> ListenerHandle;

    /// Returns a copy of the entries in queue order.
    fn get_queue(&self) -> Vec<QueueEntry>;

    /// Returns aggregate statistics.
    fn get_stats(&self) -> QueueStats;

    /// Sets an entry's status.
    ///
    /// A `Completed` entry is removed after the configured delay unless its
    /// status changes again in the meantime.
    fn update_patient_status(&self, id: &PatientId, status: QueueStatus) -> QueueOutcome;

    /// Swaps an entry with its neighbour in `direction`.
    fn move_patient(&self, id: &PatientId, direction: MoveDirection) -> QueueOutcome;

    /// Sets an entry's priority. `High` moves the entry ahead of every
    /// non-high entry, keeping relative order within both groups.
    fn set_priority(&self, id: &PatientId, priority: Priority) -> QueueOutcome;

    /// Appends a new entry with an initial wait estimate.
    fn add_patient(&self, entry: NewQueueEntry) -> QueueOutcome;

    /// 1-based position, or 0 when absent.
    fn get_patient_position(&self, id: &PatientId) -> usize;

    /// True when the entry's wait is within the notification threshold.
    fn should_notify_patient(&self, id: &PatientId) -> bool;

    /// Marks an entry checked in now.
    fn check_in(&self, id: &PatientId) -> QueueOutcome;

    /// Raises an entry to high priority and moves it to the front.
    fn fast_track(&self, id: &PatientId) -> QueueOutcome;

    /// Promotes the next waiting or checked-in entry to consultation if the
    /// room is free. Returns the promoted id.
    fn call_next(&self) -> Option<PatientId>;

    /// Removes an entry immediately, whatever its status.
    fn remove_patient(&self, id: &PatientId) -> QueueOutcome;

    /// Entries assigned to `doctor`, in queue order.
    fn entries_for_doctor(&self, doctor: &str) -> Vec<QueueEntry>;

    /// Stops the simulator and drops every listener.
    fn destroy(&self);
}
