//! # Demo Clinic Day
//!
//! Four patients for Dr. Wilson, used when the runtime starts with an empty
//! queue.

use chrono::Duration;
use hb_queue::{NewQueueEntry, Priority, QueueApi, QueueStatus, Timestamp};
use tracing::{info, warn};

/// The demo patients, checked in relative to `now`.
pub fn demo_patients(now: Timestamp) -> Vec<NewQueueEntry> {
    vec![
        NewQueueEntry::new("P001", "Sarah Johnson", "9:00 AM", "Dr. Wilson")
            .with_status(QueueStatus::CheckedIn)
            .with_priority(Priority::High)
            .checked_in_at(now - Duration::minutes(10)),
        NewQueueEntry::new("P002", "John Smith", "9:30 AM", "Dr. Wilson")
            .with_status(QueueStatus::Waiting)
            .checked_in_at(now - Duration::minutes(20)),
        NewQueueEntry::new("P003", "Michael Chen", "10:00 AM", "Dr. Wilson"),
        NewQueueEntry::new("P004", "Emma Davis", "10:30 AM", "Dr. Wilson"),
    ]
}

/// Adds the demo patients. Returns how many were added.
pub fn seed_demo(queue: &impl QueueApi, now: Timestamp) -> usize {
    let mut added = 0;
    for patient in demo_patients(now) {
        let id = patient.id.clone();
        if queue.add_patient(patient).is_applied() {
            added += 1;
        } else {
            warn!(patient_id = %id, "Demo patient already queued");
        }
    }
    info!(added, "Demo queue seeded");
    added
}
