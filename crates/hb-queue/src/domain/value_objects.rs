//! Value objects for the consultation queue.
//!
//! Immutable types handed out to callers: stats, snapshots and operation outcomes.

use super::entities::{PatientId, QueueEntry, QueueStatus, Timestamp};
use super::errors::QueueError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Aggregate queue statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    /// Number of entries in the queue.
    pub total_patients: usize,
    /// Rounded mean wait time in minutes (0 for an empty queue).
    pub average_wait_time: u32,
    /// Number of high-priority entries.
    pub priority_patients: usize,
    /// Placeholder daily completion count.
    pub completed_today: usize,
}

/// Immutable copy of the queue handed to listeners.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSnapshot {
    /// Incremented on every applied mutation.
    pub revision: u64,
    /// Entries in queue order.
    pub entries: Vec<QueueEntry>,
    /// Stats computed at the same moment as `entries`.
    pub stats: QueueStats,
    /// When the snapshot was taken.
    pub taken_at: Timestamp,
}

impl QueueSnapshot {
    /// 1-based position of an entry, or 0 if absent.
    pub fn position_of(&self, id: &PatientId) -> usize {
        position_in(&self.entries, id)
    }

    pub fn get(&self, id: &PatientId) -> Option<&QueueEntry> {
        self.entries.iter().find(|e| &e.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Number of entries currently in consultation.
    pub fn in_consultation_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.status == QueueStatus::InConsultation)
            .count()
    }
}

/// 1-based position of `id` in `entries`, or 0 if absent.
pub(crate) fn position_in(entries: &[QueueEntry], id: &PatientId) -> usize {
    entries
        .iter()
        .position(|e| &e.id == id)
        .map_or(0, |index| index + 1)
}

/// Direction for `move_patient`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    /// Towards the front of the queue.
    Up,
    /// Towards the back of the queue.
    Down,
}

impl MoveDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

impl fmt::Display for MoveDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a public queue mutation.
///
/// Callers may ignore it: a miss never changes the queue and never notifies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueOutcome {
    /// The mutation was applied and listeners were notified.
    Applied,
    /// No entry with the given id exists.
    NotFound,
    /// The entry exists but the request could not be applied.
    Rejected,
}

impl QueueOutcome {
    pub fn is_applied(self) -> bool {
        self == Self::Applied
    }
}

impl<T> From<&Result<T, QueueError>> for QueueOutcome {
    fn from(result: &Result<T, QueueError>) -> Self {
        match result {
            Ok(_) => Self::Applied,
            Err(QueueError::PatientNotFound(_)) => Self::NotFound,
            Err(_) => Self::Rejected,
        }
    }
}

/// What a simulator tick changed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Entries whose wait time was decremented.
    pub progressed: usize,
    /// Entry promoted to consultation, if any.
    pub promoted: Option<PatientId>,
    /// Entry whose consultation was completed, if any.
    pub completed: Option<PatientId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::NewQueueEntry;
    use chrono::Utc;

    fn entry(id: &str) -> QueueEntry {
        QueueEntry::from_new(
            NewQueueEntry::new(id, "Patient", "9:00 AM", "Dr. Wilson"),
            15,
            Utc::now(),
        )
    }

    #[test]
    fn test_position_is_one_based() {
        let entries = vec![entry("A"), entry("B"), entry("C")];
        assert_eq!(position_in(&entries, &PatientId::new("A")), 1);
        assert_eq!(position_in(&entries, &PatientId::new("B")), 2);
        assert_eq!(position_in(&entries, &PatientId::new("unknown")), 0);
    }

    #[test]
    fn test_outcome_from_result() {
        let ok: Result<(), QueueError> = Ok(());
        let missing: Result<(), QueueError> = Err(QueueError::PatientNotFound("X".into()));
        let dup: Result<(), QueueError> = Err(QueueError::DuplicatePatient("X".into()));

        assert_eq!(QueueOutcome::from(&ok), QueueOutcome::Applied);
        assert_eq!(QueueOutcome::from(&missing), QueueOutcome::NotFound);
        assert_eq!(QueueOutcome::from(&dup), QueueOutcome::Rejected);
        assert!(QueueOutcome::Applied.is_applied());
        assert!(!QueueOutcome::NotFound.is_applied());
    }

    #[test]
    fn test_stats_serialize_camel_case() {
        let stats = QueueStats {
            total_patients: 4,
            average_wait_time: 35,
            priority_patients: 1,
            completed_today: 8,
        };
        let value = serde_json::to_value(stats).unwrap();
        assert_eq!(value["totalPatients"], 4);
        assert_eq!(value["averageWaitTime"], 35);
        assert_eq!(value["completedToday"], 8);
    }

    #[test]
    fn test_move_direction_display() {
        assert_eq!(MoveDirection::Up.to_string(), "up");
        assert_eq!(MoveDirection::Down.as_str(), "down");
    }
}
