//! Queue error types.
//!
//! The service boundary maps these to `QueueOutcome`; they never escape as panics.

use super::entities::PatientId;
use thiserror::Error;

/// Queue error type.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum QueueError {
    /// No entry with this id is in the queue.
    #[error("Patient not found in queue: {0}")]
    PatientNotFound(PatientId),

    /// An entry with this id is already in the queue.
    #[error("Patient already queued: {0}")]
    DuplicatePatient(PatientId),

    /// The requested move would leave the queue bounds.
    #[error("Cannot move patient {id} {direction} from position {position}")]
    MoveOutOfBounds {
        id: PatientId,
        direction: &'static str,
        position: usize,
    },

    /// The entry is not in the state the operation requires.
    #[error("Patient {id} is {actual}, expected {expected}")]
    UnexpectedStatus {
        id: PatientId,
        expected: &'static str,
        actual: String,
    },

    /// A background task was requested outside a Tokio runtime.
    #[error("No Tokio runtime available to run {0}")]
    NoRuntime(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = QueueError::PatientNotFound(PatientId::new("P404"));
        assert_eq!(err.to_string(), "Patient not found in queue: P404");
    }

    #[test]
    fn test_move_out_of_bounds_display() {
        let err = QueueError::MoveOutOfBounds {
            id: PatientId::new("P001"),
            direction: "up",
            position: 1,
        };
        let msg = err.to_string();
        assert!(msg.contains("P001"));
        assert!(msg.contains("up"));
        assert!(msg.contains("position 1"));
    }

    #[test]
    fn test_no_runtime_display() {
        let err = QueueError::NoRuntime("queue simulator");
        assert!(err.to_string().contains("queue simulator"));
    }
}
