//! Event publisher adapter for the queue subsystem.
//!
//! Publishes queue events to the shared bus for staff dashboards and patient
//! notification channels.

use crate::domain::{PatientId, QueueSnapshot};
use shared_bus::{InMemoryEventBus, QueueEvent};
use std::sync::Arc;

/// Event publisher trait for the queue.
///
/// Every method returns the number of receivers the event reached.
pub trait QueueEventPublisher: Send + Sync {
    /// Publishes the stats of a new queue state.
    fn publish_queue_updated(&self, snapshot: &QueueSnapshot) -> usize;

    /// Publishes that a patient is within the notification threshold.
    fn publish_patient_due(&self, id: &PatientId, position: usize, wait_minutes: u32) -> usize;

    /// Publishes that a patient left the queue.
    fn publish_patient_removed(&self, id: &PatientId) -> usize;
}

/// No-op publisher for running without an event bus.
#[derive(Debug, Clone, Default)]
pub struct NoOpPublisher;

impl QueueEventPublisher for NoOpPublisher {
    fn publish_queue_updated(&self, _snapshot: &QueueSnapshot) -> usize {
        0
    }

    fn publish_patient_due(&self, _id: &PatientId, _position: usize, _wait_minutes: u32) -> usize {
        0
    }

    fn publish_patient_removed(&self, _id: &PatientId) -> usize {
        0
    }
}

/// Publisher backed by the in-memory shared bus.
#[derive(Clone)]
pub struct BusPublisher {
    bus: Arc<InMemoryEventBus>,
}

impl BusPublisher {
    pub fn new(bus: Arc<InMemoryEventBus>) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &Arc<InMemoryEventBus> {
        &self.bus
    }
}

impl QueueEventPublisher for BusPublisher {
    fn publish_queue_updated(&self, snapshot: &QueueSnapshot) -> usize {
        self.bus.broadcast(QueueEvent::QueueUpdated {
            revision: snapshot.revision,
            total_patients: snapshot.stats.total_patients,
            average_wait_time: snapshot.stats.average_wait_time,
            priority_patients: snapshot.stats.priority_patients,
        })
    }

    fn publish_patient_due(&self, id: &PatientId, position: usize, wait_minutes: u32) -> usize {
        self.bus.broadcast(QueueEvent::PatientDue {
            patient_id: id.to_string(),
            position,
            wait_minutes,
        })
    }

    fn publish_patient_removed(&self, id: &PatientId) -> usize {
        self.bus.broadcast(QueueEvent::PatientRemoved {
            patient_id: id.to_string(),
        })
    }
}

/// Recording publisher for testing.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingPublisher {
    pub updates: parking_lot::Mutex<Vec<u64>>,
    pub due: parking_lot::Mutex<Vec<(PatientId, usize, u32)>>,
    pub removed: parking_lot::Mutex<Vec<PatientId>>,
}

#[cfg(test)]
impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl QueueEventPublisher for RecordingPublisher {
    fn publish_queue_updated(&self, snapshot: &QueueSnapshot) -> usize {
        self.updates.lock().push(snapshot.revision);
        1
    }

    fn publish_patient_due(&self, id: &PatientId, position: usize, wait_minutes: u32) -> usize {
        self.due.lock().push((id.clone(), position, wait_minutes));
        1
    }

    fn publish_patient_removed(&self, id: &PatientId) -> usize {
        self.removed.lock().push(id.clone());
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::QueueStats;
    use chrono::Utc;
    use shared_bus::EventFilter;

    fn snapshot() -> QueueSnapshot {
        QueueSnapshot {
            revision: 7,
            entries: Vec::new(),
            stats: QueueStats {
                total_patients: 3,
                average_wait_time: 12,
                priority_patients: 1,
                completed_today: 8,
            },
            taken_at: Utc::now(),
        }
    }

    #[test]
    fn test_noop_publisher() {
        let publisher = NoOpPublisher;
        assert_eq!(publisher.publish_queue_updated(&snapshot()), 0);
        assert_eq!(publisher.publish_patient_removed(&PatientId::new("P001")), 0);
    }

    #[test]
    fn test_bus_publisher_maps_snapshot_stats() {
        let bus = Arc::new(InMemoryEventBus::new());
        let mut sub = bus.subscribe(EventFilter::all());
        let publisher = BusPublisher::new(Arc::clone(&bus));

        assert_eq!(publisher.publish_queue_updated(&snapshot()), 1);
        assert_eq!(
            sub.try_recv(),
            Ok(Some(QueueEvent::QueueUpdated {
                revision: 7,
                total_patients: 3,
                average_wait_time: 12,
                priority_patients: 1,
            }))
        );
    }

    #[test]
    fn test_bus_publisher_patient_events() {
        let bus = Arc::new(InMemoryEventBus::new());
        let mut sub = bus.subscribe(EventFilter::for_patient("P002"));
        let publisher = BusPublisher::new(Arc::clone(&bus));

        publisher.publish_patient_due(&PatientId::new("P001"), 1, 4);
        publisher.publish_patient_due(&PatientId::new("P002"), 2, 9);
        publisher.publish_patient_removed(&PatientId::new("P002"));

        assert_eq!(
            sub.try_recv(),
            Ok(Some(QueueEvent::PatientDue {
                patient_id: "P002".to_string(),
                position: 2,
                wait_minutes: 9,
            }))
        );
        assert_eq!(
            sub.try_recv(),
            Ok(Some(QueueEvent::PatientRemoved {
                patient_id: "P002".to_string(),
            }))
        );
        assert_eq!(publisher.bus().events_published(), 3);
    }

    #[test]
    fn test_recording_publisher() {
        let publisher = RecordingPublisher::new();
        publisher.publish_queue_updated(&snapshot());
        publisher.publish_patient_removed(&PatientId::new("P004"));
        assert_eq!(*publisher.updates.lock(), vec![7]);
        assert_eq!(*publisher.removed.lock(), vec![PatientId::new("P004")]);
    }
}
