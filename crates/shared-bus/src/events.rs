//! # Queue Events
//!
//! Defines all event types that flow through the shared bus.

use serde::{Deserialize, Serialize};

/// All events that can be published to the event bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum QueueEvent {
    /// The queue changed; carries the stats of the new state.
    QueueUpdated {
        /// Queue revision after the change.
        revision: u64,
        /// Number of entries.
        total_patients: usize,
        /// Rounded mean wait in minutes.
        average_wait_time: u32,
        /// Number of high-priority entries.
        priority_patients: usize,
    },

    /// A patient is close enough to their turn to be notified.
    PatientDue {
        /// The patient to notify.
        patient_id: String,
        /// 1-based queue position.
        position: usize,
        /// Estimated minutes until called.
        wait_minutes: u32,
    },

    /// A patient left the queue.
    PatientRemoved {
        /// The removed patient.
        patient_id: String,
    },
}

impl QueueEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::QueueUpdated { .. } | Self::PatientRemoved { .. } => EventTopic::Queue,
            Self::PatientDue { .. } => EventTopic::Notification,
        }
    }

    /// The patient this event concerns, if it is patient-specific.
    #[must_use]
    pub fn patient_id(&self) -> Option<&str> {
        match self {
            Self::QueueUpdated { .. } => None,
            Self::PatientDue { patient_id, .. } | Self::PatientRemoved { patient_id } => {
                Some(patient_id)
            }
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Queue contents changed.
    Queue,
    /// Patient notifications.
    Notification,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Patients to include. Empty means all patients; queue-wide events
    /// always pass.
    pub patient_ids: Vec<String>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            patient_ids: Vec::new(),
        }
    }

    /// Create a filter for one patient's view: queue-wide events plus
    /// events about that patient.
    #[must_use]
    pub fn for_patient(patient_id: impl Into<String>) -> Self {
        Self {
            topics: Vec::new(),
            patient_ids: vec![patient_id.into()],
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &QueueEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let patient_match = self.patient_ids.is_empty()
            || event
                .patient_id()
                .map_or(true, |id| self.patient_ids.iter().any(|p| p == id));

        topic_match && patient_match
    }
}
