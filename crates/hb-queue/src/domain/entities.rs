//! Core domain entities for the consultation queue.
//!
//! Defines the entry lifecycle, priority classes and queue configuration.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Wall-clock timestamp used for check-in and estimated-call times.
pub type Timestamp = DateTime<Utc>;

/// Opaque patient identifier, unique within a queue.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientId(String);

impl PatientId {
    /// Creates a new patient identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PatientId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for PatientId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Lifecycle status of a queue entry.
///
/// ```text
/// [Scheduled] ──check-in──→ [CheckedIn] ──→ [Waiting] ──call──→ [InConsultation] ──→ [Completed]
///                                                                                         │
///                                                                     removed after delay ┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueueStatus {
    /// Booked but not yet arrived.
    #[default]
    Scheduled,
    /// Arrived at the clinic.
    CheckedIn,
    /// In the waiting room.
    Waiting,
    /// Currently with the doctor.
    InConsultation,
    /// Consultation finished; pending removal.
    Completed,
}

impl QueueStatus {
    /// Returns true if an entry in this status holds up the entries behind it.
    pub fn occupies_slot(self) -> bool {
        !matches!(self, Self::Completed | Self::Scheduled)
    }

    /// Returns true if the simulator advances entries in this status.
    pub fn is_progressing(self) -> bool {
        matches!(self, Self::Waiting | Self::CheckedIn)
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Scheduled => "scheduled",
            Self::CheckedIn => "checked-in",
            Self::Waiting => "waiting",
            Self::InConsultation => "in-consultation",
            Self::Completed => "completed",
        };
        f.write_str(label)
    }
}

/// Scheduling weight of an entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

/// One patient's position and status in the consultation queue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    /// Unique identifier within the queue.
    pub id: PatientId,
    /// Display name.
    pub name: String,
    /// Scheduled appointment time as shown to staff (e.g. `"9:30 AM"`).
    pub appointment_time: String,
    /// Assigned doctor.
    pub doctor: String,
    /// Current lifecycle status.
    pub status: QueueStatus,
    /// Priority class.
    pub priority: Priority,
    /// Estimated minutes until the patient is called.
    pub wait_time: u32,
    /// When the patient checked in, if they have.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_in_time: Option<Timestamp>,
    /// Estimated wall-clock time the patient will be called.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_call_time: Option<Timestamp>,
}

impl QueueEntry {
    /// Creates an entry from its underived fields with an initial wait estimate.
    pub fn from_new(new: NewQueueEntry, wait_time: u32, now: Timestamp) -> Self {
        Self {
            id: new.id,
            name: new.name,
            appointment_time: new.appointment_time,
            doctor: new.doctor,
            status: new.status,
            priority: new.priority,
            wait_time,
            check_in_time: new.check_in_time,
            estimated_call_time: Some(estimate_call_time(now, wait_time)),
        }
    }

    /// Sets the wait time and recomputes the estimated call time.
    pub fn set_wait_time(&mut self, minutes: u32, now: Timestamp) {
        self.wait_time = minutes;
        self.estimated_call_time = Some(estimate_call_time(now, minutes));
    }

    pub fn is_completed(&self) -> bool {
        self.status == QueueStatus::Completed
    }

    pub fn is_in_consultation(&self) -> bool {
        self.status == QueueStatus::InConsultation
    }

    pub fn is_high_priority(&self) -> bool {
        self.priority == Priority::High
    }
}

/// Computes `now + minutes`.
pub fn estimate_call_time(now: Timestamp, minutes: u32) -> Timestamp {
    now + ChronoDuration::minutes(i64::from(minutes))
}

/// A queue entry without its derived fields; the input to `add_patient`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQueueEntry {
    pub id: PatientId,
    pub name: String,
    pub appointment_time: String,
    pub doctor: String,
    #[serde(default)]
    pub status: QueueStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_in_time: Option<Timestamp>,
}

impl NewQueueEntry {
    /// Creates a scheduled, normal-priority entry.
    pub fn new(
        id: impl Into<PatientId>,
        name: impl Into<String>,
        appointment_time: impl Into<String>,
        doctor: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            appointment_time: appointment_time.into(),
            doctor: doctor.into(),
            status: QueueStatus::Scheduled,
            priority: Priority::Normal,
            check_in_time: None,
        }
    }

    pub fn with_status(mut self, status: QueueStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn checked_in_at(mut self, at: Timestamp) -> Self {
        self.check_in_time = Some(at);
        self
    }
}

/// Queue configuration.
///
/// Defaults reproduce the clinic's reference behaviour.
#[derive(Clone, Debug)]
pub struct QueueConfig {
    /// Average consultation length in minutes.
    pub consultation_minutes: u32,
    /// Upper bound (inclusive) of the jitter added on every recomputation.
    pub recalc_jitter_max: u32,
    /// Smallest wait estimate for an entry that is not being seen.
    pub min_wait_minutes: u32,
    /// Floor of the estimate given to newly added entries.
    pub initial_wait_floor: u32,
    /// Upper bound (inclusive) of the jitter added to new-entry estimates.
    pub initial_jitter_max: u32,
    /// Entries at or below this wait are due a notification.
    pub notify_threshold_minutes: u32,
    /// Waiting entries at or below this wait may be promoted by the simulator.
    pub promotion_threshold_minutes: u32,
    /// Minimum minutes the simulator takes off a progressing entry per tick.
    pub progress_min_minutes: u32,
    /// Maximum minutes the simulator takes off a progressing entry per tick.
    pub progress_max_minutes: u32,
    /// Per-tick probability of promoting a waiting entry.
    pub promotion_probability: f64,
    /// Per-tick probability of completing the current consultation.
    pub completion_probability: f64,
    /// Reported as `completed_today`; not a real daily count.
    pub completed_today_placeholder: usize,
    /// Delay before a completed entry is removed (milliseconds).
    pub removal_delay_ms: u64,
    /// Simulator tick period (milliseconds).
    pub tick_interval_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            consultation_minutes: 15,
            recalc_jitter_max: 9,
            min_wait_minutes: 1,
            initial_wait_floor: 15,
            initial_jitter_max: 19,
            notify_threshold_minutes: 10,
            promotion_threshold_minutes: 5,
            progress_min_minutes: 1,
            progress_max_minutes: 3,
            promotion_probability: 0.3,
            completion_probability: 0.2,
            completed_today_placeholder: 8,
            removal_delay_ms: 2_000, // 2 seconds
            tick_interval_ms: 30_000, // 30 seconds
        }
    }
}

impl QueueConfig {
    /// Creates a config with short timings for testing.
    pub fn for_testing() -> Self {
        Self {
            removal_delay_ms: 50,
            tick_interval_ms: 1_000,
            ..Default::default()
        }
    }

    pub fn removal_delay(&self) -> Duration {
        Duration::from_millis(self.removal_delay_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}
