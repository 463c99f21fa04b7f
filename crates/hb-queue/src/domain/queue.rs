//! # Patient Queue - Ordered Entries and Wait-Time Recomputation
//!
//! The authoritative in-process list of queue entries.
//!
//! ## Invariants Enforced
//!
//! - Ids are unique (checked in `add()`)
//! - `wait_time` is a `u32`, so never negative; every applied mutation ends
//!   with `recalculate_wait_times()`
//! - The simulator and `call_next()` only promote when nobody is in
//!   consultation, so at most one entry is `InConsultation`
//! - Setting `High` priority is a stable partition: order within each group
//!   is preserved
//!
//! Every mutation takes the clock reading and the random source as
//! arguments; the queue itself owns neither.

use super::entities::{
    NewQueueEntry, PatientId, Priority, QueueConfig, QueueEntry, QueueStatus, Timestamp,
};
use super::errors::QueueError;
use super::services::{
    average_wait, count_high_priority, initial_wait_estimate, partition_high_priority,
    progress_step, recalculated_wait,
};
use super::value_objects::{position_in, MoveDirection, QueueSnapshot, QueueStats, TickReport};
use crate::ports::RandomSource;

/// Ordered consultation queue.
#[derive(Debug, Clone)]
pub struct PatientQueue {
    /// Configuration.
    config: QueueConfig,

    /// Entries in call order.
    entries: Vec<QueueEntry>,

    /// Incremented on every applied mutation.
    revision: u64,
}

impl PatientQueue {
    /// Creates a new empty queue.
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            entries: Vec::new(),
            revision: 0,
        }
    }

    /// Creates a queue with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(QueueConfig::default())
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Entries in queue order.
    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn get(&self, id: &PatientId) -> Option<&QueueEntry> {
        self.entries.iter().find(|e| &e.id == id)
    }

    pub fn contains(&self, id: &PatientId) -> bool {
        self.index_of(id).is_some()
    }

    fn index_of(&self, id: &PatientId) -> Option<usize> {
        self.entries.iter().position(|e| &e.id == id)
    }

    fn require_index(&self, id: &PatientId) -> Result<usize, QueueError> {
        self.index_of(id)
            .ok_or_else(|| QueueError::PatientNotFound(id.clone()))
    }

    /// 1-based position of an entry, or 0 if absent.
    pub fn position(&self, id: &PatientId) -> usize {
        position_in(&self.entries, id)
    }

    /// True if the entry is within the notification threshold; false if absent.
    pub fn should_notify(&self, id: &PatientId) -> bool {
        self.get(id)
            .is_some_and(|e| e.wait_time <= self.config.notify_threshold_minutes)
    }

    /// Number of non-completed entries.
    pub fn active_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_completed()).count()
    }

    pub fn in_consultation(&self) -> Option<&QueueEntry> {
        self.entries.iter().find(|e| e.is_in_consultation())
    }

    /// Entries assigned to `doctor`, in queue order.
    pub fn entries_for_doctor(&self, doctor: &str) -> Vec<QueueEntry> {
        self.entries
            .iter()
            .filter(|e| e.doctor == doctor)
            .cloned()
            .collect()
    }

    /// Computes aggregate statistics.
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            total_patients: self.entries.len(),
            average_wait_time: average_wait(&self.entries),
            priority_patients: count_high_priority(&self.entries),
            completed_today: self.config.completed_today_placeholder,
        }
    }

    /// Copies the current state.
    pub fn snapshot(&self, now: Timestamp) -> QueueSnapshot {
        QueueSnapshot {
            revision: self.revision,
            entries: self.entries.clone(),
            stats: self.stats(),
            taken_at: now,
        }
    }

    /// Appends a new entry with an initial wait estimate.
    ///
    /// # Errors
    /// - `DuplicatePatient` if the id is already queued
    pub fn add(
        &mut self,
        new: NewQueueEntry,
        random: &mut dyn RandomSource,
        now: Timestamp,
    ) -> Result<(), QueueError> {
        if self.contains(&new.id) {
            return Err(QueueError::DuplicatePatient(new.id));
        }

        let initial = initial_wait_estimate(&self.config, self.active_count(), random);
        self.entries.push(QueueEntry::from_new(new, initial, now));
        self.commit(random, now);
        Ok(())
    }

    /// Sets an entry's status and returns the previous one.
    ///
    /// Removal of `Completed` entries is the caller's responsibility
    /// (see `remove_completed`).
    pub fn update_status(
        &mut self,
        id: &PatientId,
        status: QueueStatus,
        random: &mut dyn RandomSource,
        now: Timestamp,
    ) -> Result<QueueStatus, QueueError> {
        let index = self.require_index(id)?;
        let previous = std::mem::replace(&mut self.entries[index].status, status);
        self.commit(random, now);
        Ok(previous)
    }

    /// Swaps an entry with its neighbour. Returns the new 1-based position.
    ///
    /// # Errors
    /// - `PatientNotFound` if absent
    /// - `MoveOutOfBounds` when moving the first entry up or the last down
    pub fn move_entry(
        &mut self,
        id: &PatientId,
        direction: MoveDirection,
        random: &mut dyn RandomSource,
        now: Timestamp,
    ) -> Result<usize, QueueError> {
        let index = self.require_index(id)?;
        let target = match direction {
            MoveDirection::Up => index.checked_sub(1),
            MoveDirection::Down => Some(index + 1).filter(|t| *t < self.entries.len()),
        };
        let Some(target) = target else {
            return Err(QueueError::MoveOutOfBounds {
                id: id.clone(),
                direction: direction.as_str(),
                position: index + 1,
            });
        };

        self.entries.swap(index, target);
        self.commit(random, now);
        Ok(target + 1)
    }

    /// Sets an entry's priority; `High` also moves it ahead of every
    /// non-high entry.
    pub fn set_priority(
        &mut self,
        id: &PatientId,
        priority: Priority,
        random: &mut dyn RandomSource,
        now: Timestamp,
    ) -> Result<(), QueueError> {
        let index = self.require_index(id)?;
        self.entries[index].priority = priority;
        if priority == Priority::High {
            partition_high_priority(&mut self.entries);
        }
        self.commit(random, now);
        Ok(())
    }

    /// Marks an entry checked in at `now`.
    pub fn check_in(
        &mut self,
        id: &PatientId,
        random: &mut dyn RandomSource,
        now: Timestamp,
    ) -> Result<(), QueueError> {
        let index = self.require_index(id)?;
        let entry = &mut self.entries[index];
        entry.status = QueueStatus::CheckedIn;
        entry.check_in_time = Some(now);
        self.commit(random, now);
        Ok(())
    }

    /// Raises an entry to `High` priority and moves it to the front.
    pub fn fast_track(
        &mut self,
        id: &PatientId,
        random: &mut dyn RandomSource,
        now: Timestamp,
    ) -> Result<(), QueueError> {
        let index = self.require_index(id)?;
        let mut entry = self.entries.remove(index);
        entry.priority = Priority::High;
        self.entries.insert(0, entry);
        self.commit(random, now);
        Ok(())
    }

    /// Promotes the first waiting or checked-in entry to consultation.
    ///
    /// Returns `None` without changing anything if someone is already in
    /// consultation or nobody is waiting.
    pub fn call_next(
        &mut self,
        random: &mut dyn RandomSource,
        now: Timestamp,
    ) -> Option<PatientId> {
        if self.in_consultation().is_some() {
            return None;
        }
        let entry = self.entries.iter_mut().find(|e| e.status.is_progressing())?;
        entry.status = QueueStatus::InConsultation;
        let id = entry.id.clone();
        self.commit(random, now);
        Some(id)
    }

    /// Removes an entry regardless of status.
    pub fn remove(
        &mut self,
        id: &PatientId,
        random: &mut dyn RandomSource,
        now: Timestamp,
    ) -> Result<QueueEntry, QueueError> {
        let index = self.require_index(id)?;
        let entry = self.entries.remove(index);
        self.commit(random, now);
        Ok(entry)
    }

    /// Removes an entry only if it is still `Completed`.
    ///
    /// # Errors
    /// - `PatientNotFound` if already gone
    /// - `UnexpectedStatus` if the entry was re-activated in the meantime
    pub fn remove_completed(
        &mut self,
        id: &PatientId,
        random: &mut dyn RandomSource,
        now: Timestamp,
    ) -> Result<QueueEntry, QueueError> {
        let index = self.require_index(id)?;
        let status = self.entries[index].status;
        if status != QueueStatus::Completed {
            return Err(QueueError::UnexpectedStatus {
                id: id.clone(),
                expected: "completed",
                actual: status.to_string(),
            });
        }
        self.remove(id, random, now)
    }

    /// Runs one simulator step and recomputes wait times.
    ///
    /// 1. Progressing entries lose a random 1-3 minutes (floored at 0)
    /// 2. Maybe promote the first waiting entry within the promotion threshold
    /// 3. Maybe complete the current consultation
    ///
    /// Completed entries are reported, not removed.
    pub fn tick(&mut self, random: &mut dyn RandomSource, now: Timestamp) -> TickReport {
        let mut report = TickReport::default();

        for index in 0..self.entries.len() {
            if !self.entries[index].status.is_progressing() {
                continue;
            }
            let step = progress_step(&self.config, random);
            let entry = &mut self.entries[index];
            entry.set_wait_time(entry.wait_time.saturating_sub(step), now);
            report.progressed += 1;
        }

        if random.chance(self.config.promotion_probability) && self.in_consultation().is_none() {
            let threshold = self.config.promotion_threshold_minutes;
            if let Some(entry) = self
                .entries
                .iter_mut()
                .find(|e| e.status == QueueStatus::Waiting && e.wait_time <= threshold)
            {
                entry.status = QueueStatus::InConsultation;
                report.promoted = Some(entry.id.clone());
            }
        }

        if random.chance(self.config.completion_probability) {
            if let Some(entry) = self.entries.iter_mut().find(|e| e.is_in_consultation()) {
                entry.status = QueueStatus::Completed;
                report.completed = Some(entry.id.clone());
            }
        }

        self.commit(random, now);
        report
    }

    /// Recomputes every non-completed entry's wait time from its position.
    ///
    /// `InConsultation` entries wait 0; others wait one consultation per
    /// occupied slot ahead of them, plus jitter, and at least the minimum.
    pub fn recalculate_wait_times(&mut self, random: &mut dyn RandomSource, now: Timestamp) {
        let mut ahead = 0usize;
        for index in 0..self.entries.len() {
            let status = self.entries[index].status;
            match status {
                QueueStatus::Completed => {}
                QueueStatus::InConsultation => self.entries[index].wait_time = 0,
                _ => {
                    let wait = recalculated_wait(&self.config, ahead, random);
                    self.entries[index].set_wait_time(wait, now);
                }
            }
            if status.occupies_slot() {
                ahead += 1;
            }
        }
    }

    fn commit(&mut self, random: &mut dyn RandomSource, now: Timestamp) {
        self.recalculate_wait_times(random, now);
        self.revision += 1;
    }
}
