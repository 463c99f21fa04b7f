//! # Queue Service
//!
//! Thread-safe shell around `PatientQueue`. Owns the clock, the random
//! source, the listener registry and the background tasks.
//!
//! ## Notification Flow
//!
//! ```text
//! QueueApi call ──lock──→ PatientQueue mutation ──→ revision changed?
//!                                                        │ yes
//!                                   snapshot + due/removed diff (under lock)
//!                                                        │
//!                                     ──unlock──→ listeners, then bus events
//! ```
//!
//! The state lock is never held while listeners run, so a listener may call
//! back into the service. Dispatches from different threads can race once the
//! lock is released; each listener skips any snapshot whose revision is not
//! newer than the last one it received, so its final callback always carries
//! the latest state.

mod listeners;
mod simulator;

pub use listeners::{listener, Listener, ListenerHandle};

use crate::adapters::{NoOpPublisher, QueueEventPublisher};
use crate::domain::{
    MoveDirection, NewQueueEntry, PatientId, PatientQueue, Priority, QueueConfig, QueueEntry,
    QueueError, QueueOutcome, QueueSnapshot, QueueStats, QueueStatus, TickReport, Timestamp,
};
use crate::ports::{QueueApi, RandomSource, RngSource, SystemTimeSource, TimeSource};
use listeners::ListenerRegistry;
use parking_lot::Mutex;
use simulator::SimulatorTask;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Shared handle to the consultation queue.
///
/// Cloning is cheap; all clones operate on the same queue.
#[derive(Clone)]
pub struct QueueService {
    shared: Arc<Shared>,
}

struct Shared {
    state: Mutex<State>,
    listeners: ListenerRegistry,
    time: Arc<dyn TimeSource>,
    publisher: Arc<dyn QueueEventPublisher>,
    removal_delay: Duration,
    tick_interval: Duration,
    simulator: Mutex<Option<SimulatorTask>>,
}

struct State {
    queue: PatientQueue,
    random: Box<dyn RandomSource>,
    /// Ids seen by the last dispatch.
    present: HashSet<PatientId>,
    /// Ids already announced as due.
    due: HashSet<PatientId>,
    /// Completed entries awaiting removal when no runtime was available.
    deferred_removals: Vec<PatientId>,
}

/// Everything delivered after the lock is released.
struct Dispatch {
    snapshot: QueueSnapshot,
    due: Vec<(PatientId, usize, u32)>,
    removed: Vec<PatientId>,
}

impl State {
    fn prepare_dispatch(&mut self, now: Timestamp) -> Dispatch {
        let snapshot = self.queue.snapshot(now);
        let threshold = self.queue.config().notify_threshold_minutes;

        let current: HashSet<PatientId> = snapshot.entries.iter().map(|e| e.id.clone()).collect();
        let removed = self.present.difference(&current).cloned().collect();
        self.present = current;

        let mut due_now = HashSet::new();
        let mut due = Vec::new();
        for (index, entry) in snapshot.entries.iter().enumerate() {
            if entry.wait_time > threshold {
                continue;
            }
            if !self.due.contains(&entry.id) {
                due.push((entry.id.clone(), index + 1, entry.wait_time));
            }
            due_now.insert(entry.id.clone());
        }
        self.due = due_now;

        Dispatch {
            snapshot,
            due,
            removed,
        }
    }
}

impl Shared {
    /// Runs `operation` under the state lock and notifies if the queue
    /// revision changed.
    fn mutate<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut PatientQueue, &mut dyn RandomSource, Timestamp) -> Result<T, QueueError>,
    ) -> Result<T, QueueError> {
        let (result, dispatch) = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let now = self.time.now();
            let revision = state.queue.revision();
            let result = f(&mut state.queue, state.random.as_mut(), now);
            let dispatch =
                (state.queue.revision() != revision).then(|| state.prepare_dispatch(now));
            (result, dispatch)
        };

        match (&result, &dispatch) {
            (Err(error), _) => debug!(operation, %error, "Queue mutation not applied"),
            (Ok(_), Some(d)) => {
                debug!(operation, revision = d.snapshot.revision, "Queue mutation applied")
            }
            (Ok(_), None) => debug!(operation, "Queue unchanged"),
        }

        if let Some(dispatch) = dispatch {
            self.deliver(dispatch);
        }
        result
    }

    fn deliver(&self, dispatch: Dispatch) {
        let Dispatch {
            snapshot,
            due,
            removed,
        } = dispatch;

        self.listeners.notify(&snapshot);

        for id in &removed {
            self.publisher.publish_patient_removed(id);
        }
        self.publisher.publish_queue_updated(&snapshot);
        for (id, position, wait_minutes) in &due {
            debug!(patient_id = %id, position, wait_minutes, "Patient due");
            self.publisher.publish_patient_due(id, *position, *wait_minutes);
        }
    }

    /// Removes `id` after the removal delay if it is still completed by then.
    fn schedule_removal(self: &Arc<Self>, id: PatientId) {
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let shared = Arc::downgrade(self);
                let delay = self.removal_delay;
                debug!(patient_id = %id, delay_ms = delay.as_millis() as u64, "Removal scheduled");
                runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    if let Some(shared) = shared.upgrade() {
                        shared.finish_removal(&id);
                    }
                });
            }
            Err(_) => {
                warn!(patient_id = %id, "No Tokio runtime, removal deferred to next tick");
                self.state.lock().deferred_removals.push(id);
            }
        }
    }

    fn finish_removal(&self, id: &PatientId) {
        let result = self.mutate("remove_completed", |queue, random, now| {
            queue.remove_completed(id, random, now)
        });
        if result.is_ok() {
            info!(patient_id = %id, "Completed patient removed from queue");
        }
    }

    fn tick(self: &Arc<Self>) -> TickReport {
        let (report, dispatch) = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let now = self.time.now();

            for id in std::mem::take(&mut state.deferred_removals) {
                if let Err(error) = state.queue.remove_completed(&id, state.random.as_mut(), now) {
                    debug!(patient_id = %id, %error, "Deferred removal skipped");
                }
            }

            let report = state.queue.tick(state.random.as_mut(), now);
            (report, state.prepare_dispatch(now))
        };

        debug!(
            progressed = report.progressed,
            promoted = ?report.promoted,
            completed = ?report.completed,
            revision = dispatch.snapshot.revision,
            "Simulator tick"
        );

        if let Some(id) = &report.completed {
            self.schedule_removal(id.clone());
        }
        self.deliver(dispatch);
        report
    }

    fn snapshot(&self) -> QueueSnapshot {
        self.state.lock().queue.snapshot(self.time.now())
    }
}

impl QueueService {
    /// Creates a service with the system clock, an entropy-seeded random
    /// source and no event bus.
    pub fn new(config: QueueConfig) -> Self {
        Self::builder().config(config).build()
    }

    pub fn builder() -> QueueServiceBuilder {
        QueueServiceBuilder::default()
    }

    /// Copies the current state.
    pub fn snapshot(&self) -> QueueSnapshot {
        self.shared.snapshot()
    }

    /// Runs one simulator step and notifies once.
    ///
    /// Also removes completed entries whose delayed removal could not be
    /// scheduled on a runtime.
    pub fn tick(&self) -> TickReport {
        self.shared.tick()
    }

    pub fn listener_count(&self) -> usize {
        self.shared.listeners.len()
    }

    pub fn config(&self) -> QueueConfig {
        self.shared.state.lock().queue.config().clone()
    }
}

impl QueueApi for QueueService {
    fn subscribe(&self, listener: Listener) -> ListenerHandle {
        let (handle, slot, snapshot) = {
            let state = self.shared.state.lock();
            let (handle, slot) = self.shared.listeners.register(listener);
            (handle, slot, state.queue.snapshot(self.shared.time.now()))
        };
        debug!(
            listener_id = %handle.id(),
            revision = snapshot.revision,
            "Listener subscribed"
        );
        // A concurrent mutation may already have handed over a newer state.
        slot.deliver(&snapshot);
        handle
    }

    fn get_queue(&self) -> Vec<QueueEntry> {
        self.shared.state.lock().queue.entries().to_vec()
    }

    fn get_stats(&self) -> QueueStats {
        self.shared.state.lock().queue.stats()
    }

    fn update_patient_status(&self, id: &PatientId, status: QueueStatus) -> QueueOutcome {
        let result = self.shared.mutate("update_patient_status", |queue, random, now| {
            queue.update_status(id, status, random, now)
        });
        if let Ok(previous) = &result {
            debug!(patient_id = %id, from = %previous, to = %status, "Status updated");
            if status == QueueStatus::Completed {
                self.shared.schedule_removal(id.clone());
            }
        }
        QueueOutcome::from(&result)
    }

    fn move_patient(&self, id: &PatientId, direction: MoveDirection) -> QueueOutcome {
        let result = self.shared.mutate("move_patient", |queue, random, now| {
            queue.move_entry(id, direction, random, now)
        });
        QueueOutcome::from(&result)
    }

    fn set_priority(&self, id: &PatientId, priority: Priority) -> QueueOutcome {
        let result = self.shared.mutate("set_priority", |queue, random, now| {
            queue.set_priority(id, priority, random, now)
        });
        QueueOutcome::from(&result)
    }

    fn add_patient(&self, entry: NewQueueEntry) -> QueueOutcome {
        let id = entry.id.clone();
        let result = self
            .shared
            .mutate("add_patient", |queue, random, now| queue.add(entry, random, now));
        if result.is_ok() {
            info!(patient_id = %id, "Patient added to queue");
        }
        QueueOutcome::from(&result)
    }

    fn get_patient_position(&self, id: &PatientId) -> usize {
        self.shared.state.lock().queue.position(id)
    }

    fn should_notify_patient(&self, id: &PatientId) -> bool {
        self.shared.state.lock().queue.should_notify(id)
    }

    fn check_in(&self, id: &PatientId) -> QueueOutcome {
        let result = self
            .shared
            .mutate("check_in", |queue, random, now| queue.check_in(id, random, now));
        QueueOutcome::from(&result)
    }

    fn fast_track(&self, id: &PatientId) -> QueueOutcome {
        let result = self
            .shared
            .mutate("fast_track", |queue, random, now| queue.fast_track(id, random, now));
        if result.is_ok() {
            info!(patient_id = %id, "Patient fast-tracked");
        }
        QueueOutcome::from(&result)
    }

    fn call_next(&self) -> Option<PatientId> {
        let called = self
            .shared
            .mutate("call_next", |queue, random, now| Ok(queue.call_next(random, now)))
            .ok()
            .flatten();
        if let Some(id) = &called {
            info!(patient_id = %id, "Patient called to consultation");
        }
        called
    }

    fn remove_patient(&self, id: &PatientId) -> QueueOutcome {
        let result = self
            .shared
            .mutate("remove_patient", |queue, random, now| queue.remove(id, random, now));
        if result.is_ok() {
            info!(patient_id = %id, "Patient removed from queue");
        }
        QueueOutcome::from(&result)
    }

    fn entries_for_doctor(&self, doctor: &str) -> Vec<QueueEntry> {
        self.shared.state.lock().queue.entries_for_doctor(doctor)
    }

    fn destroy(&self) {
        let simulator_stopped = self.stop();
        let listeners_dropped = self.shared.listeners.clear();
        info!(simulator_stopped, listeners_dropped, "Queue service destroyed");
    }
}

/// Builder for `QueueService`.
#[derive(Default)]
pub struct QueueServiceBuilder {
    config: QueueConfig,
    time: Option<Arc<dyn TimeSource>>,
    random: Option<Box<dyn RandomSource>>,
    publisher: Option<Arc<dyn QueueEventPublisher>>,
}

impl QueueServiceBuilder {
    pub fn config(mut self, config: QueueConfig) -> Self {
        self.config = config;
        self
    }

    pub fn time_source(mut self, time: Arc<dyn TimeSource>) -> Self {
        self.time = Some(time);
        self
    }

    pub fn random_source(mut self, random: impl RandomSource + 'static) -> Self {
        self.random = Some(Box::new(random));
        self
    }

    pub fn publisher(mut self, publisher: Arc<dyn QueueEventPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn build(self) -> QueueService {
        let removal_delay = self.config.removal_delay();
        let tick_interval = self.config.tick_interval();
        let random = self
            .random
            .unwrap_or_else(|| Box::new(RngSource::from_entropy()));

        let shared = Shared {
            state: Mutex::new(State {
                queue: PatientQueue::new(self.config),
                random,
                present: HashSet::new(),
                due: HashSet::new(),
                deferred_removals: Vec::new(),
            }),
            listeners: ListenerRegistry::default(),
            time: self.time.unwrap_or_else(|| Arc::new(SystemTimeSource)),
            publisher: self.publisher.unwrap_or_else(|| Arc::new(NoOpPublisher)),
            removal_delay,
            tick_interval,
            simulator: Mutex::new(None),
        };

        QueueService {
            shared: Arc::new(shared),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::publisher::RecordingPublisher;
    use crate::ports::{FixedRandom, MockTimeSource};
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn start_time() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn service_with(publisher: Arc<RecordingPublisher>) -> QueueService {
        QueueService::builder()
            .config(QueueConfig::for_testing())
            .time_source(Arc::new(MockTimeSource::new(start_time())))
            .random_source(FixedRandom::zero())
            .publisher(publisher)
            .build()
    }

    fn service() -> QueueService {
        service_with(Arc::new(RecordingPublisher::new()))
    }

    fn patient(id: &str) -> NewQueueEntry {
        NewQueueEntry::new(id, format!("Patient {id}"), "9:00 AM", "Dr. Wilson")
            .with_status(QueueStatus::Waiting)
    }

    fn counter_listener(counter: &Arc<AtomicUsize>) -> Listener {
        let counter = Arc::clone(counter);
        listener(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn id(s: &str) -> PatientId {
        PatientId::new(s)
    }

    #[test]
    fn test_subscribe_replays_current_snapshot() {
        let service = service();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _handle = service.subscribe(listener(move |snapshot| {
            sink.lock().push(snapshot.len());
        }));

        // Called once, synchronously, even for an empty queue.
        assert_eq!(*seen.lock(), vec![0]);

        service.add_patient(patient("A"));
        assert_eq!(*seen.lock(), vec![0, 1]);
    }

    #[test]
    fn test_each_applied_mutation_notifies_once() {
        let service = service();
        let counter = Arc::new(AtomicUsize::new(0));
        let _handle = service.subscribe(counter_listener(&counter));

        service.add_patient(patient("A"));
        service.add_patient(patient("B"));
        service.move_patient(&id("B"), MoveDirection::Up);
        service.set_priority(&id("A"), Priority::High);
        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_misses_are_silent() {
        let service = service();
        service.add_patient(patient("A"));
        let counter = Arc::new(AtomicUsize::new(0));
        let _handle = service.subscribe(counter_listener(&counter));

        assert_eq!(
            service.update_patient_status(&id("Z"), QueueStatus::Completed),
            QueueOutcome::NotFound
        );
        assert_eq!(service.move_patient(&id("A"), MoveDirection::Up), QueueOutcome::Rejected);
        assert_eq!(service.add_patient(patient("A")), QueueOutcome::Rejected);
        assert_eq!(service.set_priority(&id("Z"), Priority::High), QueueOutcome::NotFound);
        assert_eq!(service.call_next(), Some(id("A")));
        assert_eq!(service.call_next(), None);

        // Replay plus the single successful call_next.
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_listener_can_reenter_service() {
        let service = service();
        let inner = service.clone();
        let totals = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&totals);
        let _handle = service.subscribe(listener(move |_| {
            sink.lock().push(inner.get_stats().total_patients);
        }));

        service.add_patient(patient("A"));
        assert_eq!(*totals.lock(), vec![0, 1]);
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let service = service();
        let counter = Arc::new(AtomicUsize::new(0));
        let handle = service.subscribe(counter_listener(&counter));

        assert!(handle.unsubscribe());
        service.add_patient(patient("A"));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(service.listener_count(), 0);
    }

    #[test]
    fn test_completed_without_runtime_is_removed_on_next_tick() {
        let service = service();
        service.add_patient(patient("A"));
        service.add_patient(patient("B"));

        service.update_patient_status(&id("A"), QueueStatus::Completed);
        assert_eq!(service.get_patient_position(&id("A")), 1);

        service.tick();
        assert_eq!(service.get_patient_position(&id("A")), 0);
        assert_eq!(service.get_patient_position(&id("B")), 1);
    }

    #[test]
    fn test_deferred_removal_skips_reactivated_entry() {
        let service = service();
        service.add_patient(patient("A"));

        service.update_patient_status(&id("A"), QueueStatus::Completed);
        service.update_patient_status(&id("A"), QueueStatus::Waiting);
        service.tick();
        assert_eq!(service.get_patient_position(&id("A")), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_entry_removed_after_delay() {
        let publisher = Arc::new(RecordingPublisher::new());
        let service = service_with(Arc::clone(&publisher));
        service.add_patient(patient("A"));
        service.add_patient(patient("B"));

        service.update_patient_status(&id("A"), QueueStatus::Completed);
        assert_eq!(service.get_queue().len(), 2);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(service.get_patient_position(&id("A")), 0);
        assert_eq!(service.get_queue().len(), 1);
        assert_eq!(*publisher.removed.lock(), vec![id("A")]);
    }

    #[test]
    fn test_patient_due_published_once_and_rearmed() {
        let publisher = Arc::new(RecordingPublisher::new());
        let service = service_with(Arc::clone(&publisher));

        // A waits 1 minute: due. B waits 15: not due.
        service.add_patient(patient("A"));
        service.add_patient(patient("B"));
        assert_eq!(*publisher.due.lock(), vec![(id("A"), 1, 1)]);

        // B moves to the front and becomes due; A drops out of the threshold.
        service.move_patient(&id("B"), MoveDirection::Up);
        assert_eq!(publisher.due.lock().last(), Some(&(id("B"), 1, 1)));

        // A is back in front: announced again.
        service.move_patient(&id("A"), MoveDirection::Up);
        assert_eq!(publisher.due.lock().last(), Some(&(id("A"), 1, 1)));
        assert_eq!(publisher.due.lock().len(), 3);
    }

    #[test]
    fn test_remove_patient_publishes_removal() {
        let publisher = Arc::new(RecordingPublisher::new());
        let service = service_with(Arc::clone(&publisher));
        service.add_patient(patient("A"));

        assert_eq!(service.remove_patient(&id("A")), QueueOutcome::Applied);
        assert_eq!(service.remove_patient(&id("A")), QueueOutcome::NotFound);
        assert_eq!(*publisher.removed.lock(), vec![id("A")]);
        assert_eq!(*publisher.updates.lock(), vec![1, 2]);
    }

    #[test]
    fn test_check_in_uses_injected_clock() {
        let service = service();
        service.add_patient(patient("A").with_status(QueueStatus::Scheduled));

        assert_eq!(service.check_in(&id("A")), QueueOutcome::Applied);
        let entry = service.get_queue().remove(0);
        assert_eq!(entry.status, QueueStatus::CheckedIn);
        assert_eq!(entry.check_in_time, Some(start_time()));
    }

    #[test]
    fn test_destroy_clears_listeners() {
        let service = service();
        let counter = Arc::new(AtomicUsize::new(0));
        let _handle = service.subscribe(counter_listener(&counter));

        service.destroy();
        service.add_patient(patient("A"));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(service.listener_count(), 0);
    }

    #[test]
    fn test_listeners_see_increasing_revisions_under_concurrent_writes() {
        use std::thread;

        let service = service();
        let writer = {
            let service = service.clone();
            thread::spawn(move || {
                for n in 0..200 {
                    service.add_patient(patient(&format!("W{n}")));
                }
            })
        };

        let mut logs = Vec::new();
        for _ in 0..50 {
            let log = Arc::new(Mutex::new(Vec::new()));
            let sink = Arc::clone(&log);
            let _handle = service.subscribe(listener(move |snapshot| {
                sink.lock().push(snapshot.revision);
            }));
            logs.push(log);
        }
        writer.join().unwrap();

        let current = service.snapshot().revision;
        assert_eq!(current, 200);
        for log in logs {
            let seen = log.lock();
            assert!(seen.windows(2).all(|pair| pair[0] < pair[1]), "{seen:?}");
            assert_eq!(seen.last(), Some(&current));
        }
    }
}
