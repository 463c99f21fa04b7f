//! Background simulator task.
//!
//! Ticks the queue on a fixed interval until stopped. The task holds only a
//! weak reference to the service, so dropping every `QueueService` handle
//! also ends it.

use super::{QueueService, Shared};
use crate::domain::QueueError;
use std::sync::Weak;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

pub(crate) struct SimulatorTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl SimulatorTask {
    fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl QueueService {
    /// Starts the periodic simulator on the current Tokio runtime.
    ///
    /// Starting an already running simulator does nothing.
    ///
    /// # Errors
    /// - `NoRuntime` when called outside a Tokio runtime
    pub fn start(&self) -> Result<(), QueueError> {
        let runtime =
            Handle::try_current().map_err(|_| QueueError::NoRuntime("the queue simulator"))?;

        let mut slot = self.shared.simulator.lock();
        if slot.as_ref().is_some_and(SimulatorTask::is_running) {
            debug!("Simulator already running");
            return Ok(());
        }

        let period = self.shared.tick_interval.max(Duration::from_millis(1));
        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = runtime.spawn(run_simulator(
            std::sync::Arc::downgrade(&self.shared),
            period,
            shutdown_rx,
        ));
        *slot = Some(SimulatorTask { shutdown, handle });

        info!(interval_ms = period.as_millis() as u64, "Queue simulator started");
        Ok(())
    }

    /// Stops the simulator. Returns false if it was not running.
    pub fn stop(&self) -> bool {
        let Some(task) = self.shared.simulator.lock().take() else {
            return false;
        };
        let was_running = task.is_running();
        if task.shutdown.send(true).is_err() {
            debug!("Simulator already exited");
        }
        if was_running {
            info!("Queue simulator stopped");
        }
        was_running
    }

    pub fn is_running(&self) -> bool {
        self.shared
            .simulator
            .lock()
            .as_ref()
            .is_some_and(SimulatorTask::is_running)
    }
}

async fn run_simulator(shared: Weak<Shared>, period: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick completes immediately.
    interval.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = interval.tick() => {
                let Some(shared) = shared.upgrade() else {
                    break;
                };
                shared.tick();
            }
        }
    }

    debug!("Simulator loop exited");
}
