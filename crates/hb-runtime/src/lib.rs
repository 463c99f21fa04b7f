//! # Health Bridge Runtime
//!
//! Wires the consultation queue to the in-process event bus and runs the
//! queue simulator.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (defaults plus environment overrides)
//! 2. Create the event bus and the queue service publishing to it
//! 3. Start the bus event logger
//! 4. Seed the demo clinic day (if enabled)
//! 5. Start the simulator
//!
//! ```text
//! QueueService ──BusPublisher──→ InMemoryEventBus ──→ event logger
//!      ↑                                       └────→ other subscribers
//!  simulator tick
//! ```

pub mod config;
pub mod demo;

pub use config::{ConfigError, RuntimeConfig};

use anyhow::{Context, Result};
use hb_queue::{BusPublisher, QueueApi, QueueService, RngSource};
use shared_bus::{EventFilter, InMemoryEventBus, QueueEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::StreamExt;
use tracing::{debug, error, info};

/// The runtime owning the bus, the queue and the background tasks.
pub struct HealthBridgeRuntime {
    /// Bus the queue publishes to.
    bus: Arc<InMemoryEventBus>,
    /// The consultation queue.
    queue: QueueService,
    /// Seed the demo patients on start.
    seed_demo: bool,
    /// Set by the first `start`.
    started: AtomicBool,
    /// Shutdown signal sender.
    shutdown_tx: watch::Sender<bool>,
    /// Shutdown signal receiver.
    shutdown_rx: watch::Receiver<bool>,
}

impl HealthBridgeRuntime {
    /// Create a new runtime with configuration.
    pub fn new(config: RuntimeConfig) -> Self {
        info!("Creating Health Bridge runtime");

        let bus = Arc::new(InMemoryEventBus::new());
        let mut builder = QueueService::builder()
            .config(config.queue)
            .publisher(Arc::new(BusPublisher::new(Arc::clone(&bus))));
        if let Some(seed) = config.rng_seed {
            info!(seed, "Using seeded simulator");
            builder = builder.random_source(RngSource::seeded(seed));
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            bus,
            queue: builder.build(),
            seed_demo: config.seed_demo,
            started: AtomicBool::new(false),
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Start the runtime. Must be called from within a Tokio runtime.
    ///
    /// Only the first call has an effect.
    pub async fn start(&self) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            debug!("Runtime already started");
            return Ok(());
        }

        info!("===========================================");
        info!("  Health Bridge Queue v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        self.spawn_event_logger();

        if self.seed_demo {
            demo::seed_demo(&self.queue, chrono::Utc::now());
        }

        self.queue
            .start()
            .context("Failed to start queue simulator")?;

        let stats = self.queue.get_stats();
        info!(
            total_patients = stats.total_patients,
            average_wait_time = stats.average_wait_time,
            "Queue ready"
        );
        Ok(())
    }

    fn spawn_event_logger(&self) {
        let mut events = self.bus.event_stream(EventFilter::all());
        let mut shutdown = self.shutdown_rx.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = events.next() => match event {
                        Some(event) => log_event(&event),
                        None => break,
                    },
                    _ = shutdown.changed() => {
                        info!("Event logger shutdown signal received");
                        break;
                    }
                }
            }
        });
    }

    /// Shutdown the runtime: stop the simulator, drop listeners and signal
    /// background tasks.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");

        self.queue.destroy();

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }

        tokio::task::yield_now().await;
        info!(
            events_published = self.bus.events_published(),
            "Shutdown complete"
        );
    }

    /// The consultation queue.
    pub fn queue(&self) -> &QueueService {
        &self.queue
    }

    /// The event bus.
    pub fn bus(&self) -> Arc<InMemoryEventBus> {
        Arc::clone(&self.bus)
    }
}

fn log_event(event: &QueueEvent) {
    match event {
        QueueEvent::QueueUpdated {
            revision,
            total_patients,
            average_wait_time,
            priority_patients,
        } => info!(
            revision,
            total_patients,
            average_wait_time,
            priority_patients,
            "Queue updated"
        ),
        QueueEvent::PatientDue {
            patient_id,
            position,
            wait_minutes,
        } => info!(%patient_id, position, wait_minutes, "Patient due"),
        QueueEvent::PatientRemoved { patient_id } => {
            info!(%patient_id, "Patient left the queue")
        }
    }
}
