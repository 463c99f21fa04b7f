//! # Consultation Queue Subsystem
//!
//! ## Purpose
//!
//! Holds the ordered list of patients waiting for a doctor, estimates each
//! patient's wait, and pushes a fresh snapshot to every listener whenever the
//! queue changes. A periodic simulator advances the queue (waits shrink,
//! patients are called in, consultations finish) for demos and dashboards.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Unique patient ids | `domain/queue.rs` - `add()` check |
//! | Wait times never negative | `u32` minutes, `saturating_sub` in `tick()` |
//! | Wait times recomputed after every mutation | `domain/queue.rs` - `commit()` |
//! | At most one patient in consultation (simulator) | `domain/queue.rs` - `tick()`, `call_next()` |
//! | High priority ahead of everyone else, stable | `domain/services.rs` - `partition_high_priority()` |
//! | Completed patients leave after a delay | `service/mod.rs` - `schedule_removal()` |
//!
//! ## Patient Lifecycle
//!
//! ```text
//! [scheduled] ──check_in──→ [checked-in] ──call_next──→ [in-consultation]
//!                                 │                            │
//!                           [waiting] ──promotion──────────────┘
//!                                                              │
//!                                                   completion ↓
//!                                                       [completed]
//!                                                              │
//!                                                  removal delay ↓
//!                                                         (removed)
//! ```
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      OUTER LAYER                                │
//! │  adapters/ - Event bus publisher                                │
//! │  service/  - QueueService: locking, listeners, background tasks │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      MIDDLE LAYER                               │
//! │  ports/inbound.rs  - QueueApi trait                             │
//! │  ports/outbound.rs - TimeSource, RandomSource traits            │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      INNER LAYER                                │
//! │  domain/entities.rs      - QueueEntry, QueueStatus, Priority    │
//! │  domain/queue.rs         - PatientQueue mutations and tick      │
//! │  domain/services.rs      - wait-time arithmetic                 │
//! │  domain/value_objects.rs - QueueStats, QueueSnapshot            │
//! │  domain/errors.rs        - QueueError enum                      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hb_queue::{listener, NewQueueEntry, QueueApi, QueueConfig, QueueService};
//!
//! let queue = QueueService::new(QueueConfig::default());
//! let handle = queue.subscribe(listener(|snapshot| {
//!     println!("{} patients waiting", snapshot.stats.total_patients);
//! }));
//! queue.add_patient(NewQueueEntry::new("P001", "Sarah Johnson", "9:00 AM", "Dr. Wilson"));
//! queue.start()?;
//! ```

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::*;
pub use domain::*;
pub use ports::*;
pub use service::{listener, Listener, ListenerHandle, QueueService, QueueServiceBuilder};
