//! # Shared Bus - Queue Notification Channel
//!
//! In-process publish/subscribe bus carrying queue changes to pages,
//! staff dashboards and patient notification bells.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────────┐
//! │ QueueService │                    │ Patient / staff  │
//! │              │    broadcast()     │ views            │
//! │              │ ──────┐            │                  │
//! └──────────────┘       │            └──────────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe(filter)
//! ```
//!
//! Filters select by topic and by patient id, so a patient view can
//! subscribe to queue-wide updates plus its own notifications.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{EventFilter, EventTopic, QueueEvent};
pub use publisher::InMemoryEventBus;
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before it starts lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
