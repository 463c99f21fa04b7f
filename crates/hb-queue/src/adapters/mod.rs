//! Adapters layer for the queue subsystem.
//!
//! Provides event bus integration for dashboards and patient notifications.

pub mod publisher;

pub use publisher::{BusPublisher, NoOpPublisher, QueueEventPublisher};
