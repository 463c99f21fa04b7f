//! Ports layer for the queue subsystem.
//!
//! Defines the hexagonal architecture port traits:
//! - Inbound (Driving) ports: API exposed to pages and staff tools
//! - Outbound (Driven) ports: clock and randomness

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
