//! # Domain Layer - Consultation Queue
//!
//! Pure queue logic; no runtime, locking or I/O.
//!
//! ## Components
//!
//! - `entities`: QueueEntry, QueueStatus, Priority, QueueConfig
//! - `queue`: PatientQueue with mutations, wait-time recomputation and the simulator step
//! - `services`: wait-time arithmetic and the high-priority partition
//! - `value_objects`: QueueStats, QueueSnapshot, MoveDirection, QueueOutcome
//! - `errors`: QueueError enumeration

pub mod entities;
pub mod errors;
pub mod queue;
pub mod services;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use queue::*;
pub use services::*;
pub use value_objects::*;
