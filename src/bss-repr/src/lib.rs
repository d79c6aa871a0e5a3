//! Core data types for the change-log replication engine: the stable
//! identifier attached to every change-log entry, the normalized mutation
//! action, and the scalar values that make up a primary-key tuple.
//!
//! Domain business logic (quotation pricing, order status machines, and so
//! on) is out of scope here; this crate only carries the vocabulary the
//! replication engine itself needs.

mod action;
mod log_id;
mod scalar;

pub use action::{Action, UnknownAction};
pub use log_id::LogId;
pub use scalar::{parse_segment, value_matches, ParseError, ScalarType, ScalarValue};

/// Logical timestamp used throughout the engine: `UpdatedAt`, `SyncedAt`,
/// and the store-cursor watermarks are all this type.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
