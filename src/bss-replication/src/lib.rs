//! The replication applier (C6, §4.6) and its photo-table special case
//! (§4.9). This is the one place the engine hardcodes a table name —
//! every other table is uniformly driven by the entity catalog (§4.1).
//!
//! The caller owns suppression: [`ReplicationEngine::apply`] expects
//! capture to already be suppressed on the [`bss_capture::CaptureContext`]
//! it's given (§4.4 step 3, §4.8 step d, §9).

mod engine;
mod merge;
mod outcome;
mod photo;

pub use engine::ReplicationEngine;
pub use outcome::ApplyOutcome;
pub use photo::PHOTO_TABLE;
