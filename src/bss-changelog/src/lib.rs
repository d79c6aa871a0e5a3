//! The append-only change log (C3, §3, §4.3): the entry type, its
//! `(SyncedAt, UpdatedAt, LogId)` read ordering, and the LogId-based
//! dedup/idempotency contract that lets upload and download both treat a
//! repeated `LogId` as a no-op rather than a duplicate.

mod entry;
mod store;

pub use entry::ChangeEntry;
pub use store::{ChangeLogError, ChangeLogStore, InMemoryChangeLog};
