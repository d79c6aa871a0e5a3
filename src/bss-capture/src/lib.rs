//! The change-capture hook (C4, §4.2): intercepts local row writes and
//! synthesizes change-log entries, with a request-scoped suppression
//! context that replication applies use to avoid re-capturing their own
//! writes (§8's "no amplification" invariant).

mod capturing_row_store;
mod context;
mod hook;

pub use capturing_row_store::{CapturingRowStore, CapturingRowStoreError};
pub use context::{CaptureContext, SuppressGuard};
pub use hook::{CaptureError, CaptureHook, ChangeLogCaptureHook, SiteIdentity};
