//! The store-cursor registry (C5, §3, §4.7): per-store replication
//! watermarks — role, server IP, last-upload/-download time, and
//! last-sync count. The download endpoint's loop-avoidance and
//! clock-skew handling (§4.5) read and advance this state; the upload
//! endpoint (§4.4) only advances the upload side.

mod cursor;
mod registry;

pub use cursor::StoreCursor;
pub use registry::{CursorError, CursorStore, InMemoryCursorStore};
