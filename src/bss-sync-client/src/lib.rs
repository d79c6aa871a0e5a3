//! The branch-side central-dispatch poller (C9, §4.8): a background task
//! that periodically pulls from central's download endpoint, applies
//! whatever single change comes back through the replication engine with
//! capture suppressed, advances the branch's own store cursor, and marks
//! locally-held central-origin rows as synced so they're never uploaded
//! back (§4.8 step e).
//!
//! Runs only on branch sites (§4.8 step 1); a central process never
//! constructs one of these.

mod client;
mod poller;

pub use client::{CentralClient, CentralClientError, DownloadQuery, ReqwestCentralClient};
pub use poller::{run_poll_cycle, run_poller, CycleOutcome, PollerConfig, CENTRAL_SOURCE_TAG};
