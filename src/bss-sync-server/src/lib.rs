//! Central-side sync surface (§6.1): the upload endpoint (C7, §4.4), the
//! download endpoint (C8, §4.5), the manual-seed utility (C10, §4.11),
//! and the wire protocol types shared with the branch poller
//! (`bss-sync-client`).
//!
//! Each endpoint's algorithm lives in its own module as a plain async
//! function over [`AppState`], independent of axum's extractors, so the
//! §8 end-to-end scenarios can be exercised without spinning up HTTP.
//! `router` is the thin axum layer on top.

mod download;
mod manual_seed;
mod router;
mod state;
mod upload;
pub mod wire;

pub use download::handle_download;
pub use manual_seed::handle_manual_seed;
pub use router::build_router;
pub use state::AppState;
pub use upload::{handle_upload, UploadEnvelopeError};
