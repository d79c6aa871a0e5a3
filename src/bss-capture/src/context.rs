use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A request-scoped suppression flag (§4.2, §5, §9).
///
/// This is deliberately *not* process-global or thread-local: the design
/// notes call out that concurrent HTTP handlers replicating for
/// different branches must not suppress each other's local domain
/// writes. Callers create one per replication-apply operation and thread
/// it explicitly through the applier instead.
#[derive(Clone, Default)]
pub struct CaptureContext {
    suppressed: Arc<AtomicBool>,
}

impl CaptureContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressed.load(Ordering::Acquire)
    }

    /// Suppresses capture until the returned guard is dropped. Scoped to
    /// a single apply (§4.2: "Suppression is scoped to a single
    /// replication apply operation") — not meant to be nested.
    pub fn suppress(&self) -> SuppressGuard<'_> {
        self.suppressed.store(true, Ordering::Release);
        SuppressGuard { ctx: self }
    }
}

/// Re-enables capture on drop, including on an early return or a panic
/// unwind — the spec requires capture re-enabled "even on exception"
/// (§4.4 step 7).
pub struct SuppressGuard<'a> {
    ctx: &'a CaptureContext,
}

impl Drop for SuppressGuard<'_> {
    fn drop(&mut self) {
        self.ctx.suppressed.store(false, Ordering::Release);
    }
}
