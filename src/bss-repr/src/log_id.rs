use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable, globally unique identifier for a change-log entry.
///
/// Whichever site originates a change allocates a fresh [`LogId`]. Once
/// assigned it is preserved verbatim across every transfer: central keeps a
/// branch's `LogId` and a branch keeps central's. This is the dedup anchor
/// the whole engine relies on to avoid re-ingesting its own writes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogId(Uuid);

impl LogId {
    /// Allocates a fresh id. Only the originating site should call this;
    /// everyone else preserves an id they received.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for LogId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LogId({})", self.0)
    }
}

impl FromStr for LogId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl From<Uuid> for LogId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// `LogId`'s `Ord` is exactly the wrapped uuid's `Ord` — the
        /// `(SyncedAt, UpdatedAt, LogId)` tie-break (§4.3) relies on this
        /// to give deterministic ordering even when two entries share
        /// both timestamps.
        #[test]
        fn ordering_matches_the_wrapped_uuid(a: [u8; 16], b: [u8; 16]) {
            let ua = Uuid::from_bytes(a);
            let ub = Uuid::from_bytes(b);
            prop_assert_eq!(LogId::from_uuid(ua).cmp(&LogId::from_uuid(ub)), ua.cmp(&ub));
        }

        /// Every uuid round-trips through `Display`/`FromStr` unchanged.
        #[test]
        fn string_round_trip_holds_for_any_uuid(bytes: [u8; 16]) {
            let id = LogId::from_uuid(Uuid::from_bytes(bytes));
            let parsed: LogId = id.to_string().parse().unwrap();
            prop_assert_eq!(id, parsed);
        }
    }
}
