use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::Timestamp;

/// Scalar types the entity catalog can declare for a primary-key column.
///
/// This is deliberately small: the replication engine never needs to know
/// anything about a column beyond how to parse it out of a `RecordId`
/// segment and how it round-trips through JSON.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    String,
    Integer,
    Uuid,
    Timestamp,
    /// An enum carried by name; any ASCII identifier is accepted, the
    /// catalog itself is responsible for validating membership if it
    /// cares to.
    EnumName,
}

/// A parsed primary-key segment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    String(String),
    Integer(i64),
    Uuid(Uuid),
    Timestamp(Timestamp),
    EnumName(String),
}

impl ScalarValue {
    /// Renders the value the way it appears inside a comma-joined
    /// `RecordId`: never quoted, never containing a literal comma.
    pub fn to_record_segment(&self) -> String {
        match self {
            ScalarValue::String(s) => s.clone(),
            ScalarValue::Integer(i) => i.to_string(),
            ScalarValue::Uuid(u) => u.to_string(),
            ScalarValue::Timestamp(t) => t.to_rfc3339(),
            ScalarValue::EnumName(s) => s.clone(),
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_record_segment())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected {expected} key segment(s), found {found}")]
    ArityMismatch { expected: usize, found: usize },
    #[error("segment {index} ({value:?}) is not a valid {ty:?}")]
    BadSegment {
        index: usize,
        value: String,
        ty: ScalarType,
    },
}

/// Parses a single `RecordId` segment against a declared [`ScalarType`].
pub fn parse_segment(ty: ScalarType, index: usize, raw: &str) -> Result<ScalarValue, ParseError> {
    let bad = || ParseError::BadSegment {
        index,
        value: raw.to_string(),
        ty,
    };
    match ty {
        ScalarType::String => Ok(ScalarValue::String(raw.to_string())),
        ScalarType::Integer => raw.parse::<i64>().map(ScalarValue::Integer).map_err(|_| bad()),
        ScalarType::Uuid => raw.parse::<Uuid>().map(ScalarValue::Uuid).map_err(|_| bad()),
        ScalarType::Timestamp => chrono::DateTime::parse_from_rfc3339(raw)
            .map(|dt| ScalarValue::Timestamp(dt.with_timezone(&chrono::Utc)))
            .map_err(|_| bad()),
        ScalarType::EnumName => {
            if raw.is_empty() {
                Err(bad())
            } else {
                Ok(ScalarValue::EnumName(raw.to_string()))
            }
        }
    }
}

/// Whether a JSON payload value matches a catalog-declared scalar type
/// (the entity catalog's row deserializer). Unlike [`parse_segment`],
/// which parses a string `RecordId` segment, a row payload field already
/// carries a native JSON type — an `Integer` column is a JSON number,
/// never a numeric string.
pub fn value_matches(ty: ScalarType, value: &Value) -> bool {
    match ty {
        ScalarType::String => value.is_string(),
        ScalarType::Integer => value.is_i64() || value.is_u64(),
        ScalarType::Uuid => value.as_str().is_some_and(|s| s.parse::<Uuid>().is_ok()),
        ScalarType::Timestamp => value
            .as_str()
            .is_some_and(|s| chrono::DateTime::parse_from_rfc3339(s).is_ok()),
        ScalarType::EnumName => value.as_str().is_some_and(|s| !s.is_empty()),
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Every integer segment a catalog could ever produce via
        /// `EntityCatalog::format_key` parses back to the same value
        /// (§4.1's `parseKey`/`serialize` round-trip).
        #[test]
        fn integer_segment_round_trips(n: i64) {
            let segment = ScalarValue::Integer(n).to_record_segment();
            prop_assert_eq!(parse_segment(ScalarType::Integer, 0, &segment), Ok(ScalarValue::Integer(n)));
        }

        /// A string segment free of commas round-trips through the
        /// comma-joined `RecordId` encoding untouched.
        #[test]
        fn string_segment_round_trips(s in "[a-zA-Z0-9_-]{0,32}") {
            let segment = ScalarValue::String(s.clone()).to_record_segment();
            prop_assert_eq!(parse_segment(ScalarType::String, 0, &segment), Ok(ScalarValue::String(s)));
        }

        /// A uuid segment round-trips regardless of which v4 id is drawn.
        #[test]
        fn uuid_segment_round_trips(bytes: [u8; 16]) {
            let uuid = Uuid::from_bytes(bytes);
            let segment = ScalarValue::Uuid(uuid).to_record_segment();
            prop_assert_eq!(parse_segment(ScalarType::Uuid, 0, &segment), Ok(ScalarValue::Uuid(uuid)));
        }
    }
}
