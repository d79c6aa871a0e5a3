use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Normalized mutation kind carried by a change-log entry.
///
/// Always stored and compared in upper case regardless of how the caller
/// spelled it; `INSERT`, `insert`, and `Insert` are the same action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Insert,
    Update,
    Upsert,
    Delete,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Insert => "INSERT",
            Action::Update => "UPDATE",
            Action::Upsert => "UPSERT",
            Action::Delete => "DELETE",
        }
    }

    /// `DELETE` never carries a payload; every other action does.
    pub fn carries_payload(self) -> bool {
        !matches!(self, Action::Delete)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognized action {0:?}, expected one of INSERT, UPDATE, UPSERT, DELETE")]
pub struct UnknownAction(String);

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INSERT" => Ok(Action::Insert),
            "UPDATE" => Ok(Action::Update),
            "UPSERT" => Ok(Action::Upsert),
            "DELETE" => Ok(Action::Delete),
            _ => Err(UnknownAction(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("insert".parse::<Action>().unwrap(), Action::Insert);
        assert_eq!("Update".parse::<Action>().unwrap(), Action::Update);
        assert_eq!("UPSERT".parse::<Action>().unwrap(), Action::Upsert);
        assert_eq!("delete".parse::<Action>().unwrap(), Action::Delete);
    }

    #[test]
    fn rejects_unknown_actions() {
        assert!("merge".parse::<Action>().is_err());
    }

    #[test]
    fn only_delete_is_payload_free() {
        assert!(!Action::Delete.carries_payload());
        assert!(Action::Insert.carries_payload());
        assert!(Action::Update.carries_payload());
        assert!(Action::Upsert.carries_payload());
    }
}
