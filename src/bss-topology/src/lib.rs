//! Normalizes the free-form role strings a store reports
//! ("central", "direct store", "alliance store", and their casing/spacing
//! variants) to a canonical [`Role`] and classifies participants as
//! central or branch.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical role of a replication participant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Central,
    DirectStore,
    AllianceStore,
    /// Anything that didn't match a known token passes through unchanged,
    /// per §4.10 ("unknown strings pass through unchanged").
    Other(String),
}

impl Role {
    /// Parses a raw role string, normalizing case and surrounding
    /// whitespace/punctuation before matching known tokens.
    pub fn normalize(raw: &str) -> Role {
        let folded = raw.trim().to_ascii_lowercase();
        let collapsed: String = folded.split_whitespace().collect::<Vec<_>>().join(" ");
        match collapsed.as_str() {
            "central" => Role::Central,
            "direct store" | "direct" | "direct-operated" | "direct branch" => Role::DirectStore,
            "alliance store" | "alliance" | "alliance franchise" | "alliance branch" => {
                Role::AllianceStore
            }
            _ => Role::Other(raw.to_string()),
        }
    }

    /// True for direct-operated and alliance-franchise stores.
    pub fn is_branch(&self) -> bool {
        matches!(self, Role::DirectStore | Role::AllianceStore)
    }

    pub fn is_central(&self) -> bool {
        matches!(self, Role::Central)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::Central => "central",
            Role::DirectStore => "direct store",
            Role::AllianceStore => "alliance store",
            Role::Other(s) => s.as_str(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_known_roles_case_insensitively() {
        assert_eq!(Role::normalize("CENTRAL"), Role::Central);
        assert_eq!(Role::normalize("Direct Store"), Role::DirectStore);
        assert_eq!(Role::normalize("  alliance   store "), Role::AllianceStore);
    }

    #[test]
    fn unknown_roles_pass_through_unchanged() {
        assert_eq!(
            Role::normalize("regional-hub"),
            Role::Other("regional-hub".to_string())
        );
    }

    #[test]
    fn branch_classification() {
        assert!(Role::DirectStore.is_branch());
        assert!(Role::AllianceStore.is_branch());
        assert!(!Role::Central.is_branch());
        assert!(!Role::Other("x".into()).is_branch());
    }
}
