//! # Desired-State Diff
//!
//! An update moves from `old` to `new` in three steps:
//!
//! | Step | Identifiers              | Keys                      | Call    |
//! |------|--------------------------|---------------------------|---------|
//! | 1    | in `old` only            | every `old` key           | untag   |
//! | 2    | in both                  | in `old` keys only        | untag   |
//! | 3    | every `new` identifier   | every `new` key           | tag     |
//!
//! The pairs of steps 1 and 2 never overlap the pairs of step 3: step 1
//! identifiers are not in `new`, and step 2 keys are not in `new`.

use std::collections::BTreeSet;

use awstags_core::DesiredState;
use awstags_lease::LeaseKey;

/// Every `(identifier, key)` pair a state declares, identifier-major.
pub fn lease_keys(state: &DesiredState) -> Vec<LeaseKey> {
    LeaseKey::product(&state.identifiers, state.tag_keys())
}

/// Difference between an old and a new [`DesiredState`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDiff {
    /// Keys declared in `old` but not in `new`.
    pub removed_keys: BTreeSet<String>,
    /// Identifiers declared in `old` but not in `new`.
    pub removed_identifiers: BTreeSet<String>,
    /// Identifiers declared in both.
    pub kept_identifiers: BTreeSet<String>,
    old_keys: BTreeSet<String>,
}

impl TagDiff {
    pub fn between(old: &DesiredState, new: &DesiredState) -> Self {
        let old_keys: BTreeSet<String> = old.tags.keys().cloned().collect();
        Self {
            removed_keys: old_keys
                .iter()
                .filter(|k| !new.tags.contains_key(*k))
                .cloned()
                .collect(),
            removed_identifiers: old.identifiers.difference(&new.identifiers).cloned().collect(),
            kept_identifiers: old.identifiers.intersection(&new.identifiers).cloned().collect(),
            old_keys,
        }
    }

    /// Pairs to strip from identifiers that are no longer declared.
    pub fn removed_identifier_leases(&self) -> Vec<LeaseKey> {
        LeaseKey::product(&self.removed_identifiers, &self.old_keys)
    }

    /// Pairs to strip from identifiers that stay declared.
    pub fn removed_key_leases(&self) -> Vec<LeaseKey> {
        LeaseKey::product(&self.kept_identifiers, &self.removed_keys)
    }

    /// Every pair the update removes.
    pub fn removal_leases(&self) -> Vec<LeaseKey> {
        let mut keys = self.removed_identifier_leases();
        keys.extend(self.removed_key_leases());
        keys
    }

    /// Whether the update removes nothing.
    pub fn is_additive(&self) -> bool {
        self.removed_identifiers.is_empty() && self.removed_keys.is_empty()
    }
}
