use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Explicit refactoring mapping for one type name.
///
/// Legacy members that are neither renamed nor discarded map to the
/// current member of the same name, or are discarded if there is none.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyMemberMapping {
    /// Legacy member name → current member name.
    pub renames: HashMap<String, String>,
    /// Legacy members whose values are dropped.
    pub discards: HashSet<String>,
}

/// Where a legacy member's value goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MappedMember<'a> {
    Discarded,
    /// Explicitly renamed. The current member must exist.
    Renamed(&'a str),
    /// Matched by name, if the current type has such a member.
    SameName(&'a str),
}

impl LegacyMemberMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rename(mut self, legacy: impl Into<String>, current: impl Into<String>) -> Self {
        self.renames.insert(legacy.into(), current.into());
        self
    }

    pub fn discard(mut self, legacy: impl Into<String>) -> Self {
        self.discards.insert(legacy.into());
        self
    }

    pub fn resolve<'a>(&'a self, legacy: &'a str) -> MappedMember<'a> {
        if self.discards.contains(legacy) {
            MappedMember::Discarded
        } else if let Some(current) = self.renames.get(legacy) {
            MappedMember::Renamed(current)
        } else {
            MappedMember::SameName(legacy)
        }
    }
}
