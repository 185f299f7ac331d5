//! Shortlist state structure and set operations

use serde::{Deserialize, Serialize};

use crate::services::UnitCatalog;

/// A catalog unit a shortlisted ID resolves to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub floor: Option<u32>,
    #[serde(default)]
    pub price: Option<u64>,
}

/// Shortlisted unit IDs plus the records they resolve to.
///
/// IDs are unique and kept in insertion order for display. Every ID has at
/// most one entry in `items`; IDs the catalog does not know have none.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortlistState {
    pub unit_ids: Vec<String>,
    pub items: Vec<UnitRecord>,
}

impl ShortlistState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, unit_id: &str) -> bool {
        self.unit_ids.iter().any(|id| id == unit_id)
    }

    pub fn len(&self) -> usize {
        self.unit_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unit_ids.is_empty()
    }

    /// IDs in lexicographic order
    pub fn sorted_ids(&self) -> Vec<String> {
        let mut ids = self.unit_ids.clone();
        ids.sort();
        ids
    }

    /// Insert an ID, resolving its record. Returns whether the set changed.
    ///
    /// Blank IDs never name a unit and are ignored.
    pub(crate) fn insert(&mut self, unit_id: &str, catalog: Option<&dyn UnitCatalog>) -> bool {
        if unit_id.trim().is_empty() || self.contains(unit_id) {
            return false;
        }
        self.unit_ids.push(unit_id.to_string());
        if let Some(record) = catalog.and_then(|catalog| catalog.resolve(unit_id)) {
            self.items.push(record);
        }
        true
    }

    /// Remove an ID and its record. Returns whether the set changed.
    pub(crate) fn remove(&mut self, unit_id: &str) -> bool {
        let before = self.unit_ids.len();
        self.unit_ids.retain(|id| id != unit_id);
        if self.unit_ids.len() == before {
            return false;
        }
        self.items.retain(|item| item.id != unit_id);
        true
    }

    pub(crate) fn clear(&mut self) {
        self.unit_ids.clear();
        self.items.clear();
    }
}
