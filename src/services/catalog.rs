//! Unit catalog lookups used to resolve shortlisted IDs into records

use std::collections::HashMap;

use crate::{error::CoreError, state::UnitRecord};

/// Resolves unit IDs to catalog records
pub trait UnitCatalog: Send + Sync + std::fmt::Debug {
    fn resolve(&self, unit_id: &str) -> Option<UnitRecord>;
}

/// Fixed in-memory catalog
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    units: HashMap<String, UnitRecord>,
}

impl StaticCatalog {
    pub fn new<I>(records: I) -> Self
    where
        I: IntoIterator<Item = UnitRecord>,
    {
        Self {
            units: records
                .into_iter()
                .map(|record| (record.id.clone(), record))
                .collect(),
        }
    }

    /// Parse a catalog from a JSON array of unit records
    pub fn from_json(raw: &str) -> Result<Self, CoreError> {
        let records: Vec<UnitRecord> = serde_json::from_str(raw)?;
        Ok(Self::new(records))
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl UnitCatalog for StaticCatalog {
    fn resolve(&self, unit_id: &str) -> Option<UnitRecord> {
        self.units.get(unit_id).cloned()
    }
}
