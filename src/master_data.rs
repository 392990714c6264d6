use std::collections::HashMap;

use itertools::Itertools;
use strsim::jaro_winkler;

use crate::error::SdqcError;

/// Kind of master-data-backed dimension the Pre-Validator checks against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterDataKind {
    Item,
    Warehouse,
    Workstation,
}

impl MasterDataKind {
    pub fn concept_name(self) -> &'static str {
        match self {
            MasterDataKind::Item => "ITEM_NO",
            MasterDataKind::Warehouse => "WAREHOUSE",
            MasterDataKind::Workstation => "WORKSTATION",
        }
    }

    fn to_error(self, value: String, suggestions: Vec<String>) -> SdqcError {
        match self {
            MasterDataKind::Item => SdqcError::ItemNotFound { value, suggestions },
            MasterDataKind::Warehouse => SdqcError::WarehouseNotFound { value, suggestions },
            MasterDataKind::Workstation => SdqcError::WorkstationNotFound { value, suggestions },
        }
    }
}

/// In-memory reference data for items/warehouses/workstations, loaded
/// unconditionally from local files.
#[derive(Debug, Clone, Default)]
pub struct MasterDataStore {
    items: Vec<String>,
    warehouses: Vec<String>,
    workstations: Vec<String>,
}

const MAX_SUGGESTIONS: usize = 5;

impl MasterDataStore {
    pub fn new(items: Vec<String>, warehouses: Vec<String>, workstations: Vec<String>) -> Self {
        MasterDataStore { items, warehouses, workstations }
    }

    pub fn load(dir: impl AsRef<std::path::Path>) -> crate::error::Result<Self> {
        let dir = dir.as_ref();
        let load_list = |name: &str| -> crate::error::Result<Vec<String>> {
            let path = dir.join(name);
            if !path.exists() {
                return Ok(Vec::new());
            }
            let content = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&content)?)
        };
        Ok(MasterDataStore {
            items: load_list("items.json")?,
            warehouses: load_list("warehouses.json")?,
            workstations: load_list("workstations.json")?,
        })
    }

    fn values_for(&self, kind: MasterDataKind) -> &[String] {
        match kind {
            MasterDataKind::Item => &self.items,
            MasterDataKind::Warehouse => &self.warehouses,
            MasterDataKind::Workstation => &self.workstations,
        }
    }

    pub fn contains(&self, kind: MasterDataKind, value: &str) -> bool {
        self.values_for(kind).iter().any(|v| v.eq_ignore_ascii_case(value))
    }

    /// Up to `MAX_SUGGESTIONS` fuzzy candidates, generated without a network
    /// round-trip: substring match first, then Jaro-Winkler similarity.
    pub fn suggestions(&self, kind: MasterDataKind, value: &str) -> Vec<String> {
        let needle = value.to_ascii_lowercase();
        self.values_for(kind)
            .iter()
            .map(|candidate| {
                let hay = candidate.to_ascii_lowercase();
                let substring_bonus = if hay.contains(&needle) || needle.contains(&hay) { 1.0 } else { 0.0 };
                let score = substring_bonus + jaro_winkler(&needle, &hay);
                (candidate.clone(), score)
            })
            .unique_by(|(candidate, _)| candidate.to_ascii_lowercase())
            .sorted_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal))
            .take(MAX_SUGGESTIONS)
            .map(|(c, _)| c)
            .collect()
    }

    /// Validates a value against the appropriate store, returning the
    /// closed `{ITEM,WAREHOUSE,WORKSTATION}_NOT_FOUND` error with fuzzy
    /// suggestions on miss.
    pub fn validate(&self, kind: MasterDataKind, value: &str) -> crate::error::Result<()> {
        if self.contains(kind, value) {
            return Ok(());
        }
        Err(kind.to_error(value.to_string(), self.suggestions(kind, value)))
    }
}

/// Maps a Concept name to the MasterDataKind it is backed by, if any.
pub fn kind_for_concept(concept: &str) -> Option<MasterDataKind> {
    match concept {
        "ITEM_NO" => Some(MasterDataKind::Item),
        "WAREHOUSE" => Some(MasterDataKind::Warehouse),
        "WORKSTATION" => Some(MasterDataKind::Workstation),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_warehouse_yields_bounded_fuzzy_suggestions() {
        let store = MasterDataStore::new(
            Vec::new(),
            vec!["W01".to_string(), "W02".to_string(), "W0A".to_string(), "WAA".to_string()],
            Vec::new(),
        );
        let err = store.validate(MasterDataKind::Warehouse, "w0x").unwrap_err();
        match err {
            SdqcError::WarehouseNotFound { suggestions, .. } => {
                assert!(suggestions.len() <= 5);
            }
            _ => panic!("expected WarehouseNotFound"),
        }
    }

    #[test]
    fn case_insensitive_exact_match_passes() {
        let store = MasterDataStore::new(vec!["10-0012".to_string()], Vec::new(), Vec::new());
        assert!(store.validate(MasterDataKind::Item, "10-0012").is_ok());
    }
}
