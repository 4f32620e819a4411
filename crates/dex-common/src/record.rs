//! Records flowing through an ingestion run.

use serde::{Deserialize, Serialize};

/// One item of the remote catalog listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    /// URL of the item's detail document
    #[serde(rename = "url", alias = "detailRef")]
    pub detail_ref: String,
}

/// A named base stat, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stat {
    pub name: String,
    pub value: i32,
}

impl Stat {
    pub fn new(name: impl Into<String>, value: i32) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Detail document for a single catalog item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDetail {
    /// Stable external identifier, used as the upsert key
    pub id: i64,
    pub name: String,
    pub height: i32,
    pub weight: i32,
    pub type_tags: Vec<String>,
    pub base_stats: Vec<Stat>,
}

/// Persistence-ready projection of an [`ItemDetail`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedRecord {
    pub id: i64,
    pub name: String,
    pub height: i32,
    pub weight: i32,
    /// Type tags joined with `,`
    pub types: String,
    pub stats: Vec<Stat>,
    /// Public path of the cached asset, derived from `id` only
    pub image_path: String,
}

/// An item that did not make it into the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedItem {
    pub name: String,
    pub reason: String,
}

/// Aggregate result of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    pub success_count: usize,
    pub failed_count: usize,
    pub failures: Vec<FailedItem>,
}

impl RunOutcome {
    pub fn record_success(&mut self) {
        self.success_count += 1;
    }

    pub fn record_failure(&mut self, name: impl Into<String>, reason: impl Into<String>) {
        self.failed_count += 1;
        self.failures.push(FailedItem {
            name: name.into(),
            reason: reason.into(),
        });
    }

    /// Number of tasks accounted for.
    pub fn total(&self) -> usize {
        self.success_count + self.failed_count
    }

    pub fn is_clean(&self) -> bool {
        self.failed_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_entry_wire_name() {
        let entry: CatalogEntry = serde_json::from_str(
            r#"{"name": "bulbasaur", "url": "https://pokeapi.co/api/v2/pokemon/1/"}"#,
        )
        .unwrap();
        assert_eq!(entry.name, "bulbasaur");
        assert_eq!(entry.detail_ref, "https://pokeapi.co/api/v2/pokemon/1/");
    }

    #[test]
    fn test_run_outcome_tally() {
        let mut outcome = RunOutcome::default();
        outcome.record_success();
        outcome.record_success();
        outcome.record_failure("ivysaur", "timeout");

        assert_eq!(outcome.success_count, 2);
        assert_eq!(outcome.failed_count, 1);
        assert_eq!(outcome.total(), 3);
        assert!(!outcome.is_clean());
        assert_eq!(outcome.failures[0].name, "ivysaur");
    }
}
