//! Resource-type -> IAM action catalog.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

const ACTION_CATALOG: &str = include_str!("../data/action_catalog.json");

/// Catalog record for one Terraform resource type.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    pub resource_type: String,
    /// The IAM service prefix the actions belong to.
    pub service: String,
    #[serde(default)]
    pub create: Vec<String>,
    #[serde(default)]
    pub read: Vec<String>,
    #[serde(default)]
    pub update: Vec<String>,
    #[serde(default)]
    pub delete: Vec<String>,
    /// ARN patterns the scopable actions can be restricted to.
    #[serde(default)]
    pub resource_arn_patterns: Vec<String>,
}

/// The embedded catalog, keyed by resource type.
pub struct ActionCatalog {
    entries: BTreeMap<String, CatalogEntry>,
}

static CATALOG: OnceLock<ActionCatalog> = OnceLock::new();

impl ActionCatalog {
    /// The process-wide catalog compiled into the binary.
    pub fn builtin() -> &'static ActionCatalog {
        CATALOG.get_or_init(|| {
            let records: Vec<CatalogEntry> = serde_json::from_str(ACTION_CATALOG)
                .expect("embedded action catalog must parse");
            let mut entries = BTreeMap::new();
            for record in records {
                let key = record.resource_type.clone();
                let previous = entries.insert(key.clone(), record);
                assert!(
                    previous.is_none(),
                    "duplicate catalog entry for resource type '{key}'"
                );
            }
            ActionCatalog { entries }
        })
    }

    /// Look up the catalog record for a Terraform resource type.
    pub fn lookup(&self, resource_type: &str) -> Option<&CatalogEntry> {
        self.entries.get(resource_type)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in resource-type order.
    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }
}
