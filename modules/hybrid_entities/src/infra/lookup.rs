//! Lookup tables backing select fields with a `dataSource`

use crate::config::LookupEntry;
use crate::contract::FieldOption;
use crate::domain::form::OptionLookup;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Serves lookup tables declared in configuration
pub struct ConfigOptionLookup {
    tables: BTreeMap<String, Vec<LookupEntry>>,
}

impl ConfigOptionLookup {
    pub fn new(tables: BTreeMap<String, Vec<LookupEntry>>) -> Self {
        Self { tables }
    }
}

#[async_trait]
impl OptionLookup for ConfigOptionLookup {
    async fn fetch_options(&self, source: &str) -> anyhow::Result<Vec<FieldOption>> {
        let entries = self
            .tables
            .get(source)
            .ok_or_else(|| anyhow::anyhow!("unknown lookup table '{}'", source))?;

        Ok(entries
            .iter()
            .map(|entry| FieldOption {
                value: entry.value.clone(),
                label: entry.label.clone(),
            })
            .collect())
    }
}
