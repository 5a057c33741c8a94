//! Optional descriptive metadata per configuration.
//!
//! A configuration may appear here without any rule (valid for the detail
//! panel, unresolvable on the map) and vice versa.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Free-form descriptive fields of one configuration. Every field is
/// optional; the detail panel substitutes a placeholder for absent values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigDetails {
    pub config: String,
    #[serde(default)]
    pub structure_type: Option<String>,
    #[serde(default)]
    pub post_height: Option<String>,
    #[serde(default)]
    pub width: Option<String>,
    #[serde(default)]
    pub roof: Option<String>,
    #[serde(default)]
    pub facade: Option<String>,
    #[serde(default)]
    pub crossbeam: Option<String>,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub wind_rating: Option<String>,
    #[serde(default)]
    pub revision: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DetailTable {
    by_config: HashMap<String, ConfigDetails>,
}

#[derive(Debug, Error)]
pub enum DetailError {
    #[error("cannot parse detail table: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate details for config {config:?}")]
    DuplicateConfig { config: String },
}

impl DetailTable {
    /// An empty table is valid; details are an optional dataset.
    pub fn from_rows(rows: Vec<ConfigDetails>) -> Result<Self, DetailError> {
        let mut by_config = HashMap::with_capacity(rows.len());
        for row in rows {
            let config = row.config.clone();
            if by_config.insert(config.clone(), row).is_some() {
                return Err(DetailError::DuplicateConfig { config });
            }
        }
        Ok(Self { by_config })
    }

    pub fn from_json_str(text: &str) -> Result<Self, DetailError> {
        let rows: Vec<ConfigDetails> = serde_json::from_str(text)?;
        Self::from_rows(rows)
    }

    pub fn get(&self, config: &str) -> Option<&ConfigDetails> {
        self.by_config.get(config)
    }

    /// Configurations the table knows, in ascending order.
    pub fn configs(&self) -> Vec<&str> {
        let mut configs: Vec<&str> = self.by_config.keys().map(String::as_str).collect();
        configs.sort_unstable();
        configs
    }

    pub fn len(&self) -> usize {
        self.by_config.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_config.is_empty()
    }
}
