//! Regulatory wind/snow zone assignments per region.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::region::RegionSet;

/// A region's regulatory zone pair, independent of any configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZonePair {
    /// Wind zone label, e.g. "2".
    pub wind: String,
    /// Snow zone label, e.g. "A".
    pub snow: String,
}

/// One input row of the zone table.
#[derive(Debug, Clone, Deserialize)]
pub struct ZoneRow {
    pub region: String,
    pub wind: String,
    pub snow: String,
}

/// Region code → zone pair. At most one assignment per region; regions
/// without an assignment stay resolvable as "missing zone", never dropped.
#[derive(Debug, Clone, Default)]
pub struct ZoneTable {
    by_region: HashMap<String, ZonePair>,
}

#[derive(Debug, Error)]
pub enum ZoneError {
    #[error("cannot parse zone table: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate zone assignment for region {region:?}")]
    DuplicateRegion { region: String },
    #[error("zone assignment for unknown region {region:?}")]
    UnknownRegion { region: String },
}

impl ZoneTable {
    /// Build the table from parsed rows, checked against the region set.
    /// A row naming a region outside the dataset is a load failure; a region
    /// with no row is tolerated (it resolves as missing-zone).
    pub fn from_rows(rows: Vec<ZoneRow>, regions: &RegionSet) -> Result<Self, ZoneError> {
        let mut by_region = HashMap::with_capacity(rows.len());
        for row in rows {
            if !regions.contains(&row.region) {
                return Err(ZoneError::UnknownRegion { region: row.region });
            }
            if by_region
                .insert(row.region.clone(), ZonePair { wind: row.wind, snow: row.snow })
                .is_some()
            {
                return Err(ZoneError::DuplicateRegion { region: row.region });
            }
        }

        let unassigned = regions.len() - by_region.len();
        if unassigned > 0 {
            tracing::warn!(unassigned, "regions without a zone assignment");
        }
        Ok(Self { by_region })
    }

    pub fn from_json_str(text: &str, regions: &RegionSet) -> Result<Self, ZoneError> {
        let rows: Vec<ZoneRow> = serde_json::from_str(text)?;
        Self::from_rows(rows, regions)
    }

    pub fn get(&self, region_code: &str) -> Option<&ZonePair> {
        self.by_region.get(region_code)
    }

    pub fn len(&self) -> usize {
        self.by_region.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_region.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_fixtures::small_region_set;

    fn row(region: &str, wind: &str, snow: &str) -> ZoneRow {
        ZoneRow { region: region.into(), wind: wind.into(), snow: snow.into() }
    }

    #[test]
    fn lookup_returns_assigned_pair() {
        let regions = small_region_set(&["01", "02"]);
        let table = ZoneTable::from_rows(vec![row("01", "2", "A")], &regions).unwrap();
        assert_eq!(
            table.get("01"),
            Some(&ZonePair { wind: "2".into(), snow: "A".into() })
        );
        assert_eq!(table.get("02"), None, "unassigned region must stay lookup-able as None");
    }

    #[test]
    fn duplicate_assignment_is_rejected() {
        let regions = small_region_set(&["01"]);
        let err = ZoneTable::from_rows(vec![row("01", "2", "A"), row("01", "3", "B")], &regions)
            .unwrap_err();
        assert!(matches!(err, ZoneError::DuplicateRegion { .. }), "got {err}");
    }

    #[test]
    fn unknown_region_is_rejected() {
        let regions = small_region_set(&["01"]);
        let err = ZoneTable::from_rows(vec![row("99", "2", "A")], &regions).unwrap_err();
        assert!(matches!(err, ZoneError::UnknownRegion { .. }), "got {err}");
    }

    #[test]
    fn parses_json_rows() {
        let regions = small_region_set(&["01"]);
        let table = ZoneTable::from_json_str(
            r#"[{"region": "01", "wind": "2", "snow": "A"}]"#,
            &regions,
        )
        .unwrap();
        assert_eq!(table.len(), 1);
    }
}
