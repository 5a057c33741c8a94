//! The reference store: the three validated tables plus region geometry,
//! loaded once and treated as immutable for the lifetime of an engine state.

pub mod details;
pub mod geometry;
pub mod region;
pub mod rules;
pub mod zones;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use details::{DetailError, DetailTable};
use region::{RegionError, RegionSet};
use rules::{RuleError, RuleTable};
use zones::{ZoneError, ZoneTable};

/// File locations of the four source datasets.
#[derive(Debug, Clone)]
pub struct DataPaths {
    pub regions: PathBuf,
    pub zones: PathBuf,
    pub rules: PathBuf,
    pub details: PathBuf,
}

impl DataPaths {
    /// Conventional layout: all four files under one directory.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            regions: dir.join("regions.geojson"),
            zones: dir.join("zones.json"),
            rules: dir.join("rules.json"),
            details: dir.join("details.json"),
        }
    }
}

/// Structural load failures. Any of these stops the engine from starting;
/// resolution gaps are data, not errors, and never appear here.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("region dataset: {0}")]
    Regions(#[from] RegionError),
    #[error("zone table: {0}")]
    Zones(#[from] ZoneError),
    #[error("rule table: {0}")]
    Rules(#[from] RuleError),
    #[error("detail table: {0}")]
    Details(#[from] DetailError),
}

/// The immutable reference data every downstream component reads from.
#[derive(Debug, Clone)]
pub struct ReferenceStore {
    pub regions: RegionSet,
    pub zones: ZoneTable,
    pub rules: RuleTable,
    pub details: DetailTable,
}

fn read(path: &Path) -> Result<String, StoreError> {
    fs::read_to_string(path).map_err(|source| StoreError::Io { path: path.to_owned(), source })
}

impl ReferenceStore {
    /// Load and validate all four datasets. The detail file is the only one
    /// whose absence is tolerated (details are optional per configuration).
    pub fn load(paths: &DataPaths) -> Result<Self, StoreError> {
        let regions = RegionSet::from_geojson_str(&read(&paths.regions)?)?;
        tracing::info!(regions = regions.len(), "region dataset loaded");

        let zones = ZoneTable::from_json_str(&read(&paths.zones)?, &regions)?;
        tracing::info!(assignments = zones.len(), "zone table loaded");

        let rules = RuleTable::from_json_str(&read(&paths.rules)?)?;
        tracing::info!(rules = rules.rule_count(), "rule table loaded");

        let details = if paths.details.exists() {
            DetailTable::from_json_str(&read(&paths.details)?)?
        } else {
            tracing::warn!(path = %paths.details.display(), "detail table missing, panels will show placeholders");
            DetailTable::default()
        };
        tracing::info!(configs = details.len(), "detail table loaded");

        Ok(Self::from_parts(regions, zones, rules, details))
    }

    pub fn from_parts(
        regions: RegionSet,
        zones: ZoneTable,
        rules: RuleTable,
        details: DetailTable,
    ) -> Self {
        Self { regions, zones, rules, details }
    }
}

#[cfg(test)]
pub mod test_fixtures {
    //! Shared in-memory datasets for the crate's tests.

    use super::*;
    use details::ConfigDetails;
    use rules::RuleRow;
    use zones::ZoneRow;

    /// A region set of unit squares, one per code, laid out on a row.
    pub fn small_region_set(codes: &[&str]) -> RegionSet {
        let features: Vec<String> = codes
            .iter()
            .enumerate()
            .map(|(i, code)| {
                let x = i as f64 * 2.0;
                format!(
                    r#"{{
                        "type": "Feature",
                        "properties": {{ "code": "{code}", "name": "Region {code}" }},
                        "geometry": {{
                            "type": "Polygon",
                            "coordinates": [[[{x}, 0.0], [{x1}, 0.0], [{x1}, 1.0], [{x}, 1.0]]]
                        }}
                    }}"#,
                    x1 = x + 1.0,
                )
            })
            .collect();
        let text = format!(
            r#"{{"type": "FeatureCollection", "features": [{}]}}"#,
            features.join(",")
        );
        RegionSet::from_geojson_str(&text).expect("fixture GeoJSON is valid")
    }

    fn zone_row(region: &str, wind: &str, snow: &str) -> ZoneRow {
        ZoneRow { region: region.into(), wind: wind.into(), snow: snow.into() }
    }

    fn rule_row(
        config: &str,
        wind: &str,
        snow: &str,
        wide: Option<u32>,
        narrow: Option<u32>,
    ) -> RuleRow {
        RuleRow {
            config: config.into(),
            wind: wind.into(),
            snow: snow.into(),
            alt_wide: wide,
            alt_narrow: narrow,
        }
    }

    /// Three regions: "01" in zones (2, A), "02" in zones (3, B), "03" without
    /// a zone assignment. Rules exist for "cfgA" only; "cfgB" appears only in
    /// the detail table.
    pub fn fixture_store() -> ReferenceStore {
        let regions = small_region_set(&["01", "02", "03"]);
        let zones = ZoneTable::from_rows(
            vec![zone_row("01", "2", "A"), zone_row("02", "3", "B")],
            &regions,
        )
        .expect("fixture zones are valid");
        let rules = RuleTable::from_rows(vec![
            rule_row("cfgA", "2", "A", Some(300), Some(600)),
            rule_row("cfgA", "3", "B", None, Some(200)),
        ])
        .expect("fixture rules are valid");
        let details = DetailTable::from_rows(vec![
            ConfigDetails {
                config: "cfgA".into(),
                structure_type: Some("Venlo".into()),
                post_height: Some("4.00 m".into()),
                width: Some("9.60 m".into()),
                roof: None,
                facade: None,
                crossbeam: None,
                material: Some("Steel S235".into()),
                wind_rating: None,
                revision: Some("2025-03".into()),
            },
            ConfigDetails {
                config: "cfgB".into(),
                structure_type: Some("Tunnel".into()),
                post_height: None,
                width: None,
                roof: None,
                facade: None,
                crossbeam: None,
                material: None,
                wind_rating: None,
                revision: None,
            },
        ])
        .expect("fixture details are valid");
        ReferenceStore::from_parts(regions, zones, rules, details)
    }
}
