//! Administrative regions and the GeoJSON subset they are loaded from.
//!
//! Only the fields the engine needs are parsed: `properties.code`,
//! `properties.name`, and `Polygon`/`MultiPolygon` geometry.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use super::geometry::{Geometry, GeometryError, LonLat, Polygon};

/// An administrative region. Immutable after load; downstream artifacts hold
/// `Arc<Region>` clones, never copies of the geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Unique code, e.g. "01".
    pub code: String,
    pub name: String,
    pub geometry: Geometry,
    /// Interior point for label placement, computed at load.
    pub centroid: LonLat,
}

/// All regions of the dataset, indexed by code.
#[derive(Debug, Clone)]
pub struct RegionSet {
    regions: Vec<Arc<Region>>,
    by_code: HashMap<String, usize>,
}

#[derive(Debug, Error)]
pub enum RegionError {
    #[error("cannot parse GeoJSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("no regions in feature collection")]
    Empty,
    #[error("duplicate region code {code:?}")]
    DuplicateCode { code: String },
    #[error("region {code:?} has invalid geometry: {source}")]
    InvalidGeometry {
        code: String,
        source: GeometryError,
    },
}

// ── GeoJSON schema ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RawCollection {
    features: Vec<RawFeature>,
}

#[derive(Deserialize)]
struct RawFeature {
    properties: RawProps,
    geometry: RawGeometry,
}

#[derive(Deserialize)]
struct RawProps {
    code: String,
    name: String,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum RawGeometry {
    Polygon { coordinates: Vec<Vec<[f64; 2]>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<[f64; 2]>>> },
}

fn ring_from_raw(raw: Vec<[f64; 2]>) -> Vec<LonLat> {
    raw.into_iter().map(|[lon, lat]| LonLat::new(lon, lat)).collect()
}

fn polygon_from_raw(mut rings: Vec<Vec<[f64; 2]>>) -> Polygon {
    if rings.is_empty() {
        return Polygon { outer: vec![], holes: vec![] };
    }
    let outer = ring_from_raw(rings.remove(0));
    let holes = rings.into_iter().map(ring_from_raw).collect();
    Polygon { outer, holes }
}

impl From<RawGeometry> for Geometry {
    fn from(raw: RawGeometry) -> Self {
        let polygons = match raw {
            RawGeometry::Polygon { coordinates } => vec![polygon_from_raw(coordinates)],
            RawGeometry::MultiPolygon { coordinates } => {
                coordinates.into_iter().map(polygon_from_raw).collect()
            }
        };
        Geometry { polygons }
    }
}

// ── RegionSet ─────────────────────────────────────────────────────────────────

impl RegionSet {
    /// Parse a GeoJSON feature collection. Every region must carry valid
    /// geometry; a degenerate outline is a load failure, not a silent skip.
    pub fn from_geojson_str(text: &str) -> Result<Self, RegionError> {
        let raw: RawCollection = serde_json::from_str(text)?;
        if raw.features.is_empty() {
            return Err(RegionError::Empty);
        }

        let mut regions = Vec::with_capacity(raw.features.len());
        let mut by_code = HashMap::with_capacity(raw.features.len());

        for feature in raw.features {
            let code = feature.properties.code;
            let geometry: Geometry = feature.geometry.into();
            geometry
                .validate()
                .map_err(|source| RegionError::InvalidGeometry { code: code.clone(), source })?;
            let centroid = geometry
                .representative_point()
                .ok_or(GeometryError::Empty)
                .map_err(|source| RegionError::InvalidGeometry { code: code.clone(), source })?;

            if by_code.contains_key(&code) {
                return Err(RegionError::DuplicateCode { code });
            }
            by_code.insert(code.clone(), regions.len());
            regions.push(Arc::new(Region {
                code,
                name: feature.properties.name,
                geometry,
                centroid,
            }));
        }

        Ok(Self { regions, by_code })
    }

    pub fn get(&self, code: &str) -> Option<&Arc<Region>> {
        self.by_code.get(code).map(|&i| &self.regions[i])
    }

    pub fn contains(&self, code: &str) -> bool {
        self.by_code.contains_key(code)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Region>> {
        self.regions.iter()
    }

    /// Region codes in ascending order.
    pub fn codes(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.regions.iter().map(|r| r.code.as_str()).collect();
        codes.sort_unstable();
        codes
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}
