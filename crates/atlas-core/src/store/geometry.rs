//! Planar geometry over WGS84 lon/lat rings.
//!
//! Region outlines span at most a few degrees, so planar math is sufficient
//! for containment tests and label placement. All coordinate math uses f64.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A point in geographic coordinates, (lon, lat) ordering as in GeoJSON.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

/// A polygon: one outer ring plus zero or more holes.
/// Rings are vertex lists; the closing vertex may or may not repeat the first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub outer: Vec<LonLat>,
    pub holes: Vec<Vec<LonLat>>,
}

/// Region geometry: one or more polygons (islands and enclaves use several).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub polygons: Vec<Polygon>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeometryError {
    #[error("geometry has no polygons")]
    Empty,
    #[error("ring has {0} vertices, need at least 3")]
    ShortRing(usize),
}

/// Even-odd crossing test. The closing edge from the last vertex back to the
/// first is always considered, so rings need not repeat their first vertex.
fn ring_contains(ring: &[LonLat], p: LonLat) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let a = ring[i];
        let b = ring[j];
        if (a.lat > p.lat) != (b.lat > p.lat) {
            let x = (b.lon - a.lon) * (p.lat - a.lat) / (b.lat - a.lat) + a.lon;
            if p.lon < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Signed shoelace area of a ring (planar approximation, degrees²).
fn ring_area(ring: &[LonLat]) -> f64 {
    let n = ring.len();
    if n == 0 {
        return 0.0;
    }
    let mut sum = 0.0;
    let mut j = n - 1;
    for i in 0..n {
        sum += (ring[j].lon + ring[i].lon) * (ring[j].lat - ring[i].lat);
        j = i;
    }
    sum / 2.0
}

/// Area centroid of a ring (planar shoelace centroid).
/// Falls back to the vertex mean for degenerate (near-zero-area) rings.
fn ring_centroid(ring: &[LonLat]) -> LonLat {
    let a = ring_area(ring);
    if a.abs() < 1e-12 {
        let n = ring.len() as f64;
        let lon = ring.iter().map(|p| p.lon).sum::<f64>() / n;
        let lat = ring.iter().map(|p| p.lat).sum::<f64>() / n;
        return LonLat::new(lon, lat);
    }
    let n = ring.len();
    let mut cx = 0.0;
    let mut cy = 0.0;
    let mut j = n - 1;
    for i in 0..n {
        let cross = ring[j].lon * ring[i].lat - ring[i].lon * ring[j].lat;
        cx += (ring[j].lon + ring[i].lon) * cross;
        cy += (ring[j].lat + ring[i].lat) * cross;
        j = i;
    }
    LonLat::new(cx / (6.0 * a), cy / (6.0 * a))
}

impl Polygon {
    /// True if `p` lies inside the outer ring and outside every hole.
    pub fn contains(&self, p: LonLat) -> bool {
        ring_contains(&self.outer, p) && !self.holes.iter().any(|h| ring_contains(h, p))
    }

    /// Unsigned area of the outer ring.
    pub fn outer_area(&self) -> f64 {
        ring_area(&self.outer).abs()
    }
}

impl Geometry {
    pub fn validate(&self) -> Result<(), GeometryError> {
        if self.polygons.is_empty() {
            return Err(GeometryError::Empty);
        }
        for poly in &self.polygons {
            for ring in std::iter::once(&poly.outer).chain(poly.holes.iter()) {
                // A closing repeat of the first vertex does not count.
                let mut n = ring.len();
                if n > 1 && ring[0] == ring[n - 1] {
                    n -= 1;
                }
                if n < 3 {
                    return Err(GeometryError::ShortRing(n));
                }
            }
        }
        Ok(())
    }

    pub fn contains(&self, p: LonLat) -> bool {
        self.polygons.iter().any(|poly| poly.contains(p))
    }

    /// (min_lon, min_lat, max_lon, max_lat) over all rings.
    pub fn bbox(&self) -> (f64, f64, f64, f64) {
        let mut min_lon = f64::INFINITY;
        let mut min_lat = f64::INFINITY;
        let mut max_lon = f64::NEG_INFINITY;
        let mut max_lat = f64::NEG_INFINITY;
        for poly in &self.polygons {
            for p in &poly.outer {
                min_lon = min_lon.min(p.lon);
                min_lat = min_lat.min(p.lat);
                max_lon = max_lon.max(p.lon);
                max_lat = max_lat.max(p.lat);
            }
        }
        (min_lon, min_lat, max_lon, max_lat)
    }

    /// A point guaranteed to lie inside the geometry, for label placement.
    /// `None` only for empty geometry (rejected by `validate`).
    ///
    /// Starts from the area centroid of the largest polygon; when that falls
    /// outside (crescents, archipelagos), scans the horizontal line through
    /// the centroid and takes the midpoint of the widest interior span.
    pub fn representative_point(&self) -> Option<LonLat> {
        let largest = self
            .polygons
            .iter()
            .max_by(|a, b| a.outer_area().total_cmp(&b.outer_area()))?;

        let centroid = ring_centroid(&largest.outer);
        if largest.contains(centroid) {
            return Some(centroid);
        }

        // Sample the scanline at centroid.lat and keep the widest run of
        // interior samples.
        let (min_lon, _, max_lon, _) = self.bbox();
        const STEPS: usize = 256;
        let step = (max_lon - min_lon) / STEPS as f64;
        let mut best: Option<(f64, f64)> = None;
        let mut run_start: Option<f64> = None;
        for i in 0..=STEPS {
            let lon = min_lon + i as f64 * step;
            let inside = largest.contains(LonLat::new(lon, centroid.lat));
            match (inside, run_start) {
                (true, None) => run_start = Some(lon),
                (false, Some(start)) => {
                    let width = lon - start;
                    if best.is_none_or(|(_, w)| width > w) {
                        best = Some(((start + lon) / 2.0, width));
                    }
                    run_start = None;
                }
                _ => {}
            }
        }
        if let Some(start) = run_start {
            let width = max_lon - start;
            if best.is_none_or(|(_, w)| width > w) {
                best = Some(((start + max_lon) / 2.0, width));
            }
        }
        match best {
            Some((lon, _)) => Some(LonLat::new(lon, centroid.lat)),
            // Scanline missed the interior entirely; the centroid is still a
            // usable label anchor.
            None => Some(centroid),
        }
    }
}
