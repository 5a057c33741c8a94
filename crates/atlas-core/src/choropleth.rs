//! Render-ready map layers: resolved verdicts joined with geometry and
//! colour, plus the aggregate statistics block.

use std::sync::Arc;

use crate::palette::{Color, Palette};
use crate::precompute::{Combination, ResolvedMap};
use crate::resolve::Verdict;
use crate::store::region::Region;
use crate::store::ReferenceStore;

/// One region's entry in a rendered layer. Geometry is shared with the
/// reference store, never copied.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionShade {
    pub region: Arc<Region>,
    pub verdict: Verdict,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub label: String,
    pub color: Color,
    /// `None` for the two non-altitude states.
    pub altitude: Option<u32>,
}

/// Per-altitude aggregation. The share denominator is the admissible count,
/// not the region total; the non-altitude states are reported separately.
#[derive(Debug, Clone, PartialEq)]
pub struct AltitudeBucket {
    pub altitude: u32,
    pub count: usize,
    /// Fraction of admissible regions at this altitude, in [0, 1].
    pub admissible_share: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapStats {
    pub total_regions: usize,
    pub admissible: usize,
    pub not_admissible: usize,
    pub unresolvable: usize,
    /// admissible ÷ total, in [0, 1].
    pub coverage: f64,
    /// Descending altitude.
    pub buckets: Vec<AltitudeBucket>,
}

/// A resolved map rendered against geometry and a palette. Derived and
/// cacheable; rebuilt, never patched, when an input changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Choropleth {
    pub combination: Combination,
    /// Ordered by region code.
    pub shades: Vec<RegionShade>,
    pub legend: Vec<LegendEntry>,
    pub stats: MapStats,
}

fn shade_color(palette: &Palette, verdict: Verdict) -> Color {
    match verdict {
        // A value missing from the palette cannot happen when the palette was
        // generated from this map's distinct values; degrade to the gap tone
        // rather than inventing a colour.
        Verdict::Altitude(m) => palette.color_of(m).unwrap_or_else(|| palette.unresolvable()),
        Verdict::NotAdmissible => palette.not_admissible(),
        Verdict::Unresolvable(_) => palette.unresolvable(),
    }
}

fn compute_stats(resolved: &ResolvedMap) -> MapStats {
    let total_regions = resolved.verdicts.len();
    let mut admissible = 0usize;
    let mut not_admissible = 0usize;
    let mut unresolvable = 0usize;
    for verdict in resolved.verdicts.values() {
        match verdict {
            Verdict::Altitude(_) => admissible += 1,
            Verdict::NotAdmissible => not_admissible += 1,
            Verdict::Unresolvable(_) => unresolvable += 1,
        }
    }

    let buckets = resolved
        .distinct_altitudes()
        .into_iter()
        .map(|altitude| {
            let count = resolved
                .verdicts
                .values()
                .filter(|v| v.altitude() == Some(altitude))
                .count();
            AltitudeBucket {
                altitude,
                count,
                admissible_share: if admissible > 0 { count as f64 / admissible as f64 } else { 0.0 },
            }
        })
        .collect();

    MapStats {
        total_regions,
        admissible,
        not_admissible,
        unresolvable,
        coverage: if total_regions > 0 { admissible as f64 / total_regions as f64 } else { 0.0 },
        buckets,
    }
}

fn build_legend(resolved: &ResolvedMap, palette: &Palette, stats: &MapStats) -> Vec<LegendEntry> {
    let mut legend: Vec<LegendEntry> = resolved
        .distinct_altitudes()
        .into_iter()
        .map(|altitude| LegendEntry {
            label: format!("{altitude} m"),
            color: shade_color(palette, Verdict::Altitude(altitude)),
            altitude: Some(altitude),
        })
        .collect();
    if stats.not_admissible > 0 {
        legend.push(LegendEntry {
            label: "Not admissible".to_owned(),
            color: palette.not_admissible(),
            altitude: None,
        });
    }
    if stats.unresolvable > 0 {
        legend.push(LegendEntry {
            label: "No applicable rule".to_owned(),
            color: palette.unresolvable(),
            altitude: None,
        });
    }
    legend
}

impl Choropleth {
    /// Join verdicts, geometry and palette. Deterministic in its inputs.
    pub fn build(resolved: &ResolvedMap, palette: &Palette, store: &ReferenceStore) -> Choropleth {
        let stats = compute_stats(resolved);
        let legend = build_legend(resolved, palette, &stats);

        let shades = resolved
            .verdicts
            .iter()
            .filter_map(|(code, &verdict)| {
                // Verdict keys come from the region set, so the lookup always
                // succeeds; a mismatch would mean the map and store are from
                // different loads, which the service's snapshotting rules out.
                store.regions.get(code).map(|region| RegionShade {
                    region: Arc::clone(region),
                    verdict,
                    color: shade_color(palette, verdict),
                })
            })
            .collect();

        Choropleth { combination: resolved.combination.clone(), shades, legend, stats }
    }
}
