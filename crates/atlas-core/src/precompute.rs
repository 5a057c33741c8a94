//! Startup precompute: one resolved map per selectable combination.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use rayon::prelude::*;

use crate::resolve::{resolve, Verdict};
use crate::store::rules::Spacing;
use crate::store::ReferenceStore;

/// A selectable (configuration, spacing) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Combination {
    pub config: String,
    pub spacing: Spacing,
}

impl Combination {
    pub fn new(config: impl Into<String>, spacing: Spacing) -> Self {
        Self { config: config.into(), spacing }
    }
}

impl std::fmt::Display for Combination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}", self.config, self.spacing)
    }
}

/// The full per-region outcome for one combination. Immutable once built;
/// replaced wholesale on reload, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMap {
    pub combination: Combination,
    /// Every known region code maps to exactly one verdict.
    pub verdicts: BTreeMap<String, Verdict>,
}

impl ResolvedMap {
    /// Distinct altitude values present, descending (legend order).
    pub fn distinct_altitudes(&self) -> Vec<u32> {
        let set: BTreeSet<u32> = self.verdicts.values().filter_map(|v| v.altitude()).collect();
        set.into_iter().rev().collect()
    }

    pub fn admissible_count(&self) -> usize {
        self.verdicts.values().filter(|v| v.is_admissible()).count()
    }
}

/// All selectable combinations: the union of configurations known to the
/// rule table or the detail table, crossed with both spacings, sorted.
pub fn enumerate_combinations(store: &ReferenceStore) -> Vec<Combination> {
    let mut configs: BTreeSet<&str> = store.rules.configs().collect();
    configs.extend(store.details.configs());
    configs
        .into_iter()
        .flat_map(|config| Spacing::ALL.map(|spacing| Combination::new(config, spacing)))
        .collect()
}

/// Resolve every region for one combination.
fn resolve_map(store: &ReferenceStore, combination: Combination) -> ResolvedMap {
    let verdicts = store
        .regions
        .iter()
        .map(|region| {
            let verdict =
                resolve(store, &region.code, &combination.config, combination.spacing);
            (region.code.clone(), verdict)
        })
        .collect();
    ResolvedMap { combination, verdicts }
}

/// Build resolved maps for every selectable combination, in parallel.
///
/// Resolution gaps land in the maps as `Unresolvable`; nothing here fails.
/// Must finish before the query service accepts requests.
pub fn precompute_all(store: &ReferenceStore) -> HashMap<Combination, Arc<ResolvedMap>> {
    let combinations = enumerate_combinations(store);
    tracing::info!(
        combinations = combinations.len(),
        regions = store.regions.len(),
        "precomputing resolved maps"
    );
    combinations
        .into_par_iter()
        .map(|combination| {
            let map = resolve_map(store, combination.clone());
            (combination, Arc::new(map))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::Gap;
    use crate::store::test_fixtures::fixture_store;

    #[test]
    fn enumeration_is_union_of_rule_and_detail_configs() {
        let store = fixture_store();
        let combos = enumerate_combinations(&store);
        // cfgA (rules) and cfgB (details only), two spacings each.
        assert_eq!(combos.len(), 4);
        assert!(combos.contains(&Combination::new("cfgA", Spacing::Wide)));
        assert!(combos.contains(&Combination::new("cfgB", Spacing::Narrow)));
    }

    #[test]
    fn every_region_appears_in_every_map() {
        let store = fixture_store();
        let maps = precompute_all(&store);
        for map in maps.values() {
            assert_eq!(
                map.verdicts.len(),
                store.regions.len(),
                "{} map must cover all regions",
                map.combination
            );
        }
    }

    #[test]
    fn rule_less_config_resolves_all_regions_as_unresolvable() {
        let store = fixture_store();
        let maps = precompute_all(&store);
        let map = &maps[&Combination::new("cfgB", Spacing::Wide)];
        assert_eq!(map.admissible_count(), 0);
        assert_eq!(map.verdicts["01"], Verdict::Unresolvable(Gap::MissingRule));
        assert_eq!(map.verdicts["03"], Verdict::Unresolvable(Gap::MissingZone));
    }

    #[test]
    fn distinct_altitudes_are_descending_and_deduplicated() {
        let store = fixture_store();
        let maps = precompute_all(&store);
        let map = &maps[&Combination::new("cfgA", Spacing::Narrow)];
        // Narrow spacing: region 01 → 600, region 02 → 200.
        assert_eq!(map.distinct_altitudes(), vec![600, 200]);
    }

    #[test]
    fn precompute_is_pure_in_the_store() {
        let store = fixture_store();
        let a = precompute_all(&store);
        let b = precompute_all(&store);
        for (combo, map) in &a {
            assert_eq!(map.verdicts, b[combo].verdicts, "{combo} differs across runs");
        }
    }
}
