//! The query service: the single entry point the front end calls.
//!
//! All reference data and resolved maps live in an immutable `EngineState`
//! snapshot; a request clones the `Arc` once and works against that snapshot,
//! so a concurrent reload can never mix data from two loads. The caches
//! belong to the snapshot too, which makes the reload swap atomic: new state,
//! empty caches, fresh palette seed, all in one pointer store.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;

use crate::cache::{CacheConfig, CacheStats, FlightCache};
use crate::choropleth::{Choropleth, MapStats};
use crate::palette::Palette;
use crate::precompute::{precompute_all, Combination, ResolvedMap};
use crate::store::details::ConfigDetails;
use crate::store::rules::Spacing;
use crate::store::{DataPaths, ReferenceStore, StoreError};

/// Placeholder shown for absent detail fields.
const PLACEHOLDER: &str = "—";

/// Malformed requests. Resolution gaps are not errors and never appear here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("unknown combination: {config} at {spacing}")]
    UnknownCombination { config: String, spacing: Spacing },
}

/// One labelled row of the configuration detail panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRow {
    pub label: &'static str,
    pub value: String,
}

/// The configuration detail panel. Always well-formed: absent metadata
/// renders as placeholder rows, never as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailPanel {
    pub config: String,
    pub rows: Vec<DetailRow>,
}

impl DetailPanel {
    fn build(config: &str, details: Option<&ConfigDetails>) -> DetailPanel {
        let pick = |value: Option<&String>| {
            value.cloned().unwrap_or_else(|| PLACEHOLDER.to_owned())
        };
        let rows = vec![
            DetailRow { label: "Model reference", value: config.to_owned() },
            DetailRow {
                label: "Structure type",
                value: pick(details.and_then(|d| d.structure_type.as_ref())),
            },
            DetailRow {
                label: "Post height",
                value: pick(details.and_then(|d| d.post_height.as_ref())),
            },
            DetailRow { label: "Width", value: pick(details.and_then(|d| d.width.as_ref())) },
            DetailRow { label: "Roof", value: pick(details.and_then(|d| d.roof.as_ref())) },
            DetailRow { label: "Facade", value: pick(details.and_then(|d| d.facade.as_ref())) },
            DetailRow {
                label: "Crossbeam",
                value: pick(details.and_then(|d| d.crossbeam.as_ref())),
            },
        ];
        DetailPanel { config: config.to_owned(), rows }
    }
}

/// Standing usage notes plus the coverage line for one combination.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryPanel {
    pub combination: Combination,
    pub coverage_line: String,
    pub notes: Vec<String>,
    /// True when no region resolves to an altitude for this combination.
    pub no_rule_banner: bool,
}

fn build_summary(choropleth: &Choropleth) -> SummaryPanel {
    let stats = &choropleth.stats;
    let pct = (stats.coverage * 100.0).round() as u32;
    SummaryPanel {
        combination: choropleth.combination.clone(),
        coverage_line: format!(
            "{} / {} regions ({pct}%)",
            stats.admissible, stats.total_regions
        ),
        notes: vec![
            "Assumes terrain category II (flat, open site).".to_owned(),
            "Max altitude from the wind × snow zone crossing for the selected configuration."
                .to_owned(),
            "Sales-support tool; does not replace a structural calculation.".to_owned(),
        ],
        no_rule_banner: stats.admissible == 0,
    }
}

/// Everything `get_view` returns for one combination.
#[derive(Debug, Clone)]
pub struct View {
    pub choropleth: Arc<Choropleth>,
    pub details: Arc<DetailPanel>,
    pub summary: Arc<SummaryPanel>,
}

impl View {
    pub fn statistics(&self) -> &MapStats {
        &self.choropleth.stats
    }
}

/// Outcome of a successful reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadReport {
    pub regions: usize,
    pub configurations: usize,
    pub combinations: usize,
}

// ── Engine state ──────────────────────────────────────────────────────────────

struct Caches {
    palette: FlightCache<Vec<u32>, Palette>,
    choropleth: FlightCache<Combination, Choropleth>,
    detail: FlightCache<String, DetailPanel>,
    summary: FlightCache<Combination, SummaryPanel>,
}

impl Caches {
    fn new(config: &CacheConfig) -> Self {
        Self {
            palette: FlightCache::new("palette", config.palette_entries, config.enabled),
            choropleth: FlightCache::new(
                "choropleth",
                config.choropleth_entries,
                config.enabled,
            ),
            detail: FlightCache::new("detail", config.detail_entries, config.enabled),
            summary: FlightCache::new("summary", config.summary_entries, config.enabled),
        }
    }
}

/// One load's worth of data: immutable reference tables, resolved maps, the
/// session palette seed, and the caches derived from them.
struct EngineState {
    store: Arc<ReferenceStore>,
    resolved: HashMap<Combination, Arc<ResolvedMap>>,
    configs: Vec<String>,
    session_seed: u64,
    caches: Caches,
}

impl EngineState {
    fn build(store: Arc<ReferenceStore>, cache_config: &CacheConfig) -> Arc<EngineState> {
        let resolved = precompute_all(&store);
        let mut configs: Vec<String> =
            resolved.keys().map(|c| c.config.clone()).collect();
        configs.sort_unstable();
        configs.dedup();
        let session_seed = rand::random();
        tracing::debug!(session_seed, "engine state built");
        Arc::new(EngineState {
            store,
            resolved,
            configs,
            session_seed,
            caches: Caches::new(cache_config),
        })
    }
}

fn unfailing<T>(result: Result<T, Infallible>) -> T {
    match result {
        Ok(value) => value,
        Err(never) => match never {},
    }
}

// ── Service ───────────────────────────────────────────────────────────────────

/// The engine façade. Cheap to share behind an `Arc` across worker threads.
pub struct AtlasService {
    /// Absent when the service was opened from an in-memory store; `reload`
    /// then rebuilds from that store (fresh seed, cleared caches).
    paths: Option<DataPaths>,
    cache_config: CacheConfig,
    state: RwLock<Arc<EngineState>>,
}

impl AtlasService {
    /// Load the reference store from disk and precompute every combination.
    /// Returns the first structural defect instead of serving partial data.
    pub fn open(paths: DataPaths, cache_config: CacheConfig) -> Result<Self, StoreError> {
        let store = Arc::new(ReferenceStore::load(&paths)?);
        let state = EngineState::build(store, &cache_config);
        Ok(Self { paths: Some(paths), cache_config, state: RwLock::new(state) })
    }

    /// Serve an already-loaded store (tests, embedders).
    pub fn with_store(store: ReferenceStore, cache_config: CacheConfig) -> Self {
        let state = EngineState::build(Arc::new(store), &cache_config);
        Self { paths: None, cache_config, state: RwLock::new(state) }
    }

    fn snapshot(&self) -> Arc<EngineState> {
        Arc::clone(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// The cached or freshly built view for one combination.
    pub fn get_view(&self, config: &str, spacing: Spacing) -> Result<View, QueryError> {
        let state = self.snapshot();
        let combination = Combination::new(config, spacing);
        let resolved = state.resolved.get(&combination).ok_or_else(|| {
            QueryError::UnknownCombination { config: config.to_owned(), spacing }
        })?;

        let palette = unfailing(state.caches.palette.get_or_build(
            resolved.distinct_altitudes(),
            || Ok(Palette::generate(&resolved.distinct_altitudes(), state.session_seed)),
        ));
        let choropleth = unfailing(state.caches.choropleth.get_or_build(
            combination.clone(),
            || Ok(Choropleth::build(resolved, &palette, &state.store)),
        ));
        let summary = unfailing(
            state.caches.summary.get_or_build(combination, || Ok(build_summary(&choropleth))),
        );
        let details = Self::detail_panel(&state, config);

        Ok(View { choropleth, details, summary })
    }

    fn detail_panel(state: &EngineState, config: &str) -> Arc<DetailPanel> {
        unfailing(state.caches.detail.get_or_build(config.to_owned(), || {
            Ok(DetailPanel::build(config, state.store.details.get(config)))
        }))
    }

    /// Detail fields for one configuration; placeholders when absent.
    pub fn get_configuration_details(&self, config: &str) -> Arc<DetailPanel> {
        Self::detail_panel(&self.snapshot(), config)
    }

    /// Selectable configurations, sorted.
    pub fn list_configurations(&self) -> Vec<String> {
        self.snapshot().configs.clone()
    }

    /// Both supported spacings, wide first.
    pub fn list_spacings(&self) -> Vec<Spacing> {
        Spacing::ALL.to_vec()
    }

    /// Re-read the reference store and atomically swap the precomputed state
    /// and all caches. On failure the previous state keeps serving.
    ///
    /// Without backing paths the current store is reused, which still clears
    /// every cache and draws a fresh palette seed.
    pub fn reload(&self) -> Result<ReloadReport, StoreError> {
        let store = match &self.paths {
            Some(paths) => Arc::new(ReferenceStore::load(paths)?),
            None => Arc::clone(&self.snapshot().store),
        };
        let state = EngineState::build(store, &self.cache_config);
        let report = ReloadReport {
            regions: state.store.regions.len(),
            configurations: state.configs.len(),
            combinations: state.resolved.len(),
        };
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
        tracing::info!(
            regions = report.regions,
            combinations = report.combinations,
            "reload complete"
        );
        Ok(report)
    }

    /// Diagnostic counters of the current state's caches.
    pub fn cache_stats(&self) -> Vec<CacheStats> {
        let state = self.snapshot();
        vec![
            state.caches.palette.stats(),
            state.caches.choropleth.stats(),
            state.caches.detail.stats(),
            state.caches.summary.stats(),
        ]
    }
}
