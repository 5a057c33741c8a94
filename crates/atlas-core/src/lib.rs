//! Altitude atlas engine.
//!
//! Resolves, for every (configuration, spacing, region) triple, whether a
//! greenhouse configuration is installable and up to which altitude, by
//! crossing regulatory wind/snow zone tables with pre-encoded engineering
//! rules. All combinations are precomputed at load; rendering artifacts
//! (palettes, choropleth layers, statistics, panels) are derived on demand
//! and served from single-flight LRU caches.
//!
//! Pipeline order:
//!   1. Reference store load + validation
//!   2. Combination precompute
//!   3. Palette / choropleth / panel derivation (cached)
//!   4. Query service
//!
//! Colours are stable within one load and intentionally unstable across
//! loads; everything else is pure in the reference data.

pub mod cache;
pub mod choropleth;
pub mod palette;
pub mod precompute;
pub mod resolve;
pub mod service;
pub mod store;
