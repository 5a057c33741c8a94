//! Verdict resolution for a single (region, configuration, spacing) triple.
//!
//! Pure lookups against the immutable reference store; safe to call from any
//! number of threads without coordination.

use serde::Serialize;

use crate::store::rules::{RuleOutcome, Spacing};
use crate::store::ReferenceStore;

/// Why a region could not be resolved. A gap is data, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Gap {
    /// The region has no wind/snow zone assignment.
    MissingZone,
    /// No rule covers this (configuration, spacing, wind, snow) key.
    MissingRule,
}

/// The exhaustive outcome for one region under one combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Maximum installable altitude in metres.
    Altitude(u32),
    /// A rule exists and explicitly forbids the combination.
    NotAdmissible,
    Unresolvable(Gap),
}

impl Verdict {
    pub fn altitude(self) -> Option<u32> {
        match self {
            Verdict::Altitude(m) => Some(m),
            _ => None,
        }
    }

    /// True only for an altitude verdict.
    pub fn is_admissible(self) -> bool {
        matches!(self, Verdict::Altitude(_))
    }
}

/// Resolve one region under one (configuration, spacing) pair.
pub fn resolve(store: &ReferenceStore, region_code: &str, config: &str, spacing: Spacing) -> Verdict {
    let Some(zone) = store.zones.get(region_code) else {
        return Verdict::Unresolvable(Gap::MissingZone);
    };
    match store.rules.lookup(config, spacing, &zone.wind, &zone.snow) {
        None => Verdict::Unresolvable(Gap::MissingRule),
        Some(RuleOutcome::NotAdmissible) => Verdict::NotAdmissible,
        Some(RuleOutcome::MaxAltitude(metres)) => Verdict::Altitude(metres),
    }
}
