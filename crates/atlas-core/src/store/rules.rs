//! The engineering rule table: (configuration, spacing, wind, snow) → verdict.
//!
//! All structural knowledge is pre-encoded here; the engine only looks it up.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Post-spacing option of a structural configuration. Exactly two are
/// supported; rule rows carry an altitude column for each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Spacing {
    /// 3.00 m between posts.
    Wide,
    /// 2.50 m between posts.
    Narrow,
}

impl Spacing {
    pub const ALL: [Spacing; 2] = [Spacing::Wide, Spacing::Narrow];

    pub fn metres(self) -> f64 {
        match self {
            Spacing::Wide => 3.0,
            Spacing::Narrow => 2.5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Spacing::Wide => "3.00 m",
            Spacing::Narrow => "2.50 m",
        }
    }
}

impl fmt::Display for Spacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Spacing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wide" | "3" | "3.0" | "3.00" => Ok(Spacing::Wide),
            "narrow" | "2.5" | "2.50" => Ok(Spacing::Narrow),
            other => Err(format!("unknown spacing {other:?} (expected \"wide\" or \"narrow\")")),
        }
    }
}

/// Outcome of a rule that exists. An absent rule is `None` at lookup time,
/// which is a different state from an explicit non-admissibility marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOutcome {
    /// Maximum installable altitude in metres.
    MaxAltitude(u32),
    NotAdmissible,
}

/// Full rule key. Keys are unique within a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleKey {
    pub config: String,
    pub spacing: Spacing,
    pub wind: String,
    pub snow: String,
}

/// One input row. A row always covers both spacings for its zone crossing;
/// `null` in an altitude column is the explicit not-admissible marker.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleRow {
    pub config: String,
    pub wind: String,
    pub snow: String,
    pub alt_wide: Option<u32>,
    pub alt_narrow: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: HashMap<RuleKey, RuleOutcome>,
    configs: BTreeSet<String>,
}

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("cannot parse rule table: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("rule table is empty")]
    Empty,
    #[error("duplicate rule for config {config:?}, wind {wind:?}, snow {snow:?}")]
    DuplicateKey {
        config: String,
        wind: String,
        snow: String,
    },
}

impl RuleTable {
    pub fn from_rows(rows: Vec<RuleRow>) -> Result<Self, RuleError> {
        if rows.is_empty() {
            return Err(RuleError::Empty);
        }

        let mut rules = HashMap::with_capacity(rows.len() * 2);
        let mut configs = BTreeSet::new();

        for row in rows {
            for (spacing, alt) in [(Spacing::Wide, row.alt_wide), (Spacing::Narrow, row.alt_narrow)]
            {
                let key = RuleKey {
                    config: row.config.clone(),
                    spacing,
                    wind: row.wind.clone(),
                    snow: row.snow.clone(),
                };
                let outcome = match alt {
                    Some(metres) => RuleOutcome::MaxAltitude(metres),
                    None => RuleOutcome::NotAdmissible,
                };
                if rules.insert(key, outcome).is_some() {
                    return Err(RuleError::DuplicateKey {
                        config: row.config,
                        wind: row.wind,
                        snow: row.snow,
                    });
                }
            }
            configs.insert(row.config);
        }

        Ok(Self { rules, configs })
    }

    pub fn from_json_str(text: &str) -> Result<Self, RuleError> {
        let rows: Vec<RuleRow> = serde_json::from_str(text)?;
        Self::from_rows(rows)
    }

    /// `None` means "no rule", distinct from `Some(NotAdmissible)`.
    pub fn lookup(
        &self,
        config: &str,
        spacing: Spacing,
        wind: &str,
        snow: &str,
    ) -> Option<RuleOutcome> {
        let key = RuleKey {
            config: config.to_owned(),
            spacing,
            wind: wind.to_owned(),
            snow: snow.to_owned(),
        };
        self.rules.get(&key).copied()
    }

    /// Configurations the table knows, in ascending order.
    pub fn configs(&self) -> impl Iterator<Item = &str> {
        self.configs.iter().map(String::as_str)
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(config: &str, wind: &str, snow: &str, wide: Option<u32>, narrow: Option<u32>) -> RuleRow {
        RuleRow {
            config: config.into(),
            wind: wind.into(),
            snow: snow.into(),
            alt_wide: wide,
            alt_narrow: narrow,
        }
    }

    #[test]
    fn spacing_parse_and_labels() {
        assert_eq!("wide".parse::<Spacing>(), Ok(Spacing::Wide));
        assert_eq!("2.5".parse::<Spacing>(), Ok(Spacing::Narrow));
        assert!("4.0".parse::<Spacing>().is_err());
        assert_eq!(Spacing::Wide.label(), "3.00 m");
        assert_eq!(Spacing::Narrow.metres(), 2.5);
    }

    #[test]
    fn row_expands_to_both_spacings() {
        let table = RuleTable::from_rows(vec![row("cfgA", "2", "A", Some(300), None)]).unwrap();
        assert_eq!(
            table.lookup("cfgA", Spacing::Wide, "2", "A"),
            Some(RuleOutcome::MaxAltitude(300))
        );
        assert_eq!(
            table.lookup("cfgA", Spacing::Narrow, "2", "A"),
            Some(RuleOutcome::NotAdmissible)
        );
    }

    #[test]
    fn absent_key_is_none_not_notadmissible() {
        let table = RuleTable::from_rows(vec![row("cfgA", "2", "A", Some(300), Some(600))]).unwrap();
        assert_eq!(table.lookup("cfgA", Spacing::Wide, "3", "A"), None);
        assert_eq!(table.lookup("cfgB", Spacing::Wide, "2", "A"), None);
    }

    #[test]
    fn duplicate_rule_key_is_rejected() {
        let err = RuleTable::from_rows(vec![
            row("cfgA", "2", "A", Some(300), Some(600)),
            row("cfgA", "2", "A", Some(200), Some(400)),
        ])
        .unwrap_err();
        assert!(matches!(err, RuleError::DuplicateKey { .. }), "got {err}");
    }

    #[test]
    fn empty_table_is_rejected() {
        assert!(matches!(RuleTable::from_rows(vec![]), Err(RuleError::Empty)));
    }

    #[test]
    fn configs_are_sorted_and_deduplicated() {
        let table = RuleTable::from_rows(vec![
            row("cfgB", "2", "A", Some(300), None),
            row("cfgA", "2", "A", Some(300), None),
            row("cfgA", "3", "A", Some(200), None),
        ])
        .unwrap();
        assert_eq!(table.configs().collect::<Vec<_>>(), vec!["cfgA", "cfgB"]);
    }
}
