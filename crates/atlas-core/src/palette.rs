//! Colour assignment for resolved altitude values.
//!
//! Colours are stable for a given engine load (session seed) but are not
//! meaningful across loads: a restart or reload may recolour the same data.
//! That boundary is intentional and user-documented.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// An sRGB colour token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color(pub [u8; 3]);

impl Color {
    /// CSS hex form, e.g. "#2563eb".
    pub fn hex(self) -> String {
        let [r, g, b] = self.0;
        format!("#{r:02x}{g:02x}{b:02x}")
    }
}

/// Mid grey reserved for explicit non-admissibility. Never assigned to an
/// altitude value.
pub const NOT_ADMISSIBLE_TONE: Color = Color([0x9c, 0xa3, 0xaf]);

/// Pale grey reserved for resolution gaps, lighter than the non-admissible
/// tone so the two states stay visually distinct.
pub const UNRESOLVABLE_TONE: Color = Color([0xe5, 0xe7, 0xeb]);

/// Saturated hues the altitude values draw from. The order is shuffled per
/// palette; when values outnumber the wheel, hues recycle.
const WHEEL: [Color; 10] = [
    Color([0x25, 0x63, 0xeb]), // blue
    Color([0x05, 0x96, 0x69]), // emerald
    Color([0xdc, 0x26, 0x26]), // red
    Color([0x7c, 0x3a, 0xed]), // violet
    Color([0xea, 0x58, 0x0c]), // orange
    Color([0x08, 0x91, 0xb2]), // cyan
    Color([0xbe, 0x12, 0x3c]), // rose
    Color([0x16, 0xa3, 0x4a]), // green
    Color([0xca, 0x8a, 0x04]), // amber
    Color([0x47, 0x46, 0xe5]), // indigo
];

/// Colour assignment for one distinct-value set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: BTreeMap<u32, Color>,
}

fn mix_values(values: &[u32]) -> u64 {
    let mut hasher = DefaultHasher::new();
    values.hash(&mut hasher);
    hasher.finish()
}

impl Palette {
    /// Assign one colour per distinct altitude value.
    ///
    /// Deterministic in (`values`, `session_seed`): the same set under the
    /// same seed always produces the same palette, so colours cannot drift
    /// within one engine load even with caching disabled.
    pub fn generate(values: &[u32], session_seed: u64) -> Palette {
        let mut distinct: Vec<u32> = values.to_vec();
        distinct.sort_unstable();
        distinct.dedup();
        // Highest altitude picks first, matching legend order.
        distinct.reverse();

        let mut rng = StdRng::seed_from_u64(session_seed ^ mix_values(&distinct));
        let mut wheel = WHEEL;
        wheel.shuffle(&mut rng);

        if distinct.len() > wheel.len() {
            tracing::warn!(
                values = distinct.len(),
                wheel = wheel.len(),
                "more altitude values than distinct hues, recycling colours"
            );
        }

        let colors = distinct
            .iter()
            .enumerate()
            .map(|(i, &v)| (v, wheel[i % wheel.len()]))
            .collect();
        Palette { colors }
    }

    pub fn color_of(&self, altitude: u32) -> Option<Color> {
        self.colors.get(&altitude).copied()
    }

    pub fn not_admissible(&self) -> Color {
        NOT_ADMISSIBLE_TONE
    }

    pub fn unresolvable(&self) -> Color {
        UNRESOLVABLE_TONE
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_values_get_distinct_colors() {
        let palette = Palette::generate(&[300, 600, 200, 450], 42);
        let mut seen = std::collections::HashSet::new();
        for v in [300, 600, 200, 450] {
            let c = palette.color_of(v).expect("value must be coloured");
            assert!(seen.insert(c), "colour {} reused within the wheel", c.hex());
        }
    }

    #[test]
    fn reserved_tones_are_never_assigned_to_values() {
        // Exceed the wheel so recycling kicks in; even then the neutral tones
        // must stay reserved.
        let values: Vec<u32> = (0..25).map(|i| i * 100).collect();
        let palette = Palette::generate(&values, 7);
        for &v in &values {
            let c = palette.color_of(v).unwrap();
            assert_ne!(c, NOT_ADMISSIBLE_TONE);
            assert_ne!(c, UNRESOLVABLE_TONE);
        }
    }

    #[test]
    fn oversized_value_set_recycles_instead_of_failing() {
        let values: Vec<u32> = (0..25).map(|i| i * 100).collect();
        let palette = Palette::generate(&values, 7);
        assert_eq!(palette.len(), 25);
    }

    #[test]
    fn same_set_same_seed_is_stable() {
        let a = Palette::generate(&[300, 600], 99);
        let b = Palette::generate(&[600, 300], 99);
        assert_eq!(a, b, "value order and repetition must not affect the palette");
    }

    #[test]
    fn different_seeds_usually_differ() {
        let values = [100, 200, 300, 400, 500];
        // With 10!/(10-5)! orderings a collision across 8 seeds is implausible;
        // require at least one difference.
        let base = Palette::generate(&values, 0);
        let any_differ = (1..=8).any(|seed| Palette::generate(&values, seed) != base);
        assert!(any_differ, "palettes should vary across session seeds");
    }

    #[test]
    fn hex_formatting() {
        assert_eq!(Color([0x25, 0x63, 0xeb]).hex(), "#2563eb");
        assert_eq!(Color([0, 0, 0]).hex(), "#000000");
    }

    #[test]
    fn empty_value_set_yields_empty_palette() {
        let palette = Palette::generate(&[], 1);
        assert!(palette.is_empty());
        assert_eq!(palette.color_of(300), None);
    }
}
