//! Difficulty tier ("ND") normalization
//!
//! Threat definitions, rulebook tables and combat tables all spell the same
//! tier differently:
//! - symbolic enum members (`ChallengeLevel.QUARTER`)
//! - fractions (`1/4`)
//! - decimal or integer strings (`0.25`, `0,5`, `7`)
//! - letter codes for the two tiers above 20 (`S`, `S+`)
//!
//! Everything is folded into one canonical key string. Unknown input is
//! passed through (cleaned) and treated as "unrecognized" by callers.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// Magnitude assigned to tiers that cannot be recognized.
///
/// Exceeds every tier threshold, so unrecognized tiers are never flagged.
pub const SENTINEL_MAGNITUDE: f64 = 999.0;

/// Enum path prefix used by the threat data files.
pub const SYMBOL_PREFIX: &str = "ChallengeLevel.";

const LEVEL_NAMES: [&str; 20] = [
    "ONE", "TWO", "THREE", "FOUR", "FIVE", "SIX", "SEVEN", "EIGHT", "NINE", "TEN", "ELEVEN",
    "TWELVE", "THIRTEEN", "FOURTEEN", "FIFTEEN", "SIXTEEN", "SEVENTEEN", "EIGHTEEN", "NINETEEN",
    "TWENTY",
];

// ============================================================================
// Typed tier
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DifficultyTier {
    Quarter,
    Half,
    /// 1 through 20.
    Level(u8),
    /// Letter tier `S` (sorts as 21).
    S,
    /// Letter tier `S+` (sorts as 22).
    SPlus,
}

impl DifficultyTier {
    /// Every tier, lowest first.
    pub fn all() -> impl Iterator<Item = DifficultyTier> {
        [DifficultyTier::Quarter, DifficultyTier::Half]
            .into_iter()
            .chain((1..=20).map(DifficultyTier::Level))
            .chain([DifficultyTier::S, DifficultyTier::SPlus])
    }

    /// Canonical key (`"0.25"`, `"7"`, `"21"`, ...).
    pub fn key(&self) -> String {
        match self {
            DifficultyTier::Quarter => "0.25".to_string(),
            DifficultyTier::Half => "0.5".to_string(),
            DifficultyTier::Level(n) => n.to_string(),
            DifficultyTier::S => "21".to_string(),
            DifficultyTier::SPlus => "22".to_string(),
        }
    }

    pub fn magnitude(&self) -> f64 {
        match self {
            DifficultyTier::Quarter => 0.25,
            DifficultyTier::Half => 0.5,
            DifficultyTier::Level(n) => f64::from(*n),
            DifficultyTier::S => 21.0,
            DifficultyTier::SPlus => 22.0,
        }
    }

    /// Enum member name without the `ChallengeLevel.` prefix.
    pub fn symbol(&self) -> String {
        match self {
            DifficultyTier::Quarter => "QUARTER".to_string(),
            DifficultyTier::Half => "HALF".to_string(),
            DifficultyTier::Level(n) => usize::from(*n)
                .checked_sub(1)
                .and_then(|i| LEVEL_NAMES.get(i))
                .map_or_else(|| n.to_string(), |name| name.to_string()),
            DifficultyTier::S => "S".to_string(),
            DifficultyTier::SPlus => "S_PLUS".to_string(),
        }
    }

    /// Parse a canonical key back into a tier.
    pub fn from_key(key: &str) -> Option<DifficultyTier> {
        vocabulary().canonical.get(key).copied()
    }
}

impl fmt::Display for DifficultyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DifficultyTier::Quarter => write!(f, "1/4"),
            DifficultyTier::Half => write!(f, "1/2"),
            DifficultyTier::Level(n) => write!(f, "{n}"),
            DifficultyTier::S => write!(f, "S"),
            DifficultyTier::SPlus => write!(f, "S+"),
        }
    }
}

// ============================================================================
// Vocabulary
// ============================================================================

/// Immutable lookup from every known surface form to its tier.
#[derive(Debug, Clone)]
pub struct TierVocabulary {
    surface: HashMap<String, DifficultyTier>,
    canonical: HashMap<String, DifficultyTier>,
}

impl TierVocabulary {
    pub fn standard() -> Self {
        let mut surface = HashMap::new();
        let mut canonical = HashMap::new();

        for tier in DifficultyTier::all() {
            surface.insert(format!("{SYMBOL_PREFIX}{}", tier.symbol()), tier);
            surface.insert(tier.to_string(), tier);
            canonical.insert(tier.key(), tier);
        }

        Self { surface, canonical }
    }

    /// Resolve any known surface form (already cleaned) to its tier.
    pub fn lookup(&self, cleaned: &str) -> Option<DifficultyTier> {
        self.surface
            .get(cleaned)
            .or_else(|| self.canonical.get(cleaned))
            .copied()
    }

    pub fn normalize(&self, raw: &str) -> String {
        let cleaned = clean(raw);
        match self.lookup(&cleaned) {
            Some(tier) => tier.key(),
            None => cleaned,
        }
    }

    pub fn magnitude(&self, canonical: &str) -> f64 {
        self.canonical
            .get(canonical.trim())
            .map(DifficultyTier::magnitude)
            .unwrap_or(SENTINEL_MAGNITUDE)
    }
}

fn vocabulary() -> &'static TierVocabulary {
    static VOCABULARY: OnceLock<TierVocabulary> = OnceLock::new();
    VOCABULARY.get_or_init(TierVocabulary::standard)
}

fn clean(raw: &str) -> String {
    raw.trim().replace(['\r', '\n'], " ").replace(',', ".")
}

/// Canonical key for any tier spelling; unknown input comes back cleaned.
pub fn normalize(raw: &str) -> String {
    vocabulary().normalize(raw)
}

/// Numeric magnitude of a canonical key, or [`SENTINEL_MAGNITUDE`].
pub fn magnitude(canonical: &str) -> f64 {
    vocabulary().magnitude(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn every_surface_form_of_a_tier_agrees() {
        assert_eq!(normalize("ChallengeLevel.QUARTER"), "0.25");
        assert_eq!(normalize("1/4"), "0.25");
        assert_eq!(normalize("0.25"), "0.25");
        assert_eq!(normalize("0,25"), "0.25");

        assert_eq!(normalize("ChallengeLevel.HALF"), "0.5");
        assert_eq!(normalize(" 1/2 "), "0.5");
        assert_eq!(normalize("0,5"), "0.5");

        assert_eq!(normalize("ChallengeLevel.SEVENTEEN"), "17");
        assert_eq!(normalize("17"), "17");

        assert_eq!(normalize("ChallengeLevel.S"), "21");
        assert_eq!(normalize("S"), "21");
        assert_eq!(normalize("ChallengeLevel.S_PLUS"), "22");
        assert_eq!(normalize("S+"), "22");
    }

    #[test]
    fn unknown_input_passes_through_cleaned() {
        assert_eq!(normalize("  ChallengeLevel.BOGUS\n"), "ChallengeLevel.BOGUS");
        assert_eq!(normalize("7,5"), "7.5");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn magnitude_uses_sentinel_for_unrecognized_keys() {
        assert_eq!(magnitude("0.25"), 0.25);
        assert_eq!(magnitude("10"), 10.0);
        assert_eq!(magnitude("22"), 22.0);
        assert_eq!(magnitude(""), SENTINEL_MAGNITUDE);
        assert_eq!(magnitude("7.5"), SENTINEL_MAGNITUDE);
        assert_eq!(magnitude("ChallengeLevel.BOGUS"), SENTINEL_MAGNITUDE);
    }

    #[test]
    fn from_key_round_trips_every_tier() {
        for tier in DifficultyTier::all() {
            assert_eq!(DifficultyTier::from_key(&tier.key()), Some(tier));
        }
        assert_eq!(DifficultyTier::all().count(), 24);
    }

    #[test]
    fn out_of_range_levels_have_numeric_symbols() {
        assert_eq!(DifficultyTier::Level(1).symbol(), "ONE");
        assert_eq!(DifficultyTier::Level(20).symbol(), "TWENTY");
        assert_eq!(DifficultyTier::Level(0).symbol(), "0");
        assert_eq!(DifficultyTier::Level(21).symbol(), "21");
        assert_eq!(normalize("ChallengeLevel.0"), "ChallengeLevel.0");
    }

    fn known_form() -> impl Strategy<Value = String> {
        let forms: Vec<String> = DifficultyTier::all()
            .flat_map(|t| {
                [
                    format!("{SYMBOL_PREFIX}{}", t.symbol()),
                    t.to_string(),
                    t.key(),
                    t.key().replace('.', ","),
                ]
            })
            .collect();
        proptest::sample::select(forms)
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent_on_vocabulary(form in known_form()) {
            let once = normalize(&form);
            prop_assert_eq!(normalize(&once), once.clone());
            prop_assert!(DifficultyTier::from_key(&once).is_some());
        }

        #[test]
        fn normalize_never_panics(raw in ".{0,24}") {
            let once = normalize(&raw);
            prop_assert_eq!(normalize(&once), once);
        }
    }
}
