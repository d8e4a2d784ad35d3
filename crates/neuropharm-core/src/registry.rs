//! Receptor registry collaborator.
//!
//! The engine consumes the registry through the [`ReceptorRegistry`] trait:
//! alias canonicalization, per-receptor behaviour-axis weight profiles, and
//! the mechanism-to-factor table. [`StaticRegistry`] is the bundled
//! implementation; deployments backed by a live knowledge graph substitute
//! their own.

use std::collections::BTreeMap;

use crate::engagement::Mechanism;

/// Behaviour-axis weight profile for one receptor, keyed by axis name.
pub type AxisWeights = BTreeMap<String, f64>;

/// Collaborator interface between the engine and a receptor registry.
pub trait ReceptorRegistry: Send + Sync {
    /// Map any receptor alias to one canonical identifier.
    /// Unknown names pass through unchanged.
    fn canonicalize(&self, name: &str) -> String;

    /// Axis-weight profile for a canonical receptor, or `None` when the
    /// registry has no profile. The orchestrator treats `None` as "skip axis
    /// contribution, keep bookkeeping".
    fn axis_weights(&self, canonical: &str) -> Option<&AxisWeights>;

    /// Signed numeric factor for a pharmacological mechanism.
    ///
    /// Total over the closed [`Mechanism`] enum; unsupported mechanism
    /// *strings* fail earlier, at parse time.
    fn mechanism_factor(&self, mechanism: Mechanism) -> f64 {
        match mechanism {
            Mechanism::Agonist => 1.0,
            Mechanism::Antagonist => -1.0,
            Mechanism::Partial => 0.5,
            Mechanism::Inverse => -1.3,
        }
    }
}

// ---------------------------------------------------------------------------
// Bundled static registry
// ---------------------------------------------------------------------------

/// Per-unit activation weights on the nine behaviour axes. Heuristic values;
/// positive raises the axis, negative lowers it.
const RECEPTOR_AXIS_TABLE: &[(&str, &[(&str, f64)])] = &[
    (
        "5-HT1A",
        &[
            ("drive", 0.2),
            ("apathy", -0.2),
            ("motivation", 0.1),
            ("cognitive_flexibility", 0.1),
            ("anxiety", -0.4),
            ("sleep_quality", 0.2),
            ("social_affiliation", 0.25),
            ("exploration", 0.18),
            ("salience", -0.12),
        ],
    ),
    (
        "5-HT1B",
        &[
            ("drive", -0.3),
            ("apathy", 0.2),
            ("motivation", -0.1),
            ("anxiety", 0.1),
            ("social_affiliation", -0.05),
            ("exploration", -0.2),
            ("salience", 0.15),
        ],
    ),
    (
        "5-HT2A",
        &[
            ("drive", 0.1),
            ("apathy", -0.1),
            ("motivation", 0.2),
            ("cognitive_flexibility", 0.4),
            ("anxiety", 0.3),
            ("sleep_quality", -0.2),
            ("social_affiliation", 0.05),
            ("exploration", 0.3),
            ("salience", 0.35),
        ],
    ),
    (
        "5-HT2C",
        &[
            ("drive", -0.4),
            ("apathy", 0.5),
            ("motivation", -0.3),
            ("cognitive_flexibility", -0.2),
            ("anxiety", 0.4),
            ("sleep_quality", -0.1),
            ("social_affiliation", -0.25),
            ("exploration", -0.4),
            ("salience", 0.18),
        ],
    ),
    (
        "5-HT3",
        &[
            ("drive", -0.1),
            ("apathy", 0.2),
            ("motivation", -0.1),
            ("cognitive_flexibility", -0.2),
            ("anxiety", 0.2),
            ("sleep_quality", -0.3),
            ("social_affiliation", -0.15),
            ("exploration", -0.25),
            ("salience", 0.22),
        ],
    ),
    (
        "5-HT7",
        &[
            ("drive", 0.2),
            ("apathy", -0.2),
            ("motivation", 0.3),
            ("cognitive_flexibility", 0.3),
            ("anxiety", 0.1),
            ("sleep_quality", 0.3),
            ("social_affiliation", 0.15),
            ("exploration", 0.25),
            ("salience", 0.1),
        ],
    ),
    (
        "MT2",
        &[
            ("drive", 0.1),
            ("apathy", -0.2),
            ("motivation", 0.1),
            ("cognitive_flexibility", 0.1),
            ("anxiety", -0.1),
            ("sleep_quality", 0.4),
            ("social_affiliation", 0.05),
            ("exploration", 0.05),
            ("salience", -0.05),
        ],
    ),
    (
        "MOR",
        &[
            ("drive", 0.35),
            ("apathy", -0.45),
            ("motivation", 0.4),
            ("cognitive_flexibility", 0.1),
            ("anxiety", -0.3),
            ("sleep_quality", 0.15),
            ("social_affiliation", 0.6),
            ("exploration", 0.2),
            ("salience", -0.05),
        ],
    ),
    (
        "A2A",
        &[
            ("drive", -0.2),
            ("apathy", 0.3),
            ("motivation", -0.25),
            ("cognitive_flexibility", 0.1),
            ("anxiety", 0.05),
            ("sleep_quality", -0.05),
            ("social_affiliation", -0.1),
            ("exploration", -0.2),
            ("salience", 0.15),
        ],
    ),
    (
        "TRKB",
        &[
            ("drive", 0.3),
            ("apathy", -0.35),
            ("motivation", 0.35),
            ("cognitive_flexibility", 0.25),
            ("anxiety", -0.2),
            ("sleep_quality", 0.15),
            ("social_affiliation", 0.32),
            ("exploration", 0.22),
            ("salience", 0.18),
        ],
    ),
    (
        "OXTR",
        &[
            ("drive", 0.05),
            ("apathy", -0.1),
            ("motivation", 0.15),
            ("cognitive_flexibility", 0.05),
            ("anxiety", -0.25),
            ("sleep_quality", 0.05),
            ("social_affiliation", 0.55),
            ("exploration", 0.1),
            ("salience", 0.12),
        ],
    ),
    (
        "ADRA2A",
        &[
            ("drive", 0.05),
            ("apathy", -0.22),
            ("motivation", 0.18),
            ("cognitive_flexibility", 0.35),
            ("anxiety", -0.18),
            ("sleep_quality", 0.1),
            ("social_affiliation", 0.12),
            ("exploration", -0.28),
            ("salience", -0.08),
        ],
    ),
];

/// Gene-symbol and shorthand aliases that do not reduce to a canonical name
/// through prefix rewriting alone.
const ALIAS_TABLE: &[(&str, &str)] = &[
    ("NTRK2", "TRKB"),
    ("BDNFR", "TRKB"),
    ("ALPHA2A", "ADRA2A"),
    ("ADRENALPHA2A", "ADRA2A"),
    ("OPRM1", "MOR"),
    ("MTNR1B", "MT2"),
    ("ADORA2A", "A2A"),
];

/// Bundled registry with a fixed serotonin/melatonin/opioid/adrenergic table.
pub struct StaticRegistry {
    profiles: BTreeMap<String, AxisWeights>,
}

impl StaticRegistry {
    /// Build the bundled registry. Cheap enough to construct at startup and
    /// share behind an `Arc`; the tables are never mutated afterwards.
    pub fn bundled() -> Self {
        let mut profiles = BTreeMap::new();
        for (receptor, weights) in RECEPTOR_AXIS_TABLE {
            let profile: AxisWeights = weights
                .iter()
                .map(|(axis, value)| (axis.to_string(), *value))
                .collect();
            profiles.insert(receptor.to_string(), profile);
        }
        Self { profiles }
    }

    /// Canonical receptor names known to the bundled table.
    pub fn known_receptors(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    fn lookup_compact(&self, compact: &str) -> Option<String> {
        self.profiles
            .keys()
            .find(|canon| canon.replace('-', "") == compact)
            .cloned()
    }
}

impl ReceptorRegistry for StaticRegistry {
    fn canonicalize(&self, name: &str) -> String {
        let raw = name.trim().to_ascii_uppercase();
        if self.profiles.contains_key(&raw) {
            return raw;
        }

        let mut compact: String = raw.chars().filter(|c| *c != ' ' && *c != '_').collect();
        if self.profiles.contains_key(&compact) {
            return compact;
        }

        // Serotonin receptor shorthands: 5HT2A and the HTR2A gene symbol both
        // reduce to 5-HT2A.
        if let Some(suffix) = compact.strip_prefix("5HT") {
            compact = format!("5-HT{suffix}");
        } else if let Some(suffix) = compact.strip_prefix("HTR") {
            let candidate = format!("5-HT{suffix}");
            if self.profiles.contains_key(&candidate) {
                return candidate;
            }
        }
        if self.profiles.contains_key(&compact) {
            return compact;
        }

        let compact_no_dash = compact.replace('-', "");
        for (alias, target) in ALIAS_TABLE {
            if compact_no_dash == *alias && self.profiles.contains_key(*target) {
                return (*target).to_string();
            }
        }
        if let Some(canon) = self.lookup_compact(&compact_no_dash) {
            return canon;
        }

        raw
    }

    fn axis_weights(&self, canonical: &str) -> Option<&AxisWeights> {
        self.profiles.get(canonical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_gene_symbol() {
        let registry = StaticRegistry::bundled();
        assert_eq!(registry.canonicalize("HTR1A"), "5-HT1A");
        assert_eq!(registry.canonicalize("htr2a"), "5-HT2A");
    }

    #[test]
    fn test_canonicalize_shorthand() {
        let registry = StaticRegistry::bundled();
        assert_eq!(registry.canonicalize("5HT1A"), "5-HT1A");
        assert_eq!(registry.canonicalize("5-HT7"), "5-HT7");
        assert_eq!(registry.canonicalize(" 5_ht2c "), "5-HT2C");
    }

    #[test]
    fn test_canonicalize_alias_table() {
        let registry = StaticRegistry::bundled();
        assert_eq!(registry.canonicalize("NTRK2"), "TRKB");
        assert_eq!(registry.canonicalize("OPRM1"), "MOR");
        assert_eq!(registry.canonicalize("ADORA2A"), "A2A");
    }

    #[test]
    fn test_canonicalize_unknown_passes_through() {
        let registry = StaticRegistry::bundled();
        assert_eq!(registry.canonicalize("GPR139"), "GPR139");
    }

    #[test]
    fn test_axis_weights_known_and_unknown() {
        let registry = StaticRegistry::bundled();
        let weights = registry.axis_weights("5-HT1A").expect("profile");
        assert!((weights["anxiety"] + 0.4).abs() < 1e-12);
        assert!(registry.axis_weights("GPR139").is_none());
    }

    #[test]
    fn test_mechanism_factors() {
        let registry = StaticRegistry::bundled();
        assert_eq!(registry.mechanism_factor(Mechanism::Agonist), 1.0);
        assert_eq!(registry.mechanism_factor(Mechanism::Antagonist), -1.0);
        assert_eq!(registry.mechanism_factor(Mechanism::Partial), 0.5);
        assert_eq!(registry.mechanism_factor(Mechanism::Inverse), -1.3);
    }

    #[test]
    fn test_every_profile_names_the_core_axes() {
        let registry = StaticRegistry::bundled();
        for receptor in registry.known_receptors().collect::<Vec<_>>() {
            let weights = registry.axis_weights(receptor).expect("profile");
            assert!(weights.contains_key("drive"), "{receptor} missing drive");
            assert!(weights.contains_key("anxiety"), "{receptor} missing anxiety");
        }
    }
}
