//! Receptor engagement value objects and the normalizer/merger.
//!
//! Inputs arrive keyed by whatever identifier the upstream knowledge-graph
//! adapter used. The normalizer canonicalizes every key through the registry
//! and merges inputs that collapse onto the same canonical receptor.
//!
//! The merge policy deliberately mixes two strategies:
//! - evidence-weighted averaging for `occupancy` and `kg_weight`,
//! - max-evidence winner-take-all for `name` and `mechanism`.
//!
//! Mechanism is never blended: half-agonist/half-antagonist has no
//! pharmacological meaning.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::registry::ReceptorRegistry;
use crate::series::clamp_range;

/// Evidence weights below this floor are raised to it before averaging, so a
/// group of zero-evidence inputs still merges without dividing by zero.
const EVIDENCE_FLOOR: f64 = 1e-3;

/// Upper bound for knowledge-graph interaction weights.
pub const KG_WEIGHT_MAX: f64 = 1.2;

/// Upper bound for evidence confidence.
pub const EVIDENCE_MAX: f64 = 0.99;

/// Pharmacological action of a ligand at a receptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mechanism {
    /// Full activation.
    Agonist,
    /// Blockade.
    Antagonist,
    /// Partial activation (buspirone-like).
    Partial,
    /// Suppresses constitutive signalling below baseline.
    Inverse,
}

impl Mechanism {
    /// All supported mechanisms, for iteration in tests and diagnostics.
    pub const ALL: [Mechanism; 4] = [
        Mechanism::Agonist,
        Mechanism::Antagonist,
        Mechanism::Partial,
        Mechanism::Inverse,
    ];
}

impl std::fmt::Display for Mechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Agonist => write!(f, "agonist"),
            Self::Antagonist => write!(f, "antagonist"),
            Self::Partial => write!(f, "partial"),
            Self::Inverse => write!(f, "inverse"),
        }
    }
}

impl FromStr for Mechanism {
    type Err = EngineError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "agonist" => Ok(Self::Agonist),
            "antagonist" => Ok(Self::Antagonist),
            "partial" => Ok(Self::Partial),
            "inverse" => Ok(Self::Inverse),
            _ => Err(EngineError::UnsupportedMechanism(raw.to_string())),
        }
    }
}

/// Dosing duration class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Regimen {
    /// Single/short exposure.
    #[default]
    Acute,
    /// Repeated dosing at a fixed interval.
    Chronic,
}

impl Regimen {
    /// Simulation horizon in hours.
    pub fn horizon_hours(self) -> f64 {
        match self {
            Self::Acute => 24.0,
            Self::Chronic => 168.0,
        }
    }

    /// Cascade stimulus multiplier.
    pub fn stimulus(self) -> f64 {
        match self {
            Self::Acute => 1.0,
            Self::Chronic => 1.2,
        }
    }

    /// Plasma clearance rate (1/h) used by the orchestrator.
    pub fn clearance_rate(self) -> f64 {
        match self {
            Self::Acute => 0.15,
            Self::Chronic => 0.08,
        }
    }
}

impl std::fmt::Display for Regimen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Acute => write!(f, "acute"),
            Self::Chronic => write!(f, "chronic"),
        }
    }
}

/// Knowledge-graph-derived engagement of a single receptor.
///
/// Immutable value object produced by the upstream graph adapter. The engine
/// only ever replaces it wholesale (when merging duplicates), never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceptorEngagement {
    /// Raw or canonical receptor name.
    pub name: String,
    /// Fraction of the receptor population bound, [0, 1].
    pub occupancy: f64,
    /// Pharmacological action.
    pub mechanism: Mechanism,
    /// Interaction strength derived from graph evidence, nominally [0.05, 1.2].
    pub kg_weight: f64,
    /// Confidence that the interaction is real, [0, 0.99].
    pub evidence: f64,
    /// Normalized binding affinity, when the graph provides one.
    #[serde(default)]
    pub affinity: Option<f64>,
    /// Normalized regional expression, [0, 1], when the graph provides one.
    #[serde(default)]
    pub expression: Option<f64>,
    /// Provenance labels for the supporting evidence.
    #[serde(default)]
    pub evidence_sources: BTreeSet<String>,
}

impl ReceptorEngagement {
    /// Minimal constructor used throughout the tests; optional fields unset.
    pub fn new(
        name: impl Into<String>,
        occupancy: f64,
        mechanism: Mechanism,
        kg_weight: f64,
        evidence: f64,
    ) -> Self {
        Self {
            name: name.into(),
            occupancy,
            mechanism,
            kg_weight,
            evidence,
            affinity: None,
            expression: None,
            evidence_sources: BTreeSet::new(),
        }
    }

    /// Return a copy with every range-bounded field clamped to its documented
    /// range. Applied on ingest and after merging.
    pub fn clamped(&self) -> Self {
        Self {
            name: self.name.clone(),
            occupancy: clamp_range(self.occupancy, 0.0, 1.0),
            mechanism: self.mechanism,
            kg_weight: clamp_range(self.kg_weight, 0.0, KG_WEIGHT_MAX),
            evidence: clamp_range(self.evidence, 0.0, EVIDENCE_MAX),
            affinity: self.affinity,
            expression: self.expression.map(|e| clamp_range(e, 0.0, 1.0)),
            evidence_sources: self.evidence_sources.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Merging
// ---------------------------------------------------------------------------

/// Accumulator for merging engagements that share a canonical identity.
///
/// Folding through an accumulator (instead of chaining pairwise averages)
/// keeps the result invariant under input permutation: the weighted averages
/// are computed over the whole group, evidence is a running max, and the
/// dominant input is the one with the highest evidence seen so far.
#[derive(Debug, Clone)]
struct EngagementAccumulator {
    occupancy_weighted: f64,
    kg_weight_weighted: f64,
    evidence_weight_sum: f64,
    evidence_max: f64,
    dominant: ReceptorEngagement,
    affinities: Vec<f64>,
    expressions: Vec<f64>,
    sources: BTreeSet<String>,
}

impl EngagementAccumulator {
    fn start(first: &ReceptorEngagement) -> Self {
        let w = first.evidence.max(EVIDENCE_FLOOR);
        Self {
            occupancy_weighted: first.occupancy * w,
            kg_weight_weighted: first.kg_weight * w,
            evidence_weight_sum: w,
            evidence_max: first.evidence,
            dominant: first.clone(),
            affinities: first.affinity.into_iter().collect(),
            expressions: first.expression.into_iter().collect(),
            sources: first.evidence_sources.clone(),
        }
    }

    fn fold(&mut self, next: &ReceptorEngagement) {
        let w = next.evidence.max(EVIDENCE_FLOOR);
        self.occupancy_weighted += next.occupancy * w;
        self.kg_weight_weighted += next.kg_weight * w;
        self.evidence_weight_sum += w;
        if next.evidence > self.evidence_max {
            self.evidence_max = next.evidence;
            self.dominant = next.clone();
        }
        self.affinities.extend(next.affinity);
        self.expressions.extend(next.expression);
        self.sources.extend(next.evidence_sources.iter().cloned());
    }

    fn finish(self) -> ReceptorEngagement {
        let denom = self.evidence_weight_sum.max(EVIDENCE_FLOOR);
        let mean_of = |values: &[f64]| -> Option<f64> {
            if values.is_empty() {
                None
            } else {
                Some(values.iter().sum::<f64>() / values.len() as f64)
            }
        };
        ReceptorEngagement {
            name: self.dominant.name,
            occupancy: self.occupancy_weighted / denom,
            mechanism: self.dominant.mechanism,
            kg_weight: self.kg_weight_weighted / denom,
            evidence: self.evidence_max,
            affinity: mean_of(&self.affinities),
            expression: mean_of(&self.expressions),
            evidence_sources: self.sources,
        }
        .clamped()
    }
}

/// Merge a non-empty group of engagements that canonicalize to one receptor.
///
/// Panics in debug builds when called with an empty group; the normalizer
/// never does.
pub fn merge_engagements(group: &[ReceptorEngagement]) -> ReceptorEngagement {
    debug_assert!(!group.is_empty(), "merge group must not be empty");
    let mut acc = EngagementAccumulator::start(&group[0]);
    for engagement in &group[1..] {
        acc.fold(engagement);
    }
    acc.finish()
}

/// Canonicalize a raw-name → engagement map and merge duplicates.
///
/// Returns a map keyed by canonical receptor name. Iteration over the input
/// is in sorted key order, so the output is deterministic; the merge itself
/// is additionally permutation-invariant.
pub fn normalize_engagements(
    receptors: &BTreeMap<String, ReceptorEngagement>,
    registry: &dyn ReceptorRegistry,
) -> BTreeMap<String, ReceptorEngagement> {
    let mut groups: BTreeMap<String, Vec<ReceptorEngagement>> = BTreeMap::new();
    for (raw_name, engagement) in receptors {
        let canon = registry.canonicalize(raw_name);
        groups.entry(canon).or_default().push(engagement.clamped());
    }

    groups
        .into_iter()
        .map(|(canon, group)| (canon, merge_engagements(&group)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::StaticRegistry;

    fn engagement(occ: f64, mech: Mechanism, weight: f64, evidence: f64) -> ReceptorEngagement {
        ReceptorEngagement::new("5-HT1A", occ, mech, weight, evidence)
    }

    // -----------------------------------------------------------------------
    // Mechanism / Regimen parsing
    // -----------------------------------------------------------------------

    #[test]
    fn test_mechanism_round_trips_through_str() {
        for mech in Mechanism::ALL {
            assert_eq!(mech.to_string().parse::<Mechanism>().unwrap(), mech);
        }
    }

    #[test]
    fn test_mechanism_rejects_unknown_string() {
        let err = "modulator".parse::<Mechanism>().unwrap_err();
        assert_eq!(err, EngineError::UnsupportedMechanism("modulator".into()));
    }

    #[test]
    fn test_regimen_horizons() {
        assert_eq!(Regimen::Acute.horizon_hours(), 24.0);
        assert_eq!(Regimen::Chronic.horizon_hours(), 168.0);
        assert!(Regimen::Chronic.stimulus() > Regimen::Acute.stimulus());
        assert!(Regimen::Chronic.clearance_rate() < Regimen::Acute.clearance_rate());
    }

    // -----------------------------------------------------------------------
    // Merge semantics
    // -----------------------------------------------------------------------

    #[test]
    fn test_merge_weighted_average_occupancy() {
        let a = engagement(0.8, Mechanism::Agonist, 0.9, 0.6);
        let b = engagement(0.2, Mechanism::Antagonist, 0.3, 0.3);
        let merged = merge_engagements(&[a, b]);
        let expected_occ = (0.8 * 0.6 + 0.2 * 0.3) / (0.6 + 0.3);
        assert!((merged.occupancy - expected_occ).abs() < 1e-12);
        let expected_weight = (0.9 * 0.6 + 0.3 * 0.3) / (0.6 + 0.3);
        assert!((merged.kg_weight - expected_weight).abs() < 1e-12);
    }

    #[test]
    fn test_merge_dominant_wins_name_and_mechanism() {
        let mut a = engagement(0.8, Mechanism::Agonist, 0.9, 0.4);
        a.name = "weak".into();
        let mut b = engagement(0.2, Mechanism::Antagonist, 0.3, 0.7);
        b.name = "strong".into();
        let merged = merge_engagements(&[a, b]);
        assert_eq!(merged.name, "strong");
        assert_eq!(merged.mechanism, Mechanism::Antagonist);
        assert!((merged.evidence - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_merge_optional_fields_mean_over_provided() {
        let mut a = engagement(0.5, Mechanism::Agonist, 0.5, 0.5);
        a.affinity = Some(0.4);
        let mut b = engagement(0.5, Mechanism::Agonist, 0.5, 0.6);
        b.affinity = Some(0.8);
        b.expression = Some(0.9);
        let merged = merge_engagements(&[a, b]);
        assert!((merged.affinity.unwrap() - 0.6).abs() < 1e-12);
        assert!((merged.expression.unwrap() - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_merge_optional_fields_none_when_absent() {
        let a = engagement(0.5, Mechanism::Agonist, 0.5, 0.5);
        let b = engagement(0.4, Mechanism::Partial, 0.5, 0.6);
        let merged = merge_engagements(&[a, b]);
        assert!(merged.affinity.is_none());
        assert!(merged.expression.is_none());
    }

    #[test]
    fn test_merge_sources_union() {
        let mut a = engagement(0.5, Mechanism::Agonist, 0.5, 0.5);
        a.evidence_sources.insert("chembl".into());
        let mut b = engagement(0.4, Mechanism::Agonist, 0.5, 0.6);
        b.evidence_sources.insert("pdsp".into());
        b.evidence_sources.insert("chembl".into());
        let merged = merge_engagements(&[a, b]);
        assert_eq!(merged.evidence_sources.len(), 2);
    }

    #[test]
    fn test_merge_zero_evidence_does_not_divide_by_zero() {
        let a = engagement(0.7, Mechanism::Agonist, 0.8, 0.0);
        let b = engagement(0.3, Mechanism::Agonist, 0.4, 0.0);
        let merged = merge_engagements(&[a, b]);
        assert!(merged.occupancy.is_finite());
        assert!((merged.occupancy - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_merge_clamps_result() {
        let a = engagement(1.7, Mechanism::Agonist, 2.4, 1.5);
        let merged = merge_engagements(&[a]);
        assert!(merged.occupancy <= 1.0);
        assert!(merged.kg_weight <= KG_WEIGHT_MAX);
        assert!(merged.evidence <= EVIDENCE_MAX);
    }

    #[test]
    fn test_merge_permutation_invariant() {
        let a = engagement(0.8, Mechanism::Agonist, 0.9, 0.6);
        let b = engagement(0.2, Mechanism::Antagonist, 0.3, 0.75);
        let mut c = engagement(0.5, Mechanism::Partial, 0.6, 0.5);
        c.affinity = Some(0.3);

        let orders: [[&ReceptorEngagement; 3]; 6] = [
            [&a, &b, &c],
            [&a, &c, &b],
            [&b, &a, &c],
            [&b, &c, &a],
            [&c, &a, &b],
            [&c, &b, &a],
        ];
        let reference = merge_engagements(&[a.clone(), b.clone(), c.clone()]);
        for order in orders {
            let group: Vec<_> = order.into_iter().cloned().collect();
            let merged = merge_engagements(&group);
            assert!((merged.occupancy - reference.occupancy).abs() < 1e-9);
            assert!((merged.kg_weight - reference.kg_weight).abs() < 1e-9);
            assert!((merged.evidence - reference.evidence).abs() < 1e-9);
            assert_eq!(merged.mechanism, reference.mechanism);
            assert_eq!(merged.name, reference.name);
        }
    }

    // -----------------------------------------------------------------------
    // Normalization
    // -----------------------------------------------------------------------

    #[test]
    fn test_normalize_merges_aliases() {
        let registry = StaticRegistry::bundled();
        let mut receptors = BTreeMap::new();
        receptors.insert(
            "HTR1A".to_string(),
            engagement(0.7, Mechanism::Agonist, 0.8, 0.75),
        );
        receptors.insert(
            "5HT1A".to_string(),
            engagement(0.5, Mechanism::Partial, 0.6, 0.4),
        );
        let normalized = normalize_engagements(&receptors, &registry);
        assert_eq!(normalized.len(), 1);
        let merged = normalized.get("5-HT1A").expect("canonical key");
        // Dominant input is the higher-evidence agonist.
        assert_eq!(merged.mechanism, Mechanism::Agonist);
    }

    #[test]
    fn test_normalize_passes_unknown_names_through() {
        let registry = StaticRegistry::bundled();
        let mut receptors = BTreeMap::new();
        receptors.insert(
            "XYZ9".to_string(),
            engagement(0.4, Mechanism::Agonist, 0.5, 0.5),
        );
        let normalized = normalize_engagements(&receptors, &registry);
        assert!(normalized.contains_key("XYZ9"));
    }
}
