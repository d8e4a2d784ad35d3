//! Reference pathway configuration.
//!
//! The downstream pathway topology is plain configuration, not module state:
//! build a [`ReferencePathway`] once at process start, hand it to the engine,
//! and never mutate it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Embedded pathway template shipped with the crate.
const BUNDLED_PATHWAY_JSON: &str = include_str!("../assets/reference_pathway.json");

/// Downstream pathway topology: a named pathway and its node base rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferencePathway {
    /// Pathway identifier carried through cascade summaries.
    pub pathway: String,
    /// Pathway node name → base activation rate (1/h).
    pub downstream_nodes: BTreeMap<String, f64>,
}

impl ReferencePathway {
    /// Load the bundled pathway template.
    ///
    /// Falls back to [`ReferencePathway::minimal`] when the embedded asset is
    /// malformed or carries no nodes, so the cascade simulator never sees an
    /// empty node map through this path.
    pub fn bundled() -> Self {
        match serde_json::from_str::<ReferencePathway>(BUNDLED_PATHWAY_JSON) {
            Ok(pathway) if !pathway.downstream_nodes.is_empty() => pathway,
            Ok(_) => {
                log::warn!("bundled reference pathway has no nodes; using minimal default");
                Self::minimal()
            }
            Err(err) => {
                log::warn!("bundled reference pathway unreadable ({err}); using minimal default");
                Self::minimal()
            }
        }
    }

    /// Hardcoded 3-node default used when no richer template is available.
    pub fn minimal() -> Self {
        let mut downstream_nodes = BTreeMap::new();
        downstream_nodes.insert("CREB".to_string(), 0.18);
        downstream_nodes.insert("BDNF".to_string(), 0.09);
        downstream_nodes.insert("mTOR".to_string(), 0.05);
        Self {
            pathway: "monoamine_neurotrophin_cascade".to_string(),
            downstream_nodes,
        }
    }
}

impl Default for ReferencePathway {
    fn default() -> Self {
        Self::bundled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_pathway_has_core_nodes() {
        let pathway = ReferencePathway::bundled();
        assert_eq!(pathway.pathway, "monoamine_neurotrophin_cascade");
        for node in ["CREB", "BDNF", "mTOR"] {
            assert!(pathway.downstream_nodes.contains_key(node), "missing {node}");
        }
    }

    #[test]
    fn test_minimal_pathway_rates_positive() {
        let pathway = ReferencePathway::minimal();
        assert_eq!(pathway.downstream_nodes.len(), 3);
        assert!(pathway.downstream_nodes.values().all(|rate| *rate > 0.0));
    }

    #[test]
    fn test_bundled_parses_cleanly() {
        // The embedded asset itself should never hit the fallback.
        let parsed: ReferencePathway = serde_json::from_str(BUNDLED_PATHWAY_JSON).unwrap();
        assert!(!parsed.downstream_nodes.is_empty());
    }
}
