//! Simulation engine orchestrating the full pipeline.
//!
//! One `run()` call walks a linear pipeline: normalize and merge receptor
//! engagements, aggregate them into a molecular cascade, derive neuromodulator
//! drive scalars, simulate the PK/PD exposure profile, feed both into the
//! circuit response, and compose behaviour scores plus a shared confidence
//! value. No state is carried between calls; an engine instance holds only
//! its time step, the reference pathway, and the registry handle, so one
//! instance can serve concurrent callers.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::circuit::{
    simulate_circuit_with, AnalyticCircuit, CircuitBackend, CircuitParameters, GlobalMetrics,
    NeuromodulatorDrive,
};
use crate::engagement::{
    normalize_engagements, Mechanism, ReceptorEngagement, Regimen, KG_WEIGHT_MAX,
};
use crate::error::EngineError;
use crate::molecular::{
    simulate_cascade_with, AnalyticCascade, CascadeBackend, CascadeParams, CascadeSummary,
};
use crate::pkpd::{
    simulate_pkpd_with, AnalyticPkPd, PkPdBackend, PkPdParameters, PkPdSummary,
};
use crate::reference::ReferencePathway;
use crate::registry::ReceptorRegistry;
use crate::series::{self, arange, clamp01, clamp_range};

/// Fixed circuit topology used by the composer.
const REGIONS: [&str; 3] = ["prefrontal", "striatum", "amygdala"];

/// Baseline coupling before neuromodulator drive is added.
const COUPLING_BASELINE: f64 = 0.3;

/// Knowledge-graph confidence assumed when no receptor evidence is present.
const DEFAULT_KG_CONFIDENCE: f64 = 0.5;

/// One simulation request. Read-only for the duration of the call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineRequest {
    /// Raw-or-canonical receptor name → engagement. Keys are not required to
    /// be unique by canonical identity; duplicates are merged.
    pub receptors: BTreeMap<String, ReceptorEngagement>,
    #[serde(default)]
    pub regimen: Regimen,
    #[serde(default)]
    pub adhd: bool,
    #[serde(default)]
    pub gut_bias: bool,
    /// Paraventricular-thalamus weighting on the dopamine drive, [0, 1].
    #[serde(default = "default_pvt_weight")]
    pub pvt_weight: f64,
}

fn default_pvt_weight() -> f64 {
    0.5
}

/// Post-merge receptor bookkeeping surfaced in the diagnostics, including
/// receptors with no axis profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceptorContribution {
    pub occupancy: f64,
    pub mechanism: Mechanism,
    pub kg_weight: f64,
    pub affinity: Option<f64>,
    pub expression: Option<f64>,
    pub evidence: f64,
    pub sources: BTreeSet<String>,
}

/// Circuit diagnostics carried into the module summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitSummary {
    pub metrics: GlobalMetrics,
    pub backend: String,
}

/// Per-module diagnostic summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleSummaries {
    pub molecular: CascadeSummary,
    pub pkpd: PkPdSummary,
    pub circuit: CircuitSummary,
    /// Canonical receptor name → merged input bookkeeping.
    pub receptor_inputs: BTreeMap<String, ReceptorContribution>,
}

/// Composite result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineResult {
    /// Metric name → score in [0, 100].
    pub scores: BTreeMap<String, f64>,
    /// Shared time axis in hours, starting at 0.0.
    pub timepoints: Vec<f64>,
    /// Named trajectories, each aligned 1:1 with `timepoints`.
    pub trajectories: BTreeMap<String, Vec<f64>>,
    pub module_summaries: ModuleSummaries,
    /// Metric name → confidence in [0.05, 0.99]; identical across metrics.
    pub confidence: BTreeMap<String, f64>,
}

/// Backend selection for one run. All three default to the analytic
/// implementations; heavier solvers are swapped in per field.
pub struct EngineBackends<'a> {
    pub cascade: &'a dyn CascadeBackend,
    pub pkpd: &'a dyn PkPdBackend,
    pub circuit: &'a dyn CircuitBackend,
}

impl EngineBackends<'_> {
    /// The always-available analytic trio.
    pub fn analytic() -> EngineBackends<'static> {
        EngineBackends {
            cascade: &AnalyticCascade,
            pkpd: &AnalyticPkPd,
            circuit: &AnalyticCircuit,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Pipeline orchestrator. Construct once, share freely.
pub struct SimulationEngine {
    time_step: f64,
    pathway: ReferencePathway,
    registry: Arc<dyn ReceptorRegistry>,
}

impl SimulationEngine {
    /// Build an engine with an explicit pathway and registry.
    ///
    /// An empty pathway node map is replaced by the minimal default up front,
    /// so the cascade simulator never sees it.
    pub fn new(
        time_step: f64,
        pathway: ReferencePathway,
        registry: Arc<dyn ReceptorRegistry>,
    ) -> Self {
        let pathway = if pathway.downstream_nodes.is_empty() {
            log::warn!("reference pathway has no nodes; substituting minimal default");
            ReferencePathway::minimal()
        } else {
            pathway
        };
        Self {
            time_step: time_step.max(1e-3),
            pathway,
            registry,
        }
    }

    /// Build an engine over the bundled pathway and registry.
    pub fn bundled(time_step: f64) -> Self {
        Self::new(
            time_step,
            ReferencePathway::bundled(),
            Arc::new(crate::registry::StaticRegistry::bundled()),
        )
    }

    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    /// Run the pipeline with the analytic backends.
    pub fn run(&self, request: &EngineRequest) -> Result<EngineResult, EngineError> {
        self.run_with(request, &EngineBackends::analytic())
    }

    /// Run the pipeline with explicit backends.
    pub fn run_with(
        &self,
        request: &EngineRequest,
        backends: &EngineBackends<'_>,
    ) -> Result<EngineResult, EngineError> {
        let normalized = normalize_engagements(&request.receptors, self.registry.as_ref());
        log::debug!(
            "engine run: {} raw receptors, {} canonical, regimen={}",
            request.receptors.len(),
            normalized.len(),
            request.regimen
        );

        let mut receptor_states = BTreeMap::new();
        let mut receptor_weights = BTreeMap::new();
        let mut receptor_evidence = BTreeMap::new();
        let mut axis_deltas: BTreeMap<String, f64> = BTreeMap::new();
        let mut receptor_inputs = BTreeMap::new();

        for (canon, engagement) in &normalized {
            let weight = adjusted_weight(engagement);
            receptor_states.insert(canon.clone(), engagement.occupancy);
            receptor_weights.insert(canon.clone(), weight);
            receptor_evidence.insert(canon.clone(), engagement.evidence);
            receptor_inputs.insert(
                canon.clone(),
                ReceptorContribution {
                    occupancy: engagement.occupancy,
                    mechanism: engagement.mechanism,
                    kg_weight: engagement.kg_weight,
                    affinity: engagement.affinity,
                    expression: engagement.expression,
                    evidence: engagement.evidence,
                    sources: engagement.evidence_sources.clone(),
                },
            );

            // Receptors without an axis profile still contribute to the
            // cascade and to the bookkeeping above, just not to axis deltas.
            if let Some(profile) = self.registry.axis_weights(canon) {
                let factor = self.registry.mechanism_factor(engagement.mechanism);
                let scale =
                    engagement.occupancy * weight * factor * (0.5 + 0.5 * engagement.evidence);
                for (axis, axis_weight) in profile {
                    *axis_deltas.entry(axis.clone()).or_insert(0.0) += scale * axis_weight;
                }
            }
        }

        let timepoints = arange(0.0, request.regimen.horizon_hours(), self.time_step);

        let cascade_params = CascadeParams {
            pathway: self.pathway.pathway.clone(),
            receptor_states: receptor_states.clone(),
            receptor_weights,
            receptor_evidence: receptor_evidence.clone(),
            downstream_nodes: self.pathway.downstream_nodes.clone(),
            stimulus: request.regimen.stimulus(),
            timepoints: timepoints.clone(),
        };
        let cascade = simulate_cascade_with(&cascade_params, backends.cascade)?;

        let pvt = clamp01(request.pvt_weight);
        let mut serotonin = cascade.summary.steady_state.tanh();
        let mut dopamine = (cascade.summary.transient_peak * (1.0 - 0.3 * pvt)).tanh();
        let mut noradrenaline = (0.5 * cascade.summary.activation_index).tanh();
        if request.adhd {
            dopamine *= 0.85;
            noradrenaline *= 0.9;
        }
        if request.gut_bias {
            serotonin *= 1.05;
        }

        let occupancies: Vec<f64> = receptor_states.values().copied().collect();
        let evidences: Vec<f64> = receptor_evidence.values().copied().collect();
        let kg_confidence = if evidences.is_empty() {
            DEFAULT_KG_CONFIDENCE
        } else {
            series::mean(&evidences)
        };

        let mut pkpd_params = PkPdParameters::composite_ssri(request.regimen, self.time_step);
        pkpd_params.dose_mg = 50.0 * series::mean(&occupancies).max(0.25);
        pkpd_params.kg_confidence = kg_confidence;
        let profile = simulate_pkpd_with(&pkpd_params, backends.pkpd)?;
        debug_assert_eq!(profile.timepoints.len(), timepoints.len());

        let circuit_params = CircuitParameters {
            regions: REGIONS.iter().map(|r| r.to_string()).collect(),
            connectivity: uniform_connectivity(profile.summary.auc),
            drive: NeuromodulatorDrive {
                serotonin,
                dopamine,
                noradrenaline,
            },
            regimen: request.regimen,
            timepoints: timepoints.clone(),
            coupling_baseline: COUPLING_BASELINE,
            kg_confidence,
        };
        let circuit = simulate_circuit_with(&circuit_params, backends.circuit)?;

        let mut scores = compose_scores(circuit.global_metrics, &axis_deltas);
        if request.adhd {
            offset_score(&mut scores, "Motivation", -6.0);
            offset_score(&mut scores, "CognitiveFlexibility", -4.0);
        }
        if request.gut_bias {
            offset_score(&mut scores, "SleepQuality", 3.0);
            offset_score(&mut scores, "Anxiety", 2.0);
        }

        let u_mol = cascade.uncertainty.cascade;
        let u_pkpd = profile.uncertainty.pkpd;
        let u_circ = circuit.uncertainty.network;
        let base = (1.0 - series::mean(&[u_mol, u_pkpd, u_circ])).max(0.05);
        let shared_confidence = clamp_range(
            base * (1.0 - 0.3 * u_mol) * (1.0 - 0.3 * u_pkpd) * (1.0 - 0.4 * u_circ),
            0.05,
            0.99,
        );
        let confidence = scores
            .keys()
            .map(|metric| (metric.clone(), shared_confidence))
            .collect();

        let mut trajectories = BTreeMap::new();
        trajectories.insert(
            "plasma_concentration".to_string(),
            profile.plasma_concentration,
        );
        trajectories.insert(
            "brain_concentration".to_string(),
            profile.brain_concentration,
        );
        for (node, trace) in cascade.node_activity {
            trajectories.insert(format!("cascade_{node}"), trace);
        }
        for (region, trace) in circuit.region_activity {
            trajectories.insert(format!("region_{region}"), trace);
        }
        debug_assert!(
            trajectories
                .values()
                .all(|trace| trace.len() == timepoints.len()),
            "all trajectories must align with the shared time axis"
        );

        Ok(EngineResult {
            scores,
            timepoints,
            trajectories,
            module_summaries: ModuleSummaries {
                molecular: cascade.summary,
                pkpd: profile.summary,
                circuit: CircuitSummary {
                    metrics: circuit.global_metrics,
                    backend: circuit.backend,
                },
                receptor_inputs,
            },
            confidence,
        })
    }
}

// ---------------------------------------------------------------------------
// Composition helpers
// ---------------------------------------------------------------------------

/// `kg_weight` scaled by affinity and expression factors, clamped to
/// [0.05, 1.2]. Both factors are identity when the graph provided no value.
fn adjusted_weight(engagement: &ReceptorEngagement) -> f64 {
    let affinity_factor = engagement
        .affinity
        .map_or(1.0, |a| clamp_range(0.6 + 0.4 * a, 0.5, 1.4));
    let expression_factor = engagement
        .expression
        .map_or(1.0, |e| clamp_range(0.7 + 0.3 * e, 0.6, 1.35));
    clamp_range(
        engagement.kg_weight * affinity_factor * expression_factor,
        0.05,
        KG_WEIGHT_MAX,
    )
}

/// Fully-connected-minus-self topology with one shared weight derived from
/// plasma exposure.
fn uniform_connectivity(auc: f64) -> BTreeMap<String, BTreeMap<String, f64>> {
    let weight = 0.2 + 0.3 * (auc / 100.0).tanh();
    REGIONS
        .iter()
        .map(|source| {
            let targets = REGIONS
                .iter()
                .filter(|other| *other != source)
                .map(|other| (other.to_string(), weight))
                .collect();
            (source.to_string(), targets)
        })
        .collect()
}

/// `clip(50 + 100·(x − 0.5))` with optional inversion of the index.
fn score_from_index(index: f64, invert: bool) -> f64 {
    let x = if invert { 1.0 - index } else { index };
    clamp_range(50.0 + 100.0 * (x - 0.5), 0.0, 100.0)
}

/// Six base scores from the circuit indices, plus one score per populated
/// behaviour axis outside the core six.
fn compose_scores(
    metrics: GlobalMetrics,
    axis_deltas: &BTreeMap<String, f64>,
) -> BTreeMap<String, f64> {
    let mut scores = BTreeMap::new();
    scores.insert(
        "DriveInvigoration".to_string(),
        score_from_index(metrics.drive_index, false),
    );
    scores.insert(
        "ApathyBlunting".to_string(),
        score_from_index(metrics.apathy_index, true),
    );
    scores.insert(
        "Motivation".to_string(),
        score_from_index(
            0.5 * metrics.drive_index + 0.5 * (1.0 - metrics.apathy_index),
            false,
        ),
    );
    // Blended with drive: the uniform topology gives identical regional
    // traces, so the variance term alone would sit at the clamp floor.
    scores.insert(
        "CognitiveFlexibility".to_string(),
        score_from_index(
            0.5 * metrics.flexibility_index + 0.5 * metrics.drive_index,
            false,
        ),
    );
    scores.insert(
        "Anxiety".to_string(),
        score_from_index(metrics.anxiety_index, true),
    );
    scores.insert(
        "SleepQuality".to_string(),
        score_from_index(
            0.6 * (1.0 - metrics.anxiety_index) + 0.4 * (1.0 - metrics.drive_index),
            false,
        ),
    );

    for (axis, metric) in [
        ("social_affiliation", "SocialAffiliation"),
        ("exploration", "ExplorationBias"),
        ("salience", "SalienceProcessing"),
    ] {
        if let Some(value) = axis_deltas.get(axis) {
            scores.insert(
                metric.to_string(),
                clamp_range(50.0 + 45.0 * value.tanh(), 0.0, 100.0),
            );
        }
    }
    scores
}

fn offset_score(scores: &mut BTreeMap<String, f64>, metric: &str, delta: f64) {
    if let Some(value) = scores.get_mut(metric) {
        *value = clamp_range(*value + delta, 0.0, 100.0);
    }
}
