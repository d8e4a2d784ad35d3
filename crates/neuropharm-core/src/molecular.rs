//! Molecular cascade simulator.
//!
//! Turns an aggregated receptor-activation signal into downstream pathway
//! node trajectories. The analytic fallback is a saturating exponential per
//! node; heavier kinetic solvers plug in behind [`CascadeBackend`] and must
//! return the same array shape on the same timepoints.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::series::{self, validate_timepoints};

/// Pathway node base rates below this floor are raised to it.
const NODE_RATE_FLOOR: f64 = 1e-3;

/// Uncertainty floor shared by all simulation layers.
const UNCERTAINTY_FLOOR: f64 = 0.05;

/// Trust discount applied when a high-fidelity backend produced the traces.
const HIGH_FIDELITY_DISCOUNT: f64 = 0.85;

/// Inputs for one cascade simulation, keyed by canonical receptor name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeParams {
    /// Pathway identifier carried into the summary.
    pub pathway: String,
    /// Canonical receptor → occupancy [0, 1].
    pub receptor_states: BTreeMap<String, f64>,
    /// Canonical receptor → adjusted interaction weight.
    pub receptor_weights: BTreeMap<String, f64>,
    /// Canonical receptor → evidence confidence.
    pub receptor_evidence: BTreeMap<String, f64>,
    /// Pathway node → base activation rate (1/h).
    pub downstream_nodes: BTreeMap<String, f64>,
    /// Regimen stimulus multiplier.
    pub stimulus: f64,
    /// Strictly increasing time axis in hours.
    pub timepoints: Vec<f64>,
}

/// Scalar summary of one cascade simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeSummary {
    /// Peak of the cross-node mean activity trace.
    pub transient_peak: f64,
    /// Final value of the mean activity trace.
    pub steady_state: f64,
    /// Trapezoidal AUC of the mean trace divided by the horizon.
    pub activation_index: f64,
    /// Pathway identifier.
    pub pathway: String,
    /// Which backend produced the node traces.
    pub backend: String,
}

/// Uncertainty attached to a cascade simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CascadeUncertainty {
    /// Headline cascade uncertainty, evidence-derived.
    pub cascade: f64,
    /// Uncertainty on the steady-state estimate specifically.
    pub steady_state: f64,
}

/// Time-resolved cascade output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeResult {
    /// Pathway node → activity trace aligned with the input timepoints.
    pub node_activity: BTreeMap<String, Vec<f64>>,
    pub summary: CascadeSummary,
    pub uncertainty: CascadeUncertainty,
}

// ---------------------------------------------------------------------------
// Backend strategy
// ---------------------------------------------------------------------------

/// Strategy seam for the per-node trajectory computation.
///
/// A backend receives the aggregated receptor effect and the validated time
/// axis, and must return one trace per downstream node, each aligned 1:1 with
/// `time`. Selection is a configuration decision made by the caller; the
/// analytic implementation is always available.
pub trait CascadeBackend: Send + Sync {
    /// Backend tag recorded in the summary.
    fn label(&self) -> &'static str;

    /// Whether the backend earns the high-fidelity uncertainty discount.
    fn high_fidelity(&self) -> bool {
        false
    }

    /// Compute one activity trace per downstream node.
    fn node_activity(
        &self,
        params: &CascadeParams,
        effect: f64,
        time: &[f64],
    ) -> BTreeMap<String, Vec<f64>>;
}

/// Analytic fallback: saturating exponential response per node.
pub struct AnalyticCascade;

impl CascadeBackend for AnalyticCascade {
    fn label(&self) -> &'static str {
        "analytic"
    }

    fn node_activity(
        &self,
        params: &CascadeParams,
        effect: f64,
        time: &[f64],
    ) -> BTreeMap<String, Vec<f64>> {
        let t0 = time[0];
        params
            .downstream_nodes
            .iter()
            .map(|(node, rate)| {
                let k = rate.max(NODE_RATE_FLOOR);
                let trace = time
                    .iter()
                    .map(|t| effect * (1.0 - (-k * (t - t0)).exp()))
                    .collect();
                (node.clone(), trace)
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// Aggregate the receptor profile into one scalar activation effect.
///
/// `effect = stimulus · Σ_r occ_r · weight_r · (0.5 + 0.5·evidence_r)`
fn receptor_effect(params: &CascadeParams) -> f64 {
    let mut total = 0.0;
    for (receptor, occupancy) in &params.receptor_states {
        let weight = params.receptor_weights.get(receptor).copied().unwrap_or(0.5);
        let evidence = params
            .receptor_evidence
            .get(receptor)
            .copied()
            .unwrap_or(0.5);
        total += occupancy * weight * (0.5 + 0.5 * evidence);
    }
    params.stimulus * total
}

/// Run the cascade with the analytic fallback backend.
pub fn simulate_cascade(params: &CascadeParams) -> Result<CascadeResult, EngineError> {
    simulate_cascade_with(params, &AnalyticCascade)
}

/// Run the cascade with an explicit backend.
pub fn simulate_cascade_with(
    params: &CascadeParams,
    backend: &dyn CascadeBackend,
) -> Result<CascadeResult, EngineError> {
    validate_timepoints(&params.timepoints)?;
    if params.downstream_nodes.is_empty() {
        return Err(EngineError::EmptyDownstreamNodes);
    }

    let effect = receptor_effect(params);
    log::debug!(
        "cascade backend={} effect={:.4} nodes={}",
        backend.label(),
        effect,
        params.downstream_nodes.len()
    );

    let node_activity = backend.node_activity(params, effect, &params.timepoints);
    debug_assert!(
        node_activity
            .values()
            .all(|trace| trace.len() == params.timepoints.len()),
        "backend must align traces with the time axis"
    );

    let n_points = params.timepoints.len();
    let mut mean_trace = vec![0.0; n_points];
    for trace in node_activity.values() {
        for (slot, value) in mean_trace.iter_mut().zip(trace) {
            *slot += value;
        }
    }
    let n_nodes = node_activity.len() as f64;
    for slot in &mut mean_trace {
        *slot /= n_nodes;
    }

    let transient_peak = mean_trace.iter().copied().fold(f64::MIN, f64::max);
    let steady_state = *mean_trace.last().unwrap_or(&0.0);
    let duration = params.timepoints[n_points - 1] - params.timepoints[0];
    let activation_index = if duration > 0.0 {
        series::trapezoid(&mean_trace, &params.timepoints) / duration
    } else {
        0.0
    };

    let evidence: Vec<f64> = params.receptor_evidence.values().copied().collect();
    let mut cascade_uncertainty = (1.0 - series::mean(&evidence)).max(UNCERTAINTY_FLOOR);
    if backend.high_fidelity() {
        cascade_uncertainty *= HIGH_FIDELITY_DISCOUNT;
    }

    Ok(CascadeResult {
        node_activity,
        summary: CascadeSummary {
            transient_peak,
            steady_state,
            activation_index,
            pathway: params.pathway.clone(),
            backend: backend.label().to_string(),
        },
        uncertainty: CascadeUncertainty {
            cascade: cascade_uncertainty,
            steady_state: cascade_uncertainty * 0.9,
        },
    })
}
