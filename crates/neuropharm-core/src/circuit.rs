//! Circuit response simulator.
//!
//! Approximates regional neural activity responding to neuromodulator drive
//! and a pairwise connectivity topology, then reduces the activity matrix to
//! four global behaviour indices.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::engagement::Regimen;
use crate::error::EngineError;
use crate::series::{self, clamp01, validate_timepoints};

/// Uncertainty floor shared by all simulation layers.
const UNCERTAINTY_FLOOR: f64 = 0.05;

/// Gain floor keeping the exponential response well-posed.
const GAIN_FLOOR: f64 = 1e-3;

/// Fixed rise rate of the regional response (1/h).
const RESPONSE_RATE: f64 = 0.12;

/// Neuromodulator drive scalars handed down from the cascade stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeuromodulatorDrive {
    pub serotonin: f64,
    pub dopamine: f64,
    pub noradrenaline: f64,
}

/// Inputs for one circuit simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitParameters {
    /// Region names, one activity trace each.
    pub regions: Vec<String>,
    /// Directed connectivity: source region → target region → weight.
    pub connectivity: BTreeMap<String, BTreeMap<String, f64>>,
    pub drive: NeuromodulatorDrive,
    pub regimen: Regimen,
    /// Strictly increasing time axis in hours.
    pub timepoints: Vec<f64>,
    /// Baseline coupling before neuromodulator drive is added.
    pub coupling_baseline: f64,
    /// Knowledge-graph confidence backing the topology.
    pub kg_confidence: f64,
}

/// Global behaviour indices reduced from the activity matrix, all in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlobalMetrics {
    pub drive_index: f64,
    pub flexibility_index: f64,
    pub anxiety_index: f64,
    pub apathy_index: f64,
}

/// Uncertainty attached to a circuit simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircuitUncertainty {
    /// Topology-confidence-derived network uncertainty.
    pub network: f64,
}

/// Time-resolved circuit output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitResponse {
    /// Region → activity trace aligned with the input timepoints.
    pub region_activity: BTreeMap<String, Vec<f64>>,
    pub global_metrics: GlobalMetrics,
    pub uncertainty: CircuitUncertainty,
    /// Which backend produced the traces.
    pub backend: String,
}

// ---------------------------------------------------------------------------
// Backend strategy
// ---------------------------------------------------------------------------

/// Strategy seam for the regional-activity computation.
///
/// A backend receives the combined gains and the validated time axis and
/// returns one trace per region, aligned 1:1 with `time`. The analytic
/// implementation is always available.
pub trait CircuitBackend: Send + Sync {
    /// Backend tag recorded in the response.
    fn label(&self) -> &'static str;

    /// Compute one activity trace per region.
    fn region_activity(
        &self,
        params: &CircuitParameters,
        drive_gain: f64,
        regimen_gain: f64,
        time: &[f64],
    ) -> BTreeMap<String, Vec<f64>>;
}

/// Analytic fallback: saturating exponential response per region, with gain
/// boosted by that region's outgoing coupling.
pub struct AnalyticCircuit;

impl CircuitBackend for AnalyticCircuit {
    fn label(&self) -> &'static str {
        "analytic"
    }

    fn region_activity(
        &self,
        params: &CircuitParameters,
        drive_gain: f64,
        regimen_gain: f64,
        time: &[f64],
    ) -> BTreeMap<String, Vec<f64>> {
        let t0 = time[0];
        params
            .regions
            .iter()
            .map(|region| {
                let coupling_sum: f64 = params
                    .connectivity
                    .get(region)
                    .map(|targets| {
                        targets
                            .iter()
                            .filter(|(other, _)| *other != region)
                            .map(|(_, weight)| weight)
                            .sum()
                    })
                    .unwrap_or(0.0);
                let effective_gain = (drive_gain + 0.4 * coupling_sum).max(GAIN_FLOOR);
                let trace = time
                    .iter()
                    .map(|t| {
                        effective_gain * (1.0 - (-RESPONSE_RATE * (t - t0)).exp()) * regimen_gain
                    })
                    .collect();
                (region.clone(), trace)
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// Run the circuit with the analytic fallback backend.
pub fn simulate_circuit(params: &CircuitParameters) -> Result<CircuitResponse, EngineError> {
    simulate_circuit_with(params, &AnalyticCircuit)
}

/// Run the circuit with an explicit backend.
pub fn simulate_circuit_with(
    params: &CircuitParameters,
    backend: &dyn CircuitBackend,
) -> Result<CircuitResponse, EngineError> {
    validate_timepoints(&params.timepoints)?;

    let d = params.drive;
    let drive_gain = (params.coupling_baseline
        + 0.6 * d.serotonin
        + 0.3 * d.dopamine
        + 0.2 * d.noradrenaline)
        .max(GAIN_FLOOR);
    let regimen_gain = match params.regimen {
        Regimen::Chronic => 1.15,
        Regimen::Acute => 1.0,
    };

    log::debug!(
        "circuit backend={} regions={} drive_gain={:.4}",
        backend.label(),
        params.regions.len(),
        drive_gain
    );

    let region_activity =
        backend.region_activity(params, drive_gain, regimen_gain, &params.timepoints);
    debug_assert!(
        region_activity
            .values()
            .all(|trace| trace.len() == params.timepoints.len()),
        "backend must align traces with the time axis"
    );

    let global_metrics = reduce_global_metrics(&region_activity, params.timepoints.len(), d);
    let network = (1.0 - clamp01(params.kg_confidence)).max(UNCERTAINTY_FLOOR);

    Ok(CircuitResponse {
        region_activity,
        global_metrics,
        uncertainty: CircuitUncertainty { network },
        backend: backend.label().to_string(),
    })
}

fn reduce_global_metrics(
    region_activity: &BTreeMap<String, Vec<f64>>,
    n_points: usize,
    drive: NeuromodulatorDrive,
) -> GlobalMetrics {
    let finals: Vec<f64> = region_activity
        .values()
        .filter_map(|trace| trace.last().copied())
        .collect();
    let mean_final = series::mean(&finals);
    let drive_index = clamp01(mean_final / (1.0 + mean_final));

    // Mean over timepoints of the cross-region population variance.
    let mut variance_sum = 0.0;
    for idx in 0..n_points {
        let column: Vec<f64> = region_activity
            .values()
            .filter_map(|trace| trace.get(idx).copied())
            .collect();
        let mu = series::mean(&column);
        let var = if column.is_empty() {
            0.0
        } else {
            column.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / column.len() as f64
        };
        variance_sum += var;
    }
    let mean_variance = if n_points == 0 {
        0.0
    } else {
        variance_sum / n_points as f64
    };

    GlobalMetrics {
        drive_index,
        flexibility_index: clamp01(0.5 * mean_variance),
        anxiety_index: clamp01(0.4 - 0.2 * drive.serotonin + 0.1 * drive.noradrenaline),
        apathy_index: clamp01(1.0 - 0.85 * drive_index),
    }
}
