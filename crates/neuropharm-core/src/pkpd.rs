//! PK/PD profile simulator.
//!
//! Approximates plasma and brain concentration over a dosing horizon with a
//! single-compartment exponential decay model. Chronic regimens superpose one
//! decaying dose per full dosing-interval multiple inside the horizon.
//!
//! Unlike the cascade and circuit layers this simulator owns its time axis:
//! callers hand it a horizon and a step and it derives the grid itself.

use serde::{Deserialize, Serialize};

use crate::engagement::Regimen;
use crate::error::EngineError;
use crate::series::{self, arange};

/// Uncertainty floor shared by all simulation layers.
const UNCERTAINTY_FLOOR: f64 = 0.05;

/// Dosing inputs for one profile simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PkPdParameters {
    /// Compound label carried through for diagnostics.
    pub compound: String,
    /// Nominal oral dose in milligrams.
    pub dose_mg: f64,
    /// First-order elimination constant (1/h).
    pub clearance_rate: f64,
    /// Oral bioavailability fraction applied to the dose.
    pub bioavailability: f64,
    /// Brain:plasma partition ratio.
    pub brain_plasma_ratio: f64,
    pub regimen: Regimen,
    /// Hours between repeated doses under a chronic regimen.
    pub dosing_interval_h: f64,
    /// Simulation horizon in hours.
    pub horizon_h: f64,
    /// Grid step in hours.
    pub time_step_h: f64,
    /// Knowledge-graph confidence backing the dosing assumptions.
    pub kg_confidence: f64,
}

impl PkPdParameters {
    /// Defaults for the composite serotonergic compound: the only knobs a
    /// caller usually sets afterwards are dose, regimen, and confidence.
    pub fn composite_ssri(regimen: Regimen, time_step_h: f64) -> Self {
        Self {
            compound: "composite_ssri".to_string(),
            dose_mg: 50.0,
            clearance_rate: regimen.clearance_rate(),
            bioavailability: 0.6,
            brain_plasma_ratio: 0.7,
            regimen,
            dosing_interval_h: 24.0,
            horizon_h: regimen.horizon_hours(),
            time_step_h,
            kg_confidence: 0.5,
        }
    }
}

/// Scalar summary of one concentration profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PkPdSummary {
    /// Trapezoidal AUC of the plasma trace (mg·h/L equivalent units).
    pub auc: f64,
    /// Peak plasma concentration.
    pub cmax: f64,
    /// Brain AUC divided by the horizon.
    pub exposure_index: f64,
    /// Horizon actually simulated.
    pub duration_h: f64,
    pub regimen: Regimen,
    /// Which backend produced the traces.
    pub backend: String,
}

/// Uncertainty attached to a concentration profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PkPdUncertainty {
    /// Headline PK/PD uncertainty.
    pub pkpd: f64,
    /// Uncertainty on the exposure index, damped by knowledge-graph
    /// confidence less steeply than `pkpd`.
    pub exposure: f64,
}

/// Time-resolved concentration output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PkPdProfile {
    /// Time axis derived from horizon and step, starting at 0.0 h.
    pub timepoints: Vec<f64>,
    pub plasma_concentration: Vec<f64>,
    pub brain_concentration: Vec<f64>,
    pub summary: PkPdSummary,
    pub uncertainty: PkPdUncertainty,
}

// ---------------------------------------------------------------------------
// Backend strategy
// ---------------------------------------------------------------------------

/// Strategy seam for the concentration computation.
///
/// A backend returns the plasma trace aligned 1:1 with `time`; the brain
/// trace and all summaries are derived uniformly on top. The analytic
/// implementation is always available.
pub trait PkPdBackend: Send + Sync {
    /// Backend tag recorded in the summary.
    fn label(&self) -> &'static str;

    /// Compute the plasma concentration trace.
    fn plasma(&self, params: &PkPdParameters, time: &[f64]) -> Vec<f64>;
}

/// Analytic fallback: linear superposition of exponentially decaying doses.
pub struct AnalyticPkPd;

impl PkPdBackend for AnalyticPkPd {
    fn label(&self) -> &'static str {
        "analytic"
    }

    fn plasma(&self, params: &PkPdParameters, time: &[f64]) -> Vec<f64> {
        let dose_eff = params.dose_mg * params.bioavailability;
        let k_el = params.clearance_rate.max(1e-6);
        let dose_times = dose_schedule(params);
        time.iter()
            .map(|t| {
                dose_times
                    .iter()
                    .filter(|t_dose| *t >= **t_dose)
                    .map(|t_dose| dose_eff * (-k_el * (t - t_dose)).exp())
                    .sum()
            })
            .collect()
    }
}

/// Dose administration times inside the horizon.
///
/// Acute regimens dose once at t = 0; chronic regimens add one dose per full
/// dosing-interval multiple within the horizon.
fn dose_schedule(params: &PkPdParameters) -> Vec<f64> {
    match params.regimen {
        Regimen::Acute => vec![0.0],
        Regimen::Chronic => {
            let interval = params.dosing_interval_h.max(1e-6);
            let n_doses = (params.horizon_h / interval).floor() as usize + 1;
            (0..n_doses).map(|i| i as f64 * interval).collect()
        }
    }
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// Run the PK/PD profile with the analytic fallback backend.
pub fn simulate_pkpd(params: &PkPdParameters) -> Result<PkPdProfile, EngineError> {
    simulate_pkpd_with(params, &AnalyticPkPd)
}

/// Run the PK/PD profile with an explicit backend.
pub fn simulate_pkpd_with(
    params: &PkPdParameters,
    backend: &dyn PkPdBackend,
) -> Result<PkPdProfile, EngineError> {
    let timepoints = arange(0.0, params.horizon_h, params.time_step_h);

    let plasma_concentration = backend.plasma(params, &timepoints);
    debug_assert_eq!(plasma_concentration.len(), timepoints.len());
    let brain_concentration: Vec<f64> = plasma_concentration
        .iter()
        .map(|c| c * params.brain_plasma_ratio)
        .collect();

    log::debug!(
        "pkpd backend={} compound={} regimen={:?} points={}",
        backend.label(),
        params.compound,
        params.regimen,
        timepoints.len()
    );

    let auc = series::trapezoid(&plasma_concentration, &timepoints);
    let cmax = plasma_concentration
        .iter()
        .copied()
        .fold(0.0_f64, f64::max);
    let horizon = params.horizon_h.max(1e-6);
    let exposure_index = series::trapezoid(&brain_concentration, &timepoints) / horizon;

    let kg = series::clamp01(params.kg_confidence);
    let uncertainty = PkPdUncertainty {
        pkpd: (1.0 - kg).max(UNCERTAINTY_FLOOR),
        exposure: (1.0 - 0.9 * kg).max(UNCERTAINTY_FLOOR),
    };

    Ok(PkPdProfile {
        summary: PkPdSummary {
            auc,
            cmax,
            exposure_index,
            duration_h: params.horizon_h,
            regimen: params.regimen,
            backend: backend.label().to_string(),
        },
        uncertainty,
        timepoints,
        plasma_concentration,
        brain_concentration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acute_params() -> PkPdParameters {
        let mut p = PkPdParameters::composite_ssri(Regimen::Acute, 1.0);
        p.kg_confidence = 0.7;
        p
    }

    fn chronic_params() -> PkPdParameters {
        let mut p = PkPdParameters::composite_ssri(Regimen::Chronic, 6.0);
        p.kg_confidence = 0.7;
        p
    }

    #[test]
    fn test_time_axis_spans_horizon() {
        let profile = simulate_pkpd(&acute_params()).unwrap();
        assert_eq!(profile.timepoints[0], 0.0);
        assert!(*profile.timepoints.last().unwrap() >= 24.0);
        assert_eq!(
            profile.timepoints.len(),
            profile.plasma_concentration.len()
        );
        assert_eq!(
            profile.timepoints.len(),
            profile.brain_concentration.len()
        );
    }

    #[test]
    fn test_acute_decays_from_effective_dose() {
        let p = acute_params();
        let profile = simulate_pkpd(&p).unwrap();
        let expected_c0 = p.dose_mg * p.bioavailability;
        assert!((profile.plasma_concentration[0] - expected_c0).abs() < 1e-9);
        assert!(
            profile
                .plasma_concentration
                .windows(2)
                .all(|w| w[1] < w[0]),
            "single dose must decay monotonically"
        );
    }

    #[test]
    fn test_brain_tracks_plasma_by_partition_ratio() {
        let p = acute_params();
        let profile = simulate_pkpd(&p).unwrap();
        for (plasma, brain) in profile
            .plasma_concentration
            .iter()
            .zip(&profile.brain_concentration)
        {
            assert!((brain - plasma * p.brain_plasma_ratio).abs() < 1e-12);
        }
    }

    #[test]
    fn test_chronic_stacks_doses() {
        let profile = simulate_pkpd(&chronic_params()).unwrap();
        // Concentration right after the second dose exceeds the first cmax
        // window because the residual of dose one is still present.
        let idx_24h = profile
            .timepoints
            .iter()
            .position(|t| (*t - 24.0).abs() < 1e-9)
            .unwrap();
        let c0 = profile.plasma_concentration[0];
        assert!(profile.plasma_concentration[idx_24h] > c0);
        assert!(profile.summary.cmax > c0);
    }

    #[test]
    fn test_chronic_exposure_dominates_acute() {
        let acute = simulate_pkpd(&acute_params()).unwrap();
        let chronic = simulate_pkpd(&chronic_params()).unwrap();
        assert!(chronic.summary.auc > acute.summary.auc);
        assert!(chronic.summary.exposure_index > acute.summary.exposure_index);
        assert_eq!(chronic.summary.duration_h, 168.0);
        assert_eq!(acute.summary.duration_h, 24.0);
    }

    #[test]
    fn test_summary_metrics_positive() {
        let profile = simulate_pkpd(&acute_params()).unwrap();
        assert!(profile.summary.auc > 0.0);
        assert!(profile.summary.cmax > 0.0);
        assert!(profile.summary.exposure_index > 0.0);
        assert_eq!(profile.summary.backend, "analytic");
    }

    #[test]
    fn test_uncertainty_ordering() {
        let profile = simulate_pkpd(&acute_params()).unwrap();
        assert!((profile.uncertainty.pkpd - 0.3).abs() < 1e-12);
        assert!((profile.uncertainty.exposure - 0.37).abs() < 1e-12);
        let mut sure = acute_params();
        sure.kg_confidence = 1.0;
        let profile = simulate_pkpd(&sure).unwrap();
        assert_eq!(profile.uncertainty.pkpd, UNCERTAINTY_FLOOR);
        assert!((profile.uncertainty.exposure - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_zero_confidence_maximizes_uncertainty() {
        let mut p = acute_params();
        p.kg_confidence = 0.0;
        let profile = simulate_pkpd(&p).unwrap();
        assert_eq!(profile.uncertainty.pkpd, 1.0);
        assert_eq!(profile.uncertainty.exposure, 1.0);
    }
}
