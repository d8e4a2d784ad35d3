//! # neuropharm-core
//!
//! **Receptor engagement in, behaviour scores out.**
//!
//! `neuropharm-core` is a deterministic multiscale simulation core: it takes a
//! knowledge-graph-derived receptor engagement profile and runs it through a
//! molecular cascade, a PK/PD exposure model, and a coarse circuit response,
//! composing the result into bounded behaviour scores with a propagated
//! confidence value.
//!
//! ## Quick Start
//!
//! ```
//! use std::collections::BTreeMap;
//! use neuropharm_core::{
//!     EngineRequest, Mechanism, ReceptorEngagement, Regimen, SimulationEngine,
//! };
//!
//! let mut receptors = BTreeMap::new();
//! receptors.insert(
//!     "HTR1A".to_string(),
//!     ReceptorEngagement::new("HTR1A", 0.7, Mechanism::Agonist, 0.8, 0.75),
//! );
//! let request = EngineRequest {
//!     receptors,
//!     regimen: Regimen::Chronic,
//!     adhd: false,
//!     gut_bias: true,
//!     pvt_weight: 0.2,
//! };
//!
//! let engine = SimulationEngine::bundled(6.0);
//! let result = engine.run(&request)?;
//!
//! assert!((0.0..=100.0).contains(&result.scores["DriveInvigoration"]));
//! assert!(*result.timepoints.last().unwrap() >= 168.0);
//! # Ok::<(), neuropharm_core::EngineError>(())
//! ```
//!
//! ## Architecture
//!
//! Request → normalize/merge → cascade → PK/PD → circuit → scores + confidence
//!
//! Each simulation layer hides its numerical backend behind a trait
//! ([`CascadeBackend`], [`PkPdBackend`], [`CircuitBackend`]) with a mandatory
//! analytic implementation, so heavier kinetic or network solvers plug in per
//! run without changing the pipeline contract. The whole pipeline is pure and
//! synchronous: no I/O, no shared mutable state, identical inputs produce
//! identical outputs.
//!
//! Receptor aliases (gene symbols, shorthand) are resolved through the
//! [`ReceptorRegistry`] trait; [`StaticRegistry`] ships a bundled
//! serotonin/melatonin/opioid/adrenergic table.

pub mod circuit;
pub mod engagement;
pub mod engine;
pub mod error;
pub mod molecular;
pub mod pkpd;
pub mod reference;
pub mod registry;
pub mod series;

pub use circuit::{
    AnalyticCircuit, CircuitBackend, CircuitParameters, CircuitResponse, GlobalMetrics,
    NeuromodulatorDrive,
};
pub use engagement::{
    merge_engagements, normalize_engagements, Mechanism, ReceptorEngagement, Regimen,
};
pub use engine::{
    EngineBackends, EngineRequest, EngineResult, ModuleSummaries, SimulationEngine,
};
pub use error::EngineError;
pub use molecular::{AnalyticCascade, CascadeBackend, CascadeParams, CascadeResult};
pub use pkpd::{AnalyticPkPd, PkPdBackend, PkPdParameters, PkPdProfile};
pub use reference::ReferencePathway;
pub use registry::{ReceptorRegistry, StaticRegistry};

/// Crate version, from the package manifest.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
