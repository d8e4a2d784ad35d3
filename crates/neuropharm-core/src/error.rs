//! Engine error taxonomy.
//!
//! Every error here is fatal for the request that triggered it. The engine is
//! deterministic and idempotent, so a retry with the same input fails the same
//! way; callers recover by fixing the input, not by retrying.

use thiserror::Error;

/// Errors raised by the simulation layers and the orchestrator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// The simulation time axis contains no points.
    #[error("timepoints must contain at least one value")]
    EmptyTimepoints,

    /// The simulation time axis is not strictly increasing.
    #[error("timepoints must be strictly increasing")]
    NonMonotonicTimepoints,

    /// The cascade simulator was given no downstream pathway nodes.
    ///
    /// The orchestrator never produces this: it substitutes the bundled
    /// 3-node default when the reference pathway is empty.
    #[error("downstream pathway nodes must not be empty")]
    EmptyDownstreamNodes,

    /// A mechanism string outside {agonist, antagonist, partial, inverse}.
    /// Propagated to the caller unmodified.
    #[error("unsupported mechanism '{0}'")]
    UnsupportedMechanism(String),
}
