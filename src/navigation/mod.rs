mod ambiguity;
mod carry;
mod equations;
mod kalman;
mod stochastic;

pub use ambiguity::{AmbFixedMap, AmbiguityConstraintInjector, AmbiguityResolver, NullResolver};
pub use carry::{Snapshot, StateCarryForward};
pub use equations::{
    reference_satellite, EquationAssembler, EquationSystem, Rejection, Row, SatelliteValidity,
    Screening,
};
pub use kalman::KfEstimate;
pub use stochastic::{ModelContext, ModelKey, StochasticModel, StochasticModelBank};
