#![doc = include_str!("../README.md")]
#![cfg_attr(docrs, feature(doc_cfg))]

extern crate gnss_rs as gnss;

// private modules
mod candidate;
mod carrier;
mod cfg;
mod constants;
mod error;
mod navigation;
mod solutions;
mod solver;
mod variable;

#[cfg(test)]
mod tests;

// prelude
pub mod prelude {
    pub use crate::candidate::{Candidate, Measurement};
    pub use crate::carrier::{Carrier, DualFrequency};
    pub use crate::cfg::{
        Config, Error as ConfigError, InitialVariances, Positioning, Profile, Weighting,
    };
    pub use crate::error::{Component, Error};
    pub use crate::navigation::{
        reference_satellite, AmbFixedMap, AmbiguityConstraintInjector, AmbiguityResolver,
        EquationAssembler, EquationSystem, KfEstimate, ModelContext, ModelKey, NullResolver,
        Rejection, Row, SatelliteValidity, Screening, Snapshot, StateCarryForward,
        StochasticModel, StochasticModelBank,
    };
    pub use crate::solutions::{
        EpochSolution, Estimate, FixingStatistics, SatelliteSolution, SolutionType,
    };
    pub use crate::solver::{EstimatorKind, FilterPhase, Solver};
    pub use crate::variable::{
        Coefficient, ColumnIndex, Observable, SourceId, Variable, VariableAttributes,
        VariableCatalog, VariableSet,
    };
    // re-export
    pub use gnss::prelude::{Constellation, SV};
    pub use hifitime::{Duration, Epoch, TimeScale};
}

// pub export
pub use error::Error;
