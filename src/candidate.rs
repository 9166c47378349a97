//! Per satellite epoch contribution
use std::collections::HashMap;

use crate::{prelude::SV, variable::Observable};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Uncombined observation types, in measurement row order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Measurement {
    /// Pseudo range on the primary frequency
    CodeL1,
    /// Pseudo range on the secondary frequency
    CodeL2,
    /// Carrier phase on the primary frequency
    PhaseL1,
    /// Carrier phase on the secondary frequency
    PhaseL2,
}

impl Measurement {
    /// All [Measurement]s, in row block order
    pub const ALL: [Measurement; 4] = [Self::CodeL1, Self::CodeL2, Self::PhaseL1, Self::PhaseL2];

    /// True if this is a code observation
    pub fn is_code(&self) -> bool {
        matches!(self, Self::CodeL1 | Self::CodeL2)
    }

    /// True if this is a phase observation
    pub fn is_phase(&self) -> bool {
        !self.is_code()
    }

    /// True if this [Measurement] is sampled on the primary frequency
    pub fn is_primary(&self) -> bool {
        matches!(self, Self::CodeL1 | Self::PhaseL1)
    }
}

impl std::fmt::Display for Measurement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CodeL1 => write!(f, "C1"),
            Self::CodeL2 => write!(f, "C2"),
            Self::PhaseL1 => write!(f, "L1"),
            Self::PhaseL2 => write!(f, "L2"),
        }
    }
}

/// [Candidate] is one satellite contribution to an epoch.
/// Prefit residuals are expected to be corrected for every
/// deterministic effect already (orbits, clocks, tides, windup..).
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Satellite
    pub sv: SV,
    /// Elevation angle (°)
    pub elevation_deg: f64,
    /// Prefit residuals (m), per [Measurement]
    pub prefit_m: HashMap<Measurement, f64>,
    /// A-priori slant ionospheric delay on the primary frequency (m)
    pub iono_apriori_m: Option<f64>,
    /// Partial derivatives of the source indexed unknowns
    pub partials: HashMap<Observable, f64>,
    /// Weight factor, 1.0 when not defined
    pub weight: Option<f64>,
    /// Cycle slip detected on this satellite
    pub cycle_slip: bool,
}

impl Candidate {
    /// Creates a new [Candidate]. Observations, partials and
    /// a-priori delays need to be attached with the builder methods.
    pub fn new(sv: SV, elevation_deg: f64) -> Self {
        Self {
            sv,
            elevation_deg,
            prefit_m: HashMap::with_capacity(4),
            iono_apriori_m: None,
            partials: HashMap::with_capacity(4),
            weight: None,
            cycle_slip: false,
        }
    }

    /// Copies and returns [Candidate] with one more prefit residual
    pub fn with_prefit(&self, measurement: Measurement, prefit_m: f64) -> Self {
        let mut s = self.clone();
        s.prefit_m.insert(measurement, prefit_m);
        s
    }

    /// Copies and returns [Candidate] with a-priori ionospheric delay
    pub fn with_iono_apriori(&self, iono_m: f64) -> Self {
        let mut s = self.clone();
        s.iono_apriori_m = Some(iono_m);
        s
    }

    /// Copies and returns [Candidate] with one more partial derivative
    pub fn with_partial(&self, observable: Observable, partial: f64) -> Self {
        let mut s = self.clone();
        s.partials.insert(observable, partial);
        s
    }

    /// Copies and returns [Candidate] with ECEF partials (line of sight)
    pub fn with_ecef_partials(&self, dx: f64, dy: f64, dz: f64) -> Self {
        self.with_partial(Observable::Dx, dx)
            .with_partial(Observable::Dy, dy)
            .with_partial(Observable::Dz, dz)
    }

    /// Copies and returns [Candidate] with tropospheric mapping (partial)
    pub fn with_tropo_mapping(&self, mapping: f64) -> Self {
        self.with_partial(Observable::WetTroposphere, mapping)
    }

    /// Copies and returns [Candidate] with weight factor
    pub fn with_weight(&self, weight: f64) -> Self {
        let mut s = self.clone();
        s.weight = Some(weight);
        s
    }

    /// Copies and returns [Candidate] with cycle slip flag
    pub fn with_cycle_slip(&self, cycle_slip: bool) -> Self {
        let mut s = self.clone();
        s.cycle_slip = cycle_slip;
        s
    }

    /// Prefit residual for this [Measurement], if any
    pub fn prefit(&self, measurement: Measurement) -> Option<f64> {
        self.prefit_m.get(&measurement).copied()
    }

    /// Partial derivative for this [Observable], if any
    pub fn partial(&self, observable: Observable) -> Option<f64> {
        self.partials.get(&observable).copied()
    }

    /// Weight factor, 1.0 when not defined
    pub fn weight_factor(&self) -> f64 {
        self.weight.unwrap_or(1.0)
    }
}
