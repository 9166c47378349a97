//! Epoch solutions
use std::collections::BTreeMap;

use nalgebra::DVector;

use crate::{
    candidate::Measurement,
    carrier::DualFrequency,
    navigation::{AmbFixedMap, EquationSystem, KfEstimate, Rejection, Row},
    prelude::{Epoch, SV},
    solver::EstimatorKind,
    variable::{Observable, Variable, VariableCatalog, VariableSet},
};

#[cfg(feature = "serde")]
use serde::{Serialize, Serializer};

/// Serializes a map as a sequence of (key, value) pairs,
/// for keys that cannot be represented as strings.
#[cfg(feature = "serde")]
fn as_pairs<K: Serialize, V: Serialize, S: Serializer>(
    map: &BTreeMap<K, V>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(map.iter())
}

/// Type of solution
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum SolutionType {
    /// Real valued ambiguities
    #[default]
    Float,
    /// At least one ambiguity was fixed to its integer value
    Fixed,
}

impl std::fmt::Display for SolutionType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Float => write!(f, "float"),
            Self::Fixed => write!(f, "fixed"),
        }
    }
}

/// Estimated value and its standard deviation
#[derive(Debug, Copy, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Estimate {
    pub value: f64,
    pub sigma: f64,
}

impl Estimate {
    fn from_column(estimate: &KfEstimate, column: usize) -> Self {
        Self {
            value: estimate.x[column],
            sigma: estimate.p[(column, column)].max(0.0).sqrt(),
        }
    }
}

/// Ambiguity fixing statistics
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct FixingStatistics {
    /// Number of ambiguity unknowns
    pub float: usize,
    /// Number of ambiguities fixed
    pub fixed: usize,
}

impl FixingStatistics {
    /// Fixed / float ratio, 0 when nothing was estimated
    pub fn rate(&self) -> f64 {
        if self.float == 0 {
            0.0
        } else {
            self.fixed as f64 / self.float as f64
        }
    }
}

impl std::ops::AddAssign for FixingStatistics {
    fn add_assign(&mut self, rhs: Self) {
        self.float += rhs.float;
        self.fixed += rhs.fixed;
    }
}

impl std::ops::Add for FixingStatistics {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            float: self.float + rhs.float,
            fixed: self.fixed + rhs.fixed,
        }
    }
}

/// Satellite indexed results
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct SatelliteSolution {
    /// Slant ionospheric delay on the primary frequency (m)
    pub ionosphere: Estimate,
    /// Primary frequency ambiguity (cycles)
    pub ambiguity_l1: Estimate,
    /// Secondary frequency ambiguity (cycles)
    pub ambiguity_l2: Estimate,
    /// Widelane ambiguity (cycles)
    pub widelane_cycles: f64,
    /// Widelane ambiguity (m)
    pub widelane_m: f64,
    /// Narrowlane ambiguity (cycles)
    pub narrowlane_cycles: f64,
    /// Narrowlane ambiguity (m)
    pub narrowlane_m: f64,
    /// Primary frequency ambiguity was fixed
    pub fixed_l1: bool,
    /// Secondary frequency ambiguity was fixed
    pub fixed_l2: bool,
    /// Postfit residuals (m), per [Measurement]
    pub postfit: BTreeMap<Measurement, f64>,
    /// Postfit residual of the ionospheric constraint.
    /// None for the reference satellite.
    pub iono_constraint_postfit: Option<f64>,
    /// Fixing statistics of this epoch
    pub statistics: FixingStatistics,
}

/// [EpochSolution] is the outcome of one successful epoch
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct EpochSolution {
    /// [Epoch] of this solution
    pub t: Epoch,
    /// Epoch sequence number (successful or not)
    pub seq: u64,
    /// [EstimatorKind] that produced this solution
    pub kind: EstimatorKind,
    /// [SolutionType]
    pub solution_type: SolutionType,
    /// Reference satellite of the ionospheric constraints
    pub reference: SV,
    /// Source indexed estimates
    pub core: BTreeMap<Observable, Estimate>,
    /// Satellite indexed estimates
    #[cfg_attr(feature = "serde", serde(serialize_with = "as_pairs"))]
    pub satellites: BTreeMap<SV, SatelliteSolution>,
    /// Tropospheric constraint postfit residual
    pub tropo_postfit: f64,
    /// Fixed ambiguity pseudo measurements postfit residuals (cycles)
    #[cfg_attr(feature = "serde", serde(serialize_with = "as_pairs"))]
    pub fixed_postfit: BTreeMap<Variable, f64>,
    /// Fixing statistics of this epoch, all satellites
    pub statistics: FixingStatistics,
    /// Satellites excluded from this epoch
    pub rejections: Vec<(SV, Rejection)>,
}

impl EpochSolution {
    /// Source indexed [Estimate] of this [Observable]
    pub fn core_estimate(&self, observable: Observable) -> Option<Estimate> {
        self.core.get(&observable).copied()
    }

    /// Receiver clock offset (m)
    pub fn clock_offset_m(&self) -> Option<f64> {
        self.core_estimate(Observable::ClockOffset)
            .map(|estimate| estimate.value)
    }

    /// Zenith wet delay (m)
    pub fn zenith_wet_delay_m(&self) -> Option<f64> {
        self.core_estimate(Observable::WetTroposphere)
            .map(|estimate| estimate.value)
    }

    /// True if at least one ambiguity was fixed
    pub fn is_fixed(&self) -> bool {
        self.solution_type == SolutionType::Fixed
    }

    /// Builds [EpochSolution] from the posterior [KfEstimate]
    /// of said [VariableSet] and its [EquationSystem].
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        t: Epoch,
        seq: u64,
        kind: EstimatorKind,
        catalog: &VariableCatalog,
        carriers: &DualFrequency,
        set: &VariableSet,
        posterior: &KfEstimate,
        system: &EquationSystem,
        postfit: &DVector<f64>,
        fixes: &AmbFixedMap,
        rejections: Vec<(SV, Rejection)>,
    ) -> Self {
        let columns = set.columns();

        let estimate = |variable: &Variable| {
            columns
                .get(variable)
                .map(|column| Estimate::from_column(posterior, *column))
                .unwrap_or_default()
        };

        let core = set
            .variables()
            .filter(|variable| !variable.is_satellite_indexed())
            .map(|variable| (variable.observable(), estimate(variable)))
            .collect::<BTreeMap<_, _>>();

        let mut satellites = BTreeMap::<SV, SatelliteSolution>::new();
        let mut statistics = FixingStatistics::default();

        let (lambda_wl, lambda_nl, factor) = (
            carriers.widelane_wavelength(),
            carriers.narrowlane_wavelength(),
            carriers.widelane_factor(),
        );

        for sv in set.satellites() {
            let bl1 = catalog.satellite_variable(Observable::AmbiguityL1, sv);
            let bl2 = catalog.satellite_variable(Observable::AmbiguityL2, sv);
            let iono = catalog.satellite_variable(Observable::Ionosphere, sv);

            let (ambiguity_l1, ambiguity_l2) = (estimate(&bl1), estimate(&bl2));

            let widelane_cycles = ambiguity_l1.value - ambiguity_l2.value;
            let narrowlane_cycles = ambiguity_l1.value + factor * widelane_cycles;

            let (fixed_l1, fixed_l2) = (fixes.contains(&bl1), fixes.contains(&bl2));

            let sv_statistics = FixingStatistics {
                float: 2,
                fixed: fixed_l1 as usize + fixed_l2 as usize,
            };

            statistics += sv_statistics;

            satellites.insert(
                sv,
                SatelliteSolution {
                    ionosphere: estimate(&iono),
                    ambiguity_l1,
                    ambiguity_l2,
                    widelane_cycles,
                    widelane_m: lambda_wl * widelane_cycles,
                    narrowlane_cycles,
                    narrowlane_m: lambda_nl * narrowlane_cycles,
                    fixed_l1,
                    fixed_l2,
                    postfit: BTreeMap::new(),
                    iono_constraint_postfit: None,
                    statistics: sv_statistics,
                },
            );
        }

        let mut tropo_postfit = 0.0;
        let mut fixed_postfit = BTreeMap::new();

        for (row, residual) in system.rows().iter().zip(postfit.iter()) {
            match row {
                Row::Measurement(sv, measurement) => {
                    if let Some(solution) = satellites.get_mut(sv) {
                        solution.postfit.insert(*measurement, *residual);
                    }
                },
                Row::IonosphereConstraint(sv) => {
                    if let Some(solution) = satellites.get_mut(sv) {
                        solution.iono_constraint_postfit = Some(*residual);
                    }
                },
                Row::TroposphereConstraint => {
                    tropo_postfit = *residual;
                },
                Row::FixedAmbiguity(variable) => {
                    fixed_postfit.insert(variable.clone(), *residual);
                },
            }
        }

        let solution_type = if fixes.is_empty() {
            SolutionType::Float
        } else {
            SolutionType::Fixed
        };

        Self {
            t,
            seq,
            kind,
            solution_type,
            reference: system.reference(),
            core,
            satellites,
            tropo_postfit,
            fixed_postfit,
            statistics,
            rejections,
        }
    }
}

#[cfg(test)]
mod test {
    use super::FixingStatistics;

    #[test]
    fn fixing_rate() {
        assert_eq!(FixingStatistics::default().rate(), 0.0);

        let mut stats = FixingStatistics { float: 2, fixed: 1 };
        assert_eq!(stats.rate(), 0.5);

        stats += FixingStatistics { float: 2, fixed: 2 };
        assert_eq!(stats, FixingStatistics { float: 4, fixed: 3 });
        assert_eq!(stats.rate(), 0.75);
    }
}
