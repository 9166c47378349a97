//! Per epoch equations system formation
use std::collections::BTreeMap;

use itertools::Itertools;
use log::{debug, error};
use nalgebra::{DMatrix, DVector};
use thiserror::Error as ThisError;

use crate::{
    candidate::{Candidate, Measurement},
    carrier::DualFrequency,
    cfg::{Config, Weighting},
    constants::{MIN_SATELLITES, SATELLITE_UNKNOWNS},
    error::Error,
    prelude::{Epoch, SV},
    variable::{Observable, Variable, VariableCatalog, VariableSet},
};

#[cfg(feature = "serde")]
use serde::Serialize;

/// Reason why one satellite was excluded from an epoch.
/// This is not an [Error]: the epoch proceeds without it.
#[derive(Debug, Clone, Copy, PartialEq, ThisError)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum Rejection {
    #[error("missing {0} prefit")]
    MissingPrefit(Measurement),
    #[error("missing ionospheric a-priori")]
    MissingIonosphere,
    #[error("missing {0} partial")]
    MissingPartial(Observable),
    #[error("invalid weight")]
    InvalidWeight,
    #[error("non finite input")]
    NonFiniteInput,
    #[error("duplicated satellite")]
    Duplicate,
}

/// Validity of one proposed satellite
pub type SatelliteValidity = (SV, Result<(), Rejection>);

/// Outcome of the per satellite screening.
#[derive(Debug, Clone, Default)]
pub struct Screening<'a> {
    accepted: BTreeMap<SV, &'a Candidate>,
    validity: Vec<SatelliteValidity>,
}

impl<'a> Screening<'a> {
    /// Accepted [Candidate]s, in canonical order
    pub fn accepted(&self) -> impl Iterator<Item = (&SV, &&'a Candidate)> + '_ {
        self.accepted.iter()
    }

    /// Accepted [Candidate]s only, in canonical order
    pub fn candidates(&self) -> impl Iterator<Item = &'a Candidate> + '_ {
        self.accepted.values().copied()
    }

    /// Accepted satellites, in canonical order
    pub fn satellites(&self) -> impl Iterator<Item = SV> + '_ {
        self.accepted.keys().copied()
    }

    /// Accepted [Candidate] for this satellite
    pub fn candidate(&self, sv: SV) -> Option<&'a Candidate> {
        self.accepted.get(&sv).copied()
    }

    /// Number of accepted satellites
    pub fn len(&self) -> usize {
        self.accepted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }

    /// Validity of each proposed satellite, in proposal order
    pub fn validity(&self) -> &[SatelliteValidity] {
        &self.validity
    }

    /// Rejected satellites and why
    pub fn rejections(&self) -> impl Iterator<Item = (SV, Rejection)> + '_ {
        self.validity
            .iter()
            .filter_map(|(sv, validity)| validity.err().map(|rejection| (*sv, rejection)))
    }
}

/// Nature of one row of the [EquationSystem]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    /// Uncombined observation
    Measurement(SV, Measurement),
    /// Single difference ionospheric constraint (with the reference satellite)
    IonosphereConstraint(SV),
    /// Zenith wet delay constraint
    TroposphereConstraint,
    /// Fixed ambiguity pseudo measurement
    FixedAmbiguity(Variable),
}

/// Linearized system of one epoch. Weights are the diagonal
/// of the (diagonal) weight matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct EquationSystem {
    prefit: DVector<f64>,
    h: DMatrix<f64>,
    weights: DVector<f64>,
    rows: Vec<Row>,
    reference: SV,
}

impl EquationSystem {
    /// Builds a new [EquationSystem], verifying its consistency
    pub fn new(
        prefit: DVector<f64>,
        h: DMatrix<f64>,
        weights: DVector<f64>,
        rows: Vec<Row>,
        reference: SV,
    ) -> Result<Self, Error> {
        let nrows = h.nrows();

        if prefit.len() != nrows {
            return Err(Error::dimension("prefit", nrows, prefit.len()));
        }

        if weights.len() != nrows {
            return Err(Error::dimension("weights", nrows, weights.len()));
        }

        if rows.len() != nrows {
            return Err(Error::dimension("rows", nrows, rows.len()));
        }

        Ok(Self {
            prefit,
            h,
            weights,
            rows,
            reference,
        })
    }

    /// Prefit residuals
    pub fn prefit(&self) -> &DVector<f64> {
        &self.prefit
    }

    /// Design matrix
    pub fn design(&self) -> &DMatrix<f64> {
        &self.h
    }

    /// Diagonal of the weight matrix
    pub fn weights(&self) -> &DVector<f64> {
        &self.weights
    }

    /// Weight matrix
    pub fn weight_matrix(&self) -> DMatrix<f64> {
        DMatrix::from_diagonal(&self.weights)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Reference satellite of the ionospheric constraints
    pub fn reference(&self) -> SV {
        self.reference
    }

    pub fn nrows(&self) -> usize {
        self.h.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.h.ncols()
    }

    /// Copies and returns [EquationSystem] with one-hot rows appended:
    /// (row nature, column, prefit, weight).
    pub(crate) fn with_one_hot_rows(
        &self,
        rows: &[(Row, usize, f64, f64)],
    ) -> Result<Self, Error> {
        let (nrows, ncols, extra) = (self.nrows(), self.ncols(), rows.len());

        let mut h = self.h.clone().insert_rows(nrows, extra, 0.0);
        let mut prefit = self.prefit.clone().insert_rows(nrows, extra, 0.0);
        let mut weights = self.weights.clone().insert_rows(nrows, extra, 0.0);
        let mut natures = self.rows.clone();

        for (i, (row, column, value, weight)) in rows.iter().enumerate() {
            if *column >= ncols {
                return Err(Error::dimension("one-hot column", ncols, *column));
            }

            h[(nrows + i, *column)] = 1.0;
            prefit[nrows + i] = *value;
            weights[nrows + i] = *weight;
            natures.push(row.clone());
        }

        Self::new(prefit, h, weights, natures, self.reference)
    }
}

/// Selects the reference satellite: maximal (strictly positive) elevation,
/// first in proposal order on ties. When no satellite is above the horizon,
/// the first proposed satellite is returned. [Screening] proposes them
/// in canonical order.
pub fn reference_satellite<'a, I>(candidates: I) -> Option<SV>
where
    I: IntoIterator<Item = &'a Candidate>,
{
    let mut first = Option::<SV>::None;
    let mut best = Option::<(SV, f64)>::None;

    for cd in candidates {
        if first.is_none() {
            first = Some(cd.sv);
        }

        if cd.elevation_deg > 0.0 {
            match best {
                Some((_, elev)) if cd.elevation_deg <= elev => {},
                _ => best = Some((cd.sv, cd.elevation_deg)),
            }
        }
    }

    best.map(|(sv, _)| sv).or(first)
}

/// [EquationAssembler] forms prefit, design and weight matrices
/// from the [Candidate]s of one epoch.
#[derive(Debug, Clone)]
pub struct EquationAssembler {
    carriers: DualFrequency,
    weighting: Weighting,
}

impl EquationAssembler {
    /// Builds new [EquationAssembler] from [Config]uration
    pub fn new(cfg: &Config) -> Self {
        Self {
            carriers: cfg.carriers,
            weighting: cfg.weighting,
        }
    }

    /// Validates one [Candidate]
    fn validate(&self, catalog: &VariableCatalog, cd: &Candidate) -> Result<(), Rejection> {
        if !cd.elevation_deg.is_finite() {
            return Err(Rejection::NonFiniteInput);
        }

        for measurement in Measurement::ALL {
            match cd.prefit(measurement) {
                Some(value) if value.is_finite() => {},
                Some(_) => return Err(Rejection::NonFiniteInput),
                None => return Err(Rejection::MissingPrefit(measurement)),
            }
        }

        match cd.iono_apriori_m {
            Some(value) if value.is_finite() => {},
            Some(_) => return Err(Rejection::NonFiniteInput),
            None => return Err(Rejection::MissingIonosphere),
        }

        for observable in catalog.core_observables() {
            if catalog.coefficient(*observable).forced {
                continue;
            }

            match cd.partial(*observable) {
                Some(value) if value.is_finite() => {},
                Some(_) => return Err(Rejection::NonFiniteInput),
                None => return Err(Rejection::MissingPartial(*observable)),
            }
        }

        let weight = cd.weight_factor();

        if !weight.is_finite() || weight <= 0.0 {
            return Err(Rejection::InvalidWeight);
        }

        Ok(())
    }

    /// Screens the proposed [Candidate]s: each one is either accepted
    /// or rejected with a [Rejection] reason.
    pub fn screen<'a>(
        &self,
        t: Epoch,
        catalog: &VariableCatalog,
        candidates: &'a [Candidate],
    ) -> Screening<'a> {
        let mut screening = Screening {
            accepted: BTreeMap::new(),
            validity: Vec::with_capacity(candidates.len()),
        };

        for cd in candidates.iter() {
            let validity = if screening.accepted.contains_key(&cd.sv) {
                Err(Rejection::Duplicate)
            } else {
                self.validate(catalog, cd)
            };

            match validity {
                Ok(_) => {
                    screening.accepted.insert(cd.sv, cd);
                },
                Err(rejection) => {
                    error!("{}({}) - rejected: {}", t, cd.sv, rejection);
                },
            }

            screening.validity.push((cd.sv, validity));
        }

        screening
    }

    /// Forms the [EquationSystem] of accepted satellites.
    /// Row layout, for n satellites:
    /// - 4 blocks of n observations (C1, C2, L1, L2)
    /// - n-1 ionospheric constraints (non reference satellites)
    /// - 1 tropospheric constraint
    pub fn assemble(
        &self,
        catalog: &VariableCatalog,
        screening: &Screening,
        zwd_apriori_m: f64,
        set: &VariableSet,
    ) -> Result<EquationSystem, Error> {
        if !zwd_apriori_m.is_finite() {
            return Err(Error::NonFinite("zenith wet delay a-priori"));
        }

        let nsat = screening.len();

        if nsat < MIN_SATELLITES {
            return Err(Error::InsufficientGeometry {
                required: MIN_SATELLITES,
                found: nsat,
            });
        }

        let expected = set.core_len() + SATELLITE_UNKNOWNS * nsat;

        if set.len() != expected {
            return Err(Error::dimension("unknowns", expected, set.len()));
        }

        if !screening.satellites().eq(set.satellites().into_iter()) {
            return Err(Error::dimension(
                "satellite unknowns",
                nsat,
                set.satellites().len(),
            ));
        }

        let reference =
            reference_satellite(screening.candidates()).ok_or(Error::InsufficientGeometry {
                required: MIN_SATELLITES,
                found: 0,
            })?;

        let columns = set.columns();

        let column = |variable: &Variable| -> Result<usize, Error> {
            columns
                .get(variable)
                .copied()
                .ok_or(Error::dimension("unknown column", set.len(), set.len() + 1))
        };

        let (nrows, ncols) = (5 * nsat, set.len());

        let mut h = DMatrix::<f64>::zeros(nrows, ncols);
        let mut prefit = DVector::<f64>::zeros(nrows);
        let mut weights = DVector::<f64>::zeros(nrows);
        let mut rows = Vec::with_capacity(nrows);

        let gamma = self.carriers.gamma();
        let (lambda_1, lambda_2) = (
            self.carriers.lhs.wavelength(),
            self.carriers.rhs.wavelength(),
        );

        let (code_weight, phase_weight) =
            (self.weighting.code_weight(), self.weighting.phase_weight());

        let core = set
            .iter()
            .filter(|(variable, _)| !variable.is_satellite_indexed())
            .map(|(variable, attributes)| Ok((column(variable)?, variable, attributes)))
            .collect::<Result<Vec<_>, Error>>()?;

        // observations: one block per measurement type
        for (block, measurement) in Measurement::ALL.iter().enumerate() {
            for (i, (sv, cd)) in screening.accepted().enumerate() {
                let row = block * nsat + i;

                prefit[row] = cd.prefit(*measurement).unwrap_or_default();

                weights[row] = if measurement.is_code() {
                    code_weight * cd.weight_factor()
                } else {
                    phase_weight * cd.weight_factor()
                };

                for (col, variable, attributes) in core.iter() {
                    h[(row, *col)] = if attributes.coefficient.forced {
                        attributes.coefficient.default
                    } else {
                        cd.partial(variable.observable())
                            .unwrap_or(attributes.coefficient.default)
                    };
                }

                let iono = column(&catalog.satellite_variable(Observable::Ionosphere, *sv))?;

                h[(row, iono)] = match measurement {
                    Measurement::CodeL1 => 1.0,
                    Measurement::CodeL2 => gamma,
                    Measurement::PhaseL1 => -1.0,
                    Measurement::PhaseL2 => -gamma,
                };

                match measurement {
                    Measurement::PhaseL1 => {
                        let amb =
                            column(&catalog.satellite_variable(Observable::AmbiguityL1, *sv))?;
                        h[(row, amb)] = lambda_1;
                    },
                    Measurement::PhaseL2 => {
                        let amb =
                            column(&catalog.satellite_variable(Observable::AmbiguityL2, *sv))?;
                        h[(row, amb)] = lambda_2;
                    },
                    _ => {},
                }

                rows.push(Row::Measurement(*sv, *measurement));
            }
        }

        // ionospheric constraints
        let reference_iono = column(&catalog.satellite_variable(Observable::Ionosphere, reference))?;

        let reference_apriori = screening
            .candidate(reference)
            .and_then(|cd| cd.iono_apriori_m)
            .unwrap_or_default();

        let mut row = 4 * nsat;

        for (sv, cd) in screening.accepted() {
            if *sv == reference {
                continue;
            }

            let iono = column(&catalog.satellite_variable(Observable::Ionosphere, *sv))?;

            h[(row, iono)] = 1.0;
            h[(row, reference_iono)] = -1.0;

            prefit[row] = cd.iono_apriori_m.unwrap_or_default() - reference_apriori;
            weights[row] = cd.weight_factor() / self.weighting.iono_constraint_variance_m2;

            rows.push(Row::IonosphereConstraint(*sv));
            row += 1;
        }

        // tropospheric constraint
        let zwd = column(&catalog.core_variable(Observable::WetTroposphere))?;

        h[(row, zwd)] = 1.0;
        prefit[row] = zwd_apriori_m;
        weights[row] = 1.0 / self.weighting.tropo_constraint_variance_m2;
        rows.push(Row::TroposphereConstraint);

        debug!(
            "equations: {}x{} - reference {} - satellites: {}",
            nrows,
            ncols,
            reference,
            screening.satellites().join(", ")
        );

        EquationSystem::new(prefit, h, weights, rows, reference)
    }
}

#[cfg(test)]
mod test {
    use super::reference_satellite;
    use crate::{
        candidate::Candidate,
        prelude::{Constellation, SV},
    };

    #[test]
    fn reference_satellite_selection() {
        let g01 = SV::new(Constellation::GPS, 1);
        let g02 = SV::new(Constellation::GPS, 2);
        let g03 = SV::new(Constellation::GPS, 3);

        let candidates = [
            Candidate::new(g01, 30.0),
            Candidate::new(g02, 60.0),
            Candidate::new(g03, 60.0),
        ];

        assert_eq!(reference_satellite(candidates.iter()), Some(g02));

        let candidates = [Candidate::new(g02, 0.0), Candidate::new(g03, -5.0)];
        assert_eq!(reference_satellite(candidates.iter()), Some(g02));

        let empty: [Candidate; 0] = [];
        assert_eq!(reference_satellite(empty.iter()), None);
    }
}
