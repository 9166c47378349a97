//! Stochastic models: per unknown transition and process noise.
use std::collections::HashMap;

use log::debug;
use nalgebra::DMatrix;

use crate::{
    cfg::Config,
    prelude::{Constellation, Duration, SV},
    variable::{Observable, Variable, VariableAttributes, VariableSet},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default white noise sigma (m), applied when nothing else matches
const DEFAULT_WHITE_NOISE_SIGMA_M: f64 = 3.0E5;

/// Stochastic behavior of one unknown between two epochs.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StochasticModel {
    /// Unknown does not change (static coordinates, ambiguities)
    Constant,
    /// Unknown is independent from one epoch to another (clock).
    /// `sigma` is its standard deviation.
    WhiteNoise { sigma: f64 },
    /// Unknown drifts (troposphere, ionosphere).
    /// `psd` is the power spectral density in unit².s⁻¹.
    RandomWalk { psd: f64 },
}

/// Runtime context of one unknown, fed to its [StochasticModel].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelContext {
    /// Elapsed time since this unknown was last updated
    pub elapsed: Duration,
    /// Unknown must be reset (phase ambiguity after a cycle slip)
    pub reset: bool,
    /// Variance assigned on reset
    pub apriori_variance: f64,
}

impl ModelContext {
    /// [ModelContext] for an unknown that was updated `elapsed` ago
    pub fn elapsed(elapsed: Duration, apriori_variance: f64) -> Self {
        Self {
            elapsed,
            reset: false,
            apriori_variance,
        }
    }
}

impl StochasticModel {
    /// Returns the (phi, q) pair: scalar transition coefficient and
    /// process noise variance, for said [ModelContext].
    pub fn transition(&self, ctx: &ModelContext) -> (f64, f64) {
        if ctx.reset {
            return (0.0, ctx.apriori_variance);
        }

        match self {
            Self::Constant => (1.0, 0.0),
            Self::WhiteNoise { sigma } => (0.0, sigma.powi(2)),
            Self::RandomWalk { psd } => (1.0, psd * ctx.elapsed.to_seconds().abs()),
        }
    }
}

/// Lookup key of the [StochasticModelBank]. Apart from
/// [ModelKey::Variable], these are wildcards that never appear
/// as unknowns of the state vector.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModelKey {
    /// Any source, any satellite
    Observable(Observable),
    /// Any source, all satellites of said [Constellation]
    Constellation(Observable, Constellation),
    /// Any source, said satellite
    Satellite(Observable, SV),
    /// Exactly this unknown
    Variable(Variable),
}

/// [StochasticModelBank] attributes a [StochasticModel] to each unknown
/// and forms the transition and process noise matrices.
#[derive(Debug, Clone, PartialEq)]
pub struct StochasticModelBank {
    models: HashMap<ModelKey, StochasticModel>,
    fallback: StochasticModel,
}

impl Default for StochasticModelBank {
    fn default() -> Self {
        Self {
            models: HashMap::new(),
            fallback: StochasticModel::WhiteNoise {
                sigma: DEFAULT_WHITE_NOISE_SIGMA_M,
            },
        }
    }
}

impl StochasticModelBank {
    /// Builds the [StochasticModelBank] defined by this [Config]uration
    pub fn from_config(cfg: &Config) -> Self {
        let coordinates = cfg.profile.coordinates_model();

        let mut s = Self::default()
            .with_model(
                ModelKey::Observable(Observable::WetTroposphere),
                StochasticModel::RandomWalk {
                    psd: cfg.tropo_psd_m2_s,
                },
            )
            .with_model(
                ModelKey::Observable(Observable::ClockOffset),
                StochasticModel::WhiteNoise {
                    sigma: cfg.clock_sigma_m,
                },
            )
            .with_model(
                ModelKey::Observable(Observable::Ionosphere),
                StochasticModel::RandomWalk {
                    psd: cfg.iono_psd_m2_s,
                },
            )
            .with_model(
                ModelKey::Observable(Observable::AmbiguityL1),
                StochasticModel::Constant,
            )
            .with_model(
                ModelKey::Observable(Observable::AmbiguityL2),
                StochasticModel::Constant,
            );

        for observable in [
            Observable::Dx,
            Observable::Dy,
            Observable::Dz,
            Observable::DLat,
            Observable::DLon,
            Observable::DHeight,
        ] {
            s.insert(ModelKey::Observable(observable), coordinates);
        }

        s
    }

    /// Copies and returns [StochasticModelBank] with customized [StochasticModel]
    pub fn with_model(&self, key: ModelKey, model: StochasticModel) -> Self {
        let mut s = self.clone();
        s.insert(key, model);
        s
    }

    /// Defines (or replaces) a [StochasticModel]
    pub fn insert(&mut self, key: ModelKey, model: StochasticModel) {
        self.models.insert(key, model);
    }

    /// [StochasticModel] of this unknown. The most specific key wins:
    /// exact [Variable], then satellite, then constellation, then [Observable].
    pub fn model(&self, variable: &Variable) -> StochasticModel {
        let observable = variable.observable();

        if let Some(model) = self.models.get(&ModelKey::Variable(variable.clone())) {
            return *model;
        }

        if let Some(sv) = variable.satellite() {
            if let Some(model) = self.models.get(&ModelKey::Satellite(observable, sv)) {
                return *model;
            }

            let key = ModelKey::Constellation(observable, sv.constellation);

            if let Some(model) = self.models.get(&key) {
                return *model;
            }
        }

        self.models
            .get(&ModelKey::Observable(observable))
            .copied()
            .unwrap_or(self.fallback)
    }

    /// Forms the (diagonal) transition and process noise matrices of
    /// this [VariableSet]. No cross unknown coupling is modeled.
    pub fn transition_matrices<F>(
        &self,
        set: &VariableSet,
        context: F,
    ) -> (DMatrix<f64>, DMatrix<f64>)
    where
        F: Fn(&Variable, &VariableAttributes) -> ModelContext,
    {
        let size = set.len();

        let mut phi = DMatrix::<f64>::zeros(size, size);
        let mut q = DMatrix::<f64>::zeros(size, size);

        for (i, (variable, attributes)) in set.iter().enumerate() {
            let ctx = context(variable, attributes);
            let (phi_i, q_i) = attributes.model.transition(&ctx);

            if ctx.reset {
                debug!("{} - reset", variable);
            }

            phi[(i, i)] = phi_i;
            q[(i, i)] = q_i;
        }

        (phi, q)
    }
}
