//! Fixed ambiguities injection
use std::collections::BTreeMap;

use log::{debug, info, warn};

use crate::{
    candidate::Candidate,
    cfg::Config,
    error::Error,
    navigation::{EquationSystem, Row, Snapshot},
    prelude::Epoch,
    variable::Variable,
};

/// Ambiguities fixed to their integer value (cycles),
/// proposed by an [AmbiguityResolver] for one epoch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AmbFixedMap {
    inner: BTreeMap<Variable, f64>,
}

impl AmbFixedMap {
    /// Fixes this ambiguity. Only ambiguity [Variable]s may be fixed.
    pub fn insert(&mut self, variable: Variable, value: f64) -> Result<(), Error> {
        if !variable.is_ambiguity() {
            return Err(Error::NotAnAmbiguity(variable));
        }
        self.inner.insert(variable, value);
        Ok(())
    }

    /// Fixed value of said ambiguity
    pub fn get(&self, variable: &Variable) -> Option<f64> {
        self.inner.get(variable).copied()
    }

    pub fn contains(&self, variable: &Variable) -> bool {
        self.inner.contains_key(variable)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterates fixed ambiguities, in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (&Variable, f64)> + '_ {
        self.inner.iter().map(|(variable, value)| (variable, *value))
    }
}

/// [AmbiguityResolver] is the integer ambiguity search, which is
/// external to this crate. It is presented the predicted state of each epoch.
pub trait AmbiguityResolver {
    /// Proposes ambiguities to fix, possibly none.
    fn resolve(&mut self, t: Epoch, predicted: &Snapshot, candidates: &[Candidate]) -> AmbFixedMap;
}

impl<F> AmbiguityResolver for F
where
    F: FnMut(Epoch, &Snapshot, &[Candidate]) -> AmbFixedMap,
{
    fn resolve(&mut self, t: Epoch, predicted: &Snapshot, candidates: &[Candidate]) -> AmbFixedMap {
        self(t, predicted, candidates)
    }
}

/// [NullResolver] never fixes anything: float solutions only.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullResolver;

impl AmbiguityResolver for NullResolver {
    fn resolve(&mut self, _: Epoch, _: &Snapshot, _: &[Candidate]) -> AmbFixedMap {
        AmbFixedMap::default()
    }
}

/// [AmbiguityConstraintInjector] appends one pseudo measurement
/// per fixed ambiguity to the [EquationSystem].
#[derive(Debug, Clone, Copy)]
pub struct AmbiguityConstraintInjector {
    weight: f64,
}

impl AmbiguityConstraintInjector {
    /// Builds [AmbiguityConstraintInjector] from [Config]uration
    pub fn new(cfg: &Config) -> Self {
        Self {
            weight: cfg.weighting.fixed_ambiguity_weight,
        }
    }

    /// Weight of each pseudo measurement
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Consults the [AmbiguityResolver] and extends the [EquationSystem]
    /// with one row per fixed ambiguity: 1.0 at the ambiguity column,
    /// the fixed value as prefit. Rows are appended after the measurements,
    /// in canonical order.
    /// Returns the extended system and the fixes that were actually applied.
    pub fn inject<R: AmbiguityResolver>(
        &self,
        resolver: &mut R,
        t: Epoch,
        predicted: &Snapshot,
        candidates: &[Candidate],
        system: &EquationSystem,
    ) -> Result<(EquationSystem, AmbFixedMap), Error> {
        let proposed = resolver.resolve(t, predicted, candidates);

        let mut applied = AmbFixedMap::default();
        let mut rows = Vec::with_capacity(proposed.len());

        for (variable, value) in proposed.iter() {
            match predicted.variables().column(variable) {
                Some(column) => {
                    debug!("{} - {} fixed to {}", t, variable, value);
                    rows.push((
                        Row::FixedAmbiguity(variable.clone()),
                        column,
                        value,
                        self.weight,
                    ));
                    applied.insert(variable.clone(), value)?;
                },
                None => {
                    warn!("{} - {} is not an unknown: fix ignored", t, variable);
                },
            }
        }

        if applied.is_empty() {
            return Err(Error::NoFixableAmbiguity);
        }

        let extended = system.with_one_hot_rows(&rows)?;

        info!("{} - {} fixed ambiguities", t, applied.len());

        Ok((extended, applied))
    }
}
