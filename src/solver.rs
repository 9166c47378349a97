//! Uncombined PPP solver
use std::collections::{BTreeMap, HashSet};

use log::{debug, error, info, warn};

use crate::{
    candidate::Candidate,
    cfg::Config,
    error::{Component, Error},
    navigation::{
        AmbFixedMap, AmbiguityConstraintInjector, AmbiguityResolver, EquationAssembler,
        ModelContext, ModelKey, NullResolver, Snapshot, StateCarryForward, StochasticModel,
        StochasticModelBank,
    },
    prelude::{Duration, Epoch, SV},
    solutions::{EpochSolution, FixingStatistics},
    variable::{SourceId, VariableCatalog},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Estimator kind, reported in solutions and errors
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EstimatorKind {
    /// Uncombined (raw) observations PPP, float ambiguities
    #[default]
    UncombinedPpp,
    /// Uncombined PPP with ambiguity resolution
    PppAr,
}

impl std::fmt::Display for EstimatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::UncombinedPpp => write!(f, "uncombined-ppp"),
            Self::PppAr => write!(f, "ppp-ar"),
        }
    }
}

impl std::str::FromStr for EstimatorKind {
    type Err = crate::cfg::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "uncombined-ppp" | "ppp" => Ok(Self::UncombinedPpp),
            "ppp-ar" => Ok(Self::PppAr),
            _ => Err(crate::cfg::Error::InvalidEstimator),
        }
    }
}

/// Filter phase
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum FilterPhase {
    /// No posterior committed yet: initial variances apply
    #[default]
    FirstEpoch,
    /// Prior is carried forward from the previous posterior
    SteadyState,
}

impl std::fmt::Display for FilterPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::FirstEpoch => write!(f, "first-epoch"),
            Self::SteadyState => write!(f, "steady-state"),
        }
    }
}

/// [Solver] resolves [EpochSolution]s, sequentially.
/// One [Solver] processes the epochs of one receiver,
/// in chronological order.
pub struct Solver<R: AmbiguityResolver> {
    /// [EstimatorKind]
    kind: EstimatorKind,
    /// Solver parametrization
    cfg: Config,
    /// Unknowns definition
    catalog: VariableCatalog,
    /// [StochasticModelBank]
    bank: StochasticModelBank,
    /// [EquationAssembler]
    assembler: EquationAssembler,
    /// [AmbiguityConstraintInjector]
    injector: AmbiguityConstraintInjector,
    /// Last committed state
    carry: StateCarryForward,
    /// External [AmbiguityResolver]
    resolver: R,
    /// [FilterPhase]
    phase: FilterPhase,
    /// Epoch sequence number
    seq: u64,
    /// Cumulated fixing statistics
    statistics: BTreeMap<SV, FixingStatistics>,
}

impl Solver<NullResolver> {
    /// Creates a new [Solver] that never fixes ambiguities.
    /// Use [Solver::with_resolver] to attach an [AmbiguityResolver].
    /// ## Input
    /// - kind: [EstimatorKind]
    /// - cfg: [Config]uration
    /// - source: receiver identity
    ///
    /// Fails with [Error::Config] on inconsistent [Config]uration.
    pub fn new(kind: EstimatorKind, cfg: Config, source: SourceId) -> Result<Self, Error> {
        Self::new_with_resolver(kind, cfg, source, NullResolver)
    }
}

impl<R: AmbiguityResolver> Solver<R> {
    /// Creates a new [Solver] with custom [AmbiguityResolver]
    pub fn new_with_resolver(
        kind: EstimatorKind,
        cfg: Config,
        source: SourceId,
        resolver: R,
    ) -> Result<Self, Error> {
        cfg.validate()?;

        let catalog = VariableCatalog::new(&cfg, source);
        let bank = StochasticModelBank::from_config(&cfg);

        info!(
            "{} solver - {} ({}) - {} profile",
            kind, cfg.carriers, cfg.positioning, cfg.profile
        );

        Ok(Self {
            kind,
            assembler: EquationAssembler::new(&cfg),
            injector: AmbiguityConstraintInjector::new(&cfg),
            catalog,
            bank,
            cfg,
            resolver,
            carry: StateCarryForward::default(),
            phase: FilterPhase::default(),
            seq: 0,
            statistics: BTreeMap::new(),
        })
    }

    /// Replaces the [AmbiguityResolver]
    pub fn with_resolver<S: AmbiguityResolver>(self, resolver: S) -> Solver<S> {
        Solver {
            kind: self.kind,
            cfg: self.cfg,
            catalog: self.catalog,
            bank: self.bank,
            assembler: self.assembler,
            injector: self.injector,
            carry: self.carry,
            resolver,
            phase: self.phase,
            seq: self.seq,
            statistics: self.statistics,
        }
    }

    /// Customizes one [StochasticModel]. Models are attributed at
    /// every epoch: this applies to all matching unknowns from the next
    /// epoch on, including the ones carried from previous epochs.
    pub fn with_stochastic_model(mut self, key: ModelKey, model: StochasticModel) -> Self {
        self.bank.insert(key, model);
        self
    }

    /// [EstimatorKind] of this [Solver]
    pub fn kind(&self) -> EstimatorKind {
        self.kind
    }

    /// [Config]uration of this [Solver]
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Current [FilterPhase]
    pub fn phase(&self) -> FilterPhase {
        self.phase
    }

    /// Last committed [Snapshot]
    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.carry.previous()
    }

    /// Cumulated fixing statistics, per satellite
    pub fn statistics(&self) -> &BTreeMap<SV, FixingStatistics> {
        &self.statistics
    }

    /// Cumulated fixing statistics, all satellites
    pub fn total_statistics(&self) -> FixingStatistics {
        self.statistics
            .values()
            .fold(FixingStatistics::default(), |acc, stats| acc + *stats)
    }

    /// Forgets all past epochs, the next one being a first epoch
    pub fn reset(&mut self) {
        self.carry.reset();
        self.phase = FilterPhase::FirstEpoch;
        self.statistics.clear();
    }

    /// Resolves one epoch.
    /// ## Input
    /// - t: sampling [Epoch]
    /// - zwd_apriori_m: a-priori zenith wet delay (m)
    /// - candidates: contributing satellites
    ///
    /// On failure, the last committed state is preserved and
    /// remains the prior of the next attempt.
    pub fn resolve(
        &mut self,
        t: Epoch,
        zwd_apriori_m: f64,
        candidates: &[Candidate],
    ) -> Result<EpochSolution, Error> {
        let seq = self.seq;
        self.seq += 1;

        match self.process(t, seq, zwd_apriori_m, candidates) {
            Ok(solution) => Ok(solution),
            Err(e) => {
                error!("{} - aborted: {}", t, e);
                Err(e)
            },
        }
    }

    fn process(
        &mut self,
        t: Epoch,
        seq: u64,
        zwd_apriori_m: f64,
        candidates: &[Candidate],
    ) -> Result<EpochSolution, Error> {
        let kind = self.kind;
        let within = |component: Component| move |e: Error| e.within(kind, seq, component);

        let dt = self
            .carry
            .elapsed(t)
            .map_err(within(Component::StateCarryForward))?;

        // unknowns
        let screening = self.assembler.screen(t, &self.catalog, candidates);
        let set = self
            .catalog
            .epoch_variables(&self.bank, screening.satellites());

        let nsat = set.satellites().len();

        if nsat != screening.len() {
            return Err(Error::dimension("satellites", screening.len(), nsat).within(
                kind,
                seq,
                Component::VariableCatalog,
            ));
        }

        // equations
        let system = self
            .assembler
            .assemble(&self.catalog, &screening, zwd_apriori_m, &set)
            .map_err(within(Component::EquationAssembler))?;

        // stochastic models
        let slipped = screening
            .candidates()
            .filter(|cd| cd.cycle_slip)
            .map(|cd| cd.sv)
            .collect::<HashSet<_>>();

        let previous = self.carry.previous().map(|snapshot| snapshot.variables());

        let (phi, q) = self.bank.transition_matrices(&set, |variable, attributes| {
            let carried = previous.is_some_and(|previous| previous.contains(variable));

            let slipped = variable.is_ambiguity()
                && variable
                    .satellite()
                    .is_some_and(|sv| slipped.contains(&sv));

            ModelContext {
                elapsed: if carried { dt } else { Duration::ZERO },
                reset: carried && slipped,
                apriori_variance: attributes.initial_variance,
            }
        });

        // carry forward & prediction
        let prior = self.carry.materialize(&set);

        let predicted = prior
            .time_update(&phi, &q)
            .map_err(within(Component::KalmanCore))?;

        // fixed ambiguities
        let (system, fixes) = match self.kind {
            EstimatorKind::UncombinedPpp => (system, AmbFixedMap::default()),
            EstimatorKind::PppAr => {
                let view = Snapshot::new(t, &set, &predicted)
                    .map_err(within(Component::StateCarryForward))?;

                match self
                    .injector
                    .inject(&mut self.resolver, t, &view, candidates, &system)
                {
                    Ok((extended, fixes)) => (extended, fixes),
                    Err(Error::NoFixableAmbiguity) if !self.cfg.require_fixed_ambiguities => {
                        warn!("{} - no fixable ambiguity: float solution", t);
                        (system, AmbFixedMap::default())
                    },
                    Err(e) => {
                        return Err(e.within(kind, seq, Component::AmbiguityConstraintInjector));
                    },
                }
            },
        };

        // update
        let (posterior, postfit) = predicted
            .measurement_update(system.prefit(), system.design(), system.weights())
            .map_err(within(Component::KalmanCore))?;

        if posterior.x.iter().chain(posterior.p.iter()).any(|v| !v.is_finite()) {
            return Err(Error::NonFinite("posterior").within(kind, seq, Component::KalmanCore));
        }

        self.carry
            .snapshot(t, &set, &posterior)
            .map_err(within(Component::StateCarryForward))?;

        if self.phase == FilterPhase::FirstEpoch {
            self.phase = FilterPhase::SteadyState;
            info!("{} - {} solver: {}", t, self.kind, self.phase);
        }

        let solution = EpochSolution::new(
            t,
            seq,
            self.kind,
            &self.catalog,
            &self.cfg.carriers,
            &set,
            &posterior,
            &system,
            &postfit,
            &fixes,
            screening.rejections().collect(),
        );

        for (sv, satellite) in solution.satellites.iter() {
            *self.statistics.entry(*sv).or_default() += satellite.statistics;
        }

        debug!(
            "{} - {} solution - {} satellites - fixing rate {:.2}",
            t,
            solution.solution_type,
            solution.satellites.len(),
            solution.statistics.rate()
        );

        Ok(solution)
    }
}
