use std::collections::HashMap;

use log::debug;

use crate::{
    cfg::{Config, Positioning},
    navigation::StochasticModelBank,
    prelude::SV,
    variable::{Coefficient, Observable, SourceId, Variable, VariableAttributes, VariableSet},
};

/// [VariableCatalog] defines the unknowns of one receiver
/// and builds the [VariableSet] of each epoch.
#[derive(Debug, Clone)]
pub struct VariableCatalog {
    /// Receiver the unknowns belong to
    source: SourceId,
    /// Source indexed [Observable]s
    core: Vec<Observable>,
    /// Initial variance, per [Observable]
    variances: HashMap<Observable, f64>,
    /// Design [Coefficient], per [Observable]
    coefficients: HashMap<Observable, Coefficient>,
}

impl VariableCatalog {
    /// Satellite indexed [Observable]s, identical for all strategies
    pub const SATELLITE_OBSERVABLES: [Observable; 3] = [
        Observable::Ionosphere,
        Observable::AmbiguityL1,
        Observable::AmbiguityL2,
    ];

    /// Builds the [VariableCatalog] of `source` for this [Config]uration
    pub fn new(cfg: &Config, source: SourceId) -> Self {
        let mut core = vec![Observable::WetTroposphere];

        match cfg.positioning {
            Positioning::Ecef => {
                core.extend([Observable::Dx, Observable::Dy, Observable::Dz]);
            },
            Positioning::Neu => {
                core.extend([Observable::DLat, Observable::DLon, Observable::DHeight]);
            },
            Positioning::Fixed => {},
        }

        core.push(Observable::ClockOffset);

        let mut variances = HashMap::with_capacity(core.len() + 3);

        for observable in core.iter() {
            let variance = match observable {
                Observable::WetTroposphere => cfg.variances.troposphere_m2,
                Observable::ClockOffset => cfg.variances.clock_m2,
                _ => cfg.variances.coordinates_m2,
            };
            variances.insert(*observable, variance);
        }

        variances.insert(Observable::Ionosphere, cfg.variances.ionosphere_m2);
        variances.insert(Observable::AmbiguityL1, cfg.variances.ambiguity);
        variances.insert(Observable::AmbiguityL2, cfg.variances.ambiguity);

        let mut coefficients = HashMap::with_capacity(1);
        coefficients.insert(Observable::ClockOffset, Coefficient::forced(1.0));

        debug!(
            "{} - unknowns: {:?} + {:?} per satellite",
            source,
            core,
            Self::SATELLITE_OBSERVABLES
        );

        Self {
            source,
            core,
            variances,
            coefficients,
        }
    }

    /// Receiver these unknowns belong to
    pub fn source(&self) -> &SourceId {
        &self.source
    }

    /// Source indexed [Observable]s
    pub fn core_observables(&self) -> &[Observable] {
        &self.core
    }

    /// Customize the design [Coefficient] of an [Observable]
    pub fn with_coefficient(&self, observable: Observable, coefficient: Coefficient) -> Self {
        let mut s = self.clone();
        s.coefficients.insert(observable, coefficient);
        s
    }

    /// Customize the initial variance of an [Observable]
    pub fn with_initial_variance(&self, observable: Observable, variance: f64) -> Self {
        let mut s = self.clone();
        s.variances.insert(observable, variance);
        s
    }

    /// Source indexed [Variable] for this [Observable]
    pub fn core_variable(&self, observable: Observable) -> Variable {
        Variable::source_indexed(observable, self.source.clone())
    }

    /// Satellite indexed [Variable] for this [Observable]
    pub fn satellite_variable(&self, observable: Observable, sv: SV) -> Variable {
        Variable::satellite_indexed(observable, self.source.clone(), sv)
    }

    /// Source indexed [Variable]s, in column order
    pub fn core_variables(&self) -> Vec<Variable> {
        let mut core = self
            .core
            .iter()
            .map(|obs| self.core_variable(*obs))
            .collect::<Vec<_>>();

        core.sort();
        core
    }

    /// [VariableAttributes] of this [Variable], its model being
    /// picked up from the [StochasticModelBank].
    pub fn attributes(&self, bank: &StochasticModelBank, variable: &Variable) -> VariableAttributes {
        let observable = variable.observable();

        VariableAttributes {
            model: bank.model(variable),
            initial_variance: self.variances.get(&observable).copied().unwrap_or(1.0E10),
            coefficient: self.coefficient(observable),
        }
    }

    /// Design [Coefficient] of this [Observable]
    pub fn coefficient(&self, observable: Observable) -> Coefficient {
        self.coefficients
            .get(&observable)
            .copied()
            .unwrap_or_default()
    }

    /// Builds the [VariableSet] of an epoch where said satellites contribute.
    pub fn epoch_variables<I: IntoIterator<Item = SV>>(
        &self,
        bank: &StochasticModelBank,
        satellites: I,
    ) -> VariableSet {
        let mut set = VariableSet::default();

        for variable in self.core_variables() {
            let attributes = self.attributes(bank, &variable);
            set.insert(variable, attributes);
        }

        for sv in satellites {
            for observable in Self::SATELLITE_OBSERVABLES {
                let variable = self.satellite_variable(observable, sv);
                let attributes = self.attributes(bank, &variable);
                set.insert(variable, attributes);
            }
        }

        set
    }
}

#[cfg(test)]
mod test {
    use super::VariableCatalog;
    use crate::{
        cfg::{Config, Positioning},
        navigation::{StochasticModel, StochasticModelBank},
        prelude::{Constellation, SV},
        variable::{Observable, SourceId},
    };

    use rstest::*;

    #[rstest]
    #[case(Positioning::Ecef, 5)]
    #[case(Positioning::Neu, 5)]
    #[case(Positioning::Fixed, 2)]
    fn catalog_epoch_variables(#[case] positioning: Positioning, #[case] core: usize) {
        let cfg = Config {
            positioning,
            ..Config::default()
        };

        let catalog = VariableCatalog::new(&cfg, SourceId::from("REF1"));
        let bank = StochasticModelBank::from_config(&cfg);

        let svs = [
            SV::new(Constellation::GPS, 12),
            SV::new(Constellation::GPS, 3),
            SV::new(Constellation::GPS, 25),
        ];

        let set = catalog.epoch_variables(&bank, svs);

        assert_eq!(set.core_len(), core);
        assert_eq!(set.len(), core + 3 * svs.len());

        let first = set.variables().next().unwrap();
        assert_eq!(first.observable(), Observable::WetTroposphere);

        let clock = catalog.core_variable(Observable::ClockOffset);
        let attributes = set.attributes(&clock).unwrap();

        assert!(attributes.coefficient.forced);
        assert_eq!(attributes.coefficient.default, 1.0);
        assert_eq!(
            attributes.model,
            StochasticModel::WhiteNoise {
                sigma: cfg.clock_sigma_m
            }
        );

        let amb = catalog.satellite_variable(Observable::AmbiguityL1, svs[0]);
        let attributes = set.attributes(&amb).unwrap();

        assert_eq!(attributes.initial_variance, cfg.variances.ambiguity);
        assert_eq!(attributes.model, StochasticModel::Constant);
    }
}
