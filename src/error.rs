use thiserror::Error;

use crate::{cfg::Error as ConfigError, solver::EstimatorKind, variable::Variable};

/// Processing step of an epoch, attached to [Error::Epoch] to locate failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    /// Unknown set definition
    VariableCatalog,
    /// Prefit, design and weight matrices formation
    EquationAssembler,
    /// Transition and process noise generation
    StochasticModelBank,
    /// Cross epoch state propagation
    StateCarryForward,
    /// Time and measurement updates
    KalmanCore,
    /// Fixed ambiguities pseudo measurements
    AmbiguityConstraintInjector,
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::VariableCatalog => write!(f, "variable-catalog"),
            Self::EquationAssembler => write!(f, "equation-assembler"),
            Self::StochasticModelBank => write!(f, "stochastic-model-bank"),
            Self::StateCarryForward => write!(f, "state-carry-forward"),
            Self::KalmanCore => write!(f, "kalman-core"),
            Self::AmbiguityConstraintInjector => write!(f, "ambiguity-constraint-injector"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Matrix or vector shapes are not consistent. This is always an
    /// internal assembly defect and is surfaced immediately.
    #[error("dimension mismatch ({what}): expecting {expected}, got {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    /// Not enough satellites to form a well posed system.
    /// The epoch is skipped and the previous state is preserved.
    #[error("insufficient geometry: {found} satellites but {required} required")]
    InsufficientGeometry { required: usize, found: usize },

    /// Cholesky based inversion failed (matrix is not positive definite).
    /// The update is aborted and the previous posterior remains valid.
    #[error("singular system: failed to invert {0}")]
    SingularSystem(&'static str),

    /// The external resolver did not propose any fixed ambiguity.
    #[error("no fixable ambiguity")]
    NoFixableAmbiguity,

    /// Only ambiguity [Variable]s may be fixed to an integer value.
    #[error("{0} is not an ambiguity")]
    NotAnAmbiguity(Variable),

    /// Epochs must be presented in chronological order.
    #[error("bad operation: negative time")]
    TimeUnderflow,

    /// NaN or infinite value where a finite one is expected.
    /// Nothing is committed.
    #[error("non finite {0}")]
    NonFinite(&'static str),

    /// [Solver](crate::prelude::Solver) cannot be built from this configuration
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Any of the above, with the context it was raised in.
    #[error("{kind} epoch #{seq} ({component}): {source}")]
    Epoch {
        kind: EstimatorKind,
        seq: u64,
        component: Component,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Returns the innermost condition, stripping any [Error::Epoch] context.
    pub fn root(&self) -> &Error {
        match self {
            Self::Epoch { source, .. } => source.root(),
            other => other,
        }
    }

    /// Wraps this [Error] with epoch processing context.
    pub(crate) fn within(self, kind: EstimatorKind, seq: u64, component: Component) -> Self {
        Self::Epoch {
            kind,
            seq,
            component,
            source: Box::new(self),
        }
    }

    pub(crate) fn dimension(what: &'static str, expected: usize, found: usize) -> Self {
        Self::DimensionMismatch {
            what,
            expected,
            found,
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Component, Error};
    use crate::solver::EstimatorKind;

    #[test]
    fn error_root_context() {
        let error = Error::NoFixableAmbiguity.within(
            EstimatorKind::PppAr,
            12,
            Component::AmbiguityConstraintInjector,
        );

        assert_eq!(error.root(), &Error::NoFixableAmbiguity);

        assert_eq!(
            error.to_string(),
            "ppp-ar epoch #12 (ambiguity-constraint-injector): no fixable ambiguity"
        );
    }
}
