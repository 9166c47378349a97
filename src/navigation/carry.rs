//! Cross epoch state propagation, keyed by [Variable] identity
use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::{
    error::Error,
    navigation::KfEstimate,
    prelude::{Duration, Epoch},
    variable::{Variable, VariableSet},
};

/// Index of (i, j) in the row major upper triangle of a n x n matrix
fn packed_index(n: usize, i: usize, j: usize) -> usize {
    let (i, j) = if i <= j { (i, j) } else { (j, i) };
    i * (2 * n - i + 1) / 2 + (j - i)
}

/// [Snapshot] of a committed state: mean and covariance
/// of each unknown, addressed by [Variable].
/// Only the upper triangle of the covariance is stored,
/// it is mirrored on read.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    t: Epoch,
    variables: VariableSet,
    mean: DVector<f64>,
    upper: Vec<f64>,
}

impl Snapshot {
    /// Captures this [KfEstimate], which must describe this [VariableSet]
    pub fn new(t: Epoch, variables: &VariableSet, estimate: &KfEstimate) -> Result<Self, Error> {
        let size = variables.len();

        if estimate.x.len() != size {
            return Err(Error::dimension("snapshot state", size, estimate.x.len()));
        }

        if estimate.p.nrows() != size || estimate.p.ncols() != size {
            return Err(Error::dimension("snapshot covariance", size, estimate.p.nrows()));
        }

        let mut upper = Vec::with_capacity(size * (size + 1) / 2);

        for i in 0..size {
            for j in i..size {
                upper.push(estimate.p[(i, j)]);
            }
        }

        Ok(Self {
            t,
            variables: variables.clone(),
            mean: estimate.x.clone(),
            upper,
        })
    }

    /// [Epoch] of this [Snapshot]
    pub fn epoch(&self) -> Epoch {
        self.t
    }

    /// Unknowns described by this [Snapshot]
    pub fn variables(&self) -> &VariableSet {
        &self.variables
    }

    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// Mean of said [Variable], if it is described
    pub fn mean(&self, variable: &Variable) -> Option<f64> {
        let index = self.variables.column(variable)?;
        Some(self.mean[index])
    }

    /// Covariance of a pair of [Variable]s, if both are described
    pub fn covariance(&self, a: &Variable, b: &Variable) -> Option<f64> {
        let i = self.variables.column(a)?;
        let j = self.variables.column(b)?;
        Some(self.covariance_at(i, j))
    }

    /// Variance of said [Variable], if it is described
    pub fn variance(&self, variable: &Variable) -> Option<f64> {
        self.covariance(variable, variable)
    }

    fn covariance_at(&self, i: usize, j: usize) -> f64 {
        self.upper[packed_index(self.len(), i, j)]
    }

    /// Dense state vector
    pub fn state(&self) -> DVector<f64> {
        self.mean.clone()
    }

    /// Dense (mirrored) covariance matrix
    pub fn covariance_matrix(&self) -> DMatrix<f64> {
        let size = self.len();
        DMatrix::from_fn(size, size, |i, j| self.covariance_at(i, j))
    }

    /// Dense [KfEstimate]
    pub fn estimate(&self) -> KfEstimate {
        KfEstimate {
            x: self.state(),
            p: self.covariance_matrix(),
        }
    }
}

/// [StateCarryForward] owns the last committed [Snapshot] and maps
/// it onto the unknowns of the following epoch.
#[derive(Debug, Clone, Default)]
pub struct StateCarryForward {
    snapshot: Option<Snapshot>,
}

impl StateCarryForward {
    /// True until a first posterior has been committed
    pub fn is_first_epoch(&self) -> bool {
        self.snapshot.is_none()
    }

    /// Last committed [Snapshot]
    pub fn previous(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    /// Commits this posterior [KfEstimate]
    pub fn snapshot(
        &mut self,
        t: Epoch,
        variables: &VariableSet,
        posterior: &KfEstimate,
    ) -> Result<(), Error> {
        let snapshot = Snapshot::new(t, variables, posterior)?;
        debug!("{} - committed {} unknowns", t, snapshot.len());
        self.snapshot = Some(snapshot);
        Ok(())
    }

    /// Elapsed time since the last commit, or zero on first epoch.
    /// Epochs may not go backwards.
    pub fn elapsed(&self, t: Epoch) -> Result<Duration, Error> {
        match &self.snapshot {
            Some(snapshot) => {
                let dt = t - snapshot.epoch();
                if dt < Duration::ZERO {
                    Err(Error::TimeUnderflow)
                } else {
                    Ok(dt)
                }
            },
            None => Ok(Duration::ZERO),
        }
    }

    /// Forms the prior [KfEstimate] of this [VariableSet].
    /// - unknowns known previously inherit their mean and covariance
    /// - new unknowns get their initial variance, zero mean and no correlation
    /// - unknowns that disappeared are dropped
    pub fn materialize(&self, variables: &VariableSet) -> KfEstimate {
        let size = variables.len();

        let mut x = DVector::<f64>::zeros(size);
        let mut p = DMatrix::<f64>::zeros(size, size);

        let snapshot = match &self.snapshot {
            Some(snapshot) => snapshot,
            None => {
                for (i, (_, attributes)) in variables.iter().enumerate() {
                    p[(i, i)] = attributes.initial_variance;
                }
                return KfEstimate { x, p };
            },
        };

        let indices = variables.indices(snapshot.variables());

        let (mut carried, mut seeded) = (0, 0);

        for a in indices.iter() {
            match a.pre {
                Some(pre_a) => {
                    carried += 1;
                    x[a.now] = snapshot.mean[pre_a];

                    for b in indices.iter() {
                        if let Some(pre_b) = b.pre {
                            p[(a.now, b.now)] = snapshot.covariance_at(pre_a, pre_b);
                        }
                    }
                },
                None => {
                    seeded += 1;
                    p[(a.now, a.now)] = variables
                        .attributes(a.variable)
                        .map(|attributes| attributes.initial_variance)
                        .unwrap_or_default();
                },
            }
        }

        debug!(
            "{} - carried {} unknowns, seeded {}, dropped {}",
            snapshot.epoch(),
            carried,
            seeded,
            snapshot.len() - carried
        );

        KfEstimate { x, p }
    }

    /// Forgets the committed state: next epoch is a first epoch
    pub fn reset(&mut self) {
        self.snapshot = None;
    }
}
