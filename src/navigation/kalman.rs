use log::debug;
use nalgebra::{Cholesky, DMatrix, DVector};

use crate::error::Error;

/// State estimate: mean (x) and covariance (P), sized
/// to the unknowns of one epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct KfEstimate {
    /// x Vector
    pub x: DVector<f64>,
    /// P Matrix
    pub p: DMatrix<f64>,
}

/// Inverts a symmetric positive definite matrix
fn cholesky_inverse(m: &DMatrix<f64>, what: &'static str) -> Result<DMatrix<f64>, Error> {
    let cholesky = Cholesky::new(m.clone()).ok_or(Error::SingularSystem(what))?;
    Ok(cholesky.inverse())
}

/// Mirrors the upper triangle, removing round-off asymmetry
fn symmetrize(m: DMatrix<f64>) -> DMatrix<f64> {
    (m.clone() + m.transpose()) * 0.5
}

impl KfEstimate {
    /// Create new [KfEstimate], verifying dimensions
    pub fn new(x: DVector<f64>, p: DMatrix<f64>) -> Result<Self, Error> {
        if p.nrows() != p.ncols() {
            return Err(Error::dimension("covariance (square)", p.nrows(), p.ncols()));
        }

        if x.len() != p.nrows() {
            return Err(Error::dimension("state", p.nrows(), x.len()));
        }

        Ok(Self { x, p })
    }

    /// Create a zero [KfEstimate] of said dimension
    pub fn zero(size: usize) -> Self {
        Self {
            x: DVector::zeros(size),
            p: DMatrix::zeros(size, size),
        }
    }

    /// Number of unknowns
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Time update (prediction):
    /// - x⁻ = phi x
    /// - P⁻ = phi P phiᵀ + Q
    pub fn time_update(&self, phi: &DMatrix<f64>, q: &DMatrix<f64>) -> Result<Self, Error> {
        let size = self.len();

        if phi.nrows() != size || phi.ncols() != size {
            return Err(Error::dimension("transition matrix", size, phi.nrows()));
        }

        if q.nrows() != size || q.ncols() != size {
            return Err(Error::dimension("process noise", size, q.nrows()));
        }

        let x = phi * &self.x;
        let p = phi * &self.p * phi.transpose() + q;

        Ok(Self { x, p: symmetrize(p) })
    }

    /// Measurement update, in information form:
    /// - P⁺ = (Hᵀ W H + P⁻⁻¹)⁻¹
    /// - x⁺ = P⁺ (Hᵀ W y + P⁻⁻¹ x⁻)
    ///
    /// `w` is the diagonal of the weight matrix.
    /// Returns the posterior [KfEstimate] and postfit residuals (y - H x⁺).
    /// Self is not modified, whatever the outcome.
    pub fn measurement_update(
        &self,
        prefit: &DVector<f64>,
        h: &DMatrix<f64>,
        w: &DVector<f64>,
    ) -> Result<(Self, DVector<f64>), Error> {
        let (size, nrows) = (self.len(), h.nrows());

        if h.ncols() != size {
            return Err(Error::dimension("design matrix columns", size, h.ncols()));
        }

        if prefit.len() != nrows {
            return Err(Error::dimension("prefit", nrows, prefit.len()));
        }

        if w.len() != nrows {
            return Err(Error::dimension("weights", nrows, w.len()));
        }

        let p_inv = cholesky_inverse(&self.p, "predicted covariance")?;

        let mut ht_w = h.transpose();

        for (j, weight) in w.iter().enumerate() {
            ht_w.column_mut(j).scale_mut(*weight);
        }

        let info = &ht_w * h + &p_inv;
        let p = symmetrize(cholesky_inverse(&info, "information matrix")?);

        let x = &p * (&ht_w * prefit + &p_inv * &self.x);

        let postfit = prefit - h * &x;

        debug!(
            "measurement update: {} unknowns - {} rows - |postfit|={:.3E}",
            size,
            nrows,
            postfit.norm()
        );

        Ok((Self { x, p }, postfit))
    }
}
