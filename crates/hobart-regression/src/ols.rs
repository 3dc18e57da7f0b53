//! Ordinary least squares with an intercept.
//!
//! Solves the normal equations `(XᵀX) b = Xᵀy` with `nalgebra` where the first column of `X` is a
//! column of ones. Inference uses the classical homoskedastic standard errors:
//! ```text
//! σ² = Σ eᵢ² / (n - k)
//! se(bⱼ) = sqrt(σ² [(XᵀX)⁻¹]ⱼⱼ)
//! tⱼ = bⱼ / se(bⱼ),  pⱼ = 2 · (1 - F_t(|tⱼ|; n - k))
//! ```

use crate::error::{RegressionError, Result};
use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, ArrayView1, ArrayView2, s};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Singular values of `XᵀX` below this fraction of its largest entry count as zero.
const RANK_TOLERANCE: f64 = 1e-12;

/// Fitted linear model.
#[derive(Debug, Clone, PartialEq)]
pub struct OlsFit {
    /// Intercept followed by one slope per regressor
    pub coefficients: Array1<f64>,
    /// Standard error of each coefficient
    pub std_errors: Array1<f64>,
    /// t-statistic of each coefficient
    pub t_stats: Array1<f64>,
    /// Two-sided p-value of each coefficient
    pub p_values: Array1<f64>,
    /// Number of observations
    pub n_obs: usize,
}

impl OlsFit {
    /// Fitted intercept.
    pub fn intercept(&self) -> f64 {
        self.coefficients[0]
    }

    /// Fitted slopes, one per regressor.
    pub fn slopes(&self) -> ArrayView1<'_, f64> {
        self.coefficients.slice(s![1..])
    }

    /// Two-sided p-value of the `i`-th slope.
    pub fn slope_p_value(&self, i: usize) -> f64 {
        self.p_values[i + 1]
    }

    /// Residual degrees of freedom.
    pub fn df_resid(&self) -> usize {
        self.n_obs - self.coefficients.len()
    }
}

/// Regress `y` on the columns of `x` plus an intercept.
///
/// # Arguments
/// * `y` - Response, length `n`
/// * `x` - Regressors, `n x p` (no intercept column)
///
/// # Errors
/// Fails on mismatched lengths, non-finite inputs, `n <= p + 1` or a singular design.
pub fn fit_ols(y: ArrayView1<'_, f64>, x: ArrayView2<'_, f64>) -> Result<OlsFit> {
    let (n, p) = x.dim();
    if y.len() != n {
        return Err(RegressionError::DimensionMismatch {
            expected: n,
            actual: y.len(),
        });
    }
    let k = p + 1;
    if n <= k {
        return Err(RegressionError::InsufficientData {
            required: k + 1,
            actual: n,
        });
    }
    if !y.iter().chain(x.iter()).all(|v| v.is_finite()) {
        return Err(RegressionError::NonFinite);
    }

    let design = DMatrix::from_fn(n, k, |i, j| if j == 0 { 1.0 } else { x[[i, j - 1]] });
    let response = DVector::from_iterator(n, y.iter().copied());

    let xtx = design.tr_mul(&design);
    let xty = design.tr_mul(&response);
    let xtx_inv = invert(xtx)?;
    let beta = &xtx_inv * &xty;

    let residuals = &response - &design * &beta;
    let df = (n - k) as f64;
    let sigma2 = residuals.norm_squared() / df;

    let coefficients = Array1::from_iter(beta.iter().copied());
    let std_errors = Array1::from_iter((0..k).map(|j| (sigma2 * xtx_inv[(j, j)]).max(0.0).sqrt()));
    let t_stats = Array1::from_iter(
        coefficients
            .iter()
            .zip(&std_errors)
            .map(|(&b, &se)| t_statistic(b, se)),
    );

    let dist = StudentsT::new(0.0, 1.0, df)
        .map_err(|e| RegressionError::InvalidConfig(format!("Student-t distribution: {e}")))?;
    let p_values = t_stats.mapv(|t| two_sided_p(&dist, t));

    Ok(OlsFit {
        coefficients,
        std_errors,
        t_stats,
        p_values,
        n_obs: n,
    })
}

/// Invert `XᵀX`, rejecting matrices that are singular up to rounding.
fn invert(xtx: DMatrix<f64>) -> Result<DMatrix<f64>> {
    let scale = xtx.amax();
    if scale == 0.0 || xtx.rank(RANK_TOLERANCE * scale) < xtx.nrows() {
        return Err(RegressionError::SingularMatrix);
    }
    xtx.try_inverse().ok_or(RegressionError::SingularMatrix)
}

fn t_statistic(coefficient: f64, std_error: f64) -> f64 {
    if std_error > 0.0 {
        coefficient / std_error
    } else if coefficient == 0.0 {
        0.0
    } else {
        f64::INFINITY.copysign(coefficient)
    }
}

fn two_sided_p(dist: &StudentsT, t: f64) -> f64 {
    if t.is_infinite() {
        return 0.0;
    }
    (2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0)
}
