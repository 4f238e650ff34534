//! Gaussian copula over binary indicator columns.
//!
//! Each column is modelled by its empirical probability of being 1. Rows are
//! mapped to normal scores, the score correlation matrix is estimated, and new
//! rows are drawn from the correlated normal and cut back to 0/1 at the
//! quantile that preserves each column's marginal.

use crate::{AnonymizeError, AnonymizeResult};
use rand::Rng;
use rand_distr::StandardNormal;

/// Diagonal loadings tried, in order, until the correlation matrix factors.
const JITTER: [f64; 6] = [0.0, 1e-8, 1e-6, 1e-4, 1e-2, 1e-1];

/// Smallest pivot accepted by the Cholesky factorization.
const MIN_PIVOT: f64 = 1e-10;

/// Probability clamp for the inverse normal CDF.
const P_EPSILON: f64 = 1e-9;

/// Fitted Gaussian copula over binary columns.
#[derive(Debug, Clone)]
pub struct GaussianCopula {
    columns: Vec<String>,
    marginals: Vec<f64>,
    cut_points: Vec<f64>,
    factor: Vec<Vec<f64>>,
}

impl GaussianCopula {
    /// Fits the copula to 0/1 rows. Values are read as 1 when >= 0.5.
    pub fn fit(columns: Vec<String>, rows: &[Vec<f64>]) -> AnonymizeResult<Self> {
        let dim = columns.len();
        if dim == 0 {
            return Err(AnonymizeError::SamplerFit("no columns to fit".into()));
        }
        if rows.is_empty() {
            return Err(AnonymizeError::SamplerFit("no rows to fit".into()));
        }
        if let Some(bad) = rows.iter().position(|r| r.len() != dim) {
            return Err(AnonymizeError::SamplerFit(format!(
                "row {bad} has {} values, expected {dim}",
                rows[bad].len()
            )));
        }

        let n = rows.len() as f64;
        let marginals: Vec<f64> = (0..dim)
            .map(|j| rows.iter().filter(|r| r[j] >= 0.5).count() as f64 / n)
            .collect();

        let cut_points = marginals
            .iter()
            .map(|&p| {
                if p >= 1.0 {
                    f64::NEG_INFINITY
                } else if p <= 0.0 {
                    f64::INFINITY
                } else {
                    inverse_normal_cdf(1.0 - p)
                }
            })
            .collect();

        // Mid-point of each CDF step.
        let scores: Vec<Vec<f64>> = rows
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&marginals)
                    .map(|(&x, &p)| {
                        if p <= 0.0 || p >= 1.0 {
                            0.0
                        } else if x >= 0.5 {
                            inverse_normal_cdf(1.0 - p / 2.0)
                        } else {
                            inverse_normal_cdf((1.0 - p) / 2.0)
                        }
                    })
                    .collect()
            })
            .collect();

        let corr = correlation(&scores, dim);
        let factor = factor_with_jitter(&corr)?;

        Ok(Self {
            columns,
            marginals,
            cut_points,
            factor,
        })
    }

    /// Draws rows of 0/1 indicators.
    pub fn sample<R: Rng>(&self, count: usize, rng: &mut R) -> Vec<Vec<u8>> {
        let dim = self.columns.len();
        let mut rows = Vec::with_capacity(count);
        let mut noise = vec![0.0_f64; dim];

        for _ in 0..count {
            for e in noise.iter_mut() {
                *e = rng.sample(StandardNormal);
            }
            let row = (0..dim)
                .map(|i| {
                    let z: f64 = (0..=i).map(|k| self.factor[i][k] * noise[k]).sum();
                    u8::from(z > self.cut_points[i])
                })
                .collect();
            rows.push(row);
        }

        rows
    }

    /// Returns the column names.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the fitted probability of 1 for each column.
    #[must_use]
    pub fn marginals(&self) -> &[f64] {
        &self.marginals
    }
}

/// Pearson correlation of the score columns. Constant columns are uncorrelated.
fn correlation(scores: &[Vec<f64>], dim: usize) -> Vec<Vec<f64>> {
    let n = scores.len() as f64;
    let means: Vec<f64> = (0..dim)
        .map(|j| scores.iter().map(|r| r[j]).sum::<f64>() / n)
        .collect();
    let stds: Vec<f64> = (0..dim)
        .map(|j| {
            let var = scores.iter().map(|r| (r[j] - means[j]).powi(2)).sum::<f64>() / n;
            var.sqrt()
        })
        .collect();

    let mut corr = vec![vec![0.0; dim]; dim];
    for i in 0..dim {
        corr[i][i] = 1.0;
        for j in 0..i {
            if stds[i] == 0.0 || stds[j] == 0.0 {
                continue;
            }
            let cov = scores
                .iter()
                .map(|r| (r[i] - means[i]) * (r[j] - means[j]))
                .sum::<f64>()
                / n;
            let c = (cov / (stds[i] * stds[j])).clamp(-1.0, 1.0);
            corr[i][j] = c;
            corr[j][i] = c;
        }
    }
    corr
}

/// Factors the correlation matrix, loading the diagonal when it is singular.
///
/// One-hot groups always sum to one, so the raw matrix is rank-deficient.
fn factor_with_jitter(corr: &[Vec<f64>]) -> AnonymizeResult<Vec<Vec<f64>>> {
    for eps in JITTER {
        let loaded: Vec<Vec<f64>> = corr
            .iter()
            .enumerate()
            .map(|(i, row)| {
                row.iter()
                    .enumerate()
                    .map(|(j, &v)| {
                        let v = if i == j { v + eps } else { v };
                        v / (1.0 + eps)
                    })
                    .collect()
            })
            .collect();

        if let Some(l) = cholesky(&loaded) {
            if eps > 0.0 {
                tracing::debug!(eps, "correlation matrix factored with diagonal loading");
            }
            return Ok(l);
        }
    }

    Err(AnonymizeError::SamplerFit(
        "correlation matrix is not positive definite".into(),
    ))
}

/// Lower-triangular Cholesky factor, or `None` if the matrix is not positive definite.
pub(crate) fn cholesky(m: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    let n = m.len();
    let mut l = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[i][k] * l[j][k]).sum();
            if i == j {
                let pivot = m[i][i] - sum;
                if pivot <= MIN_PIVOT || !pivot.is_finite() {
                    return None;
                }
                l[i][j] = pivot.sqrt();
            } else {
                l[i][j] = (m[i][j] - sum) / l[j][j];
            }
        }
    }

    Some(l)
}

/// Inverse of the standard normal CDF (Acklam's rational approximation).
pub(crate) fn inverse_normal_cdf(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_690e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838,
        -2.549_732_539_343_734,
        4.374_664_141_464_968,
        2.938_163_982_698_783,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996,
        3.754_408_661_907_416,
    ];
    const P_LOW: f64 = 0.024_25;

    let p = p.clamp(P_EPSILON, 1.0 - P_EPSILON);

    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    }
}
