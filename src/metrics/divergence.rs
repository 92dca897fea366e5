//! Distances between predicted and actual `[p_high, p_low]` distributions.
//!
//! Divergences are in bits.

use serde::Serialize;

use crate::error::{Error, Result};

/// Guard added to the KL denominator and to the log argument.
pub const KL_EPSILON: f64 = 1e-8;

fn check_distributions(p: &[f64], q: &[f64]) -> Result<()> {
    if p.is_empty() {
        return Err(Error::EmptyInput);
    }
    if p.len() != q.len() {
        return Err(Error::DimensionMismatch {
            expected: p.len(),
            found: q.len(),
        });
    }
    if p.iter().chain(q).any(|x| !x.is_finite() || *x < 0.0) {
        return Err(Error::InvalidParameter {
            name: "distribution",
            message: "probabilities must be finite and non-negative",
        });
    }
    Ok(())
}

/// `D(p ‖ q) = Σ p_i · log2(p_i / (q_i + ε) + ε)`.
///
/// The guards keep zero entries finite on both sides. `D(p ‖ p)` is 0 up to
/// roughly `ε / ln 2`.
pub fn kl_divergence(p: &[f64], q: &[f64]) -> Result<f64> {
    check_distributions(p, q)?;
    Ok(p.iter()
        .zip(q)
        .map(|(pi, qi)| pi * (pi / (qi + KL_EPSILON) + KL_EPSILON).log2())
        .sum())
}

/// `½ D(p ‖ m) + ½ D(q ‖ m)` with `m = (p + q) / 2`. Symmetric.
pub fn js_divergence(p: &[f64], q: &[f64]) -> Result<f64> {
    check_distributions(p, q)?;
    let m: Vec<f64> = p.iter().zip(q).map(|(a, b)| 0.5 * (a + b)).collect();
    Ok(0.5 * kl_divergence(p, &m)? + 0.5 * kl_divergence(q, &m)?)
}

/// `½ Σ |p_i − q_i|`, in `[0, 1]` for probability vectors.
pub fn total_variation_distance(p: &[f64], q: &[f64]) -> Result<f64> {
    check_distributions(p, q)?;
    Ok(0.5 * p.iter().zip(q).map(|(a, b)| (a - b).abs()).sum::<f64>())
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct DivergenceMetrics {
    /// `D(predicted ‖ actual)`.
    pub kl: f64,
    pub js: f64,
    pub tvd: f64,
}

impl DivergenceMetrics {
    pub fn between(predicted: &[f64], actual: &[f64]) -> Result<Self> {
        Ok(Self {
            kl: kl_divergence(predicted, actual)?,
            js: js_divergence(predicted, actual)?,
            tvd: total_variation_distance(predicted, actual)?,
        })
    }

    /// Field-wise mean, or `None` for no items.
    pub fn mean<'a, I>(items: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Self>,
    {
        let (sum, count) = items.into_iter().fold((Self::default(), 0usize), |(acc, n), m| {
            (
                Self {
                    kl: acc.kl + m.kl,
                    js: acc.js + m.js,
                    tvd: acc.tvd + m.tvd,
                },
                n + 1,
            )
        });
        (count > 0).then(|| Self {
            kl: sum.kl / count as f64,
            js: sum.js / count as f64,
            tvd: sum.tvd / count as f64,
        })
    }
}
