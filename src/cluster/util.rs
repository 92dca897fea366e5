use crate::error::{Error, Result};

/// Default floor applied to denominators in the annealing updates.
pub const DEFAULT_EPSILON: f64 = 1e-8;

/// Signature of a point-to-center distance function.
pub type DistanceFn = fn(&[f64], &[f64]) -> f64;

#[inline]
pub fn squared_euclidean(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[inline]
pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    squared_euclidean(a, b).sqrt()
}

/// Divide `a` by `b`, flooring the denominator at `floor`.
///
/// Every division in the annealing updates goes through this so that an
/// all-zero row or column never produces NaN or infinity.
#[inline]
pub fn safe_divide(a: f64, b: f64, floor: f64) -> f64 {
    a / b.max(floor)
}

/// Index of the largest value; the first one wins on ties.
pub(crate) fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Index of the smallest value; the first one wins on ties.
pub(crate) fn argmin(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v < values[best] {
            best = i;
        }
    }
    best
}

/// Per-cluster member counts (`bincount` with a fixed length).
pub(crate) fn cluster_sizes(labels: &[usize], n_clusters: usize) -> Vec<usize> {
    let mut sizes = vec![0usize; n_clusters];
    for &l in labels {
        sizes[l] += 1;
    }
    sizes
}

/// Column-wise mean of a non-empty dense matrix.
pub(crate) fn centroid(data: &[Vec<f64>]) -> Vec<f64> {
    let d = data[0].len();
    let mut mean = vec![0.0; d];
    for row in data {
        for (m, x) in mean.iter_mut().zip(row) {
            *m += x;
        }
    }
    let n = data.len() as f64;
    for m in &mut mean {
        *m /= n;
    }
    mean
}

/// Check that `data` is non-empty, rectangular, at least one column wide and finite.
///
/// Returns the dimensionality.
pub(crate) fn validate_matrix(data: &[Vec<f64>]) -> Result<usize> {
    let first = data.first().ok_or(Error::EmptyInput)?;
    let d = first.len();
    if d == 0 {
        return Err(Error::InvalidParameter {
            name: "dimension",
            message: "must be at least 1",
        });
    }
    for (row, point) in data.iter().enumerate() {
        if point.len() != d {
            return Err(Error::DimensionMismatch {
                expected: d,
                found: point.len(),
            });
        }
        if let Some(column) = point.iter().position(|x| !x.is_finite()) {
            return Err(Error::NonFiniteValue { row, column });
        }
    }
    Ok(d)
}
