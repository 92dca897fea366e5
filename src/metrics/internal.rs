//! Internal cluster-quality indices.
//!
//! These need no ground truth: they score a partition by how compact and
//! separated its clusters are in feature space. All distances are Euclidean.
//!
//! | Index | Range | Better |
//! |-------|-------|--------|
//! | Silhouette | `[-1, 1]` | higher |
//! | Davies–Bouldin | `[0, ∞)` | lower |
//! | Calinski–Harabasz | `[0, ∞)` | higher |
//!
//! ## References
//!
//! - Rousseeuw, P. (1987). "Silhouettes: a graphical aid to the interpretation
//!   and validation of cluster analysis."
//! - Davies, D. & Bouldin, D. (1979). "A cluster separation measure."
//! - Caliński, T. & Harabasz, J. (1974). "A dendrite method for cluster analysis."

use serde::Serialize;

use crate::cluster::{util, DeterministicAnnealing};
use crate::error::{Error, Result};

/// Compact label ids to `0..k` and check `2 <= k <= n - 1`.
///
/// Returns the relabelled assignments and `k`.
fn check_labels(data: &[Vec<f64>], labels: &[usize]) -> Result<(Vec<usize>, usize)> {
    util::validate_matrix(data)?;
    if labels.len() != data.len() {
        return Err(Error::DimensionMismatch {
            expected: data.len(),
            found: labels.len(),
        });
    }
    let mut distinct: Vec<usize> = labels.to_vec();
    distinct.sort_unstable();
    distinct.dedup();
    let k = distinct.len();
    let n = labels.len();
    if k < 2 || k >= n {
        return Err(Error::DegenerateLabels { found: k, n_items: n });
    }
    let compact = labels
        .iter()
        .map(|l| distinct.binary_search(l).unwrap_or_default())
        .collect();
    Ok((compact, k))
}

fn cluster_means(data: &[Vec<f64>], labels: &[usize], k: usize) -> Vec<Vec<f64>> {
    let d = data[0].len();
    let sizes = util::cluster_sizes(labels, k);
    let mut means = vec![vec![0.0; d]; k];
    for (point, &l) in data.iter().zip(labels) {
        for (m, x) in means[l].iter_mut().zip(point) {
            *m += x;
        }
    }
    for (mean, &size) in means.iter_mut().zip(&sizes) {
        for m in mean.iter_mut() {
            *m /= size as f64;
        }
    }
    means
}

/// Mean silhouette coefficient over all points.
///
/// A point alone in its cluster scores 0.
pub fn silhouette_score(data: &[Vec<f64>], labels: &[usize]) -> Result<f64> {
    let (labels, k) = check_labels(data, labels)?;
    let sizes = util::cluster_sizes(&labels, k);
    let n = data.len();

    let mut total = 0.0;
    let mut sums = vec![0.0; k];
    for i in 0..n {
        sums.iter_mut().for_each(|s| *s = 0.0);
        for j in 0..n {
            if i != j {
                sums[labels[j]] += util::euclidean(&data[i], &data[j]);
            }
        }
        let own = labels[i];
        if sizes[own] <= 1 {
            continue;
        }
        let a = sums[own] / (sizes[own] - 1) as f64;
        let b = (0..k)
            .filter(|&c| c != own)
            .map(|c| sums[c] / sizes[c] as f64)
            .fold(f64::INFINITY, f64::min);
        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
        }
    }
    Ok(total / n as f64)
}

/// Davies–Bouldin index: mean over clusters of the worst ratio
/// `(s_i + s_j) / d(μ_i, μ_j)`, where `s` is the mean distance to the centroid.
///
/// Coincident centroids count as infinitely far apart. Returns 0 when every
/// cluster has zero spread or every pair of centroids coincides.
pub fn davies_bouldin_score(data: &[Vec<f64>], labels: &[usize]) -> Result<f64> {
    let (labels, k) = check_labels(data, labels)?;
    let means = cluster_means(data, &labels, k);
    let sizes = util::cluster_sizes(&labels, k);

    let mut spread = vec![0.0; k];
    for (point, &l) in data.iter().zip(&labels) {
        spread[l] += util::euclidean(point, &means[l]);
    }
    for (s, &size) in spread.iter_mut().zip(&sizes) {
        *s /= size as f64;
    }

    let mut separation = vec![vec![0.0; k]; k];
    for i in 0..k {
        for j in (i + 1)..k {
            let d = util::euclidean(&means[i], &means[j]);
            separation[i][j] = d;
            separation[j][i] = d;
        }
    }

    let all_compact = spread.iter().all(|&s| s.abs() < 1e-15);
    let all_coincident = separation.iter().flatten().all(|&d| d.abs() < 1e-15);
    if all_compact || all_coincident {
        return Ok(0.0);
    }

    let worst: f64 = (0..k)
        .map(|i| {
            (0..k)
                .filter(|&j| j != i)
                .map(|j| {
                    let d = separation[i][j];
                    if d == 0.0 {
                        0.0
                    } else {
                        (spread[i] + spread[j]) / d
                    }
                })
                .fold(0.0, f64::max)
        })
        .sum();
    Ok(worst / k as f64)
}

/// Calinski–Harabasz index: between- over within-cluster dispersion, each
/// divided by its degrees of freedom.
///
/// A partition with zero within-cluster dispersion scores 1.
pub fn calinski_harabasz_score(data: &[Vec<f64>], labels: &[usize]) -> Result<f64> {
    let (labels, k) = check_labels(data, labels)?;
    let n = data.len();
    let means = cluster_means(data, &labels, k);
    let sizes = util::cluster_sizes(&labels, k);
    let global = util::centroid(data);

    let between: f64 = means
        .iter()
        .zip(&sizes)
        .map(|(m, &size)| size as f64 * util::squared_euclidean(m, &global))
        .sum();
    let within: f64 = data
        .iter()
        .zip(&labels)
        .map(|(point, &l)| util::squared_euclidean(point, &means[l]))
        .sum();

    if within == 0.0 {
        return Ok(1.0);
    }
    Ok(between * (n - k) as f64 / (within * (k - 1) as f64))
}

/// Internal indices of one fitted model on its training data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ClusterQuality {
    pub silhouette: f64,
    pub davies_bouldin: f64,
    pub calinski_harabasz: f64,
    /// Within-cluster sum of squares.
    pub inertia: f64,
    /// Between-cluster sum of squares.
    pub bcss: f64,
}

impl ClusterQuality {
    /// Score `model`'s current labels on the data it was fitted on.
    pub fn evaluate(model: &DeterministicAnnealing, data: &[Vec<f64>]) -> Result<Self> {
        let fit = model.fitted().ok_or(Error::NotFitted)?;
        Ok(Self {
            silhouette: silhouette_score(data, &fit.labels)?,
            davies_bouldin: davies_bouldin_score(data, &fit.labels)?,
            calinski_harabasz: calinski_harabasz_score(data, &fit.labels)?,
            inertia: fit.inertia,
            bcss: model.compute_bcss(data)?,
        })
    }

    /// Field-wise mean, or `None` for no items.
    pub fn mean<'a, I>(items: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Self>,
    {
        let mut total = Self::default();
        let mut count = 0usize;
        for q in items {
            total.silhouette += q.silhouette;
            total.davies_bouldin += q.davies_bouldin;
            total.calinski_harabasz += q.calinski_harabasz;
            total.inertia += q.inertia;
            total.bcss += q.bcss;
            count += 1;
        }
        if count == 0 {
            return None;
        }
        let n = count as f64;
        Some(Self {
            silhouette: total.silhouette / n,
            davies_bouldin: total.davies_bouldin / n,
            calinski_harabasz: total.calinski_harabasz / n,
            inertia: total.inertia / n,
            bcss: total.bcss / n,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::AnnealingParams;

    fn two_blobs() -> (Vec<Vec<f64>>, Vec<usize>) {
        let data = vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![10.0, 0.0],
            vec![10.0, 1.0],
        ];
        (data, vec![0, 0, 1, 1])
    }

    #[test]
    fn silhouette_of_separated_blobs() {
        let (data, labels) = two_blobs();
        let s = silhouette_score(&data, &labels).unwrap();
        // a = 1, b = (10 + √101) / 2 for every point.
        let b = (10.0 + 101f64.sqrt()) / 2.0;
        assert!((s - (b - 1.0) / b).abs() < 1e-12);
    }

    #[test]
    fn silhouette_singleton_scores_zero() {
        let data = vec![vec![0.0], vec![1.0], vec![5.0]];
        let s = silhouette_score(&data, &[0, 0, 1]).unwrap();
        // Points 0 and 1: a = 1, b = 5 and 4.
        let expected = ((5.0 - 1.0) / 5.0 + (4.0 - 1.0) / 4.0) / 3.0;
        assert!((s - expected).abs() < 1e-12);
    }

    #[test]
    fn davies_bouldin_of_separated_blobs() {
        let (data, labels) = two_blobs();
        let db = davies_bouldin_score(&data, &labels).unwrap();
        // spread 0.5 each, centroid distance 10.
        assert!((db - 0.1).abs() < 1e-12);
    }

    #[test]
    fn calinski_harabasz_of_separated_blobs() {
        let (data, labels) = two_blobs();
        let ch = calinski_harabasz_score(&data, &labels).unwrap();
        // between = 4 * 25 = 100, within = 4 * 0.25 = 1, (n - k) / (k - 1) = 2.
        assert!((ch - 200.0).abs() < 1e-9);
    }

    #[test]
    fn zero_within_dispersion_gives_one() {
        let data = vec![vec![0.0], vec![0.0], vec![3.0]];
        assert_eq!(calinski_harabasz_score(&data, &[0, 0, 1]).unwrap(), 1.0);
        assert_eq!(davies_bouldin_score(&data, &[0, 0, 1]).unwrap(), 0.0);
    }

    #[test]
    fn label_ids_need_not_be_contiguous() {
        let (data, _) = two_blobs();
        let a = silhouette_score(&data, &[0, 0, 1, 1]).unwrap();
        let b = silhouette_score(&data, &[3, 3, 7, 7]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn degenerate_label_counts_are_rejected() {
        let (data, _) = two_blobs();
        assert!(matches!(
            silhouette_score(&data, &[0, 0, 0, 0]),
            Err(Error::DegenerateLabels { found: 1, n_items: 4 })
        ));
        assert!(matches!(
            calinski_harabasz_score(&data, &[0, 1, 2, 3]),
            Err(Error::DegenerateLabels { found: 4, n_items: 4 })
        ));
        assert!(davies_bouldin_score(&data, &[0, 1]).is_err());
    }

    #[test]
    fn evaluate_fitted_model() {
        let (data, _) = two_blobs();
        let mut model = DeterministicAnnealing::new(AnnealingParams {
            seed: Some(7),
            ..Default::default()
        })
        .unwrap();
        assert!(ClusterQuality::evaluate(&model, &data).is_err());
        let labels = model.fit(&data).unwrap().labels.clone();
        let q = ClusterQuality::evaluate(&model, &data).unwrap();
        // Scores the fitted labels, whichever split the seed produced.
        assert_eq!(q.silhouette, silhouette_score(&data, &labels).unwrap());
        assert_eq!(q.davies_bouldin, davies_bouldin_score(&data, &labels).unwrap());
        assert_eq!(q.calinski_harabasz, calinski_harabasz_score(&data, &labels).unwrap());
        assert_eq!(Some(q.inertia), model.inertia());
        assert_eq!(q.bcss, model.compute_bcss(&data).unwrap());
    }

    #[test]
    fn mean_of_nothing_is_none() {
        assert!(ClusterQuality::mean(&[]).is_none());
        let a = ClusterQuality {
            silhouette: 0.2,
            inertia: 4.0,
            ..Default::default()
        };
        let b = ClusterQuality {
            silhouette: 0.4,
            inertia: 2.0,
            ..Default::default()
        };
        let m = ClusterQuality::mean(&[a, b]).unwrap();
        assert!((m.silhouette - 0.3).abs() < 1e-12);
        assert_eq!(m.inertia, 3.0);
    }
}
