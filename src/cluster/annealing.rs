//! Size-constrained clustering by deterministic annealing.
//!
//! # The Algorithm
//!
//! Deterministic annealing replaces hard k-means assignments with a Gibbs
//! distribution over clusters:
//!
//! ```text
//! p(c | x) = η_c · exp(-β · d(x, μ_c)) / Σ_c' η_c' · exp(-β · d(x, μ_c'))
//! ```
//!
//! where `β = 1 / T` is the inverse temperature. At high temperature every
//! point belongs a little to every cluster; as `T` drops the distribution
//! sharpens into hard assignments.
//!
//! The size constraint enters through the multipliers `η`. Each iteration
//! solves the fixed point
//!
//! ```text
//! η_c = λ_c / Σ_x w(x) · exp(-β · d(x, μ_c)) / Σ_c' η_c' · exp(-β · d(x, μ_c'))
//! ```
//!
//! so that the probability mass landing in cluster `c` tracks its target
//! fraction `λ_c`. Centers are then the `w`-weighted centroids under the Gibbs
//! probabilities.
//!
//! ## Temperature ladder
//!
//! A run starts at each temperature of a decreasing ladder
//! (`1, 0.1, …, 1e-8` by default), cooling by a fixed factor per iteration.
//! The first run ending with exactly `k` non-empty clusters wins. If none
//! does, the run with the smallest deviation from `k` is kept and a warning
//! is logged.
//!
//! ## Numerical safety
//!
//! Every denominator is floored at `epsilon` (default `1e-8`). Distances are
//! shifted by each row's minimum before exponentiation; the shift cancels in
//! both row-normalised updates, and keeps `exp` from underflowing to zero at
//! low temperature.
//!
//! ## Exact sizes
//!
//! The annealed sizes only approximate the targets.
//! [`DeterministicAnnealing::enforce_cluster_distribution`] moves points
//! greedily until every cluster holds exactly its apportioned share.
//!
//! ## References
//!
//! Rose, K. (1998). "Deterministic annealing for clustering, compression,
//! classification, regression, and related optimization problems."
//! Proceedings of the IEEE 86(11).

use rand::prelude::*;
use rand::seq::index;
use tracing::{debug, warn};

use super::traits::Clustering;
use super::util::{self, DistanceFn, DEFAULT_EPSILON};
use crate::error::{Error, Result};

/// Default starting temperatures, one annealing run each.
pub const DEFAULT_TEMPERATURES: [f64; 9] = [1.0, 0.1, 1e-2, 1e-3, 1e-4, 1e-5, 1e-6, 1e-7, 1e-8];

const DISTRIBUTION_TOLERANCE: f64 = 1e-10;

/// Deterministic annealing parameters.
#[derive(Clone, Debug)]
pub struct AnnealingParams {
    /// Number of clusters `k`.
    pub n_clusters: usize,

    /// Target fraction of points per cluster; `k` entries summing to 1.
    pub distribution: Vec<f64>,

    /// Maximum iterations per annealing run.
    pub max_iters: usize,

    /// Point-to-center distance. Euclidean by default.
    pub distance: DistanceFn,

    /// Optional explicit starting temperatures (replaces [`DEFAULT_TEMPERATURES`]).
    pub temperatures: Option<Vec<f64>>,

    /// Multiplicative temperature decay applied after every iteration.
    pub cooling: f64,

    /// Floor for denominators in the η, Gibbs and center updates.
    pub epsilon: f64,

    /// Optional RNG seed for reproducible center initialisation.
    pub seed: Option<u64>,
}

impl Default for AnnealingParams {
    fn default() -> Self {
        Self {
            n_clusters: 2,
            distribution: vec![0.5, 0.5],
            max_iters: 1000,
            distance: util::euclidean,
            temperatures: None,
            cooling: 0.999,
            epsilon: DEFAULT_EPSILON,
            seed: None,
        }
    }
}

impl AnnealingParams {
    fn validate(&self) -> Result<()> {
        if self.n_clusters == 0 {
            return Err(Error::InvalidParameter {
                name: "n_clusters",
                message: "must be at least 1",
            });
        }
        if self.distribution.len() != self.n_clusters {
            return Err(Error::InvalidParameter {
                name: "distribution",
                message: "must have exactly n_clusters entries",
            });
        }
        if self.distribution.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(Error::InvalidParameter {
                name: "distribution",
                message: "fractions must be finite and non-negative",
            });
        }
        let total: f64 = self.distribution.iter().sum();
        if (total - 1.0).abs() > DISTRIBUTION_TOLERANCE {
            return Err(Error::InvalidParameter {
                name: "distribution",
                message: "must sum to 1",
            });
        }
        if self.max_iters == 0 {
            return Err(Error::InvalidParameter {
                name: "max_iters",
                message: "must be at least 1",
            });
        }
        if let Some(ladder) = &self.temperatures {
            if ladder.is_empty() {
                return Err(Error::InvalidParameter {
                    name: "temperatures",
                    message: "must not be empty",
                });
            }
            if ladder.iter().any(|t| !t.is_finite() || *t <= 0.0) {
                return Err(Error::InvalidParameter {
                    name: "temperatures",
                    message: "must be finite and positive",
                });
            }
        }
        if !(self.cooling > 0.0 && self.cooling <= 1.0) {
            return Err(Error::InvalidParameter {
                name: "cooling",
                message: "must be in (0, 1]",
            });
        }
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(Error::InvalidParameter {
                name: "epsilon",
                message: "must be finite and positive",
            });
        }
        Ok(())
    }
}

/// State of a fitted model.
#[derive(Clone, Debug)]
pub struct AnnealingFit {
    /// Cluster centers, `k × d`.
    pub centers: Vec<Vec<f64>>,
    /// One cluster id in `[0, k)` per training point.
    pub labels: Vec<usize>,
    /// Size multipliers of the selected run.
    pub eta: Vec<f64>,
    /// Inverse temperature at the end of the selected run.
    pub beta: f64,
    /// Normalised per-point demand weights used during the fit.
    pub demands: Vec<f64>,
    /// Within-cluster sum of squared Euclidean distances.
    pub inertia: f64,
    /// Whether a run produced exactly `k` non-empty clusters.
    pub exact: bool,
}

struct AnnealingRun {
    labels: Vec<usize>,
    centers: Vec<Vec<f64>>,
    eta: Vec<f64>,
    beta: f64,
    deviation: usize,
}

/// Size-constrained clusterer.
#[derive(Clone, Debug)]
pub struct DeterministicAnnealing {
    params: AnnealingParams,
    rng: StdRng,
    fit: Option<AnnealingFit>,
}

impl DeterministicAnnealing {
    /// Validate the parameters and create an unfitted model.
    pub fn new(params: AnnealingParams) -> Result<Self> {
        params.validate()?;
        let rng = match params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self {
            params,
            rng,
            fit: None,
        })
    }

    /// Shorthand for `k` clusters with the given target distribution and default settings.
    pub fn with_distribution(n_clusters: usize, distribution: Vec<f64>) -> Result<Self> {
        Self::new(AnnealingParams {
            n_clusters,
            distribution,
            ..Default::default()
        })
    }

    /// Parameters this model was built with.
    pub fn params(&self) -> &AnnealingParams {
        &self.params
    }

    /// Target distribution.
    pub fn distribution(&self) -> &[f64] {
        &self.params.distribution
    }

    /// Fitted state, if any.
    pub fn fitted(&self) -> Option<&AnnealingFit> {
        self.fit.as_ref()
    }

    /// Training labels of the last fit.
    pub fn labels(&self) -> Option<&[usize]> {
        self.fit.as_ref().map(|f| f.labels.as_slice())
    }

    /// Cluster centers of the last fit.
    pub fn cluster_centers(&self) -> Option<&[Vec<f64>]> {
        self.fit.as_ref().map(|f| f.centers.as_slice())
    }

    /// Within-cluster sum of squares of the last fit.
    pub fn inertia(&self) -> Option<f64> {
        self.fit.as_ref().map(|f| f.inertia)
    }

    /// Fit with uniform demands and no exact-size enforcement.
    pub fn fit(&mut self, data: &[Vec<f64>]) -> Result<&AnnealingFit> {
        self.fit_with(data, None, false)
    }

    /// Fit on `data`.
    ///
    /// `demands` weights each point (uniform when `None`; normalised to sum 1).
    /// With `enforce_cluster_distribution`, labels are post-processed to match the
    /// apportioned target counts exactly.
    pub fn fit_with(
        &mut self,
        data: &[Vec<f64>],
        demands: Option<&[f64]>,
        enforce_cluster_distribution: bool,
    ) -> Result<&AnnealingFit> {
        util::validate_matrix(data)?;
        let n = data.len();
        let k = self.params.n_clusters;
        if k > n {
            return Err(Error::InvalidClusterCount {
                requested: k,
                n_items: n,
            });
        }

        let demands = normalise_demands(demands, n)?;
        let capacity: Vec<f64> = self
            .params
            .distribution
            .iter()
            .map(|p| p * n as f64)
            .collect();
        let ladder = self
            .params
            .temperatures
            .clone()
            .unwrap_or_else(|| DEFAULT_TEMPERATURES.to_vec());

        let mut runs: Vec<AnnealingRun> = Vec::with_capacity(ladder.len());
        for &temperature in &ladder {
            let run = self.anneal(data, &demands, &capacity, temperature);
            debug!(
                temperature,
                deviation = run.deviation,
                "annealing run finished"
            );
            let exact = run.deviation == 0;
            runs.push(run);
            if exact {
                break;
            }
        }

        // First minimum wins, matching the ladder order.
        let best = runs
            .into_iter()
            .min_by_key(|r| r.deviation)
            .ok_or(Error::InvalidParameter {
                name: "temperatures",
                message: "must not be empty",
            })?;
        let exact = best.deviation == 0;
        if !exact {
            warn!(
                n_clusters = k,
                deviation = best.deviation,
                "no annealing run produced exactly n_clusters non-empty clusters; keeping closest"
            );
        }

        self.fit = Some(AnnealingFit {
            centers: best.centers,
            labels: best.labels,
            eta: best.eta,
            beta: best.beta,
            demands,
            inertia: 0.0,
            exact,
        });

        if enforce_cluster_distribution {
            self.enforce_cluster_distribution(data)?;
        }

        let fit = self.fit.as_mut().ok_or(Error::NotFitted)?;
        fit.inertia = inertia(data, &fit.labels, &fit.centers);
        Ok(&*fit)
    }

    /// Assign new points to the fitted clusters.
    ///
    /// The Gibbs probabilities are rebuilt from the stored `η` re-balanced for
    /// uniform demand over `data`. Centers are not modified.
    pub fn predict(&self, data: &[Vec<f64>]) -> Result<Vec<usize>> {
        let fit = self.fit.as_ref().ok_or(Error::NotFitted)?;
        let d = util::validate_matrix(data)?;
        let expected = fit.centers[0].len();
        if d != expected {
            return Err(Error::DimensionMismatch { expected, found: d });
        }

        let k = self.params.n_clusters;
        let m = data.len();
        let demands = vec![1.0 / m as f64; m];
        let dist = self.distances(data, &fit.centers);
        let boltz = boltzmann(&dist, k, fit.beta);
        let eta = self.update_eta(&fit.eta, &demands, &boltz);
        let gibbs = self.update_gibbs(&eta, &boltz);

        Ok(gibbs.chunks_exact(k).map(util::argmax).collect())
    }

    /// Reassign points until every cluster holds exactly its target count.
    ///
    /// Target counts are `distribution × n` apportioned by largest remainder, so
    /// they always sum to `n`. While some cluster is over target, its member
    /// farthest from its center moves to the nearest under-target cluster. Each
    /// move shrinks the imbalance by one, so at most `n` moves happen.
    ///
    /// Returns the resulting per-cluster counts. Calling it on an already
    /// balanced model changes nothing.
    pub fn enforce_cluster_distribution(&mut self, data: &[Vec<f64>]) -> Result<Vec<usize>> {
        let k = self.params.n_clusters;
        let fit = self.fit.as_mut().ok_or(Error::NotFitted)?;
        let n = fit.labels.len();
        if data.len() != n {
            return Err(Error::DimensionMismatch {
                expected: n,
                found: data.len(),
            });
        }

        let expected = target_counts(&self.params.distribution, n);
        let mut sizes = util::cluster_sizes(&fit.labels, k);

        while let Some(big) = (0..k).find(|&c| sizes[c] > expected[c]) {
            let center = &fit.centers[big];
            let mut farthest: Option<(usize, f64)> = None;
            for (i, point) in data.iter().enumerate() {
                if fit.labels[i] != big {
                    continue;
                }
                let d = util::euclidean(point, center);
                if farthest.map_or(true, |(_, best)| d > best) {
                    farthest = Some((i, d));
                }
            }
            let Some((point, _)) = farthest else {
                break;
            };

            let target = (0..k).filter(|&c| sizes[c] < expected[c]).min_by(|&a, &b| {
                util::euclidean(&data[point], &fit.centers[a])
                    .total_cmp(&util::euclidean(&data[point], &fit.centers[b]))
            });
            let Some(target) = target else {
                break;
            };

            fit.labels[point] = target;
            sizes[big] -= 1;
            sizes[target] += 1;
            debug!(point, from = big, to = target, "moved point to under-populated cluster");
        }

        fit.inertia = inertia(data, &fit.labels, &fit.centers);
        Ok(sizes)
    }

    /// Between-cluster sum of squares: `Σ_c |C_c| · ‖μ_c − x̄‖²`.
    pub fn compute_bcss(&self, data: &[Vec<f64>]) -> Result<f64> {
        let fit = self.fit.as_ref().ok_or(Error::NotFitted)?;
        util::validate_matrix(data)?;
        if data.len() != fit.labels.len() {
            return Err(Error::DimensionMismatch {
                expected: fit.labels.len(),
                found: data.len(),
            });
        }

        let global = util::centroid(data);
        let sizes = util::cluster_sizes(&fit.labels, self.params.n_clusters);
        Ok(fit
            .centers
            .iter()
            .zip(&sizes)
            .map(|(center, &size)| size as f64 * util::squared_euclidean(center, &global))
            .sum())
    }

    fn anneal(
        &mut self,
        data: &[Vec<f64>],
        demands: &[f64],
        capacity: &[f64],
        start_temperature: f64,
    ) -> AnnealingRun {
        let k = self.params.n_clusters;
        let mut centers = self.initial_centers(data);
        let mut eta = self.params.distribution.clone();
        let mut temperature = start_temperature;
        let mut beta = 1.0 / temperature;
        let mut labels = vec![0usize; data.len()];

        for _ in 0..self.params.max_iters {
            beta = 1.0 / temperature;
            let dist = self.distances(data, &centers);
            let boltz = boltzmann(&dist, k, beta);
            eta = self.update_eta(&eta, demands, &boltz);
            let gibbs = self.update_gibbs(&eta, &boltz);
            centers = self.update_centers(demands, &gibbs, data);
            temperature *= self.params.cooling;

            for (label, row) in labels.iter_mut().zip(gibbs.chunks_exact(k)) {
                *label = util::argmax(row);
            }
            if is_satisfied(&labels, capacity) {
                break;
            }
        }

        let non_empty = util::cluster_sizes(&labels, k)
            .iter()
            .filter(|&&s| s > 0)
            .count();
        AnnealingRun {
            labels,
            centers,
            eta,
            beta,
            deviation: non_empty.abs_diff(k),
        }
    }

    /// `k` distinct points sampled without replacement.
    fn initial_centers(&mut self, data: &[Vec<f64>]) -> Vec<Vec<f64>> {
        index::sample(&mut self.rng, data.len(), self.params.n_clusters)
            .into_iter()
            .map(|i| data[i].clone())
            .collect()
    }

    /// Row-major `n × k` point-to-center distances.
    fn distances(&self, data: &[Vec<f64>], centers: &[Vec<f64>]) -> Vec<f64> {
        let distance = self.params.distance;
        let mut out = Vec::with_capacity(data.len() * centers.len());
        for point in data {
            out.extend(centers.iter().map(|c| distance(point, c)));
        }
        out
    }

    fn update_eta(&self, eta: &[f64], demands: &[f64], boltz: &[f64]) -> Vec<f64> {
        let k = eta.len();
        let eps = self.params.epsilon;
        let mut denominator = vec![0.0; k];
        for (row, &w) in boltz.chunks_exact(k).zip(demands) {
            let norm: f64 = row.iter().zip(eta).map(|(e, h)| e * h).sum();
            for (acc, &e) in denominator.iter_mut().zip(row) {
                *acc += util::safe_divide(e, norm, eps) * w;
            }
        }
        self.params
            .distribution
            .iter()
            .zip(&denominator)
            .map(|(&lambda, &den)| util::safe_divide(lambda, den, eps))
            .collect()
    }

    fn update_gibbs(&self, eta: &[f64], boltz: &[f64]) -> Vec<f64> {
        let k = eta.len();
        let eps = self.params.epsilon;
        let mut gibbs = Vec::with_capacity(boltz.len());
        for row in boltz.chunks_exact(k) {
            let start = gibbs.len();
            gibbs.extend(row.iter().zip(eta).map(|(e, h)| e * h));
            let norm: f64 = gibbs[start..].iter().sum();
            for g in &mut gibbs[start..] {
                *g = util::safe_divide(*g, norm, eps);
            }
        }
        gibbs
    }

    fn update_centers(&self, demands: &[f64], gibbs: &[f64], data: &[Vec<f64>]) -> Vec<Vec<f64>> {
        let k = self.params.n_clusters;
        let d = data[0].len();
        let eps = self.params.epsilon;
        let mut sums = vec![vec![0.0; d]; k];
        let mut mass = vec![0.0; k];

        for ((point, row), &w) in data.iter().zip(gibbs.chunks_exact(k)).zip(demands) {
            for c in 0..k {
                let p = row[c] * w;
                mass[c] += p;
                for (s, x) in sums[c].iter_mut().zip(point) {
                    *s += p * x;
                }
            }
        }

        for (center, &m) in sums.iter_mut().zip(&mass) {
            for s in center.iter_mut() {
                *s = util::safe_divide(*s, m, eps);
            }
        }
        sums
    }
}

impl Clustering for DeterministicAnnealing {
    fn fit_predict(&mut self, data: &[Vec<f64>]) -> Result<Vec<usize>> {
        Ok(self.fit(data)?.labels.clone())
    }

    fn n_clusters(&self) -> usize {
        self.params.n_clusters
    }
}

/// `exp(-β · (d − min_row d))` for every entry of a row-major `n × k` matrix.
fn boltzmann(dist: &[f64], k: usize, beta: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(dist.len());
    for row in dist.chunks_exact(k) {
        let shift = row.iter().copied().fold(f64::INFINITY, f64::min);
        out.extend(row.iter().map(|d| (-beta * (d - shift)).exp()));
    }
    out
}

fn normalise_demands(demands: Option<&[f64]>, n: usize) -> Result<Vec<f64>> {
    let Some(demands) = demands else {
        return Ok(vec![1.0 / n as f64; n]);
    };
    if demands.len() != n {
        return Err(Error::DimensionMismatch {
            expected: n,
            found: demands.len(),
        });
    }
    if demands.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(Error::InvalidParameter {
            name: "demands",
            message: "weights must be finite and non-negative",
        });
    }
    let total: f64 = demands.iter().sum();
    if total <= 0.0 {
        return Err(Error::InvalidParameter {
            name: "demands",
            message: "weights must not all be zero",
        });
    }
    Ok(demands.iter().map(|w| w / total).collect())
}

/// Every cluster non-empty and none above its capacity.
fn is_satisfied(labels: &[usize], capacity: &[f64]) -> bool {
    util::cluster_sizes(labels, capacity.len())
        .iter()
        .zip(capacity)
        .all(|(&size, &cap)| size > 0 && size as f64 <= cap)
}

fn inertia(data: &[Vec<f64>], labels: &[usize], centers: &[Vec<f64>]) -> f64 {
    data.iter()
        .zip(labels)
        .map(|(point, &l)| util::squared_euclidean(point, &centers[l]))
        .sum()
}

/// Integer cluster sizes for `n` points, apportioned by largest remainder.
pub fn target_counts(distribution: &[f64], n: usize) -> Vec<usize> {
    let quotas: Vec<f64> = distribution.iter().map(|p| p * n as f64).collect();
    let mut counts: Vec<usize> = quotas.iter().map(|q| q.floor() as usize).collect();
    let assigned: usize = counts.iter().sum();

    let mut order: Vec<usize> = (0..quotas.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = quotas[a] - quotas[a].floor();
        let rb = quotas[b] - quotas[b].floor();
        rb.total_cmp(&ra).then(a.cmp(&b))
    });
    for &c in order.iter().take(n.saturating_sub(assigned)) {
        counts[c] += 1;
    }
    counts
}
