//! Size-constrained clustering.
//!
//! ## Why size constraints
//!
//! Plain k-means finds whatever cluster sizes minimise the within-cluster sum
//! of squares. When the share of points each cluster should receive is known in
//! advance (for example, the fraction of research outputs rated 3* or 4*), the
//! partition has to respect those shares as well.
//!
//! ## Deterministic annealing
//!
//! [`DeterministicAnnealing`] keeps soft Gibbs assignments whose per-cluster
//! mass is pinned to a target distribution by Lagrange-like multipliers, and
//! lowers the temperature until the assignments harden. The result follows the
//! targets approximately; [`DeterministicAnnealing::enforce_cluster_distribution`]
//! makes the sizes exact.
//!
//! **Objective** (at temperature `T`):
//!
//! ```text
//! F = Σ_x w(x) Σ_c p(c|x) d(x, μ_c) − T · H(p)   subject to   Σ_x w(x) p(c|x) = λ_c
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use refcluster::cluster::{AnnealingParams, Clustering, DeterministicAnnealing};
//!
//! let data = vec![
//!     vec![0.0, 0.0],
//!     vec![0.1, 0.1],
//!     vec![10.0, 10.0],
//!     vec![10.1, 10.1],
//! ];
//!
//! let mut model = DeterministicAnnealing::new(AnnealingParams {
//!     n_clusters: 2,
//!     distribution: vec![0.5, 0.5],
//!     seed: Some(42),
//!     ..Default::default()
//! })
//! .unwrap();
//! let labels = model.fit_predict(&data).unwrap();
//! assert_eq!(labels[0], labels[1]);
//! assert_ne!(labels[0], labels[2]);
//!
//! let bcss = model.compute_bcss(&data).unwrap();
//! assert!(bcss > 0.0);
//! ```

mod annealing;
mod traits;
pub(crate) mod util;

pub use annealing::{
    target_counts, AnnealingFit, AnnealingParams, DeterministicAnnealing, DEFAULT_TEMPERATURES,
};
pub use traits::Clustering;
pub use util::{euclidean, safe_divide, squared_euclidean, DistanceFn, DEFAULT_EPSILON};
