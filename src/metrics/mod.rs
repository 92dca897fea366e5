//! Evaluation metrics.
//!
//! - [`internal`]: cluster-quality indices over the training partition
//! - [`regression`]: predicted vs actual high-scoring percentages across folds
//! - [`divergence`]: predicted vs actual `[high, low]` distributions per fold

pub mod divergence;
pub mod internal;
pub mod regression;

pub use divergence::{js_divergence, kl_divergence, total_variation_distance, DivergenceMetrics};
pub use internal::{calinski_harabasz_score, davies_bouldin_score, silhouette_score, ClusterQuality};
pub use regression::{
    clustering_accuracy, mean_absolute_error, r2_score, root_mean_squared_error, RegressionAccuracy,
};
