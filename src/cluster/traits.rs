use crate::error::Result;

/// Common interface for hard clustering algorithms (one label per point).
pub trait Clustering {
    /// Fit the model and return one cluster label per input point.
    ///
    /// Takes `&mut self` because fitting consumes the model's random source and
    /// stores the fitted state for later prediction.
    fn fit_predict(&mut self, data: &[Vec<f64>]) -> Result<Vec<usize>>;

    /// The configured number of clusters.
    fn n_clusters(&self) -> usize;
}
