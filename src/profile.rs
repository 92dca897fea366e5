//! Per-cluster feature summaries.
//!
//! After labelling, each training cluster is described column by column:
//! count, mean, sample standard deviation, min, quartiles and max of the raw
//! (pre-imputation) feature values. Missing and non-finite values are skipped.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::labels::{ClusterLabelMapping, ScoreLabel};

/// Descriptive statistics of one feature within one cluster.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FeatureSummary {
    pub feature: String,
    /// Observed values.
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; `None` below two values.
    pub std: Option<f64>,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl FeatureSummary {
    /// Summarise the finite values of `values`, or `None` if there are none.
    ///
    /// Quartiles interpolate linearly between the closest ranks.
    pub fn describe<'a, I>(feature: &str, values: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Option<f64>>,
    {
        let mut sorted: Vec<f64> = values
            .into_iter()
            .filter_map(|v| v.filter(|x| x.is_finite()))
            .collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len();
        let mean = sorted.iter().sum::<f64>() / n as f64;
        let std = (n > 1).then(|| {
            let ss: f64 = sorted.iter().map(|x| (x - mean).powi(2)).sum();
            (ss / (n - 1) as f64).sqrt()
        });

        Some(Self {
            feature: feature.to_string(),
            count: n,
            mean,
            std,
            min: sorted[0],
            q1: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            q3: quantile(&sorted, 0.75),
            max: sorted[n - 1],
        })
    }
}

/// Linear-interpolation quantile of sorted, non-empty `values`.
fn quantile(values: &[f64], q: f64) -> f64 {
    let pos = q * (values.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    values[lo] + (values[hi] - values[lo]) * (pos - lo as f64)
}

/// One labelled cluster of a training fold.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClusterProfile {
    pub label: ScoreLabel,
    pub cluster: usize,
    /// Rows assigned to the cluster.
    pub size: usize,
    /// One entry per feature with at least one observed value.
    pub features: Vec<FeatureSummary>,
}

/// Describe the high- and low-scoring clusters, in that order.
///
/// `rows[i]` holds the values of `names` for the row assigned to `labels[i]`.
///
/// # Errors
///
/// [`Error::DimensionMismatch`] if `labels` and `rows` differ in length or a
/// row's width differs from `names`.
pub fn profile_clusters(
    names: &[String],
    rows: &[Vec<Option<f64>>],
    labels: &[usize],
    mapping: &ClusterLabelMapping,
) -> Result<[ClusterProfile; 2]> {
    if labels.len() != rows.len() {
        return Err(Error::DimensionMismatch {
            expected: rows.len(),
            found: labels.len(),
        });
    }
    if let Some(row) = rows.iter().find(|r| r.len() != names.len()) {
        return Err(Error::DimensionMismatch {
            expected: names.len(),
            found: row.len(),
        });
    }

    let profile = |cluster: usize, label: ScoreLabel| {
        let members: Vec<&Vec<Option<f64>>> = rows
            .iter()
            .zip(labels)
            .filter(|&(_, &l)| l == cluster)
            .map(|(row, _)| row)
            .collect();
        let features = names
            .iter()
            .enumerate()
            .filter_map(|(j, name)| FeatureSummary::describe(name, members.iter().map(|row| &row[j])))
            .collect();
        ClusterProfile {
            label,
            cluster,
            size: members.len(),
            features,
        }
    };

    Ok([
        profile(mapping.high_scoring, ScoreLabel::HighScoringOutputs),
        profile(mapping.low_scoring, ScoreLabel::LowScoringOutputs),
    ])
}
