//! Institution-level leave-one-out cross-validation.
//!
//! Each institution is held out once. The model is trained on every other
//! institution's outputs with a target distribution equal to their combined
//! high/low split, and then asked to split the held-out institution's outputs.
//! The predicted split is compared with the institution's real one.
//!
//! Imputation and scaling statistics come from the training rows of each fold
//! only. Any failing fold aborts the run with [`Error::Fold`]; averages over a
//! partial set of folds are never reported.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cluster::{AnnealingParams, DeterministicAnnealing, DEFAULT_EPSILON};
use crate::dataset::{high_scoring_institutions, FeatureTable, InstitutionId, InstitutionResult};
use crate::error::{Error, Result};
use crate::features::{Feature, FeatureGroups};
use crate::labels::{infer_cluster_labels, ClusterLabelMapping};
use crate::metrics::{clustering_accuracy, ClusterQuality, DivergenceMetrics, RegressionAccuracy};
use crate::preprocess::{Imputation, Imputer, Scaler, Scaling};
use crate::profile::{profile_clusters, ClusterProfile};

/// Settings for one cross-validation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LooConfig {
    /// Feature groups to cluster on.
    pub features: FeatureGroups,
    /// Annealing iterations per temperature.
    pub max_iters: usize,
    /// Seed for center initialisation; `None` draws from the OS.
    pub seed: Option<u64>,
    pub imputation: Imputation,
    pub scaling: Scaling,
    /// Force exact training cluster sizes after annealing.
    pub enforce_distribution: bool,
    /// Denominator floor of the annealing updates.
    pub epsilon: f64,
}

impl Default for LooConfig {
    fn default() -> Self {
        Self {
            features: FeatureGroups::default(),
            max_iters: 3000,
            seed: Some(42),
            imputation: Imputation::Median,
            scaling: Scaling::Standard,
            enforce_distribution: false,
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl LooConfig {
    pub fn with_features(mut self, features: FeatureGroups) -> Self {
        self.features = features;
        self
    }

    pub fn with_max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_imputation(mut self, imputation: Imputation) -> Self {
        self.imputation = imputation;
        self
    }

    pub fn with_scaling(mut self, scaling: Scaling) -> Self {
        self.scaling = scaling;
        self
    }

    pub fn with_enforce_distribution(mut self, enforce: bool) -> Self {
        self.enforce_distribution = enforce;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }
}

/// Actual `(high %, low %)` of an institution's outputs.
pub fn actual_output_score_percentages(high: u64, low: u64) -> Result<(f64, f64)> {
    let total = high + low;
    if total == 0 {
        return Err(Error::DivisionByZero {
            context: "institution has no scored outputs",
        });
    }
    let total = total as f64;
    Ok((high as f64 / total * 100.0, low as f64 / total * 100.0))
}

/// Predicted `(high %, low %)` from cluster assignments and the label mapping.
pub fn predicted_output_score_percentages(
    labels: &[usize],
    mapping: &ClusterLabelMapping,
) -> Result<(f64, f64)> {
    if labels.is_empty() {
        return Err(Error::EmptyInput);
    }
    let n = labels.len() as f64;
    let share = |cluster: usize| labels.iter().filter(|&&l| l == cluster).count() as f64 / n * 100.0;
    Ok((share(mapping.high_scoring), share(mapping.low_scoring)))
}

/// `[high, low]` fractions of the given output counts.
pub fn target_distribution(high: u64, low: u64) -> Result<[f64; 2]> {
    let total = high + low;
    if total == 0 {
        return Err(Error::DivisionByZero {
            context: "training folds have no scored outputs",
        });
    }
    let total = total as f64;
    Ok([high as f64 / total, low as f64 / total])
}

/// Result of one held-out institution.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FoldOutcome {
    pub institution: InstitutionId,
    pub train_outputs: usize,
    pub test_outputs: usize,
    /// `[high, low]` fractions the model was fitted towards.
    pub target_distribution: [f64; 2],
    pub actual_high: f64,
    pub actual_low: f64,
    pub predicted_high: f64,
    pub predicted_low: f64,
    pub labels: ClusterLabelMapping,
    pub divergence: DivergenceMetrics,
    pub quality: ClusterQuality,
    /// High- then low-scoring training cluster, from raw feature values.
    pub profiles: [ClusterProfile; 2],
}

/// Aggregated result of a cross-validation run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CrossValidationReport {
    pub features: Vec<Feature>,
    pub accuracy: RegressionAccuracy,
    /// Mean over folds.
    pub divergence: DivergenceMetrics,
    /// Mean over folds.
    pub quality: ClusterQuality,
    pub outcomes: Vec<FoldOutcome>,
}

impl CrossValidationReport {
    pub fn folds(&self) -> usize {
        self.outcomes.len()
    }

    /// Flat metric name to value mapping.
    pub fn to_map(&self) -> BTreeMap<&'static str, f64> {
        BTreeMap::from([
            ("folds", self.folds() as f64),
            ("mae", self.accuracy.mae),
            ("rmse", self.accuracy.rmse),
            ("mape", self.accuracy.mape),
            ("r2", self.accuracy.r2),
            ("kl_divergence", self.divergence.kl),
            ("js_divergence", self.divergence.js),
            ("tvd", self.divergence.tvd),
            ("silhouette_score", self.quality.silhouette),
            ("davies_bouldin_score", self.quality.davies_bouldin),
            ("calinski_harabasz_score", self.quality.calinski_harabasz),
            ("inertia", self.quality.inertia),
            ("bcss", self.quality.bcss),
        ])
    }
}

/// Leave-one-institution-out evaluation of size-constrained clustering.
#[derive(Clone, Debug, Default)]
pub struct LeaveOneOut {
    config: LooConfig,
}

/// Per-run inputs shared by every fold.
struct RunContext<'a> {
    table: &'a FeatureTable,
    columns: Vec<usize>,
    names: Vec<String>,
    anchors: Vec<InstitutionId>,
    total_high: u64,
    total_low: u64,
}

impl LeaveOneOut {
    pub fn new(config: LooConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LooConfig {
        &self.config
    }

    /// Hold out every institution in `results` once, in order.
    ///
    /// Rows of institutions missing from `results` are always training rows.
    pub fn run(&self, table: &FeatureTable, results: &[InstitutionResult]) -> Result<CrossValidationReport> {
        if results.is_empty() || table.is_empty() {
            return Err(Error::EmptyInput);
        }
        let features = self.config.features.features()?;
        let columns = features
            .iter()
            .map(|&f| table.column_index(f))
            .collect::<Result<Vec<_>>>()?;
        let ctx = RunContext {
            table,
            columns,
            names: features.iter().map(|f| f.column().to_string()).collect(),
            anchors: high_scoring_institutions(results),
            total_high: results.iter().map(|r| r.high_scoring_outputs).sum(),
            total_low: results.iter().map(|r| r.low_scoring_outputs).sum(),
        };

        let mut outcomes = Vec::with_capacity(results.len());
        for result in results {
            let outcome = self.fold(&ctx, result).map_err(|source| Error::Fold {
                institution: result.institution,
                source: Box::new(source),
            })?;
            outcomes.push(outcome);
        }

        let column = |f: fn(&FoldOutcome) -> f64| outcomes.iter().map(f).collect::<Vec<_>>();
        let accuracy = clustering_accuracy(
            &column(|o| o.actual_high),
            &column(|o| o.predicted_high),
            &column(|o| o.actual_low),
            &column(|o| o.predicted_low),
        )?;
        let divergence = DivergenceMetrics::mean(outcomes.iter().map(|o| &o.divergence)).unwrap_or_default();
        let quality = ClusterQuality::mean(outcomes.iter().map(|o| &o.quality)).unwrap_or_default();

        info!(
            features = ?features,
            folds = outcomes.len(),
            mae = accuracy.mae,
            rmse = accuracy.rmse,
            mape = accuracy.mape,
            r2 = accuracy.r2,
            kl = divergence.kl,
            js = divergence.js,
            tvd = divergence.tvd,
            silhouette = quality.silhouette,
            davies_bouldin = quality.davies_bouldin,
            calinski_harabasz = quality.calinski_harabasz,
            "cross-validation finished"
        );

        Ok(CrossValidationReport {
            features,
            accuracy,
            divergence,
            quality,
            outcomes,
        })
    }

    fn fold(&self, ctx: &RunContext<'_>, held_out: &InstitutionResult) -> Result<FoldOutcome> {
        let (actual_high, actual_low) =
            actual_output_score_percentages(held_out.high_scoring_outputs, held_out.low_scoring_outputs)?;

        let mut train_ids = Vec::new();
        let mut train_rows = Vec::new();
        let mut test_rows = Vec::new();
        for record in ctx.table.rows() {
            let values = record.select(&ctx.columns);
            if record.institution == held_out.institution {
                test_rows.push(values);
            } else {
                train_ids.push(record.institution);
                train_rows.push(values);
            }
        }
        if test_rows.is_empty() || train_rows.is_empty() {
            return Err(Error::EmptyInput);
        }

        let distribution = target_distribution(
            ctx.total_high - held_out.high_scoring_outputs,
            ctx.total_low - held_out.low_scoring_outputs,
        )?;

        let imputer = Imputer::fit(self.config.imputation, &ctx.names, &train_rows)?;
        let (scaler, train) = Scaler::fit_transform(self.config.scaling, &imputer.transform(&train_rows)?)?;
        let test = scaler.transform(&imputer.transform(&test_rows)?)?;

        let mut model = DeterministicAnnealing::new(AnnealingParams {
            n_clusters: 2,
            distribution: distribution.to_vec(),
            max_iters: self.config.max_iters,
            epsilon: self.config.epsilon,
            seed: self.config.seed,
            ..Default::default()
        })?;
        let fit = model.fit_with(&train, None, self.config.enforce_distribution)?;
        let mapping = infer_cluster_labels(
            train_ids.iter().copied().zip(fit.labels.iter().copied()),
            &ctx.anchors,
        )?;
        let profiles = profile_clusters(&ctx.names, &train_rows, &fit.labels, &mapping)?;
        for profile in &profiles {
            debug!(
                institution = held_out.institution,
                label = %profile.label,
                cluster = profile.cluster,
                size = profile.size,
                "training cluster profile"
            );
        }
        let quality = ClusterQuality::evaluate(&model, &train)?;

        let predicted = model.predict(&test)?;
        let (predicted_high, predicted_low) = predicted_output_score_percentages(&predicted, &mapping)?;
        let divergence = DivergenceMetrics::between(
            &[predicted_high / 100.0, predicted_low / 100.0],
            &[actual_high / 100.0, actual_low / 100.0],
        )?;

        info!(
            institution = held_out.institution,
            train_outputs = train.len(),
            test_outputs = test.len(),
            target_high = distribution[0],
            actual_high,
            predicted_high,
            "fold finished"
        );

        Ok(FoldOutcome {
            institution: held_out.institution,
            train_outputs: train.len(),
            test_outputs: test.len(),
            target_distribution: distribution,
            actual_high,
            actual_low,
            predicted_high,
            predicted_low,
            labels: mapping,
            divergence,
            quality,
            profiles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actual_percentages() {
        let (high, low) = actual_output_score_percentages(40, 80).unwrap();
        assert!((high - 100.0 / 3.0).abs() < 1e-12);
        assert!((low - 200.0 / 3.0).abs() < 1e-12);
        assert_eq!(actual_output_score_percentages(3, 0).unwrap(), (100.0, 0.0));
        assert!(matches!(
            actual_output_score_percentages(0, 0),
            Err(Error::DivisionByZero { .. })
        ));
    }

    #[test]
    fn predicted_percentages_follow_mapping() {
        let mapping = ClusterLabelMapping {
            high_scoring: 1,
            low_scoring: 0,
        };
        let (high, low) = predicted_output_score_percentages(&[1, 1, 1, 0], &mapping).unwrap();
        assert_eq!((high, low), (75.0, 25.0));
        // A cluster absent from the predictions contributes 0%.
        let (high, low) = predicted_output_score_percentages(&[0, 0], &mapping).unwrap();
        assert_eq!((high, low), (0.0, 100.0));
    }

    #[test]
    fn target_distribution_sums_to_one() {
        let [high, low] = target_distribution(123, 77).unwrap();
        assert!((high + low - 1.0).abs() < 1e-12);
        assert!((high - 0.615).abs() < 1e-12);
        assert!(target_distribution(0, 0).is_err());
    }

    #[test]
    fn config_defaults_and_overrides() {
        let config = LooConfig::default();
        assert_eq!(config.max_iters, 3000);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.imputation, Imputation::Median);
        assert_eq!(config.scaling, Scaling::Standard);
        assert!(!config.enforce_distribution);

        let parsed: LooConfig = serde_json::from_str(
            r#"{"max-iters": 500, "scaling": "minmax", "features": {"authors": true}}"#,
        )
        .unwrap();
        assert_eq!(parsed.max_iters, 500);
        assert_eq!(parsed.scaling, Scaling::MinMax);
        assert_eq!(parsed.seed, Some(42));
        assert!(parsed.features.authors && parsed.features.citations);
    }

    #[test]
    fn builder_methods() {
        let config = LooConfig::default()
            .with_seed(None)
            .with_max_iters(10)
            .with_imputation(Imputation::Mode)
            .with_enforce_distribution(true);
        assert_eq!(config.seed, None);
        assert_eq!(config.max_iters, 10);
        assert_eq!(config.imputation, Imputation::Mode);
        assert!(config.enforce_distribution);
    }

    #[test]
    fn report_map_keys() {
        let report = CrossValidationReport {
            features: vec![Feature::Sjr],
            accuracy: RegressionAccuracy {
                mae: 1.0,
                ..Default::default()
            },
            divergence: DivergenceMetrics::default(),
            quality: ClusterQuality::default(),
            outcomes: Vec::new(),
        };
        let map = report.to_map();
        assert_eq!(map.len(), 13);
        assert_eq!(map["mae"], 1.0);
        assert_eq!(map["folds"], 0.0);
        assert!(map.contains_key("calinski_harabasz_score"));
    }

    #[test]
    fn missing_feature_column_fails_before_any_fold() {
        let mut table = FeatureTable::new(["normalised_citations"]);
        table.push(1, vec![Some(0.0)]).unwrap();
        let results = [InstitutionResult::new(1, 1, 0)];
        let err = LeaveOneOut::default().run(&table, &results).unwrap_err();
        assert!(matches!(err, Error::MissingColumn { .. }));
    }
}
