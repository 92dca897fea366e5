use thiserror::Error;

/// Errors returned by the clustering engine, the metrics and the evaluation harness.
#[derive(Debug, Error)]
pub enum Error {
    /// No rows (or no folds) to work on.
    #[error("empty input")]
    EmptyInput,

    /// A parameter failed validation.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Field or argument name.
        name: &'static str,
        /// What is wrong with it.
        message: &'static str,
    },

    /// More clusters than points.
    #[error("invalid cluster count: requested {requested}, but dataset has {n_items} items")]
    InvalidClusterCount {
        /// Requested number of clusters.
        requested: usize,
        /// Number of points available.
        n_items: usize,
    },

    /// Two inputs disagree in length or width.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Length or width the operation needed.
        expected: usize,
        /// Length or width it was given.
        found: usize,
    },

    /// A feature value is NaN or infinite (missing values must be imputed first).
    #[error("non-finite value at row {row}, column {column}")]
    NonFiniteValue {
        /// Row index.
        row: usize,
        /// Column index.
        column: usize,
    },

    /// A selected feature has no column in the feature table.
    #[error("feature table has no column named {feature}")]
    MissingColumn {
        /// Feature (column) name.
        feature: String,
    },

    /// The model was used before `fit`.
    #[error("model is not fitted")]
    NotFitted,

    /// An imputation statistic could not be computed (every training value is missing).
    #[error("cannot impute feature {feature}: no observed values in the training data")]
    UndefinedImputation {
        /// Feature (column) name.
        feature: String,
    },

    /// None of the training rows belongs to a known all-high-scoring institution.
    #[error("no training rows belong to an all-high-scoring anchor institution")]
    NoAnchorRows,

    /// A ratio was requested over a zero total.
    #[error("division by zero: {context}")]
    DivisionByZero {
        /// What was being divided.
        context: &'static str,
    },

    /// Cluster-quality indices need between 2 and n - 1 distinct labels.
    #[error("found {found} distinct labels for {n_items} items; need between 2 and n - 1")]
    DegenerateLabels {
        /// Number of distinct labels present.
        found: usize,
        /// Number of labelled items.
        n_items: usize,
    },

    /// A cross-validation fold failed; the whole run is aborted.
    #[error("fold for institution {institution} failed: {source}")]
    Fold {
        /// Held-out institution of the failing fold.
        institution: u64,
        /// Underlying error.
        #[source]
        source: Box<Error>,
    },
}

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;
