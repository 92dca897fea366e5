//! Size-constrained clustering of research outputs.
//!
//! `refcluster` splits research outputs into a high-scoring and a
//! low-scoring cluster whose sizes follow a known distribution, and measures
//! how well the split predicts institutions' real results.
//!
//! - [`cluster`]: deterministic annealing with per-cluster size targets
//! - [`dataset`], [`features`], [`preprocess`]: feature table, feature
//!   engineering, train-only imputation and scaling
//! - [`labels`]: naming clusters from all-high-scoring anchor institutions
//! - [`profile`]: per-cluster feature summaries
//! - [`metrics`]: cluster quality, regression accuracy and divergences
//! - [`validation`]: leave-one-institution-out cross-validation
//!
//! The library logs through `tracing` and never installs a subscriber.

#![forbid(unsafe_code)]

pub mod cluster;
pub mod dataset;
pub mod error;
pub mod features;
pub mod labels;
pub mod metrics;
pub mod preprocess;
pub mod profile;
pub mod validation;

pub use cluster::{AnnealingFit, AnnealingParams, Clustering, DeterministicAnnealing};
pub use dataset::{FeatureTable, InstitutionId, InstitutionResult, StarProfile};
pub use error::{Error, Result};
pub use features::{Feature, FeatureGroups};
pub use labels::{infer_cluster_labels, ClusterLabelMapping, ScoreLabel};
pub use preprocess::{Imputation, Scaling};
pub use profile::{profile_clusters, ClusterProfile, FeatureSummary};
pub use validation::{CrossValidationReport, FoldOutcome, LeaveOneOut, LooConfig};
