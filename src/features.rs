//! Feature catalogue, feature-group selection and column transforms.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A numeric feature of a research output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// `ln(1 + citations)`, z-scored within publication year.
    NormalisedCitations,
    /// Smallest top-citation percentile bucket the output falls in (1, 5, 10, 25, 50, 100).
    TopCitationPercentile,
    FieldWeightedCitationImpact,
    FieldWeightedViewsImpact,
    /// Source-normalised impact per paper of the venue.
    Snip,
    /// SCImago journal rank of the venue.
    Sjr,
    CiteScore,
    /// `ln(1 + additional authors)`.
    LogTransformedAuthors,
}

impl Feature {
    /// Column name in the feature table.
    pub fn column(self) -> &'static str {
        match self {
            Feature::NormalisedCitations => "normalised_citations",
            Feature::TopCitationPercentile => "top_citation_percentile",
            Feature::FieldWeightedCitationImpact => "field_weighted_citation_impact",
            Feature::FieldWeightedViewsImpact => "field_weighted_views_impact",
            Feature::Snip => "SNIP",
            Feature::Sjr => "SJR",
            Feature::CiteScore => "Cite_Score",
            Feature::LogTransformedAuthors => "log_transformed_authors",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Which groups of features feed the clustering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FeatureGroups {
    /// Year-normalised citation counts.
    pub citations: bool,
    /// Per-output bibliometrics: top percentile, FWCI, FWVI.
    pub output_metrics: bool,
    /// Venue metrics: SNIP, SJR, CiteScore.
    pub journal_metrics: bool,
    /// Log-transformed author count.
    pub authors: bool,
}

impl Default for FeatureGroups {
    fn default() -> Self {
        Self {
            citations: true,
            output_metrics: true,
            journal_metrics: false,
            authors: false,
        }
    }
}

impl FeatureGroups {
    /// Selected features in a fixed order.
    pub fn features(&self) -> Result<Vec<Feature>> {
        let mut out = Vec::new();
        if self.citations {
            out.push(Feature::NormalisedCitations);
        }
        if self.output_metrics {
            out.extend([
                Feature::TopCitationPercentile,
                Feature::FieldWeightedCitationImpact,
                Feature::FieldWeightedViewsImpact,
            ]);
        }
        if self.journal_metrics {
            out.extend([Feature::Snip, Feature::Sjr, Feature::CiteScore]);
        }
        if self.authors {
            out.push(Feature::LogTransformedAuthors);
        }
        if out.is_empty() {
            return Err(Error::InvalidParameter {
                name: "features",
                message: "select at least one feature group",
            });
        }
        Ok(out)
    }
}

/// Log-transform citation counts and z-score them within each publication year.
///
/// A year whose sample standard deviation is zero or undefined (at most one
/// observed count) maps every output to 0, missing counts included. In a year
/// with spread, missing counts stay missing.
pub fn normalise_citations_by_year(citations: &[Option<f64>], years: &[i32]) -> Result<Vec<Option<f64>>> {
    if citations.len() != years.len() {
        return Err(Error::DimensionMismatch {
            expected: citations.len(),
            found: years.len(),
        });
    }

    let logged: Vec<Option<f64>> = citations.iter().map(|c| c.map(f64::ln_1p)).collect();

    let mut by_year: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
    for (value, &year) in logged.iter().zip(years) {
        if let Some(v) = value.filter(|v| v.is_finite()) {
            by_year.entry(year).or_default().push(v);
        }
    }

    // (mean, sample std) per year; std is None below two observations.
    let stats: BTreeMap<i32, (f64, Option<f64>)> = by_year
        .into_iter()
        .map(|(year, values)| {
            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            let std = (values.len() > 1).then(|| {
                (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
            });
            (year, (mean, std))
        })
        .collect();

    Ok(logged
        .iter()
        .zip(years)
        .map(|(value, year)| {
            match stats.get(year) {
                Some(&(mean, Some(s))) if s > 0.0 => value.map(|v| (v - mean) / s),
                _ => Some(0.0),
            }
        })
        .collect())
}

/// An output outside every reported top-percentile bucket is in the top 100%.
pub fn infer_missing_top_percentile(values: &[Option<f64>]) -> Vec<f64> {
    values.iter().map(|v| v.unwrap_or(100.0)).collect()
}

/// `ln(1 + n)` of the additional-author count, with missing counts as 0.
pub fn log_transform_author_count(values: &[Option<f64>]) -> Vec<f64> {
    values.iter().map(|v| v.unwrap_or(0.0).ln_1p()).collect()
}
