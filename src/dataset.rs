//! In-memory feature table and institution-level ground truth.
//!
//! Rows are research outputs: an owning institution plus one value per
//! declared feature, where `None` marks an explicitly missing value. Scores
//! are only known per institution, as counts of high-scoring (4*, 3*) and
//! low-scoring (2*, 1*, unclassified) outputs.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::features::Feature;

/// Institution identifier (UKPRN).
pub type InstitutionId = u64;

/// One research output.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputRecord {
    /// Owning institution.
    pub institution: InstitutionId,
    /// One value per table column, in column order.
    pub values: Vec<Option<f64>>,
}

impl OutputRecord {
    /// Values of the given columns, in the given order.
    pub fn select(&self, columns: &[usize]) -> Vec<Option<f64>> {
        columns.iter().map(|&c| self.values[c]).collect()
    }
}

/// Research outputs with a fixed, named column order.
#[derive(Clone, Debug, Default)]
pub struct FeatureTable {
    columns: Vec<String>,
    rows: Vec<OutputRecord>,
}

impl FeatureTable {
    /// Empty table with the given column names.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Empty table with one column per feature.
    pub fn from_features(features: &[Feature]) -> Self {
        Self::new(features.iter().map(|f| f.column()))
    }

    /// Append a row. Every column needs a value (use `None` for missing).
    pub fn push(&mut self, institution: InstitutionId, values: Vec<Option<f64>>) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(Error::DimensionMismatch {
                expected: self.columns.len(),
                found: values.len(),
            });
        }
        self.rows.push(OutputRecord {
            institution,
            values,
        });
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[OutputRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the column for `feature`.
    pub fn column_index(&self, feature: Feature) -> Result<usize> {
        let name = feature.column();
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| Error::MissingColumn {
                feature: name.to_string(),
            })
    }

    /// Distinct institutions in first-seen order.
    pub fn institutions(&self) -> Vec<InstitutionId> {
        let mut seen = Vec::new();
        for row in &self.rows {
            if !seen.contains(&row.institution) {
                seen.push(row.institution);
            }
        }
        seen
    }

    /// Rows owned by `institution`.
    pub fn rows_of(&self, institution: InstitutionId) -> impl Iterator<Item = &OutputRecord> {
        self.rows.iter().filter(move |r| r.institution == institution)
    }

    /// Number of rows owned by `institution`.
    pub fn output_count(&self, institution: InstitutionId) -> usize {
        self.rows_of(institution).count()
    }
}

/// Percentage profile of an institution's outputs per quality rating.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StarProfile {
    pub four_star: f64,
    pub three_star: f64,
    pub two_star: f64,
    pub one_star: f64,
    pub unclassified: f64,
}

/// Ground-truth output counts of one institution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstitutionResult {
    pub institution: InstitutionId,
    /// Outputs rated 4* or 3*.
    pub high_scoring_outputs: u64,
    /// Outputs rated 2*, 1* or unclassified.
    pub low_scoring_outputs: u64,
}

impl InstitutionResult {
    pub fn new(institution: InstitutionId, high_scoring_outputs: u64, low_scoring_outputs: u64) -> Self {
        Self {
            institution,
            high_scoring_outputs,
            low_scoring_outputs,
        }
    }

    /// Turn a percentage profile into counts for `total_outputs` outputs.
    ///
    /// Each rating count is rounded half-to-even on its own, so high + low may
    /// differ from `total_outputs` by a small amount.
    pub fn from_star_profile(
        institution: InstitutionId,
        profile: &StarProfile,
        total_outputs: usize,
    ) -> Self {
        let count = |pct: f64| (pct / 100.0 * total_outputs as f64).round_ties_even() as u64;
        Self {
            institution,
            high_scoring_outputs: count(profile.four_star) + count(profile.three_star),
            low_scoring_outputs: count(profile.two_star)
                + count(profile.one_star)
                + count(profile.unclassified),
        }
    }

    pub fn total(&self) -> u64 {
        self.high_scoring_outputs + self.low_scoring_outputs
    }

    /// At least one high-scoring output and no low-scoring ones.
    pub fn is_all_high_scoring(&self) -> bool {
        self.high_scoring_outputs > 0 && self.low_scoring_outputs == 0
    }
}

/// Institutions whose outputs were all high-scoring, by ascending high count.
pub fn high_scoring_institutions(results: &[InstitutionResult]) -> Vec<InstitutionId> {
    let mut anchors: Vec<&InstitutionResult> =
        results.iter().filter(|r| r.is_all_high_scoring()).collect();
    anchors.sort_by_key(|r| r.high_scoring_outputs);
    anchors.into_iter().map(|r| r.institution).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_rejects_wrong_width() {
        let mut table = FeatureTable::new(["a", "b"]);
        assert!(table.push(1, vec![Some(1.0)]).is_err());
        assert!(table.push(1, vec![Some(1.0), None]).is_ok());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn institutions_in_first_seen_order() {
        let mut table = FeatureTable::new(["a"]);
        for id in [30, 10, 30, 20, 10] {
            table.push(id, vec![Some(0.0)]).unwrap();
        }
        assert_eq!(table.institutions(), vec![30, 10, 20]);
        assert_eq!(table.output_count(30), 2);
        assert_eq!(table.output_count(99), 0);
    }

    #[test]
    fn missing_column_is_reported_by_name() {
        let table = FeatureTable::new(["SJR"]);
        assert_eq!(table.column_index(Feature::Sjr).unwrap(), 0);
        match table.column_index(Feature::Snip) {
            Err(Error::MissingColumn { feature }) => assert_eq!(feature, "SNIP"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn star_profile_to_counts() {
        let profile = StarProfile {
            four_star: 6.3,
            three_star: 63.5,
            two_star: 28.6,
            one_star: 1.6,
            unclassified: 0.0,
        };
        let result = InstitutionResult::from_star_profile(10007800, &profile, 63);
        assert_eq!(result.high_scoring_outputs, 44);
        assert_eq!(result.low_scoring_outputs, 19);
        assert_eq!(result.total(), 63);
    }

    #[test]
    fn anchors_are_all_high_institutions() {
        let results = vec![
            InstitutionResult::new(10007783, 3, 0),
            InstitutionResult::new(10007856, 0, 2),
            InstitutionResult::new(10000001, 5, 0),
            InstitutionResult::new(10000002, 1, 0),
            InstitutionResult::new(10000003, 0, 0),
        ];
        assert_eq!(
            high_scoring_institutions(&results),
            vec![10000002, 10007783, 10000001]
        );
    }
}
