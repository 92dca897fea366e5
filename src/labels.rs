//! Naming the two clusters.
//!
//! Cluster ids are arbitrary. Rows from institutions whose outputs were all
//! rated high-scoring act as anchors: the cluster holding more of them is the
//! high-scoring one.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dataset::InstitutionId;
use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreLabel {
    HighScoringOutputs,
    LowScoringOutputs,
}

impl fmt::Display for ScoreLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScoreLabel::HighScoringOutputs => "high_scoring_outputs",
            ScoreLabel::LowScoringOutputs => "low_scoring_outputs",
        })
    }
}

/// Which cluster id carries which label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterLabelMapping {
    pub high_scoring: usize,
    pub low_scoring: usize,
}

impl ClusterLabelMapping {
    /// Label of `cluster`, or `None` for an id outside the mapping.
    pub fn label_of(&self, cluster: usize) -> Option<ScoreLabel> {
        if cluster == self.high_scoring {
            Some(ScoreLabel::HighScoringOutputs)
        } else if cluster == self.low_scoring {
            Some(ScoreLabel::LowScoringOutputs)
        } else {
            None
        }
    }

    pub fn to_map(&self) -> BTreeMap<usize, ScoreLabel> {
        BTreeMap::from([
            (self.high_scoring, ScoreLabel::HighScoringOutputs),
            (self.low_scoring, ScoreLabel::LowScoringOutputs),
        ])
    }
}

/// Label clusters 0 and 1 from training assignments.
///
/// `assignments` yields `(institution, cluster)` per training row. Cluster 0 is
/// high-scoring only if strictly more anchor rows fall in it than in cluster 1;
/// otherwise cluster 1 is.
///
/// # Errors
///
/// - [`Error::InvalidParameter`] if any cluster id is above 1.
/// - [`Error::NoAnchorRows`] if no row belongs to an anchor institution.
pub fn infer_cluster_labels<I>(assignments: I, anchors: &[InstitutionId]) -> Result<ClusterLabelMapping>
where
    I: IntoIterator<Item = (InstitutionId, usize)>,
{
    let mut counts = [0usize; 2];
    for (institution, cluster) in assignments {
        if cluster > 1 {
            return Err(Error::InvalidParameter {
                name: "cluster",
                message: "label inference expects exactly two clusters",
            });
        }
        if anchors.contains(&institution) {
            counts[cluster] += 1;
        }
    }
    if counts == [0, 0] {
        return Err(Error::NoAnchorRows);
    }

    Ok(if counts[0] > counts[1] {
        ClusterLabelMapping {
            high_scoring: 0,
            low_scoring: 1,
        }
    } else {
        ClusterLabelMapping {
            high_scoring: 1,
            low_scoring: 0,
        }
    })
}
