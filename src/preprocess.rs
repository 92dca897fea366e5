//! Missing-value imputation and feature scaling.
//!
//! Both transforms are fitted on training rows only and then applied unchanged
//! to held-out rows, so no statistic of a test fold leaks into its model.

use serde::{Deserialize, Serialize};

use crate::cluster::util;
use crate::error::{Error, Result};

/// Statistic used to fill a missing feature value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Imputation {
    #[default]
    Median,
    Mean,
    /// Most frequent value; the smallest one wins ties.
    Mode,
}

/// Feature scaling method.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scaling {
    /// Zero mean, unit (population) variance.
    #[default]
    Standard,
    /// Rescale each column to `[0, 1]`.
    MinMax,
}

/// Per-column fill values learned from training rows.
#[derive(Clone, Debug, PartialEq)]
pub struct Imputer {
    strategy: Imputation,
    fill: Vec<f64>,
}

impl Imputer {
    /// Learn one fill value per column.
    ///
    /// `names` labels the columns for error reporting. Missing and non-finite
    /// values are ignored; a column with no observed value cannot be imputed.
    pub fn fit(strategy: Imputation, names: &[String], rows: &[Vec<Option<f64>>]) -> Result<Self> {
        if rows.is_empty() {
            return Err(Error::EmptyInput);
        }
        let mut fill = Vec::with_capacity(names.len());
        for (column, name) in names.iter().enumerate() {
            let mut observed = Vec::with_capacity(rows.len());
            for row in rows {
                let value = row.get(column).ok_or(Error::DimensionMismatch {
                    expected: names.len(),
                    found: row.len(),
                })?;
                if let Some(v) = value.filter(|v| v.is_finite()) {
                    observed.push(v);
                }
            }
            if observed.is_empty() {
                return Err(Error::UndefinedImputation {
                    feature: name.clone(),
                });
            }
            fill.push(match strategy {
                Imputation::Median => median(&mut observed),
                Imputation::Mean => observed.iter().sum::<f64>() / observed.len() as f64,
                Imputation::Mode => mode(&mut observed),
            });
        }
        Ok(Self { strategy, fill })
    }

    pub fn strategy(&self) -> Imputation {
        self.strategy
    }

    /// Learned fill value per column.
    pub fn fill_values(&self) -> &[f64] {
        &self.fill
    }

    /// Replace missing and non-finite values with the learned fill values.
    pub fn transform(&self, rows: &[Vec<Option<f64>>]) -> Result<Vec<Vec<f64>>> {
        rows.iter()
            .map(|row| {
                if row.len() != self.fill.len() {
                    return Err(Error::DimensionMismatch {
                        expected: self.fill.len(),
                        found: row.len(),
                    });
                }
                Ok(row
                    .iter()
                    .zip(&self.fill)
                    .map(|(v, &fill)| v.filter(|x| x.is_finite()).unwrap_or(fill))
                    .collect())
            })
            .collect()
    }
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

fn mode(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    let mut best = values[0];
    let mut best_count = 0;
    let mut start = 0;
    while start < values.len() {
        let end = start + values[start..].iter().take_while(|&&v| v == values[start]).count();
        // Strictly greater keeps the smallest value among equal counts.
        if end - start > best_count {
            best = values[start];
            best_count = end - start;
        }
        start = end;
    }
    best
}

/// Per-column affine transform learned from training rows.
#[derive(Clone, Debug, PartialEq)]
pub struct Scaler {
    method: Scaling,
    offset: Vec<f64>,
    scale: Vec<f64>,
}

impl Scaler {
    pub fn fit(method: Scaling, data: &[Vec<f64>]) -> Result<Self> {
        let d = util::validate_matrix(data)?;
        let n = data.len() as f64;
        let (offset, scale) = match method {
            Scaling::Standard => {
                let mean = util::centroid(data);
                let scale = (0..d)
                    .map(|j| {
                        let var = data.iter().map(|r| (r[j] - mean[j]).powi(2)).sum::<f64>() / n;
                        nonzero_scale(var.sqrt())
                    })
                    .collect();
                (mean, scale)
            }
            Scaling::MinMax => {
                let mut min = vec![f64::INFINITY; d];
                let mut max = vec![f64::NEG_INFINITY; d];
                for row in data {
                    for j in 0..d {
                        min[j] = min[j].min(row[j]);
                        max[j] = max[j].max(row[j]);
                    }
                }
                let scale = min.iter().zip(&max).map(|(lo, hi)| nonzero_scale(hi - lo)).collect();
                (min, scale)
            }
        };
        Ok(Self {
            method,
            offset,
            scale,
        })
    }

    pub fn method(&self) -> Scaling {
        self.method
    }

    /// Apply the learned transform to `data`.
    pub fn transform(&self, data: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        let d = util::validate_matrix(data)?;
        if d != self.offset.len() {
            return Err(Error::DimensionMismatch {
                expected: self.offset.len(),
                found: d,
            });
        }
        Ok(data
            .iter()
            .map(|row| {
                row.iter()
                    .zip(self.offset.iter().zip(&self.scale))
                    .map(|(x, (o, s))| (x - o) / s)
                    .collect()
            })
            .collect())
    }

    pub fn fit_transform(method: Scaling, data: &[Vec<f64>]) -> Result<(Self, Vec<Vec<f64>>)> {
        let scaler = Self::fit(method, data)?;
        let scaled = scaler.transform(data)?;
        Ok((scaler, scaled))
    }
}

/// Constant columns keep their offset but are not divided by ~0.
fn nonzero_scale(s: f64) -> f64 {
    if s < 10.0 * f64::EPSILON {
        1.0
    } else {
        s
    }
}
