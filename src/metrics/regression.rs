//! Accuracy of predicted against actual high-scoring percentages across folds.

use serde::Serialize;

use crate::error::{Error, Result};

fn check_pair(actual: &[f64], predicted: &[f64]) -> Result<()> {
    if actual.is_empty() {
        return Err(Error::EmptyInput);
    }
    if actual.len() != predicted.len() {
        return Err(Error::DimensionMismatch {
            expected: actual.len(),
            found: predicted.len(),
        });
    }
    Ok(())
}

/// Mean absolute error.
pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_pair(actual, predicted)?;
    let sum: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p).abs()).sum();
    Ok(sum / actual.len() as f64)
}

/// Root mean squared error.
pub fn root_mean_squared_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_pair(actual, predicted)?;
    let sum: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p).powi(2)).sum();
    Ok((sum / actual.len() as f64).sqrt())
}

/// Coefficient of determination.
///
/// When the actual values are constant the score is 1 for a perfect
/// prediction and 0 otherwise, rather than NaN or -∞.
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_pair(actual, predicted)?;
    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let residual: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p).powi(2)).sum();
    let total: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    if total == 0.0 {
        return Ok(if residual == 0.0 { 1.0 } else { 0.0 });
    }
    Ok(1.0 - residual / total)
}

/// Regression scores over all folds, comparing high-scoring percentages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct RegressionAccuracy {
    pub mae: f64,
    pub rmse: f64,
    /// Mean absolute percentage error, in percent.
    pub mape: f64,
    pub r2: f64,
}

/// Score predicted against actual high-scoring percentages.
///
/// MAPE divides by the actual high percentage; for a fold whose actual high
/// percentage is exactly 0 it uses that fold's low percentages instead.
///
/// # Errors
///
/// [`Error::DivisionByZero`] if a fold's actual high and low percentages are
/// both 0, plus the length checks of the individual metrics.
pub fn clustering_accuracy(
    actual_high: &[f64],
    predicted_high: &[f64],
    actual_low: &[f64],
    predicted_low: &[f64],
) -> Result<RegressionAccuracy> {
    check_pair(actual_high, predicted_high)?;
    check_pair(actual_high, actual_low)?;
    check_pair(actual_high, predicted_low)?;

    let mut mape = 0.0;
    for i in 0..actual_high.len() {
        let (actual, predicted) = if actual_high[i] == 0.0 {
            (actual_low[i], predicted_low[i])
        } else {
            (actual_high[i], predicted_high[i])
        };
        if actual == 0.0 {
            return Err(Error::DivisionByZero {
                context: "absolute percentage error with zero actual high and low percentages",
            });
        }
        mape += ((actual - predicted) / actual).abs() * 100.0;
    }

    Ok(RegressionAccuracy {
        mae: mean_absolute_error(actual_high, predicted_high)?,
        rmse: root_mean_squared_error(actual_high, predicted_high)?,
        mape: mape / actual_high.len() as f64,
        r2: r2_score(actual_high, predicted_high)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_predictions() {
        let actual = [20.0, 50.0, 80.0];
        let low = [80.0, 50.0, 20.0];
        let acc = clustering_accuracy(&actual, &actual, &low, &low).unwrap();
        assert_eq!(acc.mae, 0.0);
        assert_eq!(acc.rmse, 0.0);
        assert_eq!(acc.mape, 0.0);
        assert_eq!(acc.r2, 1.0);
    }

    #[test]
    fn known_errors() {
        let actual = [50.0, 100.0];
        let predicted = [60.0, 80.0];
        let acc = clustering_accuracy(&actual, &predicted, &[50.0, 0.0], &[40.0, 20.0]).unwrap();
        assert!((acc.mae - 15.0).abs() < 1e-12);
        assert!((acc.rmse - 250f64.sqrt()).abs() < 1e-12);
        // 20% and 20%.
        assert!((acc.mape - 20.0).abs() < 1e-12);
        // residual 500, total 1250.
        assert!((acc.r2 - 0.6).abs() < 1e-12);
    }

    #[test]
    fn mape_falls_back_to_low_percentages() {
        let acc = clustering_accuracy(&[0.0, 50.0], &[10.0, 50.0], &[100.0, 50.0], &[90.0, 50.0]).unwrap();
        // |100 - 90| / 100 = 10% for the first fold, 0% for the second.
        assert!((acc.mape - 5.0).abs() < 1e-12);
    }

    #[test]
    fn mape_with_no_outputs_is_an_error() {
        assert!(matches!(
            clustering_accuracy(&[0.0], &[0.0], &[0.0], &[0.0]),
            Err(Error::DivisionByZero { .. })
        ));
    }

    #[test]
    fn r2_on_constant_actuals_is_finite() {
        assert_eq!(r2_score(&[40.0, 40.0], &[40.0, 40.0]).unwrap(), 1.0);
        assert_eq!(r2_score(&[40.0, 40.0], &[30.0, 40.0]).unwrap(), 0.0);
    }

    #[test]
    fn length_mismatch() {
        assert!(mean_absolute_error(&[1.0], &[1.0, 2.0]).is_err());
        assert!(matches!(root_mean_squared_error(&[], &[]), Err(Error::EmptyInput)));
    }
}
