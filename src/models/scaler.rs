//! Per-feature z-score scaling.

use serde::{Deserialize, Serialize};

use crate::error::{ArtifactLoadError, SchemaMismatchError};

/// Mean and standard deviation learned for one feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureScale {
    pub mean: f64,
    pub std: f64,
}

/// Ordered scaling parameters, one pair per feature.
#[derive(Debug, Clone, PartialEq)]
pub struct Scaler {
    params: Vec<FeatureScale>,
}

impl Scaler {
    /// Build a scaler, rejecting zero or non-finite deviations.
    ///
    /// `names` is the feature schema; there must be exactly one parameter
    /// pair per name.
    pub fn new(params: Vec<FeatureScale>, names: &[&str]) -> Result<Self, ArtifactLoadError> {
        if params.len() != names.len() {
            return Err(SchemaMismatchError::FeatureCount {
                artifact: "scaler",
                expected: names.len(),
                found: params.len(),
            }
            .into());
        }
        for (param, name) in params.iter().zip(names) {
            if !param.mean.is_finite() {
                return Err(ArtifactLoadError::InvalidParameter {
                    feature: name.to_string(),
                    reason: format!("non-finite mean {}", param.mean),
                });
            }
            if !param.std.is_finite() || param.std == 0.0 {
                return Err(ArtifactLoadError::InvalidParameter {
                    feature: name.to_string(),
                    reason: format!("standard deviation must be finite and non-zero, got {}", param.std),
                });
            }
        }
        Ok(Self { params })
    }

    /// Number of features the scaler covers.
    pub fn n_features(&self) -> usize {
        self.params.len()
    }

    /// Stored parameters in feature order.
    pub fn params(&self) -> &[FeatureScale] {
        &self.params
    }

    /// `(x - mean) / std` for every feature.
    pub fn scale(&self, raw: &[f64]) -> Vec<f64> {
        raw.iter()
            .zip(&self.params)
            .map(|(x, p)| (x - p.mean) / p.std)
            .collect()
    }

    /// Inverse of [`Scaler::scale`]: `x * std + mean`.
    pub fn unscale(&self, scaled: &[f64]) -> Vec<f64> {
        scaled
            .iter()
            .zip(&self.params)
            .map(|(x, p)| x * p.std + p.mean)
            .collect()
    }
}
