//! Logistic regression variant, evaluated on standardized features.

use crate::error::{ArtifactLoadError, SchemaMismatchError};
use crate::types::InferenceResult;

/// Linear model with a sigmoid link.
#[derive(Debug, Clone, PartialEq)]
pub struct LogisticModel {
    coefficients: Vec<f64>,
    intercept: f64,
}

impl LogisticModel {
    /// Build a model, rejecting non-finite weights.
    pub fn new(coefficients: Vec<f64>, intercept: f64, names: &[&str]) -> Result<Self, ArtifactLoadError> {
        if coefficients.len() != names.len() {
            return Err(SchemaMismatchError::FeatureCount {
                artifact: "logistic",
                expected: names.len(),
                found: coefficients.len(),
            }
            .into());
        }
        if let Some((name, w)) = names
            .iter()
            .zip(&coefficients)
            .find(|(_, w)| !w.is_finite())
        {
            return Err(ArtifactLoadError::InvalidParameter {
                feature: name.to_string(),
                reason: format!("non-finite coefficient {w}"),
            });
        }
        if !intercept.is_finite() {
            return Err(ArtifactLoadError::InvalidParameter {
                feature: "intercept".to_string(),
                reason: format!("non-finite intercept {intercept}"),
            });
        }
        Ok(Self {
            coefficients,
            intercept,
        })
    }

    pub fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Probability of label 1 for a feature vector.
    pub fn probability(&self, features: &[f64]) -> f64 {
        let z: f64 = self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(w, x)| w * x)
                .sum::<f64>();
        1.0 / (1.0 + (-z).exp())
    }

    pub fn predict(&self, features: &[f64]) -> InferenceResult {
        InferenceResult::from_probability(self.probability(features))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_logit_is_a_tie() {
        let model = LogisticModel::new(vec![1.0, -1.0], 0.0, &["a", "b"]).unwrap();
        let result = model.predict(&[2.0, 2.0]);

        assert_eq!(result.probability, 0.5);
        assert_eq!(result.label, 0);
    }

    #[test]
    fn test_probability_is_sigmoid() {
        let model = LogisticModel::new(vec![2.0], -1.0, &["a"]).unwrap();

        let p = model.probability(&[1.0]);
        assert!((p - 1.0 / (1.0 + (-1.0f64).exp())).abs() < 1e-12);
        assert_eq!(model.predict(&[1.0]).label, 1);
        assert_eq!(model.predict(&[0.0]).label, 0);
    }

    #[test]
    fn test_extreme_logits_stay_in_unit_interval() {
        let model = LogisticModel::new(vec![1.0], 0.0, &["a"]).unwrap();

        assert_eq!(model.probability(&[1e4]), 1.0);
        assert_eq!(model.probability(&[-1e4]), 0.0);
    }

    #[test]
    fn test_non_finite_weight_rejected() {
        let err = LogisticModel::new(vec![1.0, f64::NAN], 0.0, &["Age", "Gender"]).unwrap_err();
        assert!(err.to_string().contains("Gender"));
    }

    #[test]
    fn test_coefficient_count_must_match_schema() {
        let err = LogisticModel::new(vec![1.0; 3], 0.0, &["Age", "Gender"]).unwrap_err();
        assert!(matches!(
            err,
            ArtifactLoadError::Schema(SchemaMismatchError::FeatureCount { expected: 2, found: 3, .. })
        ));
    }
}
