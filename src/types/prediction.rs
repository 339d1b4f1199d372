//! Prediction result data structures

use serde::{Deserialize, Serialize};

/// Label and class-1 probability produced by a model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InferenceResult {
    /// Predicted label (0 = no cancer, 1 = cancer)
    pub label: u8,
    /// Probability of label 1, in [0.0, 1.0]
    pub probability: f64,
}

impl InferenceResult {
    /// Derive the label from a class-1 probability.
    ///
    /// Label 1 requires a probability strictly above 0.5; a tie goes to
    /// the negative class.
    #[must_use]
    pub fn from_probability(probability: f64) -> Self {
        let probability = probability.clamp(0.0, 1.0);
        let label = u8::from(probability > 0.5);
        Self { label, probability }
    }
}

/// Risk tier classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
    Alert,
    Danger,
}

impl RiskTier {
    /// Determine risk tier from probability and thresholds
    pub fn from_probability(probability: f64, thresholds: &RiskTierThresholds) -> Self {
        if probability >= thresholds.danger {
            RiskTier::Danger
        } else if probability >= thresholds.alert {
            RiskTier::Alert
        } else if probability >= thresholds.high {
            RiskTier::High
        } else if probability >= thresholds.medium {
            RiskTier::Medium
        } else {
            RiskTier::Low
        }
    }

    /// Lowercase tier name, as serialized.
    pub fn as_str(self) -> &'static str {
        match self {
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
            RiskTier::Alert => "alert",
            RiskTier::Danger => "danger",
        }
    }
}

/// Lower bounds of each tier above `low`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskTierThresholds {
    pub medium: f64,
    pub high: f64,
    pub alert: f64,
    pub danger: f64,
}

impl Default for RiskTierThresholds {
    fn default() -> Self {
        Self {
            medium: 0.05,
            high: 0.15,
            alert: 0.30,
            danger: 0.70,
        }
    }
}

/// Body of a successful `POST /predict` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    /// Predicted label (0/1)
    pub prediction: u8,

    /// Probability of cancer (label 1)
    pub probability_cancer: f64,

    /// Coarse risk bucket of `probability_cancer`
    pub risk_tier: RiskTier,

    /// Model variant that produced the prediction
    pub model: String,
}

impl PredictionResponse {
    /// Shape an inference result into a response body
    pub fn new(result: InferenceResult, thresholds: &RiskTierThresholds, model: &str) -> Self {
        Self {
            prediction: result.label,
            probability_cancer: result.probability,
            risk_tier: RiskTier::from_probability(result.probability, thresholds),
            model: model.to_string(),
        }
    }
}
