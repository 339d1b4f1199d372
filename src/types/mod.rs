//! Type definitions for the inference service

pub mod patient;
pub mod prediction;

pub use patient::{PatientRecord, FEATURE_COUNT, FEATURE_NAMES};
pub use prediction::{InferenceResult, PredictionResponse, RiskTier, RiskTierThresholds};
