//! Cancer Risk Inference Library
//!
//! Serves cancer-diagnosis predictions from a pre-trained random forest
//! (or a logistic regression alternative) over an 8-feature patient record.

pub mod config;
pub mod error;
pub mod feature_extractor;
pub mod metrics;
pub mod models;
pub mod server;
pub mod types;

pub use config::AppConfig;
pub use error::{ArtifactLoadError, InferenceError, SchemaMismatchError, ValidationError};
pub use feature_extractor::FeatureExtractor;
pub use metrics::ServiceMetrics;
pub use models::inference::InferenceEngine;
pub use types::{InferenceResult, PatientRecord, PredictionResponse, RiskTier};
