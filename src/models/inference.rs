//! Inference engine: the immutable context every request handler shares

use crate::config::{AppConfig, ModelVariant, ModelsConfig, ScalingMode};
use crate::error::{ArtifactLoadError, InferenceError};
use crate::feature_extractor::FeatureExtractor;
use crate::models::aggregator::Ensemble;
use crate::models::loader::{LoadedModels, ModelLoader};
use crate::models::logistic::LogisticModel;
use crate::models::scaler::Scaler;
use crate::types::{InferenceResult, PatientRecord};
use serde_json::Value;
use tracing::{debug, info};

/// Result of inference on one record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Validated input
    pub record: PatientRecord,
    /// Label and class-1 probability
    pub result: InferenceResult,
    /// Variant that produced the result
    pub variant: ModelVariant,
}

/// Inference engine over loaded artifacts.
///
/// Built once at startup and never mutated, so it is shared across request
/// handlers behind an `Arc` without locking.
#[derive(Debug)]
pub struct InferenceEngine {
    ensemble: Ensemble,
    scaler: Scaler,
    logistic: Option<LogisticModel>,
    extractor: FeatureExtractor,
    /// Variant selection, per-variant scaling and tree fan-out
    settings: ModelsConfig,
}

impl InferenceEngine {
    /// Load artifacts named by the configuration and build the engine
    pub fn new(config: &AppConfig) -> Result<Self, ArtifactLoadError> {
        let models = ModelLoader::new().load_all(&config.models.artifact_paths())?;
        Self::from_models(models, config)
    }

    /// Build the engine from already loaded artifacts
    pub fn from_models(models: LoadedModels, config: &AppConfig) -> Result<Self, ArtifactLoadError> {
        let variant = config.models.variant;
        if variant == ModelVariant::Logistic && models.logistic.is_none() {
            return Err(ArtifactLoadError::MissingArtifact {
                variant: variant.to_string(),
                artifact: "logistic",
            });
        }

        info!(
            variant = %variant,
            trees = models.ensemble.n_trees(),
            forest_scaling = ?config.models.forest.scaling,
            logistic_scaling = ?config.models.logistic.scaling,
            parallel_trees = config.models.parallel_trees,
            "Inference engine initialized"
        );

        Ok(Self {
            ensemble: models.ensemble,
            scaler: models.scaler,
            logistic: models.logistic,
            extractor: FeatureExtractor::new(&config.validation),
            settings: config.models.clone(),
        })
    }

    /// Active model variant
    pub fn variant(&self) -> ModelVariant {
        self.settings.variant
    }

    /// Number of trees in the loaded ensemble
    pub fn tree_count(&self) -> usize {
        self.ensemble.n_trees()
    }

    /// Number of features every model expects
    pub fn feature_count(&self) -> usize {
        self.ensemble.n_features()
    }

    /// Whether the logistic variant is loaded
    pub fn has_logistic(&self) -> bool {
        self.logistic.is_some()
    }

    /// Validate a raw record and run the active variant on it
    pub fn infer(&self, raw: &Value) -> Result<Prediction, InferenceError> {
        let record = self.extractor.extract(raw)?;
        let variant = self.variant();
        let result = self.predict_with(variant, &record.to_features())?;

        debug!(
            variant = %variant,
            label = result.label,
            probability = result.probability,
            "Inference complete"
        );

        Ok(Prediction {
            record,
            result,
            variant,
        })
    }

    /// Run a variant on a feature vector, applying the scaling configured for it
    pub fn predict_with(&self, variant: ModelVariant, features: &[f64]) -> Result<InferenceResult, InferenceError> {
        match self.settings.scaling_for(variant) {
            ScalingMode::Raw => self.predict_raw_with(variant, features),
            ScalingMode::Standardized => self.predict_scaled_with(variant, features),
        }
    }

    /// Run the active variant on features exactly as given
    pub fn predict_raw(&self, features: &[f64]) -> Result<InferenceResult, InferenceError> {
        self.predict_raw_with(self.variant(), features)
    }

    /// Scale the features, then run the active variant
    pub fn predict_scaled(&self, features: &[f64]) -> Result<InferenceResult, InferenceError> {
        self.predict_scaled_with(self.variant(), features)
    }

    /// Run inference on a batch of raw records
    pub fn predict_batch(&self, records: &[Value]) -> Vec<Result<Prediction, InferenceError>> {
        records.iter().map(|r| self.infer(r)).collect()
    }

    fn predict_raw_with(&self, variant: ModelVariant, features: &[f64]) -> Result<InferenceResult, InferenceError> {
        self.check_len(features)?;
        self.run(variant, features)
    }

    fn predict_scaled_with(&self, variant: ModelVariant, features: &[f64]) -> Result<InferenceResult, InferenceError> {
        self.check_len(features)?;
        self.run(variant, &self.scaler.scale(features))
    }

    fn run(&self, variant: ModelVariant, features: &[f64]) -> Result<InferenceResult, InferenceError> {
        match variant {
            ModelVariant::Forest if self.settings.parallel_trees => Ok(self.ensemble.predict_parallel(features)),
            ModelVariant::Forest => Ok(self.ensemble.predict(features)),
            ModelVariant::Logistic => self
                .logistic
                .as_ref()
                .map(|model| model.predict(features))
                .ok_or_else(|| InferenceError::VariantUnavailable(variant.to_string())),
        }
    }

    fn check_len(&self, features: &[f64]) -> Result<(), InferenceError> {
        if features.len() != self.ensemble.n_features() {
            return Err(InferenceError::FeatureCount {
                expected: self.ensemble.n_features(),
                got: features.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::scaler::FeatureScale;
    use crate::models::tree::{DecisionTree, TreeNode};
    use crate::types::FEATURE_NAMES;
    use serde_json::json;

    fn models(with_logistic: bool) -> LoadedModels {
        let tree = DecisionTree::new(TreeNode::split(
            0,
            50.0,
            TreeNode::leaf(0.9, 0.1),
            TreeNode::leaf(0.3, 0.7),
        ));
        let params = (0..8).map(|_| FeatureScale { mean: 50.0, std: 10.0 }).collect();
        let mut coefficients = vec![0.0; 8];
        coefficients[0] = 1.0;
        LoadedModels {
            ensemble: Ensemble::new(vec![tree], 8).unwrap(),
            scaler: Scaler::new(params, &FEATURE_NAMES).unwrap(),
            logistic: with_logistic
                .then(|| LogisticModel::new(coefficients, 0.0, &FEATURE_NAMES).unwrap()),
        }
    }

    fn record(age: i64) -> Value {
        json!({
            "Age": age,
            "Gender": 0,
            "BMI": 24.5,
            "Smoking": 0,
            "GeneticRisk": 0,
            "PhysicalActivity": 5.0,
            "AlcoholIntake": 1.0,
            "CancerHistory": 0
        })
    }

    #[test]
    fn test_forest_uses_raw_features_by_default() {
        let engine = InferenceEngine::from_models(models(false), &AppConfig::default()).unwrap();

        let young = engine.infer(&record(30)).unwrap();
        assert_eq!(young.result.label, 0);
        assert_eq!(young.result.probability, 0.1);
        assert_eq!(young.variant, ModelVariant::Forest);

        let old = engine.infer(&record(70)).unwrap();
        assert_eq!(old.result.label, 1);
        assert_eq!(old.result.probability, 0.7);
    }

    #[test]
    fn test_raw_and_scaled_entry_points_differ() {
        let engine = InferenceEngine::from_models(models(false), &AppConfig::default()).unwrap();
        let mut features = [0.0; 8];
        features[0] = 70.0;

        // Scaled age is 2.0, which falls on the left of the 50.0 split.
        assert_eq!(engine.predict_raw(&features).unwrap().probability, 0.7);
        assert_eq!(engine.predict_scaled(&features).unwrap().probability, 0.1);
    }

    #[test]
    fn test_logistic_variant_scales_first() {
        let mut config = AppConfig::default();
        config.models.variant = ModelVariant::Logistic;
        let engine = InferenceEngine::from_models(models(true), &config).unwrap();

        // Age 50 scales to 0, so the logit is 0.
        let tie = engine.infer(&record(50)).unwrap();
        assert_eq!(tie.result.probability, 0.5);
        assert_eq!(tie.result.label, 0);
        assert_eq!(tie.variant, ModelVariant::Logistic);

        let high = engine.infer(&record(80)).unwrap();
        assert!((high.result.probability - 1.0 / (1.0 + (-3.0f64).exp())).abs() < 1e-12);
    }

    #[test]
    fn test_forest_scaling_follows_config() {
        let mut config = AppConfig::default();
        config.models.forest.scaling = ScalingMode::Standardized;
        let engine = InferenceEngine::from_models(models(false), &config).unwrap();

        // Scaled age 2.0 falls on the left of the 50.0 split.
        assert_eq!(engine.infer(&record(70)).unwrap().result.probability, 0.1);
    }

    #[test]
    fn test_logistic_variant_requires_artifact() {
        let mut config = AppConfig::default();
        config.models.variant = ModelVariant::Logistic;

        let err = InferenceEngine::from_models(models(false), &config).unwrap_err();
        assert!(matches!(err, ArtifactLoadError::MissingArtifact { .. }));
    }

    #[test]
    fn test_unloaded_variant_is_an_error() {
        let engine = InferenceEngine::from_models(models(false), &AppConfig::default()).unwrap();

        let err = engine.predict_with(ModelVariant::Logistic, &[0.0; 8]).unwrap_err();
        assert!(matches!(err, InferenceError::VariantUnavailable(_)));
    }

    #[test]
    fn test_wrong_vector_length() {
        let engine = InferenceEngine::from_models(models(false), &AppConfig::default()).unwrap();

        let err = engine.predict_raw(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, InferenceError::FeatureCount { expected: 8, got: 2 }));
    }

    #[test]
    fn test_validation_error_passes_through() {
        let engine = InferenceEngine::from_models(models(false), &AppConfig::default()).unwrap();
        let mut raw = record(30);
        raw.as_object_mut().unwrap().remove("BMI");

        match engine.infer(&raw) {
            Err(InferenceError::Validation(err)) => assert!(err.names("BMI")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_batch_and_determinism() {
        let mut config = AppConfig::default();
        config.models.parallel_trees = true;
        let engine = InferenceEngine::from_models(models(false), &config).unwrap();

        let results = engine.predict_batch(&[record(30), record(70), record(30)]);
        let first = results[0].as_ref().unwrap().result;
        let third = results[2].as_ref().unwrap().result;

        assert_eq!(first.probability.to_bits(), third.probability.to_bits());
        assert_eq!(results[1].as_ref().unwrap().result.label, 1);
    }
}
