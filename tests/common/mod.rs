//! Shared fixtures for integration tests

#![allow(dead_code)]

use cancer_risk_inference::config::AppConfig;
use cancer_risk_inference::models::{
    DecisionTree, Ensemble, FeatureScale, LogisticModel, ModelLoader, Scaler, TreeNode,
};
use cancer_risk_inference::types::FEATURE_NAMES;
use serde_json::{json, Value};
use tempfile::TempDir;

/// Age stump: 0.1 at or below 50, 0.7 above
pub fn age_stump() -> DecisionTree {
    DecisionTree::new(TreeNode::split(
        0,
        50.0,
        TreeNode::leaf(0.9, 0.1),
        TreeNode::leaf(0.3, 0.7),
    ))
}

/// Smoking stump: 0.2 for non-smokers, 0.6 for smokers
pub fn smoking_stump() -> DecisionTree {
    DecisionTree::new(TreeNode::split(
        3,
        0.5,
        TreeNode::leaf(0.8, 0.2),
        TreeNode::leaf(0.4, 0.6),
    ))
}

/// Write a two-stump forest, a scaler and a logistic model into a fresh
/// directory and return a config pointing at them.
pub fn write_artifacts() -> (TempDir, AppConfig) {
    let dir = tempfile::tempdir().unwrap();
    let loader = ModelLoader::new();

    let ensemble = Ensemble::new(vec![age_stump(), smoking_stump()], 8).unwrap();
    let scaler = Scaler::new(
        (0..8).map(|_| FeatureScale { mean: 50.0, std: 10.0 }).collect(),
        &FEATURE_NAMES,
    )
    .unwrap();
    let mut coefficients = vec![0.0; 8];
    coefficients[0] = 1.0;
    let logistic = LogisticModel::new(coefficients, 0.0, &FEATURE_NAMES).unwrap();

    let mut config = AppConfig::default();
    config.models.ensemble_path = dir.path().join("forest.json");
    config.models.scaler_path = dir.path().join("scaler.json");
    config.models.logistic_path = Some(dir.path().join("logistic.json"));

    loader.write_ensemble(&ensemble, &config.models.ensemble_path).unwrap();
    loader.write_scaler(&scaler, &config.models.scaler_path).unwrap();
    loader
        .write_logistic(&logistic, config.models.logistic_path.as_deref().unwrap())
        .unwrap();

    (dir, config)
}

pub fn patient(age: i64, smoking: i64) -> Value {
    json!({
        "Age": age,
        "Gender": 1,
        "BMI": 24.5,
        "Smoking": smoking,
        "GeneticRisk": 1,
        "PhysicalActivity": 5.2,
        "AlcoholIntake": 1.3,
        "CancerHistory": 0
    })
}
