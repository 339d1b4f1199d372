//! Patient record data structures

use serde::{Deserialize, Serialize};

/// Number of features every model artifact is trained on.
pub const FEATURE_COUNT: usize = 8;

/// Feature names in training order. Models index features by this position.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "Age",
    "Gender",
    "BMI",
    "Smoking",
    "GeneticRisk",
    "PhysicalActivity",
    "AlcoholIntake",
    "CancerHistory",
];

/// Patient-level inputs to the risk model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PatientRecord {
    /// Age in years
    pub age: i64,

    /// Gender (0 = male, 1 = female)
    pub gender: i64,

    /// Body mass index
    #[serde(rename = "BMI")]
    pub bmi: f64,

    /// Smoker (0 = no, 1 = yes)
    pub smoking: i64,

    /// Genetic risk level (0 = low, 1 = medium, 2 = high)
    pub genetic_risk: i64,

    /// Hours of physical activity per week
    pub physical_activity: f64,

    /// Alcohol units per week
    pub alcohol_intake: f64,

    /// Personal history of cancer (0 = no, 1 = yes)
    pub cancer_history: i64,
}

impl PatientRecord {
    /// Feature vector in training order.
    #[must_use]
    pub fn to_features(&self) -> [f64; FEATURE_COUNT] {
        [
            self.age as f64,
            self.gender as f64,
            self.bmi,
            self.smoking as f64,
            self.genetic_risk as f64,
            self.physical_activity,
            self.alcohol_intake,
            self.cancer_history as f64,
        ]
    }
}
