//! Feature vector building for cancer risk model inference.
//!
//! Turns an untyped JSON record into the fixed-order feature vector the
//! models were trained on, validating every field once at the boundary.

use serde_json::{Map, Value};

use crate::config::ValidationConfig;
use crate::error::{FieldViolation, ValidationError, ViolationKind};
use crate::types::patient::{PatientRecord, FEATURE_COUNT, FEATURE_NAMES};

#[derive(Debug, Clone, Copy, PartialEq)]
enum FieldType {
    Integer,
    Number,
}

impl FieldType {
    fn name(self) -> &'static str {
        match self {
            FieldType::Integer => "integer",
            FieldType::Number => "number",
        }
    }
}

/// Declared type and domain of one record field.
struct FieldSpec {
    name: &'static str,
    ty: FieldType,
    domain: &'static str,
    in_domain: fn(f64) -> bool,
}

fn positive(v: f64) -> bool {
    v > 0.0
}

fn non_negative(v: f64) -> bool {
    v >= 0.0
}

fn binary(v: f64) -> bool {
    v == 0.0 || v == 1.0
}

fn risk_level(v: f64) -> bool {
    (0.0..=2.0).contains(&v)
}

/// Field declarations in training order.
const FIELDS: [FieldSpec; FEATURE_COUNT] = [
    FieldSpec { name: "Age", ty: FieldType::Integer, domain: "> 0", in_domain: positive },
    FieldSpec { name: "Gender", ty: FieldType::Integer, domain: "0 or 1", in_domain: binary },
    FieldSpec { name: "BMI", ty: FieldType::Number, domain: "> 0", in_domain: positive },
    FieldSpec { name: "Smoking", ty: FieldType::Integer, domain: "0 or 1", in_domain: binary },
    FieldSpec { name: "GeneticRisk", ty: FieldType::Integer, domain: "0, 1 or 2", in_domain: risk_level },
    FieldSpec { name: "PhysicalActivity", ty: FieldType::Number, domain: ">= 0", in_domain: non_negative },
    FieldSpec { name: "AlcoholIntake", ty: FieldType::Number, domain: ">= 0", in_domain: non_negative },
    FieldSpec { name: "CancerHistory", ty: FieldType::Integer, domain: "0 or 1", in_domain: binary },
];

/// Feature extractor that validates raw records into model input vectors.
///
/// Output order is [`FEATURE_NAMES`]; artifacts are checked against the same
/// order at load time, so it is not re-checked per request.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    enforce_ranges: bool,
    reject_unknown_fields: bool,
}

impl FeatureExtractor {
    /// Create a feature extractor with the given validation settings.
    pub fn new(config: &ValidationConfig) -> Self {
        Self {
            enforce_ranges: config.enforce_ranges,
            reject_unknown_fields: config.reject_unknown_fields,
        }
    }

    /// Validate a raw record into a typed patient record.
    ///
    /// Every offending field is reported, in record order, with unknown
    /// fields last.
    pub fn extract(&self, raw: &Value) -> Result<PatientRecord, ValidationError> {
        let Some(object) = raw.as_object() else {
            return Err(ValidationError::new(vec![FieldViolation {
                field: "$record".to_string(),
                kind: ViolationKind::NotAnObject,
            }]));
        };

        let mut values = [0.0; FEATURE_COUNT];
        let mut violations = Vec::new();

        for (slot, spec) in values.iter_mut().zip(&FIELDS) {
            match self.read_field(object, spec) {
                Ok(value) => *slot = value,
                Err(kind) => violations.push(FieldViolation {
                    field: spec.name.to_string(),
                    kind,
                }),
            }
        }

        if self.reject_unknown_fields {
            violations.extend(
                object
                    .keys()
                    .filter(|key| !FEATURE_NAMES.contains(&key.as_str()))
                    .map(|key| FieldViolation {
                        field: key.clone(),
                        kind: ViolationKind::Unknown,
                    }),
            );
        }

        if !violations.is_empty() {
            return Err(ValidationError::new(violations));
        }

        Ok(PatientRecord {
            age: values[0] as i64,
            gender: values[1] as i64,
            bmi: values[2],
            smoking: values[3] as i64,
            genetic_risk: values[4] as i64,
            physical_activity: values[5],
            alcohol_intake: values[6],
            cancer_history: values[7] as i64,
        })
    }

    /// Validate a raw record and return its feature vector.
    pub fn build(&self, raw: &Value) -> Result<[f64; FEATURE_COUNT], ValidationError> {
        self.extract(raw).map(|record| record.to_features())
    }

    fn read_field(&self, object: &Map<String, Value>, spec: &FieldSpec) -> Result<f64, ViolationKind> {
        let value = object.get(spec.name).ok_or(ViolationKind::Missing)?;
        let wrong_type = ViolationKind::WrongType {
            expected: spec.ty.name(),
        };

        let number = match value {
            Value::Number(n) => n,
            Value::Null => return Err(ViolationKind::Missing),
            _ => return Err(wrong_type),
        };

        let value = match spec.ty {
            FieldType::Integer => match number.as_i64() {
                Some(i) => i as f64,
                None => {
                    let f = number.as_f64().ok_or(wrong_type.clone())?;
                    if !f.is_finite() {
                        return Err(ViolationKind::NonFinite);
                    }
                    if f.fract() != 0.0 || f.abs() > i64::MAX as f64 {
                        return Err(wrong_type);
                    }
                    f
                }
            },
            FieldType::Number => number.as_f64().ok_or(wrong_type)?,
        };

        if !value.is_finite() {
            return Err(ViolationKind::NonFinite);
        }
        if self.enforce_ranges && !(spec.in_domain)(value) {
            return Err(ViolationKind::OutOfRange {
                value,
                domain: spec.domain,
            });
        }
        Ok(value)
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }

    /// Get feature names in model order.
    pub fn feature_names(&self) -> &'static [&'static str] {
        &FEATURE_NAMES
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(&ValidationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> Value {
        json!({
            "Age": 58,
            "Gender": 1,
            "BMI": 16.085,
            "Smoking": 0,
            "GeneticRisk": 1,
            "PhysicalActivity": 8.146,
            "AlcoholIntake": 4.149,
            "CancerHistory": 1
        })
    }

    #[test]
    fn test_feature_extraction() {
        let extractor = FeatureExtractor::default();

        let features = extractor.build(&record()).unwrap();

        assert_eq!(features.len(), extractor.feature_count());
        assert_eq!(features, [58.0, 1.0, 16.085, 0.0, 1.0, 8.146, 4.149, 1.0]);
    }

    #[test]
    fn test_missing_bmi_is_named() {
        let mut raw = record();
        raw.as_object_mut().unwrap().remove("BMI");

        let err = FeatureExtractor::default().build(&raw).unwrap_err();

        assert_eq!(err.violations().len(), 1);
        assert_eq!(err.violations()[0].field, "BMI");
        assert_eq!(err.violations()[0].kind, ViolationKind::Missing);
    }

    #[test]
    fn test_every_bad_field_reported_in_order() {
        let raw = json!({
            "Age": "58",
            "Gender": 1,
            "BMI": null,
            "Smoking": 0.5,
            "GeneticRisk": 3,
            "PhysicalActivity": 1.0,
            "AlcoholIntake": -1.0,
            "CancerHistory": true,
            "Height": 170
        });

        let err = FeatureExtractor::default().extract(&raw).unwrap_err();
        let fields: Vec<&str> = err.fields().collect();

        assert_eq!(
            fields,
            ["Age", "BMI", "Smoking", "GeneticRisk", "AlcoholIntake", "CancerHistory", "Height"]
        );
        assert_eq!(err.violations()[0].kind, ViolationKind::WrongType { expected: "integer" });
        assert!(matches!(err.violations()[3].kind, ViolationKind::OutOfRange { value, .. } if value == 3.0));
        assert_eq!(err.violations()[6].kind, ViolationKind::Unknown);
    }

    #[test]
    fn test_whole_float_accepted_for_integer_field() {
        let mut raw = record();
        raw["Age"] = json!(58.0);

        let record = FeatureExtractor::default().extract(&raw).unwrap();
        assert_eq!(record.age, 58);
    }

    #[test]
    fn test_relaxed_validation() {
        let extractor = FeatureExtractor::new(&ValidationConfig {
            enforce_ranges: false,
            reject_unknown_fields: false,
        });
        let mut raw = record();
        raw["GeneticRisk"] = json!(7);
        raw["Height"] = json!(170);

        let features = extractor.build(&raw).unwrap();
        assert_eq!(features[4], 7.0);
    }

    #[test]
    fn test_non_object_rejected() {
        let err = FeatureExtractor::default().build(&json!([1, 2, 3])).unwrap_err();
        assert!(err.names("$record"));
    }

    #[test]
    fn test_feature_names_match_fields() {
        let names: Vec<&str> = FIELDS.iter().map(|f| f.name).collect();
        assert_eq!(names, FEATURE_NAMES);
    }
}
