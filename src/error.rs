//! Error types for artifact loading and per-request inference.

use std::fmt;
use std::path::PathBuf;

/// Errors raised while loading or writing model artifacts.
///
/// Every variant is fatal at startup: the service never begins serving
/// requests once one of these has been returned.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactLoadError {
    /// Returned when the artifact file cannot be read.
    #[error("failed to read artifact from {path}")]
    Read {
        /// Path to the artifact file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the artifact file is not a valid document.
    #[error("failed to parse artifact {path}")]
    Parse {
        /// Path to the artifact file.
        path: PathBuf,
        /// The underlying serde_json error.
        source: serde_json::Error,
    },

    /// Returned when encoding an artifact fails.
    #[error("failed to serialize artifact for {path}")]
    Serialize {
        /// Path the artifact was going to be written to.
        path: PathBuf,
        /// The underlying serde_json error.
        source: serde_json::Error,
    },

    /// Returned when writing the artifact file fails.
    #[error("failed to write artifact to {path}")]
    Write {
        /// Path to the file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the ensemble artifact contains no trees.
    #[error("ensemble artifact {path} contains no trees")]
    EmptyEnsemble {
        /// Path to the ensemble artifact.
        path: PathBuf,
    },

    /// Returned when a tree's node list does not describe a rooted binary tree.
    #[error("tree {tree}, node {node}: {reason}")]
    InvalidNode {
        /// Zero-based tree position within the ensemble.
        tree: usize,
        /// Zero-based node position within the tree's node list.
        node: usize,
        /// What is wrong with the node.
        reason: String,
    },

    /// Returned when a scaler or logistic parameter is unusable.
    #[error("invalid parameter for feature {feature}: {reason}")]
    InvalidParameter {
        /// Feature name the parameter belongs to.
        feature: String,
        /// What is wrong with the parameter.
        reason: String,
    },

    /// Returned when the configuration requires an artifact that was not given.
    #[error("model variant `{variant}` requires the {artifact} artifact, but no path is configured")]
    MissingArtifact {
        /// The active model variant.
        variant: String,
        /// Which artifact is missing.
        artifact: &'static str,
    },

    /// Returned when two artifacts disagree on the feature schema.
    #[error(transparent)]
    Schema(#[from] SchemaMismatchError),
}

/// Feature schema disagreements between artifacts and the patient record layout.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaMismatchError {
    /// Returned when an artifact's feature count differs from the record's.
    #[error("{artifact} artifact has {found} features, expected {expected}")]
    FeatureCount {
        /// Which artifact disagrees.
        artifact: &'static str,
        /// Feature count of the patient record layout.
        expected: usize,
        /// Feature count found in the artifact.
        found: usize,
    },

    /// Returned when an artifact names its features in a different order.
    #[error("{artifact} artifact names feature {index} `{found}`, expected `{expected}`")]
    FeatureName {
        /// Which artifact disagrees.
        artifact: &'static str,
        /// Zero-based feature position.
        index: usize,
        /// Name expected at that position.
        expected: String,
        /// Name found in the artifact.
        found: String,
    },
}

/// Why a single field of an incoming record was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum ViolationKind {
    /// The field is absent.
    Missing,
    /// The field is present but not of the declared type.
    WrongType {
        /// The declared type, e.g. `"integer"`.
        expected: &'static str,
    },
    /// The value is NaN or infinite.
    NonFinite,
    /// The value lies outside the declared domain.
    OutOfRange {
        /// The offending value.
        value: f64,
        /// Human-readable description of the domain, e.g. `"0 or 1"`.
        domain: &'static str,
    },
    /// The field is not part of the patient record.
    Unknown,
    /// The record itself is not a JSON object.
    NotAnObject,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::Missing => write!(f, "missing required field"),
            ViolationKind::WrongType { expected } => write!(f, "expected {expected}"),
            ViolationKind::NonFinite => write!(f, "value must be finite"),
            ViolationKind::OutOfRange { value, domain } => {
                write!(f, "value {value} out of range, expected {domain}")
            }
            ViolationKind::Unknown => write!(f, "unknown field"),
            ViolationKind::NotAnObject => write!(f, "record must be a JSON object"),
        }
    }
}

/// A rejected field together with the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldViolation {
    /// Field name as it appears in the request body.
    pub field: String,
    /// Why the field was rejected.
    pub kind: ViolationKind,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.kind)
    }
}

/// A malformed patient record. Holds one violation per offending field.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    violations: Vec<FieldViolation>,
}

impl ValidationError {
    pub(crate) fn new(violations: Vec<FieldViolation>) -> Self {
        Self { violations }
    }

    /// All field violations, in patient record order.
    #[must_use]
    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    /// Names of the offending fields.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.violations.iter().map(|v| v.field.as_str())
    }

    /// Return `true` if `field` is among the offending fields.
    #[must_use]
    pub fn names(&self, field: &str) -> bool {
        self.fields().any(|f| f == field)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid patient record")?;
        for (i, violation) in self.violations.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{violation}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Per-request inference failures.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    /// The incoming record failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A raw feature vector had the wrong length.
    #[error("feature vector has {got} features, expected {expected}")]
    FeatureCount {
        /// Feature count the loaded models expect.
        expected: usize,
        /// Length of the vector supplied.
        got: usize,
    },

    /// The requested model variant was not loaded at startup.
    #[error("model variant `{0}` is not loaded")]
    VariantUnavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_lists_every_field() {
        let err = ValidationError::new(vec![
            FieldViolation {
                field: "Age".to_string(),
                kind: ViolationKind::Missing,
            },
            FieldViolation {
                field: "BMI".to_string(),
                kind: ViolationKind::WrongType { expected: "number" },
            },
        ]);

        assert!(err.names("Age"));
        assert!(err.names("BMI"));
        assert!(!err.names("Gender"));
        assert_eq!(
            err.to_string(),
            "invalid patient record: Age: missing required field; BMI: expected number"
        );
    }

    #[test]
    fn test_schema_mismatch_converts_into_load_error() {
        let err: ArtifactLoadError = SchemaMismatchError::FeatureCount {
            artifact: "scaler",
            expected: 8,
            found: 7,
        }
        .into();

        assert!(matches!(err, ArtifactLoadError::Schema(_)));
        assert_eq!(err.to_string(), "scaler artifact has 7 features, expected 8");
    }
}
