//! Model artifact loader and writer

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

use crate::error::{ArtifactLoadError, SchemaMismatchError};
use crate::models::aggregator::Ensemble;
use crate::models::logistic::LogisticModel;
use crate::models::scaler::{FeatureScale, Scaler};
use crate::models::tree::{DecisionTree, NodeRecord};
use crate::types::FEATURE_NAMES;

/// Persisted ensemble: feature schema plus one flattened node list per tree
#[derive(Debug, Serialize, Deserialize)]
struct EnsembleArtifact {
    n_features: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    feature_names: Vec<String>,
    trees: Vec<TreeArtifact>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TreeArtifact {
    nodes: Vec<NodeRecord>,
}

/// Persisted scaler: one (mean, std) pair per feature
#[derive(Debug, Serialize, Deserialize)]
struct ScalerArtifact {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    feature_names: Vec<String>,
    params: Vec<FeatureScale>,
}

/// Persisted logistic model
#[derive(Debug, Serialize, Deserialize)]
struct LogisticArtifact {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    feature_names: Vec<String>,
    coefficients: Vec<f64>,
    intercept: f64,
}

/// Locations of the artifacts to load at startup
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub ensemble: PathBuf,
    pub scaler: PathBuf,
    pub logistic: Option<PathBuf>,
}

/// Everything the inference engine needs, loaded and validated
#[derive(Debug, Clone)]
pub struct LoadedModels {
    pub ensemble: Ensemble,
    pub scaler: Scaler,
    pub logistic: Option<LogisticModel>,
}

/// Loader for model artifacts, checking each against the patient record schema
pub struct ModelLoader {
    schema: &'static [&'static str],
}

impl ModelLoader {
    /// Create a loader for the patient record feature schema
    pub fn new() -> Self {
        Self {
            schema: &FEATURE_NAMES,
        }
    }

    /// Load the ensemble, the scaler and, when configured, the logistic model
    pub fn load_all(&self, paths: &ArtifactPaths) -> Result<LoadedModels, ArtifactLoadError> {
        let ensemble = self.load_ensemble(&paths.ensemble)?;
        let scaler = self.load_scaler(&paths.scaler)?;
        let logistic = paths
            .logistic
            .as_deref()
            .map(|path| self.load_logistic(path))
            .transpose()?;

        info!(
            trees = ensemble.n_trees(),
            features = ensemble.n_features(),
            logistic = logistic.is_some(),
            "Model artifacts loaded"
        );

        Ok(LoadedModels {
            ensemble,
            scaler,
            logistic,
        })
    }

    /// Load a tree ensemble artifact
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub fn load_ensemble(&self, path: &Path) -> Result<Ensemble, ArtifactLoadError> {
        let artifact: EnsembleArtifact = read_json(path)?;
        self.check_schema("ensemble", artifact.n_features, &artifact.feature_names)?;

        if artifact.trees.is_empty() {
            return Err(ArtifactLoadError::EmptyEnsemble {
                path: path.to_path_buf(),
            });
        }

        let trees = artifact
            .trees
            .iter()
            .enumerate()
            .map(|(index, tree)| DecisionTree::from_nodes(index, &tree.nodes, artifact.n_features))
            .collect::<Result<Vec<_>, _>>()?;

        let max_depth = trees.iter().map(DecisionTree::depth).max().unwrap_or(0);
        debug!(trees = trees.len(), max_depth, "Ensemble parsed");

        Ensemble::new(trees, artifact.n_features).ok_or_else(|| ArtifactLoadError::EmptyEnsemble {
            path: path.to_path_buf(),
        })
    }

    /// Load a scaler artifact
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub fn load_scaler(&self, path: &Path) -> Result<Scaler, ArtifactLoadError> {
        let artifact: ScalerArtifact = read_json(path)?;
        self.check_schema("scaler", artifact.params.len(), &artifact.feature_names)?;
        Scaler::new(artifact.params, self.schema)
    }

    /// Load a logistic model artifact
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub fn load_logistic(&self, path: &Path) -> Result<LogisticModel, ArtifactLoadError> {
        let artifact: LogisticArtifact = read_json(path)?;
        self.check_schema("logistic", artifact.coefficients.len(), &artifact.feature_names)?;
        LogisticModel::new(artifact.coefficients, artifact.intercept, self.schema)
    }

    /// Write an ensemble in the format [`ModelLoader::load_ensemble`] reads
    pub fn write_ensemble(&self, ensemble: &Ensemble, path: &Path) -> Result<(), ArtifactLoadError> {
        let artifact = EnsembleArtifact {
            n_features: ensemble.n_features(),
            feature_names: self.names(),
            trees: ensemble
                .trees()
                .iter()
                .map(|tree| TreeArtifact {
                    nodes: tree.to_nodes(),
                })
                .collect(),
        };
        write_json(&artifact, path)
    }

    /// Write a scaler in the format [`ModelLoader::load_scaler`] reads
    pub fn write_scaler(&self, scaler: &Scaler, path: &Path) -> Result<(), ArtifactLoadError> {
        let artifact = ScalerArtifact {
            feature_names: self.names(),
            params: scaler.params().to_vec(),
        };
        write_json(&artifact, path)
    }

    /// Write a logistic model in the format [`ModelLoader::load_logistic`] reads
    pub fn write_logistic(&self, model: &LogisticModel, path: &Path) -> Result<(), ArtifactLoadError> {
        let artifact = LogisticArtifact {
            feature_names: self.names(),
            coefficients: model.coefficients().to_vec(),
            intercept: model.intercept(),
        };
        write_json(&artifact, path)
    }

    fn names(&self) -> Vec<String> {
        self.schema.iter().map(|name| name.to_string()).collect()
    }

    fn check_schema(
        &self,
        artifact: &'static str,
        n_features: usize,
        names: &[String],
    ) -> Result<(), SchemaMismatchError> {
        if n_features != self.schema.len() {
            return Err(SchemaMismatchError::FeatureCount {
                artifact,
                expected: self.schema.len(),
                found: n_features,
            });
        }
        if names.is_empty() {
            return Ok(());
        }
        if names.len() != self.schema.len() {
            return Err(SchemaMismatchError::FeatureCount {
                artifact,
                expected: self.schema.len(),
                found: names.len(),
            });
        }
        match self
            .schema
            .iter()
            .zip(names)
            .position(|(expected, found)| *expected != found.as_str())
        {
            Some(index) => Err(SchemaMismatchError::FeatureName {
                artifact,
                index,
                expected: self.schema[index].to_string(),
                found: names[index].clone(),
            }),
            None => Ok(()),
        }
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactLoadError> {
    let bytes = std::fs::read(path).map_err(|source| ArtifactLoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| ArtifactLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json<T: Serialize>(artifact: &T, path: &Path) -> Result<(), ArtifactLoadError> {
    let bytes = serde_json::to_vec_pretty(artifact).map_err(|source| ArtifactLoadError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, &bytes).map_err(|source| ArtifactLoadError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), size_bytes = bytes.len(), "Artifact written");
    Ok(())
}
