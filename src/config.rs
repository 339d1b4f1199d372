//! Configuration management for the inference service

use crate::models::loader::ArtifactPaths;
use crate::types::prediction::RiskTierThresholds;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the configuration file path
pub const CONFIG_PATH_ENV: &str = "CANCER_RISK_CONFIG";

/// Model variant answering `POST /predict`
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelVariant {
    /// Random forest ensemble
    #[default]
    Forest,
    /// Logistic regression
    Logistic,
}

impl ModelVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelVariant::Forest => "forest",
            ModelVariant::Logistic => "logistic",
        }
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a variant sees raw features or z-score scaled ones
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScalingMode {
    /// Features go to the model as built from the request
    Raw,
    /// Features pass through the scaler first
    Standardized,
}

/// Log output format
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Newline-delimited JSON
    Json,
    /// Multi-line, human-readable
    #[default]
    Pretty,
    /// Single-line text
    Full,
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8010,
            cors_origins: vec!["*".to_string()],
        }
    }
}

/// Per-variant settings
#[derive(Debug, Clone, Deserialize)]
pub struct VariantConfig {
    /// Feature scaling applied before this variant
    pub scaling: ScalingMode,
}

/// ML models configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Random forest artifact
    pub ensemble_path: PathBuf,
    /// Scaler artifact
    pub scaler_path: PathBuf,
    /// Logistic regression artifact; required when `variant = "logistic"`
    pub logistic_path: Option<PathBuf>,
    /// Variant answering requests
    pub variant: ModelVariant,
    /// Forest settings (raw features by default)
    pub forest: VariantConfig,
    /// Logistic settings (standardized features by default)
    pub logistic: VariantConfig,
    /// Evaluate trees on the rayon pool
    pub parallel_trees: bool,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            ensemble_path: PathBuf::from("models/random_forest.json"),
            scaler_path: PathBuf::from("models/scaler.json"),
            logistic_path: Some(PathBuf::from("models/logistic.json")),
            variant: ModelVariant::Forest,
            forest: VariantConfig {
                scaling: ScalingMode::Raw,
            },
            logistic: VariantConfig {
                scaling: ScalingMode::Standardized,
            },
            parallel_trees: false,
        }
    }
}

impl ModelsConfig {
    /// Artifact locations for the loader
    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths {
            ensemble: self.ensemble_path.clone(),
            scaler: self.scaler_path.clone(),
            logistic: self.logistic_path.clone(),
        }
    }

    /// Scaling mode configured for a variant
    pub fn scaling_for(&self, variant: ModelVariant) -> ScalingMode {
        match variant {
            ModelVariant::Forest => self.forest.scaling,
            ModelVariant::Logistic => self.logistic.scaling,
        }
    }
}

/// Request validation configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Reject values outside each field's declared domain
    pub enforce_ranges: bool,
    /// Reject fields that are not part of the patient record
    pub reject_unknown_fields: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enforce_ranges: true,
            reject_unknown_fields: true,
        }
    }
}

/// Risk tier configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Lower bounds of each risk tier
    pub risk_tiers: RiskTierThresholds,
}

/// Metrics reporting configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Seconds between summary logs; 0 disables the reporter
    pub report_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: 60,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty, full)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl AppConfig {
    /// Load configuration from `$CANCER_RISK_CONFIG` or `config/config.toml`
    pub fn load() -> Result<Self> {
        let path = std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("config/config.toml"));
        Self::load_from_path(path)
    }

    /// Load configuration from a specific path, then apply
    /// `CANCER_RISK__SECTION__KEY` environment overrides
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("CANCER_RISK").separator("__").try_parsing(true))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            models: ModelsConfig::default(),
            validation: ValidationConfig::default(),
            detection: DetectionConfig::default(),
            metrics: MetricsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
