//! HTTP request layer
//!
//! Parses JSON bodies, calls the inference engine and maps its typed errors
//! onto status codes. The engine itself never sees raw bytes.

use crate::config::{AppConfig, ServerConfig};
use crate::error::InferenceError;
use crate::metrics::ServiceMetrics;
use crate::models::inference::InferenceEngine;
use crate::types::{PredictionResponse, RiskTierThresholds};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

/// Shared, read-only state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<InferenceEngine>,
    pub metrics: Arc<ServiceMetrics>,
    pub risk_tiers: Arc<RiskTierThresholds>,
    started: Instant,
}

impl AppState {
    pub fn new(engine: Arc<InferenceEngine>, metrics: Arc<ServiceMetrics>, config: &AppConfig) -> Self {
        Self {
            engine,
            metrics,
            risk_tiers: Arc::new(config.detection.risk_tiers.clone()),
            started: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub model: &'static str,
    pub trees: usize,
    pub features: usize,
    pub uptime_secs: u64,
}

/// One rejected field in an error body
#[derive(Debug, Serialize)]
pub struct FieldErrorBody {
    pub field: String,
    pub reason: String,
}

/// Error response body; `message` is what clients display
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldErrorBody>,
}

/// Failure of a request, carrying its status code
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                message: message.into(),
                errors: Vec::new(),
            },
        }
    }
}

impl From<InferenceError> for ApiError {
    fn from(err: InferenceError) -> Self {
        match &err {
            InferenceError::Validation(validation) => Self {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                body: ErrorBody {
                    message: err.to_string(),
                    errors: validation
                        .violations()
                        .iter()
                        .map(|v| FieldErrorBody {
                            field: v.field.clone(),
                            reason: v.kind.to_string(),
                        })
                        .collect(),
                },
            },
            InferenceError::FeatureCount { .. } | InferenceError::VariantUnavailable(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Build the router with CORS and request tracing
pub fn router(state: AppState, server: &ServerConfig) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/predict", post(predict))
        .layer(cors_layer(server))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origin = if server.cors_origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        let origins: Vec<HeaderValue> = server
            .cors_origins
            .iter()
            .filter_map(|o| match o.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

/// Health check handler
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        model: state.engine.variant().as_str(),
        trees: state.engine.tree_count(),
        features: state.engine.feature_count(),
        uptime_secs: state.uptime_secs(),
    })
}

/// Prediction handler
pub async fn predict(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let request_id = uuid::Uuid::new_v4();
    let start = Instant::now();

    let Json(raw) = body.map_err(|rejection| {
        warn!(%request_id, error = %rejection.body_text(), "Malformed request body");
        state.metrics.record_validation_failure();
        ApiError::from(rejection)
    })?;

    let prediction = match state.engine.infer(&raw) {
        Ok(prediction) => prediction,
        Err(InferenceError::Validation(err)) => {
            warn!(%request_id, error = %err, "Rejected patient record");
            state.metrics.record_validation_failure();
            return Err(InferenceError::Validation(err).into());
        }
        Err(err) => {
            error!(%request_id, error = %err, "Inference failed");
            return Err(err.into());
        }
    };

    let response = PredictionResponse::new(prediction.result, &state.risk_tiers, prediction.variant.as_str());
    let latency = start.elapsed();
    state
        .metrics
        .record_prediction(latency, &prediction.result, response.risk_tier);

    debug!(
        %request_id,
        prediction = response.prediction,
        probability_cancer = response.probability_cancer,
        risk_tier = ?response.risk_tier,
        latency_us = latency.as_micros() as u64,
        "Prediction served"
    );

    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FieldViolation, ValidationError, ViolationKind};

    #[test]
    fn test_validation_error_maps_to_422() {
        let err = InferenceError::Validation(ValidationError::new(vec![FieldViolation {
            field: "BMI".to_string(),
            kind: ViolationKind::Missing,
        }]));

        let api: ApiError = err.into();

        assert_eq!(api.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(api.body.errors.len(), 1);
        assert_eq!(api.body.errors[0].field, "BMI");
        assert_eq!(api.body.errors[0].reason, "missing required field");
        assert!(api.body.message.contains("BMI"));
    }

    #[test]
    fn test_feature_count_maps_to_500() {
        let api: ApiError = InferenceError::FeatureCount { expected: 8, got: 3 }.into();
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(api.body.errors.is_empty());
    }
}
