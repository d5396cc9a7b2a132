//! Predictive Maintenance Dashboard API
//!
//! HTTP back end for the single-user dashboard: slider metadata, the
//! loaded model's schema, and the predict pipeline.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

mod error;
mod routes;
pub mod settings;

pub use error::DashboardError;
pub use routes::predictions::{run_prediction, PredictResponse};
pub use settings::{DashboardConfig, LogFormat, MismatchPolicy};

use alerting::RiskAssessor;
use feature_reconciler::Reconciler;
use inference_engine::InferenceEngine;
use input_validator::Validator;

/// Process-wide state, built once at startup and shared read-only
pub struct AppContext {
    /// Loaded model
    pub engine: InferenceEngine,
    pub reconciler: Reconciler,
    pub validator: Validator,
    pub assessor: RiskAssessor,
    pub mismatch_policy: MismatchPolicy,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: Instant,
    /// Prometheus handle, when a recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

pub type SharedContext = Arc<AppContext>;

impl AppContext {
    /// Build the context around an already loaded engine
    pub fn new(
        config: &DashboardConfig,
        engine: InferenceEngine,
    ) -> Result<Self, DashboardError> {
        config.check()?;
        let assessor = RiskAssessor::new(config.risk.clone())
            .map_err(|e| DashboardError::Config(e.to_string()))?;

        Ok(Self {
            engine,
            reconciler: Reconciler::new(config.fill_policy()),
            validator: Validator::new(config.inputs.clone()),
            assessor,
            mismatch_policy: config.on_schema_mismatch,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
            metrics: None,
        })
    }

    /// Load the configured model and build the context
    pub fn from_config(config: &DashboardConfig) -> Result<Self, DashboardError> {
        let engine =
            InferenceEngine::load(&config.model_path).map_err(DashboardError::ModelUnavailable)?;
        Self::new(config, engine)
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub model: ModelInfo,
}

/// Loaded model summary
#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub source: String,
    pub feature_count: usize,
    pub classes: Vec<i64>,
}

/// Create the application router
pub fn create_router(ctx: SharedContext) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/schema", get(routes::model::get_schema))
        .route("/api/v1/inputs", get(routes::model::get_inputs))
        .route("/api/v1/predict", post(routes::predictions::post_predict))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

/// Health check handler
async fn health_handler(State(ctx): State<SharedContext>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: ctx.version.clone(),
        uptime_seconds: ctx.start_time.elapsed().as_secs(),
        model: ModelInfo {
            source: ctx.engine.source().to_string(),
            feature_count: ctx.engine.schema().len(),
            classes: ctx.engine.classes().to_vec(),
        },
    })
}

/// Prometheus exposition
async fn metrics_handler(State(ctx): State<SharedContext>) -> impl IntoResponse {
    match &ctx.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed".to_string(),
        ),
    }
}

/// Initialize logging
pub fn init_logging(config: &DashboardConfig) -> Result<(), DashboardError> {
    let level = config.max_level()?;
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    let result = match config.log_format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.finish()),
    };

    if let Err(e) = result {
        eprintln!("Tracing subscriber already set: {}", e);
    }
    Ok(())
}

/// Install the global Prometheus recorder
pub fn install_metrics() -> Result<PrometheusHandle, DashboardError> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| DashboardError::Config(format!("metrics recorder: {}", e)))
}

/// Run the server
pub async fn run_server(ctx: SharedContext, addr: &str) -> Result<(), DashboardError> {
    let app = create_router(ctx);

    info!("Starting dashboard server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
