//! Prediction Routes

use alerting::RiskAssessment;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use feature_reconciler::{FeatureVector, RawInput, ReconcileReport};
use inference_engine::Prediction;
use serde::Serialize;
use tracing::{info, warn};

use crate::{AppContext, DashboardError, SharedContext};

/// Response for the predict endpoint
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub prediction: Prediction,
    pub risk: RiskAssessment,
    /// Row handed to the model
    pub features: FeatureVector,
    pub reconciliation: ReconcileReport,
    /// Non-fatal problems, such as default-filled model columns
    pub warnings: Vec<String>,
    pub latency_us: u64,
}

/// Validate, reconcile, predict and assess one set of readings
pub fn run_prediction(
    ctx: &AppContext,
    input: &RawInput,
) -> Result<PredictResponse, DashboardError> {
    let validation = ctx.validator.validate(input);
    if !validation.valid {
        metrics::counter!("pdm_prediction_errors_total", "kind" => "validation").increment(1);
        return Err(DashboardError::Validation(validation));
    }

    let reconciliation = ctx
        .reconciler
        .reconcile(input, ctx.engine.schema())
        .map_err(|e| {
            metrics::counter!("pdm_prediction_errors_total", "kind" => "schema_mismatch")
                .increment(1);
            DashboardError::SchemaMismatch(e)
        })?;

    let mut warnings = Vec::new();
    if !reconciliation.report.defaulted.is_empty() {
        let fill = ctx.reconciler.fill_policy().fill_value().unwrap_or(0.0);
        warn!(
            "Model columns not supplied by inputs, filled with {}: {:?}",
            fill, reconciliation.report.defaulted
        );
        warnings.push(format!(
            "Missing features filled with {}: {}",
            fill,
            reconciliation.report.defaulted.join(", ")
        ));
    }

    let result = ctx.engine.predict(&reconciliation.vector).map_err(|e| {
        metrics::counter!("pdm_prediction_errors_total", "kind" => "prediction_failure")
            .increment(1);
        DashboardError::PredictionFailure(e)
    })?;

    let risk = ctx.assessor.assess(&result.prediction);

    let level = match risk.level {
        alerting::RiskLevel::High => "high",
        alerting::RiskLevel::Low => "low",
    };
    metrics::counter!("pdm_predictions_total", "risk" => level).increment(1);
    metrics::histogram!("pdm_inference_latency_seconds")
        .record(result.latency_us as f64 / 1e6);

    info!(
        "Prediction for type {}: {} ({:.2}%)",
        input.machine_type, level, risk.failure_probability_pct
    );

    Ok(PredictResponse {
        prediction: result.prediction,
        risk,
        features: reconciliation.vector,
        reconciliation: reconciliation.report,
        warnings,
        latency_us: result.latency_us,
    })
}

/// Run a prediction
pub async fn post_predict(
    State(ctx): State<SharedContext>,
    payload: Result<Json<RawInput>, JsonRejection>,
) -> Result<Json<PredictResponse>, DashboardError> {
    let Json(input) = payload?;
    run_prediction(&ctx, &input).map(Json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::context;
    use crate::{create_router, DashboardConfig, MismatchPolicy};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use feature_reconciler::{MachineType, Schema};
    use tower::ServiceExt;

    async fn post(ctx: SharedContext, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let response = create_router(ctx)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/predict")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null))
    }

    fn readings(torque: f64) -> serde_json::Value {
        serde_json::json!({
            "machine_type": "M",
            "air_temperature_k": 300.0,
            "process_temperature_k": 310.0,
            "rotational_speed_rpm": 1500,
            "torque_nm": torque,
            "tool_wear_min": 100
        })
    }

    #[tokio::test]
    async fn test_low_risk_prediction() {
        let ctx = context(&DashboardConfig::default(), Schema::canonical());
        let (status, json) = post(ctx, readings(40.0)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["risk"]["level"], "low");
        assert_eq!(
            json["risk"]["message"],
            "Low Risk: Machine Operating Normally. (Failure Probability: 10.00%)"
        );
        assert_eq!(json["features"]["Type_M"], 1.0);
        assert_eq!(json["features"]["Type_H"], 0.0);
        assert_eq!(json["features"]["Rotational speed [rpm]"], 1500.0);
        assert_eq!(json["warnings"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_high_risk_prediction() {
        let ctx = context(&DashboardConfig::default(), Schema::canonical());
        let (status, json) = post(ctx, readings(75.0)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["risk"]["level"], "high");
        assert_eq!(json["prediction"]["label"], 1);
        let pct = json["risk"]["failure_probability_pct"].as_f64().unwrap();
        assert!((pct - 80.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_out_of_range_rejected() {
        let ctx = context(&DashboardConfig::default(), Schema::canonical());
        let (status, json) = post(ctx, readings(95.0)).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["error"], "validation");
        assert_eq!(json["details"][0]["kind"], "out_of_range");
        assert_eq!(json["details"][0]["field"], "torque");
    }

    #[tokio::test]
    async fn test_unknown_machine_type_rejected() {
        let ctx = context(&DashboardConfig::default(), Schema::canonical());
        let mut body = readings(40.0);
        body["machine_type"] = "X".into();
        let (status, json) = post(ctx, body).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["error"], "invalid_request");
        assert!(json["message"].as_str().unwrap().contains("machine_type"));
        assert_eq!(json["details"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_missing_field_uses_error_body() {
        let ctx = context(&DashboardConfig::default(), Schema::canonical());
        let mut body = readings(40.0);
        body.as_object_mut().unwrap().remove("torque_nm");
        let (status, json) = post(ctx, body).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["error"], "invalid_request");
        assert!(json["message"].as_str().unwrap().contains("torque_nm"));
    }

    fn schema_with_extras() -> Schema {
        Schema::new([
            "Air temperature [K]",
            "Process temperature [K]",
            "Rotational speed [rpm]",
            "Torque [Nm]",
            "Tool wear [min]",
            "Type_L",
            "Type_M",
            "RNF",
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn test_unmapped_column_proceeds_with_warning() {
        let ctx = context(&DashboardConfig::default(), schema_with_extras());
        let (status, json) = post(ctx, readings(40.0)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["features"]["RNF"], 0.0);
        assert!(json["features"].get("Type_H").is_none());
        assert_eq!(json["reconciliation"]["defaulted"], serde_json::json!(["RNF"]));
        assert_eq!(json["reconciliation"]["unused"][0], "Type_H");
        assert_eq!(json["warnings"][0], "Missing features filled with 0: RNF");
    }

    #[tokio::test]
    async fn test_unmapped_column_aborts_when_configured() {
        let config = DashboardConfig {
            on_schema_mismatch: MismatchPolicy::Abort,
            ..Default::default()
        };
        let ctx = context(&config, schema_with_extras());
        let (status, json) = post(ctx, readings(40.0)).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"], "schema_mismatch");
        assert_eq!(json["details"]["missing_columns"], serde_json::json!(["RNF"]));
    }

    #[test]
    fn test_run_prediction_directly() {
        let ctx = context(&DashboardConfig::default(), Schema::canonical());
        let input = RawInput {
            machine_type: MachineType::High,
            ..Default::default()
        };
        let response = run_prediction(&ctx, &input).unwrap();
        assert_eq!(response.features.get("Type_H"), Some(1.0));
        assert!(!response.prediction.failed);
        assert!(response.reconciliation.is_exact());
    }
}
