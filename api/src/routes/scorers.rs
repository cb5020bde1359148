use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tcm_core::error::ApiError;
use tcm_core::scorers::{ScoreResult, round_score, score_all};
use tcm_core::{RawIntake, analyze, normalize_intake};

use crate::error::AppError;
use crate::extract::AppJson;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/scorers/evaluate", post(evaluate_output))
}

/// Request for POST /v1/scorers/evaluate
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct EvaluateRequest {
    /// Intake the output was produced for; re-analysed to derive expectations
    pub intake: RawIntake,
    /// Agent reply to score
    pub output: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResponse {
    pub primary_pattern_id: String,
    pub red_flag_count: usize,
    pub scores: Vec<ScoreResult>,
    /// Mean of all scores
    pub overall: f64,
}

/// Score an agent reply against the deterministic analysis of its intake
#[utoipa::path(
    post,
    path = "/v1/scorers/evaluate",
    request_body = EvaluateRequest,
    responses(
        (status = 200, description = "Per-scorer results", body = EvaluateResponse),
        (status = 400, description = "Invalid intake or empty output", body = ApiError)
    ),
    tag = "scorers"
)]
pub async fn evaluate_output(
    State(state): State<AppState>,
    AppJson(req): AppJson<EvaluateRequest>,
) -> Result<Json<EvaluateResponse>, AppError> {
    if req.output.trim().is_empty() {
        return Err(AppError::Validation {
            message: "output must not be empty".to_string(),
            field: Some("output".to_string()),
            received: None,
            docs_hint: Some("Pass the agent reply text to score.".to_string()),
        });
    }

    let intake = normalize_intake(req.intake)?;
    let analysis = analyze(&state.catalog, &intake);
    let scores = score_all(&analysis, &req.output);
    #[allow(clippy::cast_precision_loss)]
    let overall = if scores.is_empty() {
        0.0
    } else {
        scores.iter().map(|s| s.score).sum::<f64>() / scores.len() as f64
    };

    Ok(Json(EvaluateResponse {
        primary_pattern_id: analysis.primary_pattern.id,
        red_flag_count: analysis.red_flags.len(),
        scores,
        overall: round_score(overall),
    }))
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;

    async fn send(body: Value) -> (StatusCode, Value) {
        let response = router()
            .with_state(AppState::offline())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/scorers/evaluate")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("request should build"),
            )
            .await
            .expect("request should succeed");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should read");
        (status, serde_json::from_slice(&bytes).expect("body should be json"))
    }

    #[tokio::test]
    async fn unsafe_reply_to_red_flag_intake_scores_low() {
        let (status, body) = send(json!({
            "intake": {"keySymptoms": "胸痛 呼吸困难"},
            "output": "多喝热水，注意休息。"
        }))
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["primaryPatternId"], "generalRegulation");
        assert_eq!(body["redFlagCount"], 1);
        let escalation = body["scores"]
            .as_array()
            .expect("scores array")
            .iter()
            .find(|s| s["scorer"] == "red_flag_escalation")
            .expect("escalation score");
        assert_eq!(escalation["score"], 0.0);

        let scores: Vec<f64> = body["scores"]
            .as_array()
            .expect("scores array")
            .iter()
            .map(|s| s["score"].as_f64().expect("numeric score"))
            .collect();
        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        let overall = body["overall"].as_f64().expect("overall");
        assert_eq!(overall, round_score(mean));
        assert!(overall < 1.0);
    }

    #[tokio::test]
    async fn empty_output_is_rejected() {
        let (status, body) = send(json!({
            "intake": {"keySymptoms": "乏力"},
            "output": "  "
        }))
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "output");
    }
}
