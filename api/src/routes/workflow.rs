use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tcm_core::error::ApiError;
use tcm_core::prompt::{build_consultation_prompt, offline_reply};
use tcm_core::scorers::{ScoreResult, score_all};
use tcm_core::{Intake, PatternAnalysis, RawIntake, analyze, normalize_intake};
use uuid::Uuid;

use crate::error::AppError;
use crate::extract::AppJson;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/workflows/consultation", post(run_consultation))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReplySource {
    /// Generated by the configured language model
    Model,
    /// Composed deterministically from the analysis
    Offline,
}

/// Response for POST /v1/workflows/consultation
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationResponse {
    pub run_id: Uuid,
    /// Intake after normalization (step 1)
    pub intake: Intake,
    /// Deterministic pattern analysis fed into the consultation
    pub analysis: PatternAnalysis,
    /// Consultation reply (step 2)
    pub reply: String,
    pub reply_source: ReplySource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Post-hoc quality scores for `reply`
    pub scores: Vec<ScoreResult>,
    pub generated_at: DateTime<Utc>,
}

/// Run the two-step consultation workflow
///
/// Step 1 normalizes the intake; step 2 runs the pattern scorer, asks the
/// language model for a reply (or composes an offline one), and scores it.
#[utoipa::path(
    post,
    path = "/v1/workflows/consultation",
    request_body = RawIntake,
    responses(
        (status = 200, description = "Consultation reply with analysis and scores", body = ConsultationResponse),
        (status = 400, description = "Invalid intake", body = ApiError),
        (status = 502, description = "Language model unavailable", body = ApiError)
    ),
    tag = "workflows"
)]
pub async fn run_consultation(
    State(state): State<AppState>,
    AppJson(raw): AppJson<RawIntake>,
) -> Result<Json<ConsultationResponse>, AppError> {
    let run_id = Uuid::now_v7();
    let intake = normalize_intake(raw)?;
    let analysis = analyze(&state.catalog, &intake);

    let (reply, reply_source, model) = match &state.llm {
        Some(llm) => {
            let prompt = build_consultation_prompt(&intake, &analysis);
            let completion = llm.complete(&prompt).await?;
            (completion.text, ReplySource::Model, Some(completion.model))
        }
        None => (offline_reply(&analysis), ReplySource::Offline, None),
    };

    let scores = score_all(&analysis, &reply);
    tracing::info!(
        run_id = %run_id,
        primary = %analysis.primary_pattern.id,
        red_flags = analysis.red_flags.len(),
        source = ?reply_source,
        "consultation completed"
    );
    for low in scores.iter().filter(|s| s.score < 1.0) {
        tracing::warn!(run_id = %run_id, scorer = %low.scorer, score = low.score, reason = %low.reason, "consultation reply below quality bar");
    }

    Ok(Json(ConsultationResponse {
        run_id,
        intake,
        analysis,
        reply,
        reply_source,
        model,
        scores,
        generated_at: Utc::now(),
    }))
}
