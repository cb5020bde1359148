use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tcm_core::error::ApiError;
use tcm_core::{PatternAnalysis, PatternDefinition, RawIntake, analyze, normalize_intake};

use crate::error::AppError;
use crate::extract::AppJson;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/tools/pattern-analysis", post(analyze_pattern))
}

pub fn catalog_router() -> Router<AppState> {
    Router::new().route("/v1/patterns", get(list_patterns))
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatternSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub formula_ref: String,
    pub keyword_count: usize,
}

impl From<&PatternDefinition> for PatternSummary {
    fn from(pattern: &PatternDefinition) -> Self {
        Self {
            id: pattern.id.clone(),
            name: pattern.name.clone(),
            description: pattern.description.clone(),
            formula_ref: pattern.formula_ref.clone(),
            keyword_count: pattern.keywords.len(),
        }
    }
}

/// Response for GET /v1/patterns
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatternListResponse {
    /// Patterns in declaration order (the order that breaks score ties)
    pub patterns: Vec<PatternSummary>,
    /// Pattern reported when no keyword matches
    pub fallback: PatternSummary,
    pub red_flag_rules: usize,
}

/// Run the keyword pattern scorer on an intake
///
/// Deterministic: no language model is involved. Blank optional fields are
/// ignored; `keySymptoms` is required.
#[utoipa::path(
    post,
    path = "/v1/tools/pattern-analysis",
    request_body = RawIntake,
    responses(
        (status = 200, description = "Ranked patterns, red flags and suggested focus", body = PatternAnalysis),
        (status = 400, description = "Invalid intake", body = ApiError)
    ),
    tag = "tools"
)]
pub async fn analyze_pattern(
    State(state): State<AppState>,
    AppJson(raw): AppJson<RawIntake>,
) -> Result<Json<PatternAnalysis>, AppError> {
    let intake = normalize_intake(raw)?;
    Ok(Json(analyze(&state.catalog, &intake)))
}

/// List the pattern catalog
#[utoipa::path(
    get,
    path = "/v1/patterns",
    responses(
        (status = 200, description = "Pattern catalog", body = PatternListResponse)
    ),
    tag = "tools"
)]
pub async fn list_patterns(State(state): State<AppState>) -> Json<PatternListResponse> {
    Json(PatternListResponse {
        patterns: state.catalog.patterns().iter().map(PatternSummary::from).collect(),
        fallback: state.catalog.fallback().into(),
        red_flag_rules: state.catalog.red_flags().len(),
    })
}
