use std::net::SocketAddr;

use axum::Router;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod error;
mod extract;
mod llm;
mod middleware;
mod routes;
mod state;

use middleware::cors::CorsPolicy;
use middleware::request_id::{MakeRequestUuidV7, REQUEST_ID_HEADER};
use middleware::security_headers::SecurityConfig;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "TCM Consultation API",
        version = "0.1.0",
        description = "Intake normalization, keyword pattern analysis, LLM consultation, and reply scoring."
    ),
    paths(
        routes::health::health_check,
        routes::tools::analyze_pattern,
        routes::tools::list_patterns,
        routes::workflow::run_consultation,
        routes::scorers::evaluate_output,
    ),
    components(schemas(
        HealthResponse,
        tcm_core::error::ApiError,
        tcm_core::RawIntake,
        tcm_core::Intake,
        tcm_core::PatternAnalysis,
        tcm_core::PatternMatch,
        tcm_core::scorers::ScoreResult,
        routes::tools::PatternSummary,
        routes::tools::PatternListResponse,
        routes::workflow::ReplySource,
        routes::workflow::ConsultationResponse,
        routes::scorers::EvaluateRequest,
        routes::scorers::EvaluateResponse,
    ))
)]
struct ApiDoc;

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Number of patterns in the loaded catalog (fallback excluded)
    pub patterns: usize,
    /// "model" when a language model is configured, otherwise "offline"
    pub consultation_mode: String,
}

/// Edge settings resolved once at startup.
#[derive(Clone, Default)]
struct EdgeConfig {
    cors: CorsPolicy,
    security: SecurityConfig,
    rate_limit: bool,
}

impl EdgeConfig {
    fn from_env() -> Self {
        Self {
            cors: CorsPolicy::from_env(),
            security: SecurityConfig::from_env(),
            rate_limit: true,
        }
    }
}

fn build_app(app_state: state::AppState, edge: EdgeConfig) -> Router {
    let mut tools = routes::tools::router().merge(routes::scorers::router());
    let mut workflow = routes::workflow::router();
    if edge.rate_limit {
        tools = tools.layer(middleware::rate_limit::tools_layer());
        workflow = workflow.layer(middleware::rate_limit::workflow_layer());
    }

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(routes::health::router())
        .merge(routes::tools::catalog_router())
        .merge(tools)
        .merge(workflow)
        .fallback(routes::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuidV7))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER))
                .layer(axum::middleware::from_fn_with_state(
                    edge.security,
                    middleware::security_headers::apply,
                ))
                // Preflights answered by the CORS layer still pass through the security layer.
                .layer(axum::middleware::from_fn_with_state(
                    edge.cors,
                    middleware::cors::apply,
                )),
        )
        .with_state(app_state)
}

#[tokio::main]
async fn main() {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tcm_api=debug,tcm_core=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let app_state = match state::AppState::from_env() {
        Ok(state) => state,
        Err(err) => {
            tracing::error!(error = %err, "startup failed");
            std::process::exit(1);
        }
    };

    let app = build_app(app_state, EdgeConfig::from_env());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(%addr, error = %err, "failed to bind listener");
            std::process::exit(1);
        }
    };
    tracing::info!("TCM consultation API listening on {}", addr);

    if let Err(err) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    {
        tracing::error!(error = %err, "server terminated");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tcm_core::OriginAllowList;
    use tower::ServiceExt;

    use super::*;

    fn app(allow: &str) -> Router {
        build_app(
            state::AppState::offline(),
            EdgeConfig {
                cors: CorsPolicy::new(OriginAllowList::parse(allow)),
                security: SecurityConfig::default(),
                rate_limit: false,
            },
        )
    }

    #[tokio::test]
    async fn preflight_short_circuits_before_routing() {
        let response = app("https://*.pages.dev")
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/v1/workflows/consultation")
                    .header("origin", "https://449cdfa5.pages.dev")
                    .header("access-control-request-method", "POST")
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("request should succeed");

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "https://449cdfa5.pages.dev"
        );
        assert_eq!(response.headers()["access-control-max-age"], "86400");
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
        assert_eq!(response.headers()["x-frame-options"], "DENY");
        assert_eq!(
            response.headers()["content-security-policy"],
            "frame-ancestors 'none'"
        );
    }

    #[tokio::test]
    async fn routed_response_carries_cors_security_and_request_id_headers() {
        let response = app("https://a.com")
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("origin", "https://a.com")
                    .header("x-request-id", "req-123")
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("request should succeed");

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers["access-control-allow-origin"], "https://a.com");
        assert_eq!(headers["vary"], "Origin");
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert_eq!(headers["x-request-id"], "req-123");

        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should read");
        let body: serde_json::Value = serde_json::from_slice(&bytes).expect("json body");
        assert_eq!(body["status"], "ok");
        assert_eq!(body["consultationMode"], "offline");
    }

    #[tokio::test]
    async fn rejected_origin_still_gets_a_response_without_allow_origin() {
        let response = app("https://a.com")
            .oneshot(
                Request::builder()
                    .uri("/v1/patterns")
                    .header("origin", "https://evil.com")
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("request should succeed");

        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key("access-control-allow-origin"));
    }

    #[tokio::test]
    async fn unknown_path_returns_structured_not_found() {
        let response = app("")
            .oneshot(
                Request::builder()
                    .uri("/v1/unknown")
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("request should succeed");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should read");
        let body: serde_json::Value = serde_json::from_slice(&bytes).expect("json body");
        assert_eq!(body["error"], "not_found");
    }

    #[test]
    fn openapi_document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/v1/patterns",
            "/v1/tools/pattern-analysis",
            "/v1/workflows/consultation",
            "/v1/scorers/evaluate",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
