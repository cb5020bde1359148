use axum::extract::{Request, State};
use axum::http::header::{HOST, LOCATION};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

const HSTS: &str = "max-age=63072000; includeSubDomains";

/// Transport and header hardening applied to every routed response.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityConfig {
    /// Redirect plain-HTTP requests (per `X-Forwarded-Proto`) and send HSTS.
    pub require_https: bool,
}

impl SecurityConfig {
    pub fn from_env() -> Self {
        Self {
            require_https: std::env::var("TCM_REQUIRE_HTTPS")
                .map(|v| v == "true")
                .unwrap_or(false),
        }
    }
}

/// Apply the security-header baseline, redirecting to HTTPS when required.
///
/// The CSP only sets `frame-ancestors` so the Swagger UI keeps working.
pub async fn apply(State(config): State<SecurityConfig>, req: Request, next: Next) -> Response {
    if config.require_https {
        if let Some(location) = https_redirect_target(req.headers(), req.uri()) {
            let mut response = (StatusCode::MOVED_PERMANENTLY, [(LOCATION, location)]).into_response();
            insert_baseline(response.headers_mut(), true);
            return response;
        }
    }

    let mut response = next.run(req).await;
    insert_baseline(response.headers_mut(), config.require_https);
    response
}

/// `Some(https URL)` when a TLS-terminating proxy reports the request came in over HTTP.
fn https_redirect_target(headers: &HeaderMap, uri: &axum::http::Uri) -> Option<String> {
    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("https");
    if !proto.eq_ignore_ascii_case("http") {
        return None;
    }

    let host = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let path_and_query = uri.path_and_query().map_or("/", |pq| pq.as_str());
    let target = format!("https://{host}{path_and_query}");
    target.parse::<axum::http::Uri>().ok().map(|_| target)
}

fn insert_baseline(headers: &mut HeaderMap, hsts: bool) {
    headers.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
    headers.insert(
        "referrer-policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("frame-ancestors 'none'"),
    );
    if hsts {
        headers.insert("strict-transport-security", HeaderValue::from_static(HSTS));
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use axum::{Router, middleware};
    use tower::ServiceExt;

    use super::*;

    async fn ok() -> StatusCode {
        StatusCode::OK
    }

    fn app(require_https: bool) -> Router {
        Router::new().route("/health", get(ok)).layer(middleware::from_fn_with_state(
            SecurityConfig { require_https },
            apply,
        ))
    }

    #[tokio::test]
    async fn apply_adds_security_headers() {
        let response = app(false)
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("request should succeed");

        let headers = response.headers();
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert_eq!(headers["referrer-policy"], "strict-origin-when-cross-origin");
        assert_eq!(headers["x-frame-options"], "DENY");
        assert_eq!(headers["content-security-policy"], "frame-ancestors 'none'");
        assert!(headers.get("strict-transport-security").is_none());
    }

    #[tokio::test]
    async fn plain_http_is_redirected_when_https_is_required() {
        let response = app(true)
            .oneshot(
                Request::builder()
                    .uri("/health?verbose=1")
                    .header("host", "tcm.example")
                    .header("x-forwarded-proto", "http")
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("request should succeed");

        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(
            response.headers()["location"],
            "https://tcm.example/health?verbose=1"
        );
        assert_eq!(response.headers()["strict-transport-security"], HSTS);
    }

    #[tokio::test]
    async fn forwarded_https_passes_through_with_hsts() {
        let response = app(true)
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("x-forwarded-proto", "https")
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("request should succeed");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["strict-transport-security"], HSTS);
    }
}
