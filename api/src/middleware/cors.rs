use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ACCESS_CONTROL_EXPOSE_HEADERS, ACCESS_CONTROL_MAX_AGE, ORIGIN, VARY,
};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tcm_core::OriginAllowList;
use tcm_core::cors::{ALLOW_HEADERS, ALLOW_METHODS, EXPOSE_HEADERS, PREFLIGHT_MAX_AGE_SECS};

/// CORS policy shared by every route: one allow-list, resolved per request.
#[derive(Debug, Clone, Default)]
pub struct CorsPolicy {
    allow_list: Arc<OriginAllowList>,
}

impl CorsPolicy {
    pub fn new(allow_list: OriginAllowList) -> Self {
        Self {
            allow_list: Arc::new(allow_list),
        }
    }

    /// Build the policy from `TCM_CORS_ORIGINS` (comma-separated; empty allows any origin).
    pub fn from_env() -> Self {
        let raw = std::env::var("TCM_CORS_ORIGINS").unwrap_or_default();
        let allow_list = OriginAllowList::parse(&raw);
        if allow_list.is_empty() {
            tracing::warn!("TCM_CORS_ORIGINS is empty; every origin is allowed");
        } else {
            tracing::info!(entries = allow_list.entries().len(), "CORS allow-list loaded");
        }
        Self::new(allow_list)
    }
}

/// Resolve the request origin and attach CORS headers.
///
/// `OPTIONS` requests are answered here with `204` and never reach a route.
pub async fn apply(State(policy): State<CorsPolicy>, req: Request, next: Next) -> Response {
    let resolved = match req.headers().get(ORIGIN).map(|v| v.to_str()) {
        None | Some(Ok("")) => policy.allow_list.resolve(None),
        Some(Ok(origin)) => {
            let resolved = policy.allow_list.resolve(Some(origin));
            if resolved.is_none() {
                tracing::debug!(origin, "CORS origin rejected");
            }
            resolved
        }
        // Present but not visible ASCII: never fall back to the first entry.
        Some(Err(_)) => {
            tracing::debug!("CORS origin rejected: header is not valid text");
            None
        }
    };

    if req.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        let headers = response.headers_mut();
        insert_cors_headers(headers, resolved.as_deref());
        headers.insert(
            ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from(PREFLIGHT_MAX_AGE_SECS),
        );
        return response;
    }

    let mut response = next.run(req).await;
    insert_cors_headers(response.headers_mut(), resolved.as_deref());
    response
}

fn insert_cors_headers(headers: &mut HeaderMap, allow_origin: Option<&str>) {
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    headers.insert(
        ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static(EXPOSE_HEADERS),
    );

    let Some(origin) = allow_origin else {
        return;
    };
    // Origins that are not valid header text are treated as rejected.
    let Ok(value) = HeaderValue::from_str(origin) else {
        return;
    };
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
    if origin != "*" {
        headers.append(VARY, HeaderValue::from_static("Origin"));
    }
}
