use axum::http::Uri;

use crate::error::AppError;

pub mod health;
pub mod scorers;
pub mod tools;
pub mod workflow;

/// Fallback for unmatched paths: a structured 404 instead of an empty body.
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}
