use axum::response::IntoResponse;

/// Liveness check. Does not touch storage.
pub async fn health_check() -> impl IntoResponse {
    "healthy"
}
