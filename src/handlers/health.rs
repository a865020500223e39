use axum::{extract::State, http::StatusCode};
use std::sync::Arc;

use crate::AppState;

pub async fn health_check() -> &'static str {
    "OK"
}

/// Ready only while the Genie space connection handle is usable
pub async fn ready_check(State(state): State<Arc<AppState>>) -> (StatusCode, &'static str) {
    if state.genie_service.is_connected() {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::api_router;
    use crate::services::genie::GenieService;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_and_ready_when_disconnected() {
        let router = api_router(Arc::new(AppState::new(Arc::new(GenieService::disconnected("s")))));

        let response = router
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"OK");

        let response = router
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
