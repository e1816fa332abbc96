use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::time::Duration;
use tokio::time::timeout;

use super::data_source::*;

const READY_CHECK_TIMEOUT: Duration = Duration::from_secs(3);

#[tracing::instrument]
pub async fn handler(data_src: StateDataSource) -> Response {
    let outcome = timeout(READY_CHECK_TIMEOUT, data_src.is_ready())
        .await
        .unwrap_or(Err(DataSourceError::TimedOut));

    match outcome {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({"status": "ok"}))).into_response(),
        Err(e) => {
            tracing::debug!(reason = %e, "not ready");
            let msg = serde_json::json!({"status": "failure", "message": e.to_string()});
            (StatusCode::SERVICE_UNAVAILABLE, Json(msg)).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    use crate::http_server::health::data_source::tests::*;

    async fn status_of(mock: MockReadiness) -> StatusCode {
        handler(StateDataSource::new(Arc::new(mock))).await.status()
    }

    #[tokio::test]
    async fn test_handler_direct() {
        assert_eq!(status_of(MockReadiness::Ready).await, StatusCode::OK);
        assert_eq!(
            status_of(MockReadiness::DependencyFailure).await,
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(MockReadiness::ShuttingDown).await,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_check_times_out() {
        assert_eq!(
            status_of(MockReadiness::Hanging).await,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
