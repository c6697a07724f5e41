use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Structured error type for all API handlers.
///
/// Each variant maps to an HTTP status code, a machine-readable code string,
/// and a human-readable message. Implements [`IntoResponse`] so handlers can
/// return `Result<T, ApiError>` directly.
#[derive(Debug)]
pub enum ApiError {
    /// 404 - No route matched.
    NotFound,
    /// 503 - `max_peers` websocket peers are already connected.
    PeerLimitReached(usize),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::PeerLimitReached(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound => "not_found",
            ApiError::PeerLimitReached(_) => "peer_limit_reached",
        }
    }

    pub fn message(&self) -> String {
        match self {
            ApiError::NotFound => "Not found.".to_string(),
            ApiError::PeerLimitReached(max) => {
                format!("Too many coworkers connected (limit {}). Try again later.", max)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": {
                "code": self.code(),
                "message": self.message(),
            }
        });
        (self.status_code(), Json(body)).into_response()
    }
}
