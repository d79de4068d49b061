use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

use crate::upstream::UpstreamError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("upstream unavailable: {0}")]
    Upstream(UpstreamError),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),
}

impl From<UpstreamError> for ApiError {
    fn from(e: UpstreamError) -> Self {
        match e {
            UpstreamError::InvalidRequest(msg) => ApiError::BadRequest(msg),
            other => ApiError::Upstream(other),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        if let ApiError::Upstream(e) = &self {
            tracing::error!("❌ upstream error while serving request: {}", e);
        }

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let upstream = ApiError::from(UpstreamError::Status {
            status: 500,
            body: "boom".into(),
        });
        assert_eq!(upstream.into_response().status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            ApiError::NotFound("week 9".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::BadRequest("bad sort".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_rejected_upstream_request_is_a_bad_request() {
        let err = ApiError::from(UpstreamError::InvalidRequest("invalid challenge id \"..\"".into()));
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
