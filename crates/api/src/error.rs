use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use courtside_models::CourtsideError;
use tracing::error;

use crate::routes::ApiResponse;

/// Domain error carried out of a handler.
#[derive(Debug)]
pub struct ApiError(pub CourtsideError);

impl From<CourtsideError> for ApiError {
    fn from(err: CourtsideError) -> Self {
        Self(err)
    }
}

pub fn status_for(err: &CourtsideError) -> StatusCode {
    match err {
        CourtsideError::UpstreamDataUnavailable { .. } => StatusCode::BAD_GATEWAY,
        CourtsideError::SchemaMismatch { .. } | CourtsideError::NotLoaded => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        CourtsideError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        CourtsideError::NotFound(_) | CourtsideError::ArtifactNotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            error!(error = %self.0, kind = self.0.kind(), "Request failed");
        }

        let body = ApiResponse::<()> {
            success: false,
            data: None,
            message: Some(self.0.to_string()),
            error: Some(self.0.kind().to_string()),
            pagination: None,
        };
        (status, Json(body)).into_response()
    }
}
