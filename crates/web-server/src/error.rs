use analytics::AnalyticsError;
use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use correlator::CorrelatorError;
use data_loader::LoaderError;
use query::QueryError;
use serde_json::json;
use series_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("Upload error: {0}")]
    Upload(#[from] LoaderError),
    #[error("Invalid JSON body: {0}")]
    Json(#[from] JsonRejection),
    #[error("Invalid query string: {0}")]
    QueryString(#[from] QueryRejection),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Query(err) => query_status(err),
            AppError::Upload(LoaderError::Io { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Upload(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Json(_) | AppError::QueryString(_) => StatusCode::BAD_REQUEST,
        }
    }
}

fn query_status(err: &QueryError) -> StatusCode {
    match err {
        QueryError::Validation(_) => StatusCode::BAD_REQUEST,
        QueryError::Store(StoreError::InvalidData(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        QueryError::Analytics(err) => analytics_status(err),
        QueryError::Correlator(CorrelatorError::UnknownEvent(_)) => StatusCode::NOT_FOUND,
        QueryError::Correlator(CorrelatorError::WindowOutOfRange { .. }) => {
            StatusCode::BAD_REQUEST
        }
        QueryError::Correlator(CorrelatorError::Analytics(err)) => analytics_status(err),
    }
}

fn analytics_status(err: &AnalyticsError) -> StatusCode {
    match err {
        AnalyticsError::Range { .. }
        | AnalyticsError::EmptyRange { .. }
        | AnalyticsError::InvalidParameters(_) => StatusCode::BAD_REQUEST,
        AnalyticsError::Calculation(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Converts our custom `AppError` into an HTTP response with an `{"error": ...}` body.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = if status.is_server_error() {
            tracing::error!(error = ?self, "Request failed.");
            "An internal error occurred".to_string()
        } else {
            tracing::debug!(error = %self, %status, "Request rejected.");
            self.to_string()
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
