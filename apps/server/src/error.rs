use allfi_exchange_rate::RateError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "code": self.code,
            "message": self.message,
        }));
        (self.status, body).into_response()
    }
}

impl From<RateError> for ApiError {
    fn from(err: RateError) -> Self {
        let (status, code) = match &err {
            RateError::NoProvider { .. } | RateError::Exhausted { .. } => {
                (StatusCode::NOT_FOUND, "RATE_NOT_FOUND")
            }
            RateError::BatchFailed => (StatusCode::BAD_GATEWAY, "RATES_UNAVAILABLE"),
            RateError::Cancelled => (StatusCode::SERVICE_UNAVAILABLE, "CANCELLED"),
            RateError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG"),
            _ => (StatusCode::BAD_GATEWAY, "UPSTREAM"),
        };
        Self {
            status,
            code,
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL",
            message: err.to_string(),
        }
    }
}
