use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use portfolio_tracker_core::errors::CoreError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Core(#[from] CoreError),
    #[error("{0}")]
    BadRequest(String),
}

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Core(e) => match e {
                CoreError::Validation(_)
                | CoreError::InvalidRange { .. }
                | CoreError::UnknownTicker(_)
                | CoreError::Deserialization(_) => StatusCode::BAD_REQUEST,
                CoreError::LotNotFound(_) => StatusCode::NOT_FOUND,
                CoreError::DataGap { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                CoreError::Api { .. } | CoreError::Network(_) | CoreError::NoProvider => {
                    StatusCode::BAD_GATEWAY
                }
                CoreError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        }
        let body = Json(ErrorBody {
            code: status.as_u16(),
            message: self.to_string(),
        });
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
