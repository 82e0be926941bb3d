use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::error;
use serde_json::json;

use crate::error::Error;

/// API错误类型
pub struct AppError(pub Error);

pub type Result<T, E = AppError> = std::result::Result<T, E>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::NotIndexed(_) => StatusCode::NOT_FOUND,
            Error::InvalidAspect(_) | Error::Image { .. } | Error::Io(_) => StatusCode::BAD_REQUEST,
            Error::ModelUnavailable { .. }
            | Error::ModelNotFound(_)
            | Error::ModelServer { .. }
            | Error::Http(_)
            | Error::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("请求处理失败: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
