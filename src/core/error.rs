use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Where role-mismatched actors are sent instead of an error page.
const NEUTRAL_PAGE: &str = "/";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(&'static str),
    #[error("authentication required")]
    Unauthenticated,
    /// Actor's role does not permit the action. Surfaced as a silent
    /// redirect to a neutral page, never as a mutation.
    #[error("insufficient role")]
    Forbidden,
    #[error("{0}")]
    Conflict(&'static str),
    #[error("{0}")]
    BadRequest(&'static str),
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
}

impl ApiError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Unauthenticated => "unauthenticated",
            Self::Forbidden => "forbidden",
            Self::Conflict(_) => "conflict",
            Self::BadRequest(_) => "bad_request",
            Self::Database(_) | Self::Pool(_) => "internal_error",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::SEE_OTHER,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Database(_) | Self::Pool(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Database(e) => {
                log::error!("database error: {e}");
                "an internal error occurred".to_string()
            }
            Self::Pool(e) => {
                log::error!("connection pool error: {e}");
                "an internal error occurred".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if matches!(self, Self::Forbidden) {
            return Redirect::to(NEUTRAL_PAGE).into_response();
        }
        let status = self.status_code();
        let body = Json(json!({
            "error": self.error_code(),
            "message": self.message(),
        }));
        (status, body).into_response()
    }
}
