//! HTTP mapping of the crate error type
//!
//! Every error leaves the API as `{ "code": ..., "message": ... }` with the
//! status of its action code. Internal errors are logged here and reach the
//! client only as a generic message.

use crate::errors::{ActionErrorCode, Error};
use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

impl ActionErrorCode {
    /// HTTP status an action code is reported with.
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::ValidationError => StatusCode::BAD_REQUEST,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let code = self.code();
        let message = match code {
            ActionErrorCode::InternalError => {
                tracing::error!(error = %self, "Request failed");
                "Internal server error".to_string()
            }
            ActionErrorCode::Unauthorized => {
                tracing::debug!(error = %self, "Request unauthorized");
                match self {
                    Self::Unauthorized { message } => message,
                    _ => "Invalid or expired session".to_string(),
                }
            }
            _ => self.to_string(),
        };
        (
            code.status(),
            Json(json!({ "code": code.as_str(), "message": message })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use http_body_util::BodyExt;

    async fn body_of(error: Error) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_error_bodies() {
        let (status, body) = body_of(Error::validation("Name is too short")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["message"], "Name is too short");

        let (status, body) = body_of(Error::not_found("Order", 7)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Order not found: 7");

        let (status, body) = body_of(Error::Payment {
            message: "card_declined secret detail".to_string(),
        })
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "INTERNAL_ERROR");
        assert_eq!(body["message"], "Internal server error");
    }
}
