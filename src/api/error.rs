//! HTTP error mapping

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;

use crate::Error;

const MASKED_MESSAGE: &str = "internal server error";

/// Error returned by every handler, rendered as `{"error": "..."}`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.into(),
        }
    }

    /// Classify a repository error
    ///
    /// Not-found never carries the storage key. Internal errors carry the
    /// underlying message only when `expose_internal` is set.
    pub fn from_error(err: Error, expose_internal: bool) -> Self {
        match err {
            Error::NotFound(_) => Self::not_found("item not found"),
            Error::InvalidRequest(msg) => Self::bad_request(msg),
            Error::Timeout(_) => Self {
                status: StatusCode::GATEWAY_TIMEOUT,
                message: err.to_string(),
            },
            other => {
                tracing::error!(error = %other, "Request failed");
                if expose_internal {
                    Self::internal(other.to_string())
                } else {
                    Self::internal(MASKED_MESSAGE)
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

/// JSON body extractor whose rejections use the [`ApiError`] shape
///
/// Syntax errors, type mismatches and a missing `application/json` content
/// type all map to 400.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::bad_request(rejection.body_text())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn status_mapping() {
        let cases = [
            (Error::not_found("items/x.json"), StatusCode::NOT_FOUND),
            (Error::invalid_request("bad id"), StatusCode::BAD_REQUEST),
            (
                Error::Timeout(Duration::from_millis(5)),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (Error::storage("boom"), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from_error(err, true).status, status);
        }
    }

    #[test]
    fn not_found_hides_storage_key() {
        let err = ApiError::from_error(Error::not_found("items/secret.json"), true);
        assert!(!err.message.contains("secret"));
    }

    #[test]
    fn internal_errors_can_be_masked() {
        let exposed = ApiError::from_error(Error::storage("bucket unreachable"), true);
        assert!(exposed.message.contains("bucket unreachable"));

        let masked = ApiError::from_error(Error::storage("bucket unreachable"), false);
        assert_eq!(masked.message, MASKED_MESSAGE);
    }
}
