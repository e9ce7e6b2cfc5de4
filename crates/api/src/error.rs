//! API error types with HTTP response mapping.

use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;
use serde::Serialize;

/// Field name to failure reason.
pub type FieldErrors = BTreeMap<String, String>;

const INTERNAL_MESSAGE: &str = "internal server error";

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Request body failed validation.
    Validation(FieldErrors),
    /// Missing, invalid or foreign credentials.
    Unauthorized(String),
    /// Domain logic error.
    Domain(DomainError),
}

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<FieldErrors>,
}

impl ApiError {
    pub fn unauthorized() -> Self {
        ApiError::Unauthorized("unauthorized".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, data) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::Validation(fields) => (
                StatusCode::BAD_REQUEST,
                "invalid request body".to_string(),
                Some(fields),
            ),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            ApiError::Domain(err) => {
                let (status, message) = domain_error_to_response(err);
                (status, message, None)
            }
        };

        let body = ErrorBody {
            code: status.as_u16(),
            message,
            data,
        };
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    match &err {
        DomainError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        DomainError::Conflict(_) => (StatusCode::CONFLICT, err.to_string()),
        DomainError::InvalidInput(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        DomainError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, err.to_string()),
        DomainError::Store(_) | DomainError::Crypto(_) => {
            tracing::error!(error = %err, "internal server error");
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string())
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<storage::QueryError> for ApiError {
    fn from(err: storage::QueryError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use storage::StoreError;

    use super::*;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn store_errors_do_not_leak() {
        let err = ApiError::from(DomainError::Store(StoreError::Unavailable(
            "connection refused at 10.0.0.3".to_string(),
        )));
        let (status, json) = body_json(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["code"], 500);
        assert_eq!(json["message"], "internal server error");
        assert!(json.get("data").is_none());
    }

    #[tokio::test]
    async fn bad_requests_have_no_data() {
        let err = ApiError::BadRequest("page must be a positive integer".to_string());
        let (status, json) = body_json(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "page must be a positive integer");
        assert!(json.get("data").is_none());
    }

    #[tokio::test]
    async fn validation_errors_carry_fields() {
        let mut fields = FieldErrors::new();
        fields.insert("email".to_string(), "must be a valid email".to_string());
        let (status, json) = body_json(ApiError::Validation(fields)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], 400);
        assert_eq!(json["data"]["email"], "must be a valid email");
    }

    #[tokio::test]
    async fn domain_errors_map_to_status() {
        let cases = [
            (DomainError::NotFound("book"), StatusCode::NOT_FOUND),
            (DomainError::conflict("taken"), StatusCode::CONFLICT),
            (DomainError::invalid("bad"), StatusCode::BAD_REQUEST),
            (DomainError::unauthorized("no"), StatusCode::UNAUTHORIZED),
        ];
        for (err, expected) in cases {
            let (status, json) = body_json(err.into()).await;
            assert_eq!(status, expected);
            assert_eq!(json["code"], expected.as_u16());
        }
    }
}
