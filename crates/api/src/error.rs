//! API error types with HTTP response mapping.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use common::Entity;
use domain::{DomainError, InvalidReason};
use reporting::ReportError;
use sales::{SaleError, TransactionFailure};
use serde_json::{Value, json};
use store::StoreError;

/// API-level error type that maps to HTTP responses.
///
/// Every body carries an `error` kind clients can branch on, a human
/// readable `message`, and the structured details of the failure.
#[derive(Debug)]
pub enum ApiError {
    /// A record referenced by the request does not exist.
    NotFound { entity: Entity, id: i64 },
    /// Field-level validation failed.
    Invalid(InvalidReason),
    /// The body, path or query could not be parsed into the expected shape.
    Malformed { status: StatusCode, message: String },
    /// Sale submission failed.
    Sale(SaleError),
    /// Missing or wrong credentials.
    Unauthorized,
    /// Storage failure outside a sale submission.
    Store(StoreError),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String, Value) {
        match self {
            ApiError::NotFound { entity, id } => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("{entity} not found: {id}"),
                json!({ "entity": entity, "id": id }),
            ),
            ApiError::Invalid(reason) => invalid(*reason),
            ApiError::Malformed { status, message } => {
                (*status, "malformed_request", message.clone(), json!({}))
            }
            ApiError::Sale(err) => sale_error_parts(err),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "valid credentials are required".to_string(),
                json!({}),
            ),
            ApiError::Store(err) => (
                if err.is_transient() {
                    StatusCode::SERVICE_UNAVAILABLE
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                },
                "internal",
                err.to_string(),
                json!({}),
            ),
        }
    }
}

fn invalid(reason: InvalidReason) -> (StatusCode, &'static str, String, Value) {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        "invalid_request",
        format!("Invalid request: {reason}"),
        json!({ "reason": reason }),
    )
}

fn sale_error_parts(err: &SaleError) -> (StatusCode, &'static str, String, Value) {
    let message = err.to_string();
    match err {
        SaleError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            err.kind(),
            message,
            json!({ "entity": entity, "id": id }),
        ),
        SaleError::InvalidRequest(reason) => invalid(*reason),
        SaleError::InsufficientStock {
            product_id,
            available,
            requested,
        } => (
            StatusCode::CONFLICT,
            err.kind(),
            message,
            json!({
                "product_id": product_id,
                "available": available,
                "requested": requested,
            }),
        ),
        SaleError::TransactionFailed(failure) => {
            let (status, cause) = match failure {
                TransactionFailure::Timeout(_) => (StatusCode::SERVICE_UNAVAILABLE, "timeout"),
                TransactionFailure::RetriesExhausted { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "retries_exhausted")
                }
                TransactionFailure::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store"),
            };
            (status, err.kind(), message, json!({ "cause": cause }))
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message, details) = self.parts();

        if status.is_server_error() {
            tracing::error!(error = %message, kind, "request failed");
        }

        let mut body = json!({ "error": kind, "message": message });
        if let (Some(body), Value::Object(details)) = (body.as_object_mut(), details) {
            body.extend(details);
        }

        let mut response = (status, axum::Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                header::HeaderValue::from_static("Basic realm=\"sales\""),
            );
        }
        response
    }
}

impl From<SaleError> for ApiError {
    fn from(err: SaleError) -> Self {
        ApiError::Sale(err)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Invalid(err.reason())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => ApiError::NotFound { entity, id },
            other => ApiError::Store(other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Malformed {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Malformed {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Malformed {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::Store(err) => err.into(),
        }
    }
}
