// rest_api/src/error.rs

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use models::errors::ClinicalError;
use security::CredentialError;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum RestApiError {
    #[error(transparent)]
    Clinical(#[from] ClinicalError),
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl RestApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            RestApiError::Clinical(err) => match err {
                ClinicalError::NotFound { .. } => StatusCode::NOT_FOUND,
                ClinicalError::Conflict(_) => StatusCode::CONFLICT,
                ClinicalError::Forbidden(_) => StatusCode::FORBIDDEN,
                ClinicalError::InvalidCredentials | ClinicalError::InvalidOrganization => StatusCode::UNAUTHORIZED,
                ClinicalError::Validation(_) => StatusCode::BAD_REQUEST,
                ClinicalError::InvalidTransition { .. } => StatusCode::CONFLICT,
                ClinicalError::OperationFailed(_)
                | ClinicalError::Storage(_)
                | ClinicalError::Serialization(_)
                | ClinicalError::Credential(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            RestApiError::Credential(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RestApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            RestApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for RestApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "Request failed");
            "Operation failed".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "status": "error",
            "message": message,
        }));

        (status, body).into_response()
    }
}

impl From<JsonRejection> for RestApiError {
    fn from(rejection: JsonRejection) -> Self {
        RestApiError::InvalidInput(rejection.body_text())
    }
}

impl From<PathRejection> for RestApiError {
    fn from(rejection: PathRejection) -> Self {
        RestApiError::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for RestApiError {
    fn from(rejection: QueryRejection) -> Self {
        RestApiError::InvalidInput(rejection.body_text())
    }
}

/// `Json` whose rejections use the API error body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(RestApiError))]
pub struct ApiJson<T>(pub T);

impl<T: Serialize> IntoResponse for ApiJson<T> {
    fn into_response(self) -> Response {
        Json(self.0).into_response()
    }
}

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(RestApiError))]
pub struct ApiPath<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(RestApiError))]
pub struct ApiQuery<T>(pub T);

pub type ApiResult<T> = Result<T, RestApiError>;
