//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing reference: {kind} '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("invalid primary key: controller {controller} column {column}")]
    InvalidPrimaryKey { controller: String, column: String },
    #[error("duplicate controller: {0}")]
    DuplicateController(String),
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("{0} has not been configured to use record select")]
    MisconfiguredTarget(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("cannot cast '{value}' to {expected} for column {column}")]
    TypeCoercion {
        column: String,
        value: String,
        expected: String,
    },
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("template: {0}")]
    Template(String),
    #[error("serialization: {0}")]
    Serialization(String),
    #[error("notify hook: {0}")]
    Hook(String),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            AppError::TypeCoercion { .. } => (StatusCode::BAD_REQUEST, "type_coercion"),
            AppError::Db(e) => {
                if let sqlx::Error::RowNotFound = e {
                    (StatusCode::NOT_FOUND, "not_found")
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, "database_error")
                }
            }
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Template(_) => (StatusCode::INTERNAL_SERVER_ERROR, "template_error"),
            AppError::Serialization(_) => (StatusCode::INTERNAL_SERVER_ERROR, "serialization_error"),
            AppError::Hook(_) => (StatusCode::INTERNAL_SERVER_ERROR, "hook_error"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let details = match &self {
            AppError::TypeCoercion { column, expected, .. } => Some(serde_json::json!({
                "column": column,
                "expected": expected,
            })),
            _ => None,
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coercion_maps_to_bad_request() {
        let err = AppError::TypeCoercion {
            column: "age".into(),
            value: "abc".into(),
            expected: "integer".into(),
        };
        assert_eq!(err.status_and_code(), (StatusCode::BAD_REQUEST, "type_coercion"));
        assert_eq!(err.to_string(), "cannot cast 'abc' to integer for column age");
    }

    #[test]
    fn row_not_found_maps_to_404() {
        let err = AppError::Db(sqlx::Error::RowNotFound);
        assert_eq!(err.status_and_code().0, StatusCode::NOT_FOUND);
    }

    #[test]
    fn misconfigured_target_message_names_controller() {
        let err: AppError = ConfigError::MisconfiguredTarget("admin/users".into()).into();
        assert_eq!(err.to_string(), "admin/users has not been configured to use record select");
        assert_eq!(err.status_and_code().0, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
