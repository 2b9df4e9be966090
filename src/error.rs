use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;

use crate::validation::ValidationError;

/// Failure of an account workflow, as seen by the request boundary.
#[derive(Error, Debug)]
pub enum AccountError {
    #[error("Validation fails")]
    Validation(#[from] ValidationError),
    #[error("Account already exists.")]
    Conflict,
    #[error("Password does not match")]
    Authentication,
    #[error("Account not found")]
    NotFound,
    #[error("Internal error")]
    Internal(String),
}

/// Machine-readable tag carried next to the human message.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Conflict,
    Authentication,
    NotFound,
    Internal,
}

impl AccountError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Conflict => ErrorKind::Conflict,
            Self::Authentication => ErrorKind::Authentication,
            Self::NotFound => ErrorKind::NotFound,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// HTTP status used when the error crosses an HTTP boundary.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Conflict => StatusCode::BAD_REQUEST,
            Self::Authentication => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Errors raised by a persistence backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Unique constraint violated: {0}")]
    Constraint(String),
    #[error("Record not found")]
    NotFound,
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for AccountError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Constraint(_) => AccountError::Conflict,
            StoreError::NotFound => AccountError::NotFound,
            StoreError::Backend(msg) => AccountError::Internal(msg),
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum CredentialError {
    #[error("Password hashing failed: {0}")]
    HashFailed(String),
}

impl From<CredentialError> for AccountError {
    fn from(err: CredentialError) -> Self {
        AccountError::Internal(err.to_string())
    }
}

pub type AccountResult<T> = Result<T, AccountError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AccountError::Conflict.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AccountError::Authentication.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AccountError::Internal("db down".to_string()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_store_constraint_becomes_conflict() {
        let err: AccountError = StoreError::Constraint("alice@example.com".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.to_string(), "Account already exists.");
    }

    #[test]
    fn test_internal_detail_is_not_in_message() {
        let err: AccountError = StoreError::Backend("io: disk full".to_string()).into();
        assert_eq!(err.to_string(), "Internal error");
    }
}
