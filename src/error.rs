use std::fmt::{self, Display};

use diesel::result::DatabaseErrorKind;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing record, or a record owned by another tenant.
    NotFound,
    Validation,
    Conflict,
    Internal,
}

#[derive(Debug)]
pub struct AppError {
    kind: ErrorKind,
    message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::new(ErrorKind::NotFound, "resource not found")
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn internal<E: Display>(error: E) -> Self {
        Self::new(ErrorKind::Internal, error.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind {
            ErrorKind::NotFound => "not found",
            ErrorKind::Validation => "validation failed",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Internal => "internal error",
        };
        write!(f, "{label}: {}", self.message)
    }
}

impl std::error::Error for AppError {}

impl From<diesel::result::Error> for AppError {
    fn from(value: diesel::result::Error) -> Self {
        match value {
            diesel::result::Error::NotFound => AppError::not_found(),
            diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                AppError::conflict(info.message().to_string())
            }
            _ => AppError::internal(value),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        AppError::internal(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        AppError::internal(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        AppError::internal(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diesel_not_found_maps_to_not_found() {
        let err = AppError::from(diesel::result::Error::NotFound);
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn display_includes_kind_and_message() {
        let err = AppError::validation("title must not be empty");
        assert_eq!(
            err.to_string(),
            "validation failed: title must not be empty"
        );
    }
}
