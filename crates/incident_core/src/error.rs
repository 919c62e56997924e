use serde::{Deserialize, Serialize};
use std::fmt;

/// Single structured error shape used by the core and surfaced by the shell.
///
/// The `code` carries the error kind; see [`AppError::kind`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
    pub retryable: bool,
}

/// Coarse classification derived from an error code prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Storage,
    Config,
    Export,
    Input,
    Other,
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            retryable: false,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn kind(&self) -> ErrorKind {
        let code = self.code.as_str();
        if code.starts_with("VALIDATION_") {
            ErrorKind::Validation
        } else if code.ends_with("_NOT_FOUND") {
            ErrorKind::NotFound
        } else if code.starts_with("STORAGE_") || code.starts_with("DB_") {
            ErrorKind::Storage
        } else if code.starts_with("CONFIG_") {
            ErrorKind::Config
        } else if code.starts_with("EXPORT_") {
            ErrorKind::Export
        } else if code.starts_with("INPUT_") {
            ErrorKind::Input
        } else {
            ErrorKind::Other
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}
