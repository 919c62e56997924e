pub mod analytics;
pub mod clock;
pub mod config;
pub mod dashboard;
pub mod demo;
pub mod domain;
pub mod error;
pub mod export;
pub mod normalize;
pub mod persist;
pub mod query;
pub mod storage;
pub mod store;
pub mod summary;
pub mod validate;

#[cfg(test)]
mod tests {
    use super::error::{AppError, ErrorKind};

    #[test]
    fn app_error_is_structured() {
        let err = AppError::new("STORAGE_WRITE_FAILED", "write failed").with_retryable(true);
        assert_eq!(err.code, "STORAGE_WRITE_FAILED");
        assert_eq!(err.message, "write failed");
        assert!(err.retryable);
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert_eq!(err.to_string(), "[STORAGE_WRITE_FAILED] write failed");
    }

    #[test]
    fn error_kinds_follow_code_prefixes() {
        assert_eq!(
            AppError::new("VALIDATION_REQUIRED_FIELD", "x").kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            AppError::new("INCIDENT_NOT_FOUND", "x").kind(),
            ErrorKind::NotFound
        );
        assert_eq!(AppError::new("INPUT_DATE_UNPARSEABLE", "x").kind(), ErrorKind::Input);
        assert_eq!(AppError::new("SOMETHING_ELSE", "x").kind(), ErrorKind::Other);
    }
}
