use chart_query::errors::QueryBuildError;
use chart_store::errors::ChartStoreError;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChartEngineError {
    #[error("Chart `{0}` not found")]
    NotFound(i64),
    #[error(transparent)]
    QueryBuildError(#[from] QueryBuildError),
    #[error("Chart store failure: {0}")]
    ExecutionError(#[from] ChartStoreError),
    #[error("Aggregate query did not finish within {0:?}")]
    QueryTimeout(Duration),
    #[error("Malformed aggregate result: {0}")]
    MalformedResult(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorClass {
    NotFound,
    BadRequest,
    Internal,
}

impl ErrorClass {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorClass::NotFound => 404,
            ErrorClass::BadRequest => 400,
            ErrorClass::Internal => 500,
        }
    }
}

/// What a caller may see of a failure. Store errors are logged server side and never
/// copied in here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub status: u16,
    pub class: ErrorClass,
    pub message: String,
}

impl ChartEngineError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ChartEngineError::NotFound(_) => ErrorClass::NotFound,
            ChartEngineError::QueryBuildError(_) => ErrorClass::BadRequest,
            ChartEngineError::ExecutionError(_)
            | ChartEngineError::QueryTimeout(_)
            | ChartEngineError::MalformedResult(_)
            | ChartEngineError::Config(_) => ErrorClass::Internal,
        }
    }

    pub fn public_message(&self) -> String {
        match self {
            ChartEngineError::NotFound(id) => format!("Chart {} not found", id),
            ChartEngineError::QueryBuildError(e) => match e {
                QueryBuildError::InvalidIdentifier { kind, .. } => {
                    format!("Chart refers to a {} that is not allowed", kind)
                }
                QueryBuildError::InvalidBucket(_) => {
                    "Bucket size must be one of day, week, month".to_string()
                }
                QueryBuildError::InvalidWindow { .. } => {
                    "Window start must not be after window end".to_string()
                }
            },
            ChartEngineError::QueryTimeout(_) => "Chart data took too long to load".to_string(),
            ChartEngineError::ExecutionError(_)
            | ChartEngineError::MalformedResult(_)
            | ChartEngineError::Config(_) => "Chart data could not be loaded".to_string(),
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        let class = self.class();
        ErrorResponse {
            status: class.status_code(),
            class,
            message: self.public_message(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chart_query::errors::IdentifierKind;

    #[test]
    fn test_classes_and_status_codes() {
        assert_eq!(ChartEngineError::NotFound(9).to_response().status, 404);
        let invalid = ChartEngineError::from(QueryBuildError::InvalidIdentifier {
            kind: IdentifierKind::Table,
            value: "users".to_string(),
        });
        assert_eq!(invalid.class(), ErrorClass::BadRequest);
        let bucket = ChartEngineError::from(QueryBuildError::InvalidBucket("year".to_string()));
        assert_eq!(bucket.to_response().status, 400);
        let timeout = ChartEngineError::QueryTimeout(Duration::from_secs(1));
        assert_eq!(timeout.to_response().status, 500);
    }

    #[test]
    fn test_store_error_text_is_not_exposed() {
        let err = ChartEngineError::from(ChartStoreError::ColumnMissing {
            table: "payroll_secret".to_string(),
            column: "salary".to_string(),
        });
        let response = err.to_response();
        assert_eq!(response.class, ErrorClass::Internal);
        assert!(!response.message.contains("payroll_secret"));
        assert!(!response.message.contains("salary"));
        // The server side message still carries the cause
        assert!(err.to_string().contains("payroll_secret"));
    }

    #[test]
    fn test_rejected_identifier_is_not_echoed() {
        let err = ChartEngineError::from(QueryBuildError::InvalidIdentifier {
            kind: IdentifierKind::ValueColumn,
            value: "amount; DROP TABLE charts".to_string(),
        });
        let message = err.public_message();
        assert_eq!(message, "Chart refers to a value column that is not allowed");
    }
}
