use chrono::{DateTime, Utc};
use std::fmt::{Display, Formatter};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Table,
    Schema,
    DateColumn,
    ValueColumn,
    ChartsTable,
}

impl Display for IdentifierKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentifierKind::Table => write!(f, "table"),
            IdentifierKind::Schema => write!(f, "schema"),
            IdentifierKind::DateColumn => write!(f, "date column"),
            IdentifierKind::ValueColumn => write!(f, "value column"),
            IdentifierKind::ChartsTable => write!(f, "charts table"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum QueryBuildError {
    #[error("Identifier `{value}` is not an allowed {kind}")]
    InvalidIdentifier { kind: IdentifierKind, value: String },
    #[error("Bucket size `{0}` is not one of day, week, month")]
    InvalidBucket(String),
    #[error("Window start {start} is after window end {end}")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl QueryBuildError {
    pub(crate) fn invalid_identifier(kind: IdentifierKind, value: &str) -> QueryBuildError {
        QueryBuildError::InvalidIdentifier {
            kind,
            value: value.to_string(),
        }
    }
}
