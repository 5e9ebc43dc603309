use crate::errors::{IdentifierKind, QueryBuildError};
use serde::{Deserialize, Serialize};

/// A relation charts may read from, together with the columns that may be bucketed on or
/// summed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartTable {
    pub table: String,
    #[serde(default)]
    pub schema: Option<String>,
    pub date_columns: Vec<String>,
    pub value_columns: Vec<String>,
}

impl ChartTable {
    pub fn new(table: &str, date_columns: &[&str], value_columns: &[&str]) -> ChartTable {
        ChartTable {
            table: table.to_string(),
            schema: None,
            date_columns: date_columns.iter().map(|c| c.to_string()).collect(),
            value_columns: value_columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn with_schema(mut self, schema: &str) -> ChartTable {
        self.schema = Some(schema.to_string());
        self
    }

    pub fn date_column(&self, requested: &str) -> Result<&str, QueryBuildError> {
        find_configured(&self.date_columns, requested)
            .ok_or_else(|| {
                QueryBuildError::invalid_identifier(IdentifierKind::DateColumn, requested)
            })
    }

    pub fn value_column(&self, requested: &str) -> Result<&str, QueryBuildError> {
        find_configured(&self.value_columns, requested).ok_or_else(|| {
            QueryBuildError::invalid_identifier(IdentifierKind::ValueColumn, requested)
        })
    }

    fn validate(&self) -> Result<(), QueryBuildError> {
        check_identifier(IdentifierKind::Table, &self.table)?;
        if let Some(schema) = &self.schema {
            check_identifier(IdentifierKind::Schema, schema)?;
        }
        for c in &self.date_columns {
            check_identifier(IdentifierKind::DateColumn, c)?;
        }
        for c in &self.value_columns {
            check_identifier(IdentifierKind::ValueColumn, c)?;
        }
        Ok(())
    }
}

/// The identifiers that may reach query text. Lookups are ASCII case-insensitive, as
/// unquoted PostgreSQL identifiers are, and always hand back the configured spelling so
/// that text read from chart definitions never ends up in a query.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    tables: Vec<ChartTable>,
}

impl AllowList {
    pub fn new(tables: Vec<ChartTable>) -> Result<AllowList, QueryBuildError> {
        for t in &tables {
            t.validate()?;
        }
        Ok(AllowList { tables })
    }

    pub fn tables(&self) -> &[ChartTable] {
        &self.tables
    }

    pub fn find_table(&self, requested: &str) -> Result<&ChartTable, QueryBuildError> {
        self.tables
            .iter()
            .find(|t| t.table.eq_ignore_ascii_case(requested))
            .ok_or_else(|| QueryBuildError::invalid_identifier(IdentifierKind::Table, requested))
    }
}

fn find_configured<'a>(configured: &'a [String], requested: &str) -> Option<&'a str> {
    configured
        .iter()
        .find(|c| c.eq_ignore_ascii_case(requested))
        .map(|c| c.as_str())
}

/// `[A-Za-z_][A-Za-z0-9_]*`, at most 63 bytes (the PostgreSQL identifier limit).
pub fn is_safe_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    s.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn check_identifier(kind: IdentifierKind, s: &str) -> Result<(), QueryBuildError> {
    if is_safe_identifier(s) {
        Ok(())
    } else {
        Err(QueryBuildError::invalid_identifier(kind, s))
    }
}
