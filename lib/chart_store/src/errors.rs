use chart_query::errors::QueryBuildError;
use chart_query::UnknownChartType;
use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChartStoreError {
    #[error(transparent)]
    SqlxError(#[from] sqlx::Error),
    #[error(transparent)]
    PolarsError(#[from] PolarsError),
    #[error(transparent)]
    UnknownChartType(#[from] UnknownChartType),
    #[error(transparent)]
    QueryBuildError(#[from] QueryBuildError),
    #[error("Table `{0}` is not loaded")]
    TableNotLoaded(String),
    #[error("Column `{column}` missing from table `{table}`")]
    ColumnMissing { table: String, column: String },
    #[error("Missing environment variable `{0}`")]
    MissingEnvironmentVariable(String),
    #[error("Invalid value `{value}` for environment variable `{variable}`")]
    InvalidEnvironmentVariable { variable: String, value: String },
}
