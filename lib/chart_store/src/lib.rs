pub mod errors;
pub mod in_memory;
pub mod postgres;

use crate::errors::ChartStoreError;
use async_trait::async_trait;
use chart_query::query_builder::ParameterizedQuery;
use chart_query::{ChartDefinition, GROUPED_DATE_COLUMN, TOTAL_VALUE_COLUMN};
use polars::prelude::{DataFrame, DataType, NamedFrom, Series, TimeUnit};

/// The relational store behind the charts. Aggregate results come back as a frame with
/// a `grouped_date` datetime column and a `total_value` numeric column.
#[async_trait]
pub trait ChartStore: Send + Sync {
    async fn find_chart(&self, chart_id: i64) -> Result<Option<ChartDefinition>, ChartStoreError>;

    async fn execute(&self, query: &ParameterizedQuery) -> Result<DataFrame, ChartStoreError>;
}

/// Builds the frame every store returns from `(bucket epoch millis, total)` pairs.
pub fn aggregate_frame(points: Vec<(i64, f64)>) -> Result<DataFrame, ChartStoreError> {
    let (timestamps, totals): (Vec<i64>, Vec<f64>) = points.into_iter().unzip();
    let grouped_date = Series::new(GROUPED_DATE_COLUMN, timestamps)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
    let total_value = Series::new(TOTAL_VALUE_COLUMN, totals);
    Ok(DataFrame::new(vec![grouped_date, total_value])?)
}
