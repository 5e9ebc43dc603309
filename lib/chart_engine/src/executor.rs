use crate::errors::ChartEngineError;
use chart_query::query_builder::ParameterizedQuery;
use chart_query::{AggregatedPoint, SeriesResult, GROUPED_DATE_COLUMN, TOTAL_VALUE_COLUMN};
use chart_store::ChartStore;
use chrono::{TimeZone, Utc};
use log::{debug, warn};
use polars::prelude::{DataFrame, DataType, PolarsError, TimeUnit};
use std::sync::Arc;
use std::time::Duration;

/// Runs aggregate queries against the store, bounded by an optional timeout.
pub struct AggregationExecutor {
    store: Arc<dyn ChartStore>,
    timeout: Option<Duration>,
}

impl AggregationExecutor {
    pub fn new(store: Arc<dyn ChartStore>, timeout: Option<Duration>) -> AggregationExecutor {
        AggregationExecutor { store, timeout }
    }

    pub async fn execute(
        &self,
        query: &ParameterizedQuery,
    ) -> Result<SeriesResult, ChartEngineError> {
        let fut = self.store.execute(query);
        let res = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
                warn!("Aggregate over {} timed out after {:?}", query.plan.table, limit);
                ChartEngineError::QueryTimeout(limit)
            })?,
            None => fut.await,
        };
        let df = res.map_err(|e| {
            warn!("Aggregate over {} failed: {}", query.plan.table, e);
            ChartEngineError::ExecutionError(e)
        })?;
        let series = series_from_frame(&df)?;
        debug!(
            "Aggregate over {} returned {} points",
            query.plan.table,
            series.len()
        );
        Ok(series)
    }
}

/// Reads `grouped_date` and `total_value` from an aggregate frame. Missing totals count
/// as zero, rows without a bucket timestamp are dropped.
pub fn series_from_frame(df: &DataFrame) -> Result<SeriesResult, ChartEngineError> {
    let dates = df
        .column(GROUPED_DATE_COLUMN)
        .map_err(|_| missing_column(GROUPED_DATE_COLUMN))?
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
        .and_then(|s| s.cast(&DataType::Int64))
        .map_err(malformed)?;
    let values = df
        .column(TOTAL_VALUE_COLUMN)
        .map_err(|_| missing_column(TOTAL_VALUE_COLUMN))?
        .cast(&DataType::Float64)
        .map_err(malformed)?;

    let mut points = Vec::with_capacity(df.height());
    for (t, v) in dates
        .i64()
        .map_err(malformed)?
        .into_iter()
        .zip(values.f64().map_err(malformed)?.into_iter())
    {
        let Some(bucket_timestamp) = t.and_then(|t| Utc.timestamp_millis_opt(t).single()) else {
            continue;
        };
        points.push(AggregatedPoint::new(bucket_timestamp, v.unwrap_or(0.0)));
    }
    Ok(SeriesResult::new(points))
}

fn missing_column(column: &str) -> ChartEngineError {
    ChartEngineError::MalformedResult(format!("missing column {}", column))
}

fn malformed(e: PolarsError) -> ChartEngineError {
    ChartEngineError::MalformedResult(e.to_string())
}
