use crate::errors::ChartStoreError;
use crate::ChartStore;
use async_trait::async_trait;
use chart_query::query_builder::{AggregatePlan, ParameterizedQuery};
use chart_query::{BucketSize, ChartDefinition, GROUPED_DATE_COLUMN, TOTAL_VALUE_COLUMN};
use chrono::{DateTime, Utc};
use log::debug;
use polars::prelude::{
    col, lit, DataFrame, DataType, Expr, IntoLazy, NamedFrom, Series, SortMultipleOptions,
    TimeUnit,
};
use std::collections::HashMap;

/// Charts and their source tables held in memory. Aggregates are evaluated from the
/// validated plan as a lazy polars query, bucketed the way PostgreSQL buckets in UTC.
#[derive(Default)]
pub struct InMemoryChartStore {
    pub charts: HashMap<i64, ChartDefinition>,
    pub frames: HashMap<String, DataFrame>,
}

impl InMemoryChartStore {
    pub fn new() -> InMemoryChartStore {
        InMemoryChartStore::default()
    }

    pub fn add_chart(&mut self, definition: ChartDefinition) {
        self.charts.insert(definition.id, definition);
    }

    /// Loads a table with one datetime column and one value column.
    pub fn add_table(
        &mut self,
        table: &str,
        date_column: &str,
        value_column: &str,
        rows: &[(DateTime<Utc>, f64)],
    ) -> Result<(), ChartStoreError> {
        let dates: Vec<i64> = rows.iter().map(|(t, _)| t.timestamp_millis()).collect();
        let values: Vec<f64> = rows.iter().map(|(_, v)| *v).collect();
        let df = DataFrame::new(vec![
            Series::new(date_column, dates)
                .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?,
            Series::new(value_column, values),
        ])?;
        self.frames.insert(table.to_string(), df);
        Ok(())
    }

    fn execute_plan(&self, plan: &AggregatePlan) -> Result<DataFrame, ChartStoreError> {
        let df = self
            .frames
            .get(&plan.table)
            .ok_or_else(|| ChartStoreError::TableNotLoaded(plan.table.clone()))?;
        get_column(df, &plan.table, &plan.date_column)?;
        get_column(df, &plan.table, &plan.value_column)?;

        let mut lf = df.clone().lazy().select([
            col(&plan.date_column)
                .cast(millisecond_datetime())
                .alias(GROUPED_DATE_COLUMN),
            col(&plan.value_column)
                .cast(DataType::Float64)
                .alias(TOTAL_VALUE_COLUMN),
        ]);
        lf = lf.filter(col(GROUPED_DATE_COLUMN).is_not_null());
        if let Some(window) = &plan.window {
            lf = lf.filter(
                col(GROUPED_DATE_COLUMN)
                    .gt_eq(instant_literal(window.start))
                    .and(col(GROUPED_DATE_COLUMN).lt_eq(instant_literal(window.end))),
            );
        }
        let out = lf
            .group_by([col(GROUPED_DATE_COLUMN)
                .dt()
                .truncate(lit(truncate_every(plan.bucket)))])
            .agg([col(TOTAL_VALUE_COLUMN).sum()])
            .sort([GROUPED_DATE_COLUMN], SortMultipleOptions::default())
            .collect()?;
        debug!(
            "In-memory aggregate over {} produced {} buckets",
            plan.table,
            out.height()
        );
        Ok(out)
    }
}

fn millisecond_datetime() -> DataType {
    DataType::Datetime(TimeUnit::Milliseconds, None)
}

fn instant_literal(instant: DateTime<Utc>) -> Expr {
    lit(instant.timestamp_millis()).cast(millisecond_datetime())
}

/// Polars truncation intervals matching `date_trunc`. Weeks start on Monday in both.
pub fn truncate_every(bucket: BucketSize) -> &'static str {
    match bucket {
        BucketSize::Day => "1d",
        BucketSize::Week => "1w",
        BucketSize::Month => "1mo",
    }
}

fn get_column<'a>(
    df: &'a DataFrame,
    table: &str,
    column: &str,
) -> Result<&'a Series, ChartStoreError> {
    df.column(column).map_err(|_| ChartStoreError::ColumnMissing {
        table: table.to_string(),
        column: column.to_string(),
    })
}

#[async_trait]
impl ChartStore for InMemoryChartStore {
    async fn find_chart(&self, chart_id: i64) -> Result<Option<ChartDefinition>, ChartStoreError> {
        Ok(self.charts.get(&chart_id).cloned())
    }

    async fn execute(&self, query: &ParameterizedQuery) -> Result<DataFrame, ChartStoreError> {
        self.execute_plan(&query.plan)
    }
}
