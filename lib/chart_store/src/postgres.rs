use crate::errors::ChartStoreError;
use crate::{aggregate_frame, ChartStore};
use async_trait::async_trait;
use chart_query::allow_list::check_identifier;
use chart_query::errors::IdentifierKind;
use chart_query::query_builder::ParameterizedQuery;
use chart_query::{ChartDefinition, GROUPED_DATE_COLUMN, TOTAL_VALUE_COLUMN};
use chrono::{DateTime, Utc};
use log::{debug, info};
use polars::prelude::DataFrame;
use sea_query::{Alias, Expr, Func, PostgresQueryBuilder, Query, SelectStatement};
use sea_query_binder::SqlxBinder;
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Executor, Row};

pub const DATABASE_URL_VARIABLE: &str = "CHART_DATABASE_URL";
pub const MAX_CONNECTIONS_VARIABLE: &str = "CHART_DATABASE_MAX_CONNECTIONS";

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_CHARTS_TABLE: &str = "charts";

// Buckets are truncated in the session time zone
pub const SESSION_TIME_ZONE_SQL: &str = "SET TIME ZONE 'UTC'";

// Column names of the charts relation
const ID_COLUMN: &str = "id";
const DATA_TABLE_COLUMN: &str = "datefieldtable";
const DATE_FIELD_COLUMN: &str = "xaxisfield";
const Y_AXIS_FIELD_COLUMN: &str = "yaxisfield";
const CHART_TYPE_COLUMN: &str = "charttype";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostgresConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_charts_table")]
    pub charts_table: String,
}

fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

fn default_charts_table() -> String {
    DEFAULT_CHARTS_TABLE.to_string()
}

impl PostgresConfig {
    pub fn new(url: &str) -> PostgresConfig {
        PostgresConfig {
            url: url.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            charts_table: DEFAULT_CHARTS_TABLE.to_string(),
        }
    }

    pub fn from_env() -> Result<PostgresConfig, ChartStoreError> {
        let url = std::env::var(DATABASE_URL_VARIABLE).map_err(|_| {
            ChartStoreError::MissingEnvironmentVariable(DATABASE_URL_VARIABLE.to_string())
        })?;
        let mut config = PostgresConfig::new(&url);
        if let Ok(max) = std::env::var(MAX_CONNECTIONS_VARIABLE) {
            config.max_connections = max.parse().map_err(|_| {
                ChartStoreError::InvalidEnvironmentVariable {
                    variable: MAX_CONNECTIONS_VARIABLE.to_string(),
                    value: max.clone(),
                }
            })?;
        }
        Ok(config)
    }
}

pub struct PostgresChartStore {
    pool: PgPool,
    charts_table: String,
}

impl PostgresChartStore {
    pub async fn connect(config: &PostgresConfig) -> Result<PostgresChartStore, ChartStoreError> {
        check_identifier(IdentifierKind::ChartsTable, &config.charts_table)?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    conn.execute(SESSION_TIME_ZONE_SQL).await?;
                    Ok(())
                })
            })
            .connect(&config.url)
            .await?;
        info!(
            "Connected chart store pool with at most {} connections",
            config.max_connections
        );
        Ok(PostgresChartStore {
            pool,
            charts_table: config.charts_table.clone(),
        })
    }

    pub fn from_pool(
        pool: PgPool,
        charts_table: &str,
    ) -> Result<PostgresChartStore, ChartStoreError> {
        check_identifier(IdentifierKind::ChartsTable, charts_table)?;
        Ok(PostgresChartStore {
            pool,
            charts_table: charts_table.to_string(),
        })
    }
}

/// Selects one chart by id. The id is bound, the charts table name has been checked by the
/// caller.
pub fn chart_lookup_query(charts_table: &str, chart_id: i64) -> SelectStatement {
    let mut select = Query::select();
    select
        .expr_as(
            Func::cast_as(Expr::col(Alias::new(ID_COLUMN)), Alias::new("BIGINT")),
            Alias::new(ID_COLUMN),
        )
        .columns([
            Alias::new(DATA_TABLE_COLUMN),
            Alias::new(DATE_FIELD_COLUMN),
            Alias::new(Y_AXIS_FIELD_COLUMN),
            Alias::new(CHART_TYPE_COLUMN),
        ])
        .from(Alias::new(charts_table))
        .and_where(Expr::col(Alias::new(ID_COLUMN)).eq(chart_id));
    select
}

#[async_trait]
impl ChartStore for PostgresChartStore {
    async fn find_chart(&self, chart_id: i64) -> Result<Option<ChartDefinition>, ChartStoreError> {
        let (sql, values) =
            chart_lookup_query(&self.charts_table, chart_id).build_sqlx(PostgresQueryBuilder);
        debug!("Chart lookup SQL: {}", sql);
        let row = sqlx::query_with(&sql, values)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let chart_type: String = row.try_get(CHART_TYPE_COLUMN)?;
        chart_from_columns(
            row.try_get(ID_COLUMN)?,
            row.try_get(DATA_TABLE_COLUMN)?,
            row.try_get(DATE_FIELD_COLUMN)?,
            row.try_get(Y_AXIS_FIELD_COLUMN)?,
            &chart_type,
        )
        .map(Some)
    }

    async fn execute(&self, query: &ParameterizedQuery) -> Result<DataFrame, ChartStoreError> {
        let (sql, values) = query.statement.build_sqlx(PostgresQueryBuilder);
        let rows = sqlx::query_with(&sql, values).fetch_all(&self.pool).await?;
        let mut decoded = Vec::with_capacity(rows.len());
        for row in rows {
            let grouped_date: DateTime<Utc> = row.try_get(GROUPED_DATE_COLUMN)?;
            let total_value: Option<f64> = row.try_get(TOTAL_VALUE_COLUMN)?;
            decoded.push((grouped_date, total_value));
        }
        aggregate_rows(decoded)
    }
}

pub fn chart_from_columns(
    id: i64,
    data_table: String,
    date_field: String,
    y_axis_field: String,
    chart_type: &str,
) -> Result<ChartDefinition, ChartStoreError> {
    Ok(ChartDefinition {
        id,
        data_table,
        date_field,
        y_axis_field,
        chart_type: chart_type.parse()?,
    })
}

/// A bucket whose values are all NULL sums to NULL in SQL and is reported as zero.
pub fn aggregate_rows(
    rows: Vec<(DateTime<Utc>, Option<f64>)>,
) -> Result<DataFrame, ChartStoreError> {
    aggregate_frame(
        rows.into_iter()
            .map(|(date, total)| (date.timestamp_millis(), total.unwrap_or(0.0)))
            .collect(),
    )
}
