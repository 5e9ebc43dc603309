use crate::alignment::align;
use crate::bucket::{bucket_for_window, select_bucket};
use crate::change::{compute_change, ChangeResult};
use crate::config::EngineConfig;
use crate::errors::{ChartEngineError, ErrorResponse};
use crate::executor::AggregationExecutor;
use crate::lookup::ChartDefinitionLookup;
use crate::period::{ComparisonPreset, PeriodResolver, Preset};
use chart_query::allow_list::AllowList;
use chart_query::query_builder::AggregateQueryBuilder;
use chart_query::{BucketSize, ChartDefinition, SeriesResult, TimeWindow};
use chart_store::ChartStore;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// A chart over an explicit window. The window applies only when both bounds are given.
/// Without a bucket size the server picks one from the span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartRequest {
    pub chart_id: i64,
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub bucket_size: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonRequest {
    pub chart_id: i64,
    pub preset: Preset,
    #[serde(default = "default_comparison_preset")]
    pub comparison_preset: ComparisonPreset,
}

fn default_comparison_preset() -> ComparisonPreset {
    ComparisonPreset::PreviousPeriod
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartResponse {
    #[serde(flatten)]
    pub chart: ChartDefinition,
    pub bucket_size: BucketSize,
    pub window: Option<TimeWindow>,
    pub data: SeriesResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartComparison {
    #[serde(flatten)]
    pub chart: ChartDefinition,
    pub bucket_size: BucketSize,
    pub window: TimeWindow,
    pub comparison_window: TimeWindow,
    pub data: SeriesResult,
    /// Comparison points within the span of `data`.
    pub comparison_data: SeriesResult,
    pub change: ChangeResult,
    /// Set when the comparison fetch failed while the primary one succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison_error: Option<ErrorResponse>,
}

impl ChartComparison {
    pub fn is_partial(&self) -> bool {
        self.comparison_error.is_some()
    }
}

pub struct Engine {
    lookup: ChartDefinitionLookup,
    builder: AggregateQueryBuilder,
    executor: AggregationExecutor,
}

impl Engine {
    pub fn new(
        store: Arc<dyn ChartStore>,
        allow_list: AllowList,
        query_timeout: Option<Duration>,
    ) -> Engine {
        Engine {
            lookup: ChartDefinitionLookup::new(store.clone()),
            builder: AggregateQueryBuilder::new(allow_list),
            executor: AggregationExecutor::new(store, query_timeout),
        }
    }

    pub fn from_config(
        config: &EngineConfig,
        store: Arc<dyn ChartStore>,
    ) -> Result<Engine, ChartEngineError> {
        Ok(Engine::new(store, config.allow_list()?, config.query_timeout()))
    }

    pub async fn fetch_chart(
        &self,
        request: &ChartRequest,
    ) -> Result<ChartResponse, ChartEngineError> {
        let window = match (request.start, request.end) {
            (Some(start), Some(end)) => Some(TimeWindow::new(start, end)?),
            _ => None,
        };
        let bucket_size = match &request.bucket_size {
            Some(token) => token.parse::<BucketSize>()?,
            None => bucket_for_window(window.as_ref()),
        };
        let chart = self.lookup.lookup(request.chart_id).await?;
        let query = self.builder.build(&chart, window.as_ref(), bucket_size)?;
        let data = self.executor.execute(&query).await?;
        Ok(ChartResponse {
            chart,
            bucket_size,
            window,
            data,
        })
    }

    pub async fn compare_chart(
        &self,
        request: &ComparisonRequest,
    ) -> Result<ChartComparison, ChartEngineError> {
        self.compare_chart_at(request, Utc::now()).await
    }

    /// Like [`Engine::compare_chart`] with presets resolved against `now`.
    pub async fn compare_chart_at(
        &self,
        request: &ComparisonRequest,
        now: DateTime<Utc>,
    ) -> Result<ChartComparison, ChartEngineError> {
        let window = PeriodResolver::new(now).resolve_primary(request.preset);
        let comparison_window =
            PeriodResolver::resolve_comparison(request.comparison_preset, &window);
        let bucket_size = select_bucket(&window, request.preset);
        debug!(
            "Chart {} {} {} vs {} {} by {}",
            request.chart_id,
            request.preset,
            window,
            request.comparison_preset,
            comparison_window,
            bucket_size
        );

        let chart = self.lookup.lookup(request.chart_id).await?;
        let primary_query = self.builder.build(&chart, Some(&window), bucket_size)?;
        let comparison_query = self
            .builder
            .build(&chart, Some(&comparison_window), bucket_size)?;

        let (primary, comparison) = tokio::join!(
            self.executor.execute(&primary_query),
            self.executor.execute(&comparison_query)
        );
        let data = primary?;
        let (comparison, comparison_error) = match comparison {
            Ok(series) => (series, None),
            Err(e) => {
                warn!(
                    "Comparison series for chart {} unavailable: {}",
                    request.chart_id, e
                );
                (SeriesResult::empty(), Some(e.to_response()))
            }
        };
        let comparison_data = align(&data, &comparison);
        let change = compute_change(&data, &comparison_data);
        Ok(ChartComparison {
            chart,
            bucket_size,
            window,
            comparison_window,
            data,
            comparison_data,
            change,
            comparison_error,
        })
    }
}
