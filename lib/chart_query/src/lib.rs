pub mod allow_list;
pub mod errors;
pub mod query_builder;

use crate::errors::QueryBuildError;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub const GROUPED_DATE_COLUMN: &str = "grouped_date";
pub const TOTAL_VALUE_COLUMN: &str = "total_value";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Line,
    Bar,
}

impl ChartType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Line => "line",
            ChartType::Bar => "bar",
        }
    }
}

impl Display for ChartType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownChartType(pub String);

impl Display for UnknownChartType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Unknown chart type `{}`", self.0)
    }
}

impl std::error::Error for UnknownChartType {}

impl FromStr for ChartType {
    type Err = UnknownChartType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "line" => Ok(ChartType::Line),
            "bar" => Ok(ChartType::Bar),
            _ => Err(UnknownChartType(s.to_string())),
        }
    }
}

/// Chart metadata as stored next to the data it plots. The identifier fields are
/// untrusted until they have passed the allow-list in the query builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDefinition {
    pub id: i64,
    pub data_table: String,
    #[serde(alias = "xAxisField")]
    pub date_field: String,
    pub y_axis_field: String,
    pub chart_type: ChartType,
}

/// A closed interval of UTC instants with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "TimeWindowBounds")]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Deserialize)]
struct TimeWindowBounds {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<TimeWindowBounds> for TimeWindow {
    type Error = QueryBuildError;

    fn try_from(bounds: TimeWindowBounds) -> Result<Self, Self::Error> {
        TimeWindow::new(bounds.start, bounds.end)
    }
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<TimeWindow, QueryBuildError> {
        if start > end {
            return Err(QueryBuildError::InvalidWindow { start, end });
        }
        Ok(TimeWindow { start, end })
    }

    pub fn instant(at: DateTime<Utc>) -> TimeWindow {
        TimeWindow { start: at, end: at }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn contains(&self, instant: &DateTime<Utc>) -> bool {
        &self.start <= instant && instant <= &self.end
    }
}

impl Display for TimeWindow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketSize {
    Day,
    Week,
    Month,
}

impl BucketSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            BucketSize::Day => "day",
            BucketSize::Week => "week",
            BucketSize::Month => "month",
        }
    }

    /// Truncates an instant the way PostgreSQL `date_trunc` does in UTC. Weeks start on
    /// Monday.
    pub fn truncate(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        let date = instant.date_naive();
        let bucket_date = match self {
            BucketSize::Day => date,
            BucketSize::Week => {
                date - Duration::days(date.weekday().num_days_from_monday() as i64)
            }
            BucketSize::Month => {
                NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
            }
        };
        Utc.from_utc_datetime(&bucket_date.and_time(NaiveTime::MIN))
    }
}

impl Display for BucketSize {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BucketSize {
    type Err = QueryBuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(BucketSize::Day),
            "week" => Ok(BucketSize::Week),
            "month" => Ok(BucketSize::Month),
            _ => Err(QueryBuildError::InvalidBucket(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregatedPoint {
    #[serde(rename = "groupedDate")]
    pub bucket_timestamp: DateTime<Utc>,
    #[serde(rename = "totalValue")]
    pub value: f64,
}

impl AggregatedPoint {
    pub fn new(bucket_timestamp: DateTime<Utc>, value: f64) -> AggregatedPoint {
        AggregatedPoint {
            bucket_timestamp,
            value,
        }
    }
}

/// Points ascending by bucket timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesResult {
    points: Vec<AggregatedPoint>,
}

impl SeriesResult {
    pub fn new(mut points: Vec<AggregatedPoint>) -> SeriesResult {
        points.sort_by_key(|p| p.bucket_timestamp);
        SeriesResult { points }
    }

    pub fn empty() -> SeriesResult {
        SeriesResult { points: vec![] }
    }

    pub fn points(&self) -> &[AggregatedPoint] {
        &self.points
    }

    pub fn first(&self) -> Option<&AggregatedPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&AggregatedPoint> {
        self.points.last()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AggregatedPoint> {
        self.points.iter()
    }
}

impl FromIterator<AggregatedPoint> for SeriesResult {
    fn from_iter<T: IntoIterator<Item = AggregatedPoint>>(iter: T) -> Self {
        SeriesResult::new(iter.into_iter().collect())
    }
}
