use chart_query::TimeWindow;
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const LAST_90_DAYS: &str = "LAST_90_DAYS";
pub const LAST_30_DAYS: &str = "LAST_30_DAYS";
pub const CURRENT_MONTH: &str = "CURRENT_MONTH";

pub const PREVIOUS_PERIOD: &str = "PREVIOUS_PERIOD";
pub const PREVIOUS_90_DAYS: &str = "PREVIOUS_90_DAYS";
pub const PREVIOUS_30_DAYS: &str = "PREVIOUS_30_DAYS";
pub const PREVIOUS_MONTH: &str = "PREVIOUS_MONTH";

/// Named primary range. Tokens that are not recognized are kept as `Unrecognized` and
/// resolve to an empty window at the current instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Preset {
    Last90Days,
    Last30Days,
    CurrentMonth,
    Unrecognized,
}

impl Preset {
    pub fn from_token(token: &str) -> Preset {
        match token {
            LAST_90_DAYS => Preset::Last90Days,
            LAST_30_DAYS => Preset::Last30Days,
            CURRENT_MONTH => Preset::CurrentMonth,
            _ => {
                debug!("Unrecognized preset `{}`, using an empty window", token);
                Preset::Unrecognized
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Last90Days => LAST_90_DAYS,
            Preset::Last30Days => LAST_30_DAYS,
            Preset::CurrentMonth => CURRENT_MONTH,
            Preset::Unrecognized => "UNRECOGNIZED",
        }
    }
}

impl From<String> for Preset {
    fn from(token: String) -> Self {
        Preset::from_token(&token)
    }
}

impl From<Preset> for String {
    fn from(preset: Preset) -> Self {
        preset.as_str().to_string()
    }
}

impl Display for Preset {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Named offset of the comparison window relative to the primary window. Unrecognized
/// tokens fall back to the previous period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ComparisonPreset {
    PreviousPeriod,
    Previous90Days,
    Previous30Days,
    PreviousMonth,
}

impl ComparisonPreset {
    pub fn from_token(token: &str) -> ComparisonPreset {
        match token {
            PREVIOUS_PERIOD => ComparisonPreset::PreviousPeriod,
            PREVIOUS_90_DAYS => ComparisonPreset::Previous90Days,
            PREVIOUS_30_DAYS => ComparisonPreset::Previous30Days,
            PREVIOUS_MONTH => ComparisonPreset::PreviousMonth,
            _ => {
                debug!(
                    "Unrecognized comparison preset `{}`, using previous period",
                    token
                );
                ComparisonPreset::PreviousPeriod
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonPreset::PreviousPeriod => PREVIOUS_PERIOD,
            ComparisonPreset::Previous90Days => PREVIOUS_90_DAYS,
            ComparisonPreset::Previous30Days => PREVIOUS_30_DAYS,
            ComparisonPreset::PreviousMonth => PREVIOUS_MONTH,
        }
    }
}

impl From<String> for ComparisonPreset {
    fn from(token: String) -> Self {
        ComparisonPreset::from_token(&token)
    }
}

impl From<ComparisonPreset> for String {
    fn from(preset: ComparisonPreset) -> Self {
        preset.as_str().to_string()
    }
}

impl Display for ComparisonPreset {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resolves presets against a fixed "now" so that both windows of a request agree on it.
#[derive(Debug, Clone, Copy)]
pub struct PeriodResolver {
    now: DateTime<Utc>,
}

impl PeriodResolver {
    pub fn new(now: DateTime<Utc>) -> PeriodResolver {
        PeriodResolver { now }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn resolve_primary(&self, preset: Preset) -> TimeWindow {
        let now = self.now;
        match preset {
            Preset::Last90Days => TimeWindow {
                start: earlier(now, Duration::days(90)),
                end: now,
            },
            Preset::Last30Days => TimeWindow {
                start: earlier(now, Duration::days(30)),
                end: now,
            },
            Preset::CurrentMonth => current_month(now).unwrap_or(TimeWindow::instant(now)),
            Preset::Unrecognized => TimeWindow::instant(now),
        }
    }

    pub fn resolve_comparison(comparison: ComparisonPreset, primary: &TimeWindow) -> TimeWindow {
        match comparison {
            ComparisonPreset::PreviousPeriod => TimeWindow {
                start: earlier(primary.start, primary.duration()),
                end: primary.start,
            },
            ComparisonPreset::Previous90Days => shift_back(primary, Duration::days(90)),
            ComparisonPreset::Previous30Days => shift_back(primary, Duration::days(30)),
            ComparisonPreset::PreviousMonth => TimeWindow {
                start: one_month_earlier(primary.start),
                end: one_month_earlier(primary.end),
            },
        }
    }
}

fn shift_back(window: &TimeWindow, by: Duration) -> TimeWindow {
    TimeWindow {
        start: earlier(window.start, by),
        end: earlier(window.end, by),
    }
}

// Saturates at the earliest representable instant.
fn earlier(instant: DateTime<Utc>, by: Duration) -> DateTime<Utc> {
    instant
        .checked_sub_signed(by)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

// Calendar arithmetic: the day of month is clamped, e.g. March 31st becomes February 29th.
fn one_month_earlier(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        .checked_sub_months(Months::new(1))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn first_of_month(year: i32, month: u32) -> Option<DateTime<Utc>> {
    let date = NaiveDate::from_ymd_opt(year, month, 1)?;
    Some(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}

/// From the first instant of the month to its last millisecond.
fn current_month(now: DateTime<Utc>) -> Option<TimeWindow> {
    let start = first_of_month(now.year(), now.month())?;
    let next = if now.month() == 12 {
        first_of_month(now.year() + 1, 1)?
    } else {
        first_of_month(now.year(), now.month() + 1)?
    };
    Some(TimeWindow {
        start,
        end: next - Duration::milliseconds(1),
    })
}
