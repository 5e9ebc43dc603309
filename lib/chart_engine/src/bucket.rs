use crate::period::Preset;
use chart_query::{BucketSize, TimeWindow};
use chrono::Duration;

const DAILY_SPAN_LIMIT_DAYS: i64 = 30;

/// Chooses the aggregation granularity for a window. Month-long and quarter-long presets
/// have fixed buckets, everything else goes by span.
pub fn select_bucket(window: &TimeWindow, preset: Preset) -> BucketSize {
    match preset {
        Preset::CurrentMonth => BucketSize::Week,
        Preset::Last90Days => BucketSize::Month,
        Preset::Last30Days | Preset::Unrecognized => bucket_for_span(window.duration()),
    }
}

/// Bucket for an explicit window that came without a bucket size. An unbounded query spans
/// more than a month.
pub fn bucket_for_window(window: Option<&TimeWindow>) -> BucketSize {
    match window {
        Some(w) => bucket_for_span(w.duration()),
        None => BucketSize::Week,
    }
}

pub fn bucket_for_span(span: Duration) -> BucketSize {
    if span <= Duration::days(DAILY_SPAN_LIMIT_DAYS) {
        BucketSize::Day
    } else {
        BucketSize::Week
    }
}
