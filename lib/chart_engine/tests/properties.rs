use chart_engine::alignment::align;
use chart_engine::bucket::select_bucket;
use chart_engine::change::compute_change;
use chart_engine::period::{ComparisonPreset, PeriodResolver, Preset};
use chart_query::{AggregatedPoint, SeriesResult};
use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

fn instant() -> impl Strategy<Value = DateTime<Utc>> {
    // 1970 to roughly 2096
    (0i64..4_000_000_000i64).prop_map(|s| Utc.timestamp_opt(s, 0).unwrap())
}

fn preset() -> impl Strategy<Value = Preset> {
    prop_oneof![
        Just(Preset::Last90Days),
        Just(Preset::Last30Days),
        Just(Preset::CurrentMonth),
        Just(Preset::Unrecognized),
    ]
}

fn fixed_offset_comparison() -> impl Strategy<Value = ComparisonPreset> {
    prop_oneof![
        Just(ComparisonPreset::PreviousPeriod),
        Just(ComparisonPreset::Previous90Days),
        Just(ComparisonPreset::Previous30Days),
    ]
}

fn series() -> impl Strategy<Value = SeriesResult> {
    prop::collection::vec((0i64..365, -1_000.0f64..1_000.0), 0..40).prop_map(|points| {
        let origin = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        points
            .into_iter()
            .map(|(day, value)| AggregatedPoint::new(origin + Duration::days(day), value))
            .collect()
    })
}

fn single(value: f64) -> SeriesResult {
    SeriesResult::new(vec![AggregatedPoint::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        value,
    )])
}

proptest! {
    #[test]
    fn primary_window_is_ordered(now in instant(), preset in preset()) {
        let w = PeriodResolver::new(now).resolve_primary(preset);
        prop_assert!(w.start <= w.end);
    }

    #[test]
    fn fixed_offset_comparison_keeps_duration(
        now in instant(),
        preset in preset(),
        comparison in fixed_offset_comparison(),
    ) {
        let primary = PeriodResolver::new(now).resolve_primary(preset);
        let c = PeriodResolver::resolve_comparison(comparison, &primary);
        prop_assert_eq!(c.duration(), primary.duration());
        prop_assert!(c.start <= c.end);
    }

    #[test]
    fn previous_month_stays_ordered(now in instant(), preset in preset()) {
        let primary = PeriodResolver::new(now).resolve_primary(preset);
        let c = PeriodResolver::resolve_comparison(ComparisonPreset::PreviousMonth, &primary);
        prop_assert!(c.start <= c.end);
    }

    #[test]
    fn bucket_selection_is_deterministic(now in instant(), preset in preset()) {
        let w = PeriodResolver::new(now).resolve_primary(preset);
        prop_assert_eq!(select_bucket(&w, preset), select_bucket(&w, preset));
    }

    #[test]
    fn aligned_points_lie_within_primary_span(primary in series(), comparison in series()) {
        let aligned = align(&primary, &comparison);
        if primary.is_empty() || comparison.is_empty() {
            prop_assert!(aligned.is_empty());
        }
        if let (Some(first), Some(last)) = (primary.first(), primary.last()) {
            for p in aligned.iter() {
                prop_assert!(first.bucket_timestamp <= p.bucket_timestamp);
                prop_assert!(p.bucket_timestamp <= last.bucket_timestamp);
            }
        }
        // A filtered subsequence, order preserved
        let mut rest = comparison.iter();
        for p in aligned.iter() {
            prop_assert!(rest.any(|c| c == p));
        }
    }

    #[test]
    fn change_sign_follows_difference(current in -1e6f64..1e6, baseline in 1e-3f64..1e6) {
        let change = compute_change(&single(current), &single(baseline));
        let percentage = change.percentage.unwrap();
        let difference = current - baseline;
        // Rounding to hundredths may land on zero
        prop_assert!(percentage == 0.0 || percentage.signum() == difference.signum());
    }

    #[test]
    fn zero_baseline_has_no_change(current in -1e6f64..1e6) {
        prop_assert_eq!(compute_change(&single(current), &single(0.0)).percentage, None);
    }

    #[test]
    fn empty_comparison_has_no_change(primary in series()) {
        let change = compute_change(&primary, &SeriesResult::empty());
        prop_assert_eq!(change.percentage, None);
    }
}
