use chart_query::SeriesResult;

/// Keeps the comparison points whose bucket falls within the first and last bucket of the
/// primary series, inclusive. An empty primary series leaves nothing to align against.
pub fn align(primary: &SeriesResult, comparison: &SeriesResult) -> SeriesResult {
    let (Some(first), Some(last)) = (primary.first(), primary.last()) else {
        return SeriesResult::empty();
    };
    let (low, high) = (first.bucket_timestamp, last.bucket_timestamp);
    comparison
        .iter()
        .filter(|p| low <= p.bucket_timestamp && p.bucket_timestamp <= high)
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chart_query::AggregatedPoint;
    use chrono::{TimeZone, Utc};

    fn series(days: &[(u32, f64)]) -> SeriesResult {
        days.iter()
            .map(|(d, v)| {
                AggregatedPoint::new(Utc.with_ymd_and_hms(2024, 5, *d, 0, 0, 0).unwrap(), *v)
            })
            .collect()
    }

    #[test]
    fn test_disjoint_windows_align_to_nothing() {
        // Comparison windows usually precede the primary one entirely
        let primary = series(&[(20, 1.0), (21, 2.0)]);
        let comparison = series(&[(1, 5.0), (2, 6.0)]);
        assert!(align(&primary, &comparison).is_empty());
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let primary = series(&[(10, 1.0), (12, 1.0), (15, 1.0)]);
        let comparison = series(&[(9, 1.0), (10, 2.0), (13, 3.0), (15, 4.0), (16, 5.0)]);
        let aligned = align(&primary, &comparison);
        let values: Vec<f64> = aligned.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_empty_inputs() {
        let some = series(&[(1, 1.0)]);
        assert!(align(&SeriesResult::empty(), &some).is_empty());
        assert!(align(&some, &SeriesResult::empty()).is_empty());
    }
}
