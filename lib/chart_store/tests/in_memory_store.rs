use chart_query::allow_list::{AllowList, ChartTable};
use chart_query::query_builder::AggregateQueryBuilder;
use chart_query::{
    BucketSize, ChartDefinition, ChartType, TimeWindow, GROUPED_DATE_COLUMN, TOTAL_VALUE_COLUMN,
};
use chart_store::errors::ChartStoreError;
use chart_store::in_memory::InMemoryChartStore;
use chart_store::ChartStore;
use chrono::{DateTime, TimeZone, Utc};
use log::debug;
use polars::prelude::{DataFrame, DataType, TimeUnit};
use rstest::*;

#[fixture]
fn use_logger() {
    let res = env_logger::try_init();
    match res {
        Ok(_) => {}
        Err(_) => {
            debug!("Tried to initialize logger which is already initialize")
        }
    }
}

fn at(d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, d, h, 0, 0).unwrap()
}

fn transactions() -> ChartDefinition {
    ChartDefinition {
        id: 3,
        data_table: "Transactions".to_string(),
        date_field: "date".to_string(),
        y_axis_field: "amount".to_string(),
        chart_type: ChartType::Line,
    }
}

#[fixture]
fn builder() -> AggregateQueryBuilder {
    AggregateQueryBuilder::new(
        AllowList::new(vec![
            ChartTable::new("transactions", &["date"], &["amount"]),
            ChartTable::new("refunds", &["date"], &["amount"]),
        ])
        .unwrap(),
    )
}

#[fixture]
fn store() -> InMemoryChartStore {
    let mut store = InMemoryChartStore::new();
    store.add_chart(transactions());
    store
        .add_table(
            "transactions",
            "date",
            "amount",
            &[
                (at(4, 9), 10.0),
                (at(4, 18), 5.0),
                (at(5, 12), 7.5),
                (at(11, 8), 1.0),
                (at(20, 8), 100.0),
            ],
        )
        .unwrap();
    store
}

fn rows(df: &DataFrame) -> Vec<(i64, f64)> {
    let dates = df
        .column(GROUPED_DATE_COLUMN)
        .unwrap()
        .cast(&DataType::Int64)
        .unwrap();
    let values = df.column(TOTAL_VALUE_COLUMN).unwrap().clone();
    dates
        .i64()
        .unwrap()
        .into_iter()
        .zip(values.f64().unwrap().into_iter())
        .map(|(d, v)| (d.unwrap(), v.unwrap()))
        .collect()
}

#[rstest]
#[tokio::test]
async fn test_find_chart(store: InMemoryChartStore, use_logger: ()) {
    let _ = use_logger;
    assert_eq!(store.find_chart(3).await.unwrap(), Some(transactions()));
    assert_eq!(store.find_chart(4).await.unwrap(), None);
}

#[rstest]
#[tokio::test]
async fn test_daily_sum_within_window(
    store: InMemoryChartStore,
    builder: AggregateQueryBuilder,
    use_logger: (),
) {
    let _ = use_logger;
    let window = TimeWindow::new(at(4, 0), at(11, 23)).unwrap();
    let query = builder
        .build(&transactions(), Some(&window), BucketSize::Day)
        .unwrap();
    let df = store.execute(&query).await.unwrap();
    assert_eq!(
        df.column(GROUPED_DATE_COLUMN).unwrap().dtype(),
        &DataType::Datetime(TimeUnit::Milliseconds, None)
    );
    assert_eq!(
        rows(&df),
        vec![
            (at(4, 0).timestamp_millis(), 15.0),
            (at(5, 0).timestamp_millis(), 7.5),
            (at(11, 0).timestamp_millis(), 1.0),
        ]
    );
}

#[rstest]
#[tokio::test]
async fn test_weekly_sum_without_window(store: InMemoryChartStore, builder: AggregateQueryBuilder) {
    let query = builder
        .build(&transactions(), None, BucketSize::Week)
        .unwrap();
    let df = store.execute(&query).await.unwrap();
    // 2024-03-04, 2024-03-11 and 2024-03-18 are Mondays
    assert_eq!(
        rows(&df),
        vec![
            (at(4, 0).timestamp_millis(), 22.5),
            (at(11, 0).timestamp_millis(), 1.0),
            (at(18, 0).timestamp_millis(), 100.0),
        ]
    );
}

#[rstest]
#[tokio::test]
async fn test_monthly_sum(store: InMemoryChartStore, builder: AggregateQueryBuilder) {
    let query = builder
        .build(&transactions(), None, BucketSize::Month)
        .unwrap();
    let df = store.execute(&query).await.unwrap();
    assert_eq!(
        rows(&df),
        vec![(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap().timestamp_millis(), 123.5)]
    );
}

#[rstest]
#[tokio::test]
async fn test_empty_window_gives_empty_frame(
    store: InMemoryChartStore,
    builder: AggregateQueryBuilder,
) {
    let window = TimeWindow::new(at(25, 0), at(30, 0)).unwrap();
    let query = builder
        .build(&transactions(), Some(&window), BucketSize::Day)
        .unwrap();
    let df = store.execute(&query).await.unwrap();
    assert_eq!(df.height(), 0);
    assert_eq!(df.get_column_names(), vec![GROUPED_DATE_COLUMN, TOTAL_VALUE_COLUMN]);
}

#[rstest]
#[tokio::test]
async fn test_table_not_loaded(store: InMemoryChartStore, builder: AggregateQueryBuilder) {
    let mut refunds = transactions();
    refunds.data_table = "refunds".to_string();
    let query = builder.build(&refunds, None, BucketSize::Day).unwrap();
    let res = store.execute(&query).await;
    assert!(matches!(res, Err(ChartStoreError::TableNotLoaded(t)) if t == "refunds"));
}

#[rstest]
#[case(BucketSize::Day)]
#[case(BucketSize::Week)]
#[case(BucketSize::Month)]
#[tokio::test]
async fn test_buckets_follow_date_trunc(
    #[case] bucket: BucketSize,
    builder: AggregateQueryBuilder,
    use_logger: (),
) {
    let _ = use_logger;
    // Sundays, month ends and a leap day, so week and month edges are crossed
    let instants = vec![
        Utc.with_ymd_and_hms(2024, 1, 28, 23, 59, 59).unwrap(),
        Utc.with_ymd_and_hms(2024, 1, 29, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 1, 31, 12, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 2, 29, 6, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 3, 3, 18, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 3, 4, 1, 0, 0).unwrap(),
    ];
    let loaded: Vec<(DateTime<Utc>, f64)> = instants
        .iter()
        .enumerate()
        .map(|(i, t)| (*t, (i + 1) as f64))
        .collect();
    let mut store = InMemoryChartStore::new();
    store
        .add_table("transactions", "date", "amount", &loaded)
        .unwrap();

    let mut expected: Vec<(i64, f64)> = vec![];
    for (t, v) in &loaded {
        let key = bucket.truncate(*t).timestamp_millis();
        match expected.iter_mut().find(|(k, _)| *k == key) {
            Some((_, total)) => *total += v,
            None => expected.push((key, *v)),
        }
    }
    expected.sort_by_key(|(k, _)| *k);

    let query = builder.build(&transactions(), None, bucket).unwrap();
    let df = store.execute(&query).await.unwrap();
    assert_eq!(rows(&df), expected);
}
