use crate::allow_list::AllowList;
use crate::errors::QueryBuildError;
use crate::{BucketSize, ChartDefinition, TimeWindow, GROUPED_DATE_COLUMN, TOTAL_VALUE_COLUMN};
use log::debug;
use sea_query::{
    Alias, Expr, Func, Iden, Order, PostgresQueryBuilder, Query, SelectStatement,
    SimpleExpr, Values,
};
use std::fmt::Write;

#[derive(Clone)]
pub(crate) enum Name {
    Schema(String),
    Table(String),
    Column(String),
    Function(String),
}

impl Iden for Name {
    fn unquoted(&self, s: &mut dyn Write) {
        let name = match self {
            Name::Schema(n) => n,
            Name::Table(n) => n,
            Name::Column(n) => n,
            Name::Function(n) => n,
        };
        // Writing into a String buffer cannot fail
        let _ = write!(s, "{}", name);
    }
}

/// The validated shape of an aggregate query. Every identifier here is the configured
/// spelling from the allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatePlan {
    pub schema: Option<String>,
    pub table: String,
    pub date_column: String,
    pub value_column: String,
    pub bucket: BucketSize,
    pub window: Option<TimeWindow>,
}

/// A grouped aggregate ready for execution. Window bounds live in the bound parameters of
/// the statement, never in its text.
#[derive(Debug, Clone)]
pub struct ParameterizedQuery {
    pub plan: AggregatePlan,
    pub statement: SelectStatement,
}

impl ParameterizedQuery {
    /// SQL text with `$n` placeholders and the values to bind to them.
    pub fn to_postgres(&self) -> (String, Values) {
        self.statement.build(PostgresQueryBuilder)
    }
}

pub struct AggregateQueryBuilder {
    allow_list: AllowList,
}

impl AggregateQueryBuilder {
    pub fn new(allow_list: AllowList) -> AggregateQueryBuilder {
        AggregateQueryBuilder { allow_list }
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    pub fn build(
        &self,
        definition: &ChartDefinition,
        window: Option<&TimeWindow>,
        bucket: BucketSize,
    ) -> Result<ParameterizedQuery, QueryBuildError> {
        let plan = self.plan(definition, window, bucket)?;
        let statement = create_aggregate_select(&plan);
        let query = ParameterizedQuery { plan, statement };
        debug!("Aggregate SQL for chart {}: {}", definition.id, query.to_postgres().0);
        Ok(query)
    }

    /// Same as [`AggregateQueryBuilder::build`] for a bucket token that has not been
    /// parsed yet.
    pub fn build_with_token(
        &self,
        definition: &ChartDefinition,
        window: Option<&TimeWindow>,
        bucket_token: &str,
    ) -> Result<ParameterizedQuery, QueryBuildError> {
        let bucket = bucket_token.parse::<BucketSize>()?;
        self.build(definition, window, bucket)
    }

    fn plan(
        &self,
        definition: &ChartDefinition,
        window: Option<&TimeWindow>,
        bucket: BucketSize,
    ) -> Result<AggregatePlan, QueryBuildError> {
        let table = self.allow_list.find_table(&definition.data_table)?;
        let date_column = table.date_column(&definition.date_field)?;
        let value_column = table.value_column(&definition.y_axis_field)?;
        if let Some(w) = window {
            if w.start > w.end {
                return Err(QueryBuildError::InvalidWindow {
                    start: w.start,
                    end: w.end,
                });
            }
        }
        Ok(AggregatePlan {
            schema: table.schema.clone(),
            table: table.table.clone(),
            date_column: date_column.to_string(),
            value_column: value_column.to_string(),
            bucket,
            window: window.copied(),
        })
    }
}

fn create_aggregate_select(plan: &AggregatePlan) -> SelectStatement {
    let date_col = || Expr::col(Name::Column(plan.date_column.clone()));
    let truncated = Func::cust(Name::Function("date_trunc".to_string()))
        .arg(bucket_literal(plan.bucket))
        .arg(date_col());
    let total = Func::sum(Expr::col(Name::Column(plan.value_column.clone())));

    let mut select = Query::select();
    select
        .expr_as(
            Func::cast_as(truncated, Alias::new("TIMESTAMPTZ")),
            Alias::new(GROUPED_DATE_COLUMN),
        )
        .expr_as(
            Func::cast_as(total, Alias::new("DOUBLE PRECISION")),
            Alias::new(TOTAL_VALUE_COLUMN),
        );
    if let Some(schema) = &plan.schema {
        select.from((
            Name::Schema(schema.clone()),
            Name::Table(plan.table.clone()),
        ));
    } else {
        select.from(Name::Table(plan.table.clone()));
    }
    if let Some(window) = &plan.window {
        select.and_where(date_col().between(window.start, window.end));
    }
    select
        .group_by_col(Alias::new(GROUPED_DATE_COLUMN))
        .order_by(Alias::new(GROUPED_DATE_COLUMN), Order::Asc);
    select
}

// The token comes from the enum, never from input.
fn bucket_literal(bucket: BucketSize) -> SimpleExpr {
    Expr::cust(match bucket {
        BucketSize::Day => "'day'",
        BucketSize::Week => "'week'",
        BucketSize::Month => "'month'",
    })
}
