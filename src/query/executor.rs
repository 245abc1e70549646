//! Query Executor
//!
//! Runs built statements against the injected [`EventStore`] and maps the
//! rows into result values. The operations live next to it:
//!
//! ```text
//! QueryParameters → scope filter → Select → Statement → EventStore → FromRow
//! ```
//!
//! - `count` (here): a single scalar count
//! - `field_counts` / `top` (aggregate.rs): grouped and distinct counts
//! - `messages` (messages.rs): paginated listing
//! - `timeseries_count` (timeseries.rs): windowed counts as a stream

use crate::query::builder::{CompareOp, FilterSet, Ident, Predicate, Select};
use crate::query::error::QueryResult;
use crate::query::params::QueryParameters;
use crate::query::results::{scalar_count, FromRow, ResultCount};
use crate::query::timeseries::DEFAULT_MAX_WINDOWS;
use crate::store::{EventStore, Statement, StoreResult};
use std::sync::Arc;

/// How the upper time bound is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RangeEnd {
    /// `time <= to`
    Inclusive,
    /// `time < to`
    Exclusive,
}

/// Territory plus optional time bounds, the filter every statement starts from
pub(crate) fn scope_filter(params: &QueryParameters, end: RangeEnd) -> FilterSet {
    let time = || Ident::trusted("time");
    let mut filters = FilterSet::new().and(Predicate::eq("territory", params.territory()));

    if !params.from().is_empty() {
        filters.push(Predicate::compare(time(), CompareOp::Gte, params.from()));
    }
    if !params.to().is_empty() {
        let op = match end {
            RangeEnd::Inclusive => CompareOp::Lte,
            RangeEnd::Exclusive => CompareOp::Lt,
        };
        filters.push(Predicate::compare(time(), op, params.to()));
    }

    filters
}

/// Query executor
#[derive(Clone)]
pub struct QueryExecutor {
    store: Arc<dyn EventStore>,
    max_windows: usize,
}

impl QueryExecutor {
    /// Create an executor over a store
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self {
            store,
            max_windows: DEFAULT_MAX_WINDOWS,
        }
    }

    /// Cap on the windows a single time series may plan
    pub fn with_max_windows(mut self, max_windows: usize) -> Self {
        self.max_windows = max_windows;
        self
    }

    pub fn max_windows(&self) -> usize {
        self.max_windows
    }

    /// The backing store
    pub fn store(&self) -> &Arc<dyn EventStore> {
        &self.store
    }

    pub(crate) async fn fetch_count(&self, statement: &Statement) -> StoreResult<u64> {
        let rows = self.store.fetch(statement).await?;
        scalar_count(&rows)
    }

    pub(crate) async fn fetch_as<T: FromRow>(&self, statement: &Statement) -> StoreResult<Vec<T>> {
        let rows = self.store.fetch(statement).await?;
        rows.iter().map(T::from_row).collect()
    }

    /// Count rows of the parameters' series in its territory and window
    ///
    /// When `field_value` is non-empty and a field is set, only rows whose
    /// field equals it are counted. Without a territory or series the count
    /// is zero and the store is not consulted.
    pub async fn count(
        &self,
        params: &QueryParameters,
        field_value: Option<&str>,
    ) -> QueryResult<ResultCount> {
        self.count_scoped(params, field_value, RangeEnd::Inclusive).await
    }

    pub(crate) async fn count_scoped(
        &self,
        params: &QueryParameters,
        field_value: Option<&str>,
        end: RangeEnd,
    ) -> QueryResult<ResultCount> {
        let series = match params.series() {
            Some(series) if !params.territory().is_empty() => series,
            _ => return Ok(ResultCount::for_window(params, 0)),
        };

        let mut select = Select::count(series).filter(&scope_filter(params, end));

        if let (Some(field), Some(value)) = (params.field(), field_value) {
            if !value.is_empty() {
                select = select.and(Predicate::compare(field.clone(), CompareOp::Eq, value));
            }
        }
        if !params.network().is_empty() {
            select = select.and(Predicate::eq("network", params.network()));
        }

        let statement = select.build();
        let count = self.fetch_count(&statement).await?;

        tracing::debug!(
            series = %series,
            territory = params.territory(),
            count,
            "Counted rows"
        );

        Ok(ResultCount::for_window(params, count))
    }
}
