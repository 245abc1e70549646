//! Time-bucketed counts
//!
//! Splits `[from, to)` into consecutive windows of a fixed number of minutes
//! and runs the simple counter over each window in order. A trailing window
//! shorter than the resolution is dropped.
//!
//! Counting happens on a spawned task that hands results over a channel of
//! capacity one, so the producer is never more than one window ahead of the
//! consumer. Dropping (or cancelling) the [`CountStream`] stops it before its
//! next store call.
//!
//! # Example
//!
//! ```rust
//! use harvest_reporter::query::TimeWindows;
//!
//! let windows = TimeWindows::plan("2014-10-01", "2014-10-02", 60).unwrap();
//! assert_eq!(windows.len(), 24);
//! ```

use crate::query::error::{QueryError, QueryResult};
use crate::query::executor::{QueryExecutor, RangeEnd};
use crate::query::params::QueryParameters;
use crate::query::results::ResultCount;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use futures_util::Stream;
use tokio::sync::mpsc;

/// Largest number of windows one time series may plan, a week at one-minute
/// resolution
pub const DEFAULT_MAX_WINDOWS: usize = 10_080;

/// Format of window bounds, matching the stored `time` column
pub const WINDOW_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Day format accepted for `from` / `to`
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// Half-open window `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeWindow {
    pub fn start_text(&self) -> String {
        self.start.format(WINDOW_FORMAT).to_string()
    }

    pub fn end_text(&self) -> String {
        self.end.format(WINDOW_FORMAT).to_string()
    }
}

fn parse_day(value: &str) -> QueryResult<NaiveDateTime> {
    NaiveDate::parse_from_str(value.trim(), DAY_FORMAT)
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .ok_or_else(|| QueryError::InvalidTimeRange(format!("cannot parse day {:?}", value)))
}

/// Forward-only sequence of windows
#[derive(Debug)]
pub struct TimeWindows {
    next: NaiveDateTime,
    step: Duration,
    remaining: usize,
}

impl TimeWindows {
    /// Plan the windows between two `YYYY-MM-DD` days
    pub fn plan(from: &str, to: &str, resolution_minutes: i64) -> QueryResult<Self> {
        if resolution_minutes <= 0 {
            return Err(QueryError::InvalidTimeRange(format!(
                "resolution must be a positive number of minutes, got {}",
                resolution_minutes
            )));
        }

        let start = parse_day(from)?;
        let end = parse_day(to)?;
        if end < start {
            return Err(QueryError::InvalidTimeRange(format!(
                "{} is before {}",
                to, from
            )));
        }

        let windows = (end - start).num_minutes() / resolution_minutes;
        let step = if windows > 0 {
            Duration::minutes(resolution_minutes)
        } else {
            Duration::zero()
        };

        Ok(Self {
            next: start,
            step,
            remaining: usize::try_from(windows).unwrap_or(0),
        })
    }
}

impl Iterator for TimeWindows {
    type Item = TimeWindow;

    fn next(&mut self) -> Option<TimeWindow> {
        if self.remaining == 0 {
            return None;
        }
        let start = self.next;
        let end = start.checked_add_signed(self.step)?;
        self.next = end;
        self.remaining -= 1;
        Some(TimeWindow { start, end })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for TimeWindows {}

/// Receiving end of a time-bucketed count
///
/// Yields one result per window in order. A store error is yielded once
/// and ends the stream.
#[derive(Debug)]
pub struct CountStream {
    rx: mpsc::Receiver<QueryResult<ResultCount>>,
    windows: usize,
}

impl CountStream {
    /// Number of windows planned
    pub fn windows(&self) -> usize {
        self.windows
    }

    /// Next window's result, `None` once finished or cancelled
    pub async fn next(&mut self) -> Option<QueryResult<ResultCount>> {
        self.rx.recv().await
    }

    /// Stop the producer; results already handed over can still be read
    pub fn cancel(&mut self) {
        self.rx.close();
    }

    /// Drain every window, stopping at the first error
    pub async fn collect(mut self) -> QueryResult<Vec<ResultCount>> {
        let mut counts = Vec::with_capacity(self.windows);
        while let Some(result) = self.next().await {
            counts.push(result?);
        }
        Ok(counts)
    }

    /// Adapt into a `futures` stream
    pub fn into_stream(self) -> impl Stream<Item = QueryResult<ResultCount>> + Send {
        futures_util::stream::unfold(self, |mut counts| async move {
            counts.next().await.map(|item| (item, counts))
        })
    }
}

impl QueryExecutor {
    /// Count per window between `params.from()` and `params.to()`
    ///
    /// Fails up front on an unparseable day or non-positive resolution.
    /// Without a territory or series the stream is empty.
    pub async fn timeseries_count(
        &self,
        params: &QueryParameters,
        field_value: Option<&str>,
        resolution_minutes: i64,
    ) -> QueryResult<CountStream> {
        let windows = TimeWindows::plan(params.from(), params.to(), resolution_minutes)?;
        if windows.len() > self.max_windows() {
            return Err(QueryError::InvalidTimeRange(format!(
                "{} windows requested, at most {} allowed",
                windows.len(),
                self.max_windows()
            )));
        }
        let (tx, rx) = mpsc::channel(1);

        if params.territory().is_empty() || params.series().is_none() {
            return Ok(CountStream { rx, windows: 0 });
        }

        let planned = windows.len();
        let executor = self.clone();
        let params = params.clone();
        let field_value = field_value.map(str::to_string);

        tracing::debug!(
            territory = params.territory(),
            windows = planned,
            resolution_minutes,
            "Starting time series"
        );

        tokio::spawn(async move {
            for window in windows {
                if tx.is_closed() {
                    tracing::debug!(window = %window.start_text(), "Time series cancelled");
                    return;
                }

                let scoped = params.with_window(window.start_text(), window.end_text());
                let result = executor
                    .count_scoped(&scoped, field_value.as_deref(), RangeEnd::Exclusive)
                    .await;

                let failed = result.is_err();
                if tx.send(result).await.is_err() {
                    return;
                }
                if failed {
                    return;
                }
            }
        });

        Ok(CountStream {
            rx,
            windows: planned,
        })
    }
}
