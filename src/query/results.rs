//! Result value objects and row mapping
//!
//! Every type here is built fresh per request and serialized straight into
//! the response body.

use crate::query::params::QueryParameters;
use crate::store::{Row, StoreResult};
use serde::Serialize;

/// Map one returned row into a value
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> StoreResult<Self>;
}

/// Read the scalar of a single-row count statement (no rows reads as 0)
pub(crate) fn scalar_count(rows: &[Row]) -> StoreResult<u64> {
    match rows.first() {
        Some(row) => row.get_count(0),
        None => Ok(0),
    }
}

/// A count over a time window
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultCount {
    pub count: u64,
    pub time_from: String,
    pub time_to: String,
}

impl ResultCount {
    pub(crate) fn for_window(params: &QueryParameters, count: u64) -> Self {
        Self {
            count,
            time_from: params.from().to_string(),
            time_to: params.to().to_string(),
        }
    }
}

/// One `(value, count)` pair of a grouped count
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueCount {
    pub value: String,
    pub count: u64,
}

impl FromRow for ValueCount {
    // Column order follows `Projection::ValueCounts`: count, value
    fn from_row(row: &Row) -> StoreResult<Self> {
        Ok(Self {
            count: row.get_count(0)?,
            value: row.get_text(1)?,
        })
    }
}

/// Grouped counts for one field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateFieldResult {
    pub field: String,
    pub counts: Vec<ValueCount>,
    pub distinct: u64,
    pub time_from: String,
    pub time_to: String,
    pub total: u64,
}

/// Output of the aggregate field counter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldCounts {
    pub results: Vec<AggregateFieldResult>,
    pub total: ResultCount,
    /// Labels of fields whose statements failed
    pub skipped: Vec<String>,
    /// The total statement failed, so `total` and each result's `total`
    /// are 0 rather than counted
    pub total_failed: bool,
}

impl FieldCounts {
    pub(crate) fn empty(params: &QueryParameters) -> Self {
        Self {
            results: Vec::new(),
            total: ResultCount::for_window(params, 0),
            skipped: Vec::new(),
            total_failed: false,
        }
    }

    /// Result for the field reported under `label`
    pub fn get(&self, label: &str) -> Option<&AggregateFieldResult> {
        self.results.iter().find(|r| r.field == label)
    }
}

/// Columns fetched for message listings, in `MessageRecord` order
pub const MESSAGE_COLUMNS: &[&str] = &[
    "time",
    "network",
    "message_id",
    "contributor_id",
    "contributor_screen_name",
    "contributor_name",
    "contributor_gender",
    "contributor_lang",
    "contributor_country",
    "contributor_geohash",
    "message",
    "is_question",
    "category",
];

/// One harvested message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub time: String,
    pub network: String,
    pub message_id: String,
    pub contributor_id: String,
    pub contributor_screen_name: String,
    pub contributor_name: String,
    pub contributor_gender: i64,
    pub contributor_lang: String,
    pub contributor_country: String,
    pub contributor_geohash: String,
    pub message: String,
    pub is_question: bool,
    pub category: String,
}

impl FromRow for MessageRecord {
    fn from_row(row: &Row) -> StoreResult<Self> {
        Ok(Self {
            time: row.get_text(0)?,
            network: row.get_text(1)?,
            message_id: row.get_text(2)?,
            contributor_id: row.get_text(3)?,
            contributor_screen_name: row.get_text(4)?,
            contributor_name: row.get_text(5)?,
            contributor_gender: row.get_i64(6)?,
            contributor_lang: row.get_text(7)?,
            contributor_country: row.get_text(8)?,
            contributor_geohash: row.get_text(9)?,
            message: row.get_text(10)?,
            is_question: row.get_i64(11)? != 0,
            category: row.get_text(12)?,
        })
    }
}

/// One page of messages plus the total matching
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MessagePage {
    pub messages: Vec<MessageRecord>,
    pub total: u64,
    pub limit: u64,
    pub skip: u64,
}
