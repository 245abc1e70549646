//! Request parameters and the sanitizer
//!
//! Callers hand in a [`RawQueryParameters`] of plain strings. Two paths turn
//! it into the [`QueryParameters`] the builders consume:
//!
//! - [`RawQueryParameters::sanitize`] is total: every value failing its
//!   character policy becomes the field's zero value.
//! - [`RawQueryParameters::validate`] applies the same policies but reports
//!   the first supplied value that fails.
//!
//! Every policy is a full match: the whole string must consist of permitted
//! characters, not just contain one.
//!
//! # Example
//!
//! ```rust
//! use harvest_reporter::query::{RawQueryParameters, Series};
//!
//! let raw = RawQueryParameters {
//!     territory: "north".to_string(),
//!     series: "messages".to_string(),
//!     from: "2014-10-01-".to_string(),
//!     ..Default::default()
//! };
//!
//! let params = raw.sanitize();
//! assert_eq!(params.series(), Some(Series::Messages));
//! assert_eq!(params.from(), "2014-10-01");
//! ```

use crate::query::builder::Ident;
use crate::query::error::{QueryError, QueryResult};
use crate::query::series::Series;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Default page size when the caller supplies none
pub const DEFAULT_LIMIT: u64 = 100;

/// Largest page size a caller can ask for
pub const MAX_LIMIT: u64 = 100;

/// Character policy applied to one parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Policy {
    /// Letters, digits and spaces
    Territory,
    /// Letters, digits and underscores, not starting with a digit
    Identifier,
    /// Letters, digits and underscores
    Network,
    /// Digits, dashes, colons and spaces
    Time,
    /// Letters and digits only
    Alphanumeric,
}

static TERRITORY: OnceLock<Option<Regex>> = OnceLock::new();
static IDENTIFIER: OnceLock<Option<Regex>> = OnceLock::new();
static NETWORK: OnceLock<Option<Regex>> = OnceLock::new();
static TIME: OnceLock<Option<Regex>> = OnceLock::new();
static ALPHANUMERIC: OnceLock<Option<Regex>> = OnceLock::new();

impl Policy {
    fn pattern(&self) -> (&'static OnceLock<Option<Regex>>, &'static str) {
        match self {
            Self::Territory => (&TERRITORY, r"^[A-Za-z0-9 ]+$"),
            Self::Identifier => (&IDENTIFIER, r"^[A-Za-z_][A-Za-z0-9_]*$"),
            Self::Network => (&NETWORK, r"^[A-Za-z0-9_]+$"),
            Self::Time => (&TIME, r"^[0-9: -]+$"),
            Self::Alphanumeric => (&ALPHANUMERIC, r"^[A-Za-z0-9]+$"),
        }
    }

    /// Whether the entire value conforms
    pub(crate) fn allows(&self, value: &str) -> bool {
        let (cell, pattern) = self.pattern();
        cell.get_or_init(|| Regex::new(pattern).ok())
            .as_ref()
            .map_or(false, |re| re.is_match(value))
    }
}

/// Clean a date/time bound, returning an empty string when unsafe
fn clean_time(value: &str) -> String {
    if value.contains("--") || !Policy::Time.allows(value) {
        return String::new();
    }
    value.trim_end_matches('-').to_string()
}

fn keep_if(policy: Policy, value: &str) -> String {
    if policy.allows(value) {
        value.to_string()
    } else {
        String::new()
    }
}

/// Parameters exactly as the caller supplied them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawQueryParameters {
    pub from: String,
    pub to: String,
    pub territory: String,
    pub network: String,
    pub field: String,
    pub series: String,
    pub limit: u64,
    pub skip: u64,
}

impl RawQueryParameters {
    /// Clean every field against its policy, dropping what fails
    pub fn sanitize(&self) -> QueryParameters {
        let dropped = |name: &str, raw: &str, kept: bool| {
            if !raw.is_empty() && !kept {
                tracing::debug!(parameter = name, value = raw, "Dropped unsafe parameter");
            }
        };

        let territory = keep_if(Policy::Territory, &self.territory);
        dropped("territory", &self.territory, !territory.is_empty());

        let network = keep_if(Policy::Network, &self.network);
        dropped("network", &self.network, !network.is_empty());

        let field = Ident::parse(&self.field);
        dropped("field", &self.field, field.is_some());

        let series = Series::lookup(&self.series);
        dropped("series", &self.series, series.is_some());

        QueryParameters {
            from: clean_time(&self.from),
            to: clean_time(&self.to),
            territory,
            network,
            field,
            series,
            limit: self.limit,
            skip: self.skip,
        }
    }

    /// Sanitize, failing on the first supplied value that would be dropped
    pub fn validate(&self) -> QueryResult<QueryParameters> {
        if !self.territory.is_empty() && !Policy::Territory.allows(&self.territory) {
            return Err(QueryError::rejected("territory", self.territory.as_str()));
        }
        if !self.network.is_empty() && !Policy::Network.allows(&self.network) {
            return Err(QueryError::rejected("network", self.network.as_str()));
        }
        if !self.field.is_empty() && Ident::parse(&self.field).is_none() {
            return Err(QueryError::rejected("field", self.field.as_str()));
        }
        if !self.series.is_empty() && !Series::is_allowed(&self.series) {
            return Err(QueryError::rejected("series", self.series.as_str()));
        }
        if let Some(series) = Series::lookup(&self.series) {
            if !self.field.is_empty() && !series.has_column(&self.field) {
                return Err(QueryError::rejected("field", self.field.as_str()));
            }
        }
        for (name, value) in [("from", &self.from), ("to", &self.to)] {
            if !value.is_empty() && clean_time(value).is_empty() {
                return Err(QueryError::rejected(name, value.as_str()));
            }
        }

        Ok(self.sanitize())
    }
}

/// Sanitized parameters
///
/// Only produced by [`RawQueryParameters::sanitize`] / `validate`, so the
/// identifier positions always hold checked names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParameters {
    from: String,
    to: String,
    territory: String,
    network: String,
    field: Option<Ident>,
    series: Option<Series>,
    limit: u64,
    skip: u64,
}

impl QueryParameters {
    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn territory(&self) -> &str {
        &self.territory
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn field(&self) -> Option<&Ident> {
        self.field.as_ref()
    }

    pub fn series(&self) -> Option<Series> {
        self.series
    }

    /// Requested page size, 0 when not supplied
    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn skip(&self) -> u64 {
        self.skip
    }

    /// Same parameters against another series
    pub fn with_series(mut self, series: Series) -> Self {
        self.series = Some(series);
        self
    }

    /// Same parameters narrowed to a generated time window
    pub(crate) fn with_window(&self, from: String, to: String) -> Self {
        Self {
            from,
            to,
            ..self.clone()
        }
    }
}

/// Page bounds owned by the request layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub limit: u64,
    pub skip: u64,
}

impl Pagination {
    /// Clamp caller-supplied bounds: limit in [1, MAX_LIMIT] defaulting to
    /// DEFAULT_LIMIT, skip defaulting to 0
    pub fn clamp(limit: Option<u64>, skip: Option<u64>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
            skip: skip.unwrap_or(0),
        }
    }

    /// Bounds for sanitized parameters, where a zero limit means unset
    pub fn of(params: &QueryParameters) -> Self {
        let limit = (params.limit > 0).then_some(params.limit);
        Self::clamp(limit, Some(params.skip))
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::clamp(None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> RawQueryParameters {
        RawQueryParameters {
            from: "2014-10-01".to_string(),
            to: "2014-10-02 12:00:00".to_string(),
            territory: "North America".to_string(),
            network: "twitter".to_string(),
            field: "contributor_lang".to_string(),
            series: "messages".to_string(),
            limit: 10,
            skip: 5,
        }
    }

    #[test]
    fn test_sanitize_keeps_valid_values() {
        let params = raw().sanitize();

        assert_eq!(params.from(), "2014-10-01");
        assert_eq!(params.to(), "2014-10-02 12:00:00");
        assert_eq!(params.territory(), "North America");
        assert_eq!(params.network(), "twitter");
        assert_eq!(params.field().map(|f| f.as_str()), Some("contributor_lang"));
        assert_eq!(params.series(), Some(Series::Messages));
        assert_eq!(params.limit(), 10);
        assert_eq!(params.skip(), 5);
    }

    #[test]
    fn test_injection_territory_dropped() {
        let mut input = raw();
        input.territory = "Rock'n'Roll; DROP TABLE x".to_string();

        let params = input.sanitize();
        assert_eq!(params.territory(), "");
        assert!(!params.territory().contains('\''));
        assert!(!params.territory().contains(';'));
    }

    #[test]
    fn test_partial_match_is_not_enough() {
        // Contains plenty of permitted characters, which a contains-one check
        // would have accepted.
        let mut input = raw();
        input.territory = "north) OR (1=1".to_string();
        input.field = "lang, password".to_string();
        input.network = "twitter--".to_string();

        let params = input.sanitize();
        assert_eq!(params.territory(), "");
        assert!(params.field().is_none());
        assert_eq!(params.network(), "");
    }

    #[test]
    fn test_series_must_be_registered() {
        let mut input = raw();
        input.series = "users".to_string();
        assert!(input.sanitize().series().is_none());

        input.series = "Messages".to_string();
        assert!(input.sanitize().series().is_none());
    }

    #[test]
    fn test_time_bounds() {
        assert_eq!(clean_time("2014-10-01-"), "2014-10-01");
        assert_eq!(clean_time("2014-10-01 10:00:00"), "2014-10-01 10:00:00");
        assert_eq!(clean_time("2014-10-01--"), "");
        assert_eq!(clean_time("2014-10-01T10:00:00"), "");
        assert_eq!(clean_time("2014-10-01'; --"), "");
        assert_eq!(clean_time("now()"), "");
        assert_eq!(clean_time("2014/10/01"), "");
        assert_eq!(clean_time(""), "");
    }

    #[test]
    fn test_validate_rejects_first_bad_field() {
        let mut input = raw();
        input.territory = "north;".to_string();

        match input.validate() {
            Err(QueryError::Rejected { field, value }) => {
                assert_eq!(field, "territory");
                assert_eq!(value, "north;");
            }
            other => panic!("expected rejection, got {:?}", other),
        }

        let mut input = raw();
        input.series = "users".to_string();
        assert!(matches!(
            input.validate(),
            Err(QueryError::Rejected { field: "series", .. })
        ));

        let mut input = raw();
        input.from = "yesterday".to_string();
        assert!(matches!(
            input.validate(),
            Err(QueryError::Rejected { field: "from", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_unknown_column() {
        let mut input = raw();
        input.field = "no_such_column".to_string();
        assert!(matches!(
            input.validate(),
            Err(QueryError::Rejected { field: "field", .. })
        ));

        // sanitize still only applies the identifier policy
        assert!(input.sanitize().field().is_some());

        let mut input = raw();
        input.series = "hashtags".to_string();
        input.field = "tag".to_string();
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_validate_accepts_empty_values() {
        let params = RawQueryParameters::default().validate().unwrap();
        assert_eq!(params, QueryParameters::default());
    }

    #[test]
    fn test_identifier_cannot_start_with_digit() {
        let mut input = raw();
        input.field = "1column".to_string();
        assert!(input.sanitize().field().is_none());
    }

    #[test]
    fn test_pagination_clamp() {
        assert_eq!(Pagination::clamp(None, None), Pagination { limit: 100, skip: 0 });
        assert_eq!(Pagination::clamp(Some(0), None).limit, 1);
        assert_eq!(Pagination::clamp(Some(500), Some(3)), Pagination { limit: 100, skip: 3 });
        assert_eq!(Pagination::clamp(Some(25), Some(0)).limit, 25);
    }

    #[test]
    fn test_pagination_of_params() {
        let mut input = raw();
        input.limit = 0;
        input.skip = 0;
        assert_eq!(Pagination::of(&input.sanitize()), Pagination::default());

        input.limit = 40;
        input.skip = 80;
        assert_eq!(
            Pagination::of(&input.sanitize()),
            Pagination { limit: 40, skip: 80 }
        );
    }
}
