//! Statement builder
//!
//! Builds `SELECT` statements for one series while keeping the two kinds of
//! fragment apart:
//!
//! - **identifiers** (`Series`, `Ident`, `FieldExpr`) are written into the
//!   statement text and can only be obtained through a whitelist or a
//!   full-match character check;
//! - **values** (`SqlValue`) are never written into the text. Each one gets
//!   a `?N` placeholder and travels in `Statement::params`.
//!
//! # Example
//!
//! ```rust
//! use harvest_reporter::query::{FieldExpr, FilterSet, Predicate, Select, Series};
//!
//! let field = FieldExpr::parse("LOWER(tag)").unwrap();
//! let filters = FilterSet::new().and(Predicate::eq("territory", "north"));
//!
//! let stmt = Select::value_counts(Series::Hashtags, field)
//!     .filter(&filters)
//!     .limit(10)
//!     .build();
//!
//! assert_eq!(
//!     stmt.sql(),
//!     "SELECT COUNT(*) AS count, LOWER(tag) AS value FROM hashtags \
//!      WHERE territory = ?1 GROUP BY LOWER(tag) ORDER BY count DESC, value ASC LIMIT ?2"
//! );
//! assert_eq!(stmt.params().len(), 2);
//! ```

use crate::query::params::Policy;
use crate::query::series::Series;
use crate::store::{SqlValue, Statement};
use std::fmt;

/// Smallest geohash prefix length
pub const MIN_PRECISION: i64 = 1;

/// Largest geohash prefix length
pub const MAX_PRECISION: i64 = 12;

/// A checked column name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident(String);

impl Ident {
    /// Accept `name` only if it is a plain identifier in full
    pub fn parse(name: &str) -> Option<Self> {
        if Policy::Identifier.allows(name) {
            Some(Self(name.to_string()))
        } else {
            None
        }
    }

    /// Column name written in code
    pub(crate) fn trusted(name: &'static str) -> Self {
        Self(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An expression over one column, usable in projections and predicates
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldExpr {
    /// The column itself
    Column(Ident),
    /// `LOWER(column)`
    Lower(Ident),
    /// First `len` characters of the column
    Prefix { column: Ident, len: u8 },
}

impl FieldExpr {
    pub fn column(ident: Ident) -> Self {
        Self::Column(ident)
    }

    pub fn lower(ident: Ident) -> Self {
        Self::Lower(ident)
    }

    /// Prefix of `ident`, with `precision` clamped to
    /// [`MIN_PRECISION`, `MAX_PRECISION`]
    pub fn prefix(ident: Ident, precision: i64) -> Self {
        let len = precision.clamp(MIN_PRECISION, MAX_PRECISION) as u8;
        Self::Prefix { column: ident, len }
    }

    /// Parse a caller-supplied field: `column` or `LOWER(column)`
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let lowered = text.to_ascii_lowercase();

        if lowered.starts_with("lower(") && lowered.ends_with(')') {
            let inner = &text["lower(".len()..text.len() - 1];
            return Ident::parse(inner.trim()).map(Self::Lower);
        }

        Ident::parse(text).map(Self::Column)
    }

    /// The underlying column
    pub fn ident(&self) -> &Ident {
        match self {
            Self::Column(ident) | Self::Lower(ident) => ident,
            Self::Prefix { column, .. } => column,
        }
    }

    /// Statement text for this expression
    pub fn sql(&self) -> String {
        match self {
            Self::Column(ident) => ident.to_string(),
            Self::Lower(ident) => format!("LOWER({})", ident),
            Self::Prefix { column, len } => format!("substr({}, 1, {})", column, len),
        }
    }

    /// Key under which results for this expression are reported
    pub fn label(&self) -> String {
        self.sql()
    }
}

impl From<Ident> for FieldExpr {
    fn from(ident: Ident) -> Self {
        Self::Column(ident)
    }
}

/// Comparison operator for a single bound value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Gte,
    Lte,
    Lt,
}

impl CompareOp {
    fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Gte => ">=",
            Self::Lte => "<=",
            Self::Lt => "<",
        }
    }
}

/// One `WHERE` condition
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        expr: FieldExpr,
        op: CompareOp,
        value: SqlValue,
    },
    OneOf {
        expr: FieldExpr,
        values: Vec<SqlValue>,
    },
    StartsWith {
        expr: FieldExpr,
        prefix: String,
    },
    NotEmpty(FieldExpr),
}

impl Predicate {
    /// `column = value` on a column named in code
    pub fn eq(column: &'static str, value: impl Into<SqlValue>) -> Self {
        Self::compare(Ident::trusted(column), CompareOp::Eq, value)
    }

    /// `column IN (values...)` on a column named in code
    pub fn one_of<V: Into<SqlValue>>(column: &'static str, values: impl IntoIterator<Item = V>) -> Self {
        Self::OneOf {
            expr: FieldExpr::Column(Ident::trusted(column)),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Compare a checked column against a value
    pub fn compare(column: Ident, op: CompareOp, value: impl Into<SqlValue>) -> Self {
        Self::Compare {
            expr: FieldExpr::Column(column),
            op,
            value: value.into(),
        }
    }

    /// `column LIKE 'prefix%'`, with the prefix escaped
    pub fn starts_with(column: Ident, prefix: impl Into<String>) -> Self {
        Self::StartsWith {
            expr: FieldExpr::Column(column),
            prefix: prefix.into(),
        }
    }

    /// `expr != ''`
    pub fn not_empty(expr: FieldExpr) -> Self {
        Self::NotEmpty(expr)
    }

    fn render(&self, params: &mut Vec<SqlValue>) -> String {
        match self {
            Self::Compare { expr, op, value } => {
                let slot = bind(params, value.clone());
                format!("{} {} {}", expr.sql(), op.as_sql(), slot)
            }
            Self::OneOf { expr, values } => {
                if values.is_empty() {
                    return "1 = 0".to_string();
                }
                let slots: Vec<String> = values.iter().map(|v| bind(params, v.clone())).collect();
                format!("{} IN ({})", expr.sql(), slots.join(", "))
            }
            Self::StartsWith { expr, prefix } => {
                let pattern = format!("{}%", escape_like(prefix));
                let slot = bind(params, SqlValue::Text(pattern));
                format!("{} LIKE {} ESCAPE '\\'", expr.sql(), slot)
            }
            Self::NotEmpty(expr) => {
                let slot = bind(params, SqlValue::text(""));
                format!("{} != {}", expr.sql(), slot)
            }
        }
    }
}

fn bind(params: &mut Vec<SqlValue>, value: SqlValue) -> String {
    params.push(value);
    format!("?{}", params.len())
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Conjunction of predicates shared between related statements
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    predicates: Vec<Predicate>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a predicate (builder style)
    pub fn and(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn push(&mut self, predicate: Predicate) {
        self.predicates.push(predicate);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Predicate> {
        self.predicates.iter()
    }

    fn render(&self, params: &mut Vec<SqlValue>) -> Option<String> {
        if self.predicates.is_empty() {
            return None;
        }
        let parts: Vec<String> = self.predicates.iter().map(|p| p.render(params)).collect();
        Some(parts.join(" AND "))
    }
}

impl Extend<Predicate> for FilterSet {
    fn extend<T: IntoIterator<Item = Predicate>>(&mut self, iter: T) {
        self.predicates.extend(iter);
    }
}

/// What a statement returns
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// `COUNT(*)`
    CountAll,
    /// `COUNT(DISTINCT expr)`
    CountDistinct(FieldExpr),
    /// `(count, value)` pairs grouped by the expression
    ValueCounts(FieldExpr),
    /// Named columns
    Columns(&'static [&'static str]),
}

/// Sort key
#[derive(Debug, Clone, PartialEq)]
pub enum Order {
    CountDesc,
    ValueAsc,
    Desc(Ident),
}

impl Order {
    fn sql(&self) -> String {
        match self {
            Self::CountDesc => "count DESC".to_string(),
            Self::ValueAsc => "value ASC".to_string(),
            Self::Desc(ident) => format!("{} DESC", ident),
        }
    }
}

/// `SELECT` statement over one series
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    series: Series,
    projection: Projection,
    filters: FilterSet,
    group_by: Option<FieldExpr>,
    order: Vec<Order>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl Select {
    fn new(series: Series, projection: Projection) -> Self {
        Self {
            series,
            projection,
            filters: FilterSet::new(),
            group_by: None,
            order: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Count matching rows
    pub fn count(series: Series) -> Self {
        Self::new(series, Projection::CountAll)
    }

    /// Count distinct values of `expr`
    pub fn count_distinct(series: Series, expr: FieldExpr) -> Self {
        Self::new(series, Projection::CountDistinct(expr))
    }

    /// Per-value counts of `expr`, most frequent first, ties by value
    pub fn value_counts(series: Series, expr: FieldExpr) -> Self {
        let mut select = Self::new(series, Projection::ValueCounts(expr.clone()));
        select.group_by = Some(expr);
        select.order = vec![Order::CountDesc, Order::ValueAsc];
        select
    }

    /// Fetch the named columns
    pub fn columns(series: Series, columns: &'static [&'static str]) -> Self {
        Self::new(series, Projection::Columns(columns))
    }

    /// Add every predicate of a shared filter
    pub fn filter(mut self, filters: &FilterSet) -> Self {
        self.filters.extend(filters.iter().cloned());
        self
    }

    pub fn and(mut self, predicate: Predicate) -> Self {
        self.filters.push(predicate);
        self
    }

    pub fn order_by(mut self, order: Order) -> Self {
        self.order.push(order);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn series(&self) -> Series {
        self.series
    }

    /// Render text and parameters
    pub fn build(&self) -> Statement {
        let mut params = Vec::new();

        let projection = match &self.projection {
            Projection::CountAll => "COUNT(*)".to_string(),
            Projection::CountDistinct(expr) => format!("COUNT(DISTINCT {})", expr.sql()),
            Projection::ValueCounts(expr) => format!("COUNT(*) AS count, {} AS value", expr.sql()),
            Projection::Columns(columns) => columns.join(", "),
        };

        let mut sql = format!("SELECT {} FROM {}", projection, self.series.table());

        if let Some(clause) = self.filters.render(&mut params) {
            sql.push_str(" WHERE ");
            sql.push_str(&clause);
        }

        if let Some(expr) = &self.group_by {
            sql.push_str(" GROUP BY ");
            sql.push_str(&expr.sql());
        }

        if !self.order.is_empty() {
            let keys: Vec<String> = self.order.iter().map(Order::sql).collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&keys.join(", "));
        }

        match (self.limit, self.offset) {
            (Some(limit), offset) => {
                let slot = bind(&mut params, limit.into());
                sql.push_str(&format!(" LIMIT {}", slot));
                if let Some(offset) = offset {
                    let slot = bind(&mut params, offset.into());
                    sql.push_str(&format!(" OFFSET {}", slot));
                }
            }
            (None, Some(offset)) => {
                let slot = bind(&mut params, offset.into());
                sql.push_str(&format!(" LIMIT -1 OFFSET {}", slot));
            }
            (None, None) => {}
        }

        Statement::new(sql, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Ident {
        Ident::parse(name).unwrap()
    }

    #[test]
    fn test_ident_parse() {
        assert!(Ident::parse("contributor_lang").is_some());
        assert!(Ident::parse("_private").is_some());
        assert!(Ident::parse("").is_none());
        assert!(Ident::parse("lang; DROP").is_none());
        assert!(Ident::parse("a.b").is_none());
        assert!(Ident::parse("9lives").is_none());
    }

    #[test]
    fn test_field_expr_parse() {
        assert_eq!(
            FieldExpr::parse("contributor_lang"),
            Some(FieldExpr::Column(ident("contributor_lang")))
        );
        assert_eq!(FieldExpr::parse("LOWER(tag)"), Some(FieldExpr::Lower(ident("tag"))));
        assert_eq!(FieldExpr::parse(" lower( keyword ) "), Some(FieldExpr::Lower(ident("keyword"))));
        assert_eq!(FieldExpr::parse("LOWER(tag) || 'x'"), None);
        assert_eq!(FieldExpr::parse("UPPER(tag)"), None);
        assert_eq!(FieldExpr::parse("lower(tag); --)"), None);
    }

    #[test]
    fn test_prefix_precision_clamped() {
        let geo = ident("contributor_geohash");
        assert_eq!(
            FieldExpr::prefix(geo.clone(), 0).sql(),
            "substr(contributor_geohash, 1, 1)"
        );
        assert_eq!(
            FieldExpr::prefix(geo.clone(), 99).sql(),
            "substr(contributor_geohash, 1, 12)"
        );
        assert_eq!(FieldExpr::prefix(geo, 7).label(), "substr(contributor_geohash, 1, 7)");
    }

    #[test]
    fn test_count_statement() {
        let filters = FilterSet::new()
            .and(Predicate::eq("territory", "north"))
            .and(Predicate::compare(ident("time"), CompareOp::Gte, "2014-10-01"))
            .and(Predicate::compare(ident("time"), CompareOp::Lte, "2014-10-02"));

        let stmt = Select::count(Series::Messages).filter(&filters).build();

        assert_eq!(
            stmt.sql(),
            "SELECT COUNT(*) FROM messages WHERE territory = ?1 AND time >= ?2 AND time <= ?3"
        );
        assert_eq!(
            stmt.params(),
            &[
                SqlValue::text("north"),
                SqlValue::text("2014-10-01"),
                SqlValue::text("2014-10-02")
            ]
        );
    }

    #[test]
    fn test_values_never_enter_text() {
        let hostile = "x' OR '1'='1";
        let stmt = Select::count(Series::Mentions)
            .and(Predicate::eq("territory", hostile))
            .and(Predicate::one_of("network", [hostile, "twitter"]))
            .build();

        assert!(!stmt.sql().contains(hostile));
        assert!(!stmt.sql().contains('\''));
        assert_eq!(stmt.params().len(), 3);
    }

    #[test]
    fn test_value_counts_with_pagination() {
        let expr = FieldExpr::column(ident("contributor_lang"));
        let stmt = Select::value_counts(Series::Messages, expr.clone())
            .and(Predicate::eq("territory", "north"))
            .and(Predicate::not_empty(expr))
            .limit(10)
            .offset(20)
            .build();

        assert_eq!(
            stmt.sql(),
            "SELECT COUNT(*) AS count, contributor_lang AS value FROM messages \
             WHERE territory = ?1 AND contributor_lang != ?2 \
             GROUP BY contributor_lang ORDER BY count DESC, value ASC LIMIT ?3 OFFSET ?4"
        );
        assert_eq!(stmt.params()[2], SqlValue::Integer(10));
        assert_eq!(stmt.params()[3], SqlValue::Integer(20));
    }

    #[test]
    fn test_offset_without_limit() {
        let stmt = Select::count_distinct(Series::Hashtags, FieldExpr::lower(ident("tag")))
            .offset(5)
            .build();

        assert_eq!(
            stmt.sql(),
            "SELECT COUNT(DISTINCT LOWER(tag)) FROM hashtags LIMIT -1 OFFSET ?1"
        );
    }

    #[test]
    fn test_starts_with_escapes_wildcards() {
        let stmt = Select::count(Series::Messages)
            .and(Predicate::starts_with(ident("contributor_geohash"), "9q_%"))
            .build();

        assert_eq!(
            stmt.sql(),
            "SELECT COUNT(*) FROM messages WHERE contributor_geohash LIKE ?1 ESCAPE '\\'"
        );
        assert_eq!(stmt.params()[0], SqlValue::text("9q\\_\\%%"));
    }

    #[test]
    fn test_empty_one_of_matches_nothing() {
        let stmt = Select::count(Series::SharedLinks)
            .and(Predicate::one_of::<&str>("type", []))
            .build();
        assert_eq!(stmt.sql(), "SELECT COUNT(*) FROM shared_links WHERE 1 = 0");
        assert!(stmt.params().is_empty());
    }

    #[test]
    fn test_columns_projection_ordered() {
        const COLS: &[&str] = &["time", "message"];
        let stmt = Select::columns(Series::Messages, COLS)
            .order_by(Order::Desc(ident("time")))
            .limit(3)
            .build();

        assert_eq!(
            stmt.sql(),
            "SELECT time, message FROM messages ORDER BY time DESC LIMIT ?1"
        );
    }
}
