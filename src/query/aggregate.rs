//! Aggregate field counter
//!
//! For a territory and window, reports per requested field the most frequent
//! non-empty values and how many distinct values there are, alongside the
//! total row count. The top-N presets are fixed calls into the same counter.
//!
//! Statements per call: one total, then two per field. A failing field is
//! logged and skipped; the others still report.

use crate::query::builder::{FieldExpr, FilterSet, Ident, Predicate, Select};
use crate::query::error::{QueryError, QueryResult};
use crate::query::executor::{scope_filter, QueryExecutor, RangeEnd};
use crate::query::params::QueryParameters;
use crate::query::results::{AggregateFieldResult, FieldCounts, ResultCount, ValueCount};
use crate::query::series::Series;
use crate::store::StoreError;

/// Geohash prefix length used when the caller gives none
pub const DEFAULT_PRECISION: i64 = 7;

/// Canned top-N reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopPreset {
    Images,
    Videos,
    Audio,
    Links,
    Keywords,
    Hashtags,
    /// Geohash prefixes of contributor locations
    Locations { precision: i64 },
}

impl TopPreset {
    /// Preset by route name; `precision` only applies to `locations`
    pub fn parse(kind: &str, precision: Option<i64>) -> Option<Self> {
        match kind {
            "images" => Some(Self::Images),
            "videos" => Some(Self::Videos),
            "audio" => Some(Self::Audio),
            "links" => Some(Self::Links),
            "keywords" => Some(Self::Keywords),
            "hashtags" => Some(Self::Hashtags),
            "locations" => Some(Self::Locations {
                precision: precision.unwrap_or(DEFAULT_PRECISION),
            }),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Images => "images",
            Self::Videos => "videos",
            Self::Audio => "audio",
            Self::Links => "links",
            Self::Keywords => "keywords",
            Self::Hashtags => "hashtags",
            Self::Locations { .. } => "locations",
        }
    }

    pub fn series(&self) -> Series {
        match self {
            Self::Images | Self::Videos | Self::Audio | Self::Links => Series::SharedLinks,
            Self::Keywords | Self::Hashtags => Series::Hashtags,
            Self::Locations { .. } => Series::Messages,
        }
    }

    pub fn fields(&self) -> Vec<FieldExpr> {
        let field = match self {
            Self::Images | Self::Videos | Self::Audio | Self::Links => {
                FieldExpr::column(Ident::trusted("expanded_url"))
            }
            Self::Keywords => FieldExpr::lower(Ident::trusted("keyword")),
            Self::Hashtags => FieldExpr::lower(Ident::trusted("tag")),
            Self::Locations { precision } => {
                FieldExpr::prefix(Ident::trusted("contributor_geohash"), *precision)
            }
        };
        vec![field]
    }

    pub fn predicates(&self) -> Vec<Predicate> {
        match self {
            Self::Images => vec![Predicate::one_of("type", ["photo", "image"])],
            Self::Videos => vec![Predicate::eq("type", "video")],
            Self::Audio => vec![Predicate::eq("type", "audio")],
            Self::Links => vec![Predicate::eq("type", "")],
            Self::Keywords | Self::Hashtags | Self::Locations { .. } => Vec::new(),
        }
    }
}

impl QueryExecutor {
    /// Grouped and distinct counts for each field, plus the shared total
    ///
    /// `extra` narrows every statement (total included) and is trusted: it
    /// comes from code, never from the caller.
    pub async fn field_counts(
        &self,
        params: &QueryParameters,
        fields: &[FieldExpr],
        extra: &[Predicate],
    ) -> QueryResult<FieldCounts> {
        let series = match params.series() {
            Some(series) if !params.territory().is_empty() && !fields.is_empty() => series,
            _ => return Ok(FieldCounts::empty(params)),
        };

        let mut scope = scope_filter(params, RangeEnd::Inclusive);
        scope.extend(extra.iter().cloned());

        let mut total_error: Option<StoreError> = None;
        let total = match self.fetch_count(&Select::count(series).filter(&scope).build()).await {
            Ok(total) => total,
            Err(e) => {
                tracing::error!(series = %series, error = %e, "Failed to count aggregate total");
                total_error = Some(e);
                0
            }
        };

        let mut results = Vec::with_capacity(fields.len());
        let mut skipped = Vec::new();

        for field in fields {
            let label = field.label();
            match self.field_result(series, params, &scope, field, total).await {
                Ok(result) => results.push(result),
                Err(e) => {
                    tracing::error!(
                        series = %series,
                        field = %label,
                        error = %e,
                        "Skipping field after store error"
                    );
                    skipped.push(label);
                }
            }
        }

        let total_failed = total_error.is_some();
        if let Some(e) = total_error {
            if results.is_empty() {
                return Err(QueryError::Store(e));
            }
        }

        Ok(FieldCounts {
            results,
            total: ResultCount::for_window(params, total),
            skipped,
            total_failed,
        })
    }

    async fn field_result(
        &self,
        series: Series,
        params: &QueryParameters,
        scope: &FilterSet,
        field: &FieldExpr,
        total: u64,
    ) -> Result<AggregateFieldResult, StoreError> {
        let non_empty = Predicate::not_empty(field.clone());

        let mut grouped = Select::value_counts(series, field.clone())
            .filter(scope)
            .and(non_empty.clone());
        if params.limit() > 0 {
            grouped = grouped.limit(params.limit());
        }
        if params.skip() > 0 {
            grouped = grouped.offset(params.skip());
        }
        let counts: Vec<ValueCount> = self.fetch_as(&grouped.build()).await?;

        let distinct = Select::count_distinct(series, field.clone())
            .filter(scope)
            .and(non_empty)
            .build();
        let distinct = self.fetch_count(&distinct).await?;

        Ok(AggregateFieldResult {
            field: field.label(),
            counts,
            distinct,
            time_from: params.from().to_string(),
            time_to: params.to().to_string(),
            total,
        })
    }

    /// Run a top-N preset
    pub async fn top(&self, preset: TopPreset, params: &QueryParameters) -> QueryResult<FieldCounts> {
        let params = params.clone().with_series(preset.series());
        self.field_counts(&params, &preset.fields(), &preset.predicates())
            .await
    }
}
