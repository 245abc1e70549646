//! Data Transfer Objects
//!
//! Request and response types for the API endpoints. Successful responses
//! share the hypermedia envelope:
//!
//! ```json
//! { "_links": { "self": { "href": "/territory/list" } },
//!   "meta": { "success": true, "from": "...", "to": "..." },
//!   "data": { ... } }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::TerritoryConfig;
use crate::query::{
    AggregateFieldResult, BasicConditions, FieldCounts, Pagination, RawQueryParameters,
};

// ============================================
// ENVELOPE
// ============================================

/// Link to a related route (RFC 6570 template)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypermediaLink {
    pub href: String,
}

/// Response metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseMeta {
    pub success: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub from: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub to: String,
}

/// Hypermedia response envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct HypermediaResource<T> {
    #[serde(rename = "_links")]
    pub links: BTreeMap<String, HypermediaLink>,
    pub meta: ResponseMeta,
    pub data: T,
}

/// Every territory route, by relation name
const TERRITORY_LINKS: &[(&str, &str)] = &[
    ("territory:list", "/territory/list"),
    (
        "territory:count",
        "/territory/count/{territory}/{series}/{field}{?from,to,network,fieldValue}",
    ),
    (
        "territory:timeseries-count",
        "/territory/timeseries/count/{territory}/{series}/{field}{?from,to,network,fieldValue,resolution}",
    ),
    (
        "territory:aggregate",
        "/territory/aggregate/{territory}/{series}{?from,to,fields,limit,skip}",
    ),
    (
        "territory:messages",
        "/territory/messages/{territory}{?from,to,limit,skip,network,lang,country,geohash,gender,questions}",
    ),
    ("territory:top-images", "/territory/top/images/{territory}{?from,to,limit,skip}"),
    ("territory:top-videos", "/territory/top/videos/{territory}{?from,to,limit,skip}"),
    ("territory:top-audio", "/territory/top/audio/{territory}{?from,to,limit,skip}"),
    ("territory:top-links", "/territory/top/links/{territory}{?from,to,limit,skip}"),
    (
        "territory:top-locations",
        "/territory/top/locations/{territory}{?from,to,limit,skip,precision}",
    ),
    ("territory:top-keywords", "/territory/top/keywords/{territory}{?from,to,limit,skip}"),
    ("territory:top-hashtags", "/territory/top/hashtags/{territory}{?from,to,limit,skip}"),
];

impl<T: Serialize> HypermediaResource<T> {
    pub fn new(data: T) -> Self {
        Self {
            links: BTreeMap::new(),
            meta: ResponseMeta::default(),
            data,
        }
    }

    /// Envelope carrying every territory link, `self_rel` listed as `self`
    pub fn territory(self_rel: &str, data: T) -> Self {
        let mut resource = Self::new(data);
        for (rel, href) in TERRITORY_LINKS {
            let rel = if *rel == self_rel { "self" } else { *rel };
            resource = resource.link(rel, *href);
        }
        resource
    }

    pub fn link(mut self, rel: &str, href: &str) -> Self {
        self.links.insert(
            rel.to_string(),
            HypermediaLink {
                href: href.to_string(),
            },
        );
        self
    }

    /// Echo the queried time window
    pub fn window(mut self, from: &str, to: &str) -> Self {
        self.meta.from = from.to_string();
        self.meta.to = to.to_string();
        self
    }

    pub fn success(mut self) -> Self {
        self.meta.success = true;
        self
    }
}

// ============================================
// TERRITORY REQUESTS
// ============================================

/// Query string of `/territory/count`
#[derive(Debug, Default, Deserialize)]
pub struct CountQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub network: Option<String>,
    #[serde(rename = "fieldValue")]
    pub field_value: Option<String>,
    pub limit: Option<u64>,
    pub skip: Option<u64>,
}

impl CountQuery {
    pub fn raw(&self, territory: &str, series: &str, field: &str, page: Pagination) -> RawQueryParameters {
        RawQueryParameters {
            from: self.from.clone().unwrap_or_default(),
            to: self.to.clone().unwrap_or_default(),
            territory: territory.to_string(),
            network: self.network.clone().unwrap_or_default(),
            field: field.to_string(),
            series: series.to_string(),
            limit: page.limit,
            skip: page.skip,
        }
    }
}

/// Query string of `/territory/timeseries/count`
#[derive(Debug, Default, Deserialize)]
pub struct TimeseriesQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub network: Option<String>,
    #[serde(rename = "fieldValue")]
    pub field_value: Option<String>,
    /// Window width in minutes
    pub resolution: Option<i64>,
}

impl TimeseriesQuery {
    pub fn raw(&self, territory: &str, series: &str, field: &str) -> RawQueryParameters {
        RawQueryParameters {
            from: self.from.clone().unwrap_or_default(),
            to: self.to.clone().unwrap_or_default(),
            territory: territory.to_string(),
            network: self.network.clone().unwrap_or_default(),
            field: field.to_string(),
            series: series.to_string(),
            ..Default::default()
        }
    }
}

/// Query string of `/territory/aggregate` and `/territory/top/*`
#[derive(Debug, Default, Deserialize)]
pub struct AggregateQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    /// Comma separated field list
    pub fields: Option<String>,
    pub limit: Option<u64>,
    pub skip: Option<u64>,
    /// Geohash prefix length for `top/locations`
    pub precision: Option<i64>,
}

impl AggregateQuery {
    pub fn raw(&self, territory: &str, series: &str) -> RawQueryParameters {
        RawQueryParameters {
            from: self.from.clone().unwrap_or_default(),
            to: self.to.clone().unwrap_or_default(),
            territory: territory.to_string(),
            series: series.to_string(),
            limit: self.limit.unwrap_or(0),
            skip: self.skip.unwrap_or(0),
            ..Default::default()
        }
    }

    /// Trimmed, non-empty entries of `fields`
    pub fn field_list(&self) -> Vec<&str> {
        self.fields
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .collect()
    }
}

/// Query string of `/territory/messages`
#[derive(Debug, Default, Deserialize)]
pub struct MessagesQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub network: Option<String>,
    pub limit: Option<u64>,
    pub skip: Option<u64>,
    pub gender: Option<String>,
    pub lang: Option<String>,
    pub country: Option<String>,
    pub geohash: Option<String>,
    /// Presence flag; any value selects questions only
    pub questions: Option<String>,
}

impl MessagesQuery {
    pub fn raw(&self, territory: &str, page: Pagination) -> RawQueryParameters {
        RawQueryParameters {
            from: self.from.clone().unwrap_or_default(),
            to: self.to.clone().unwrap_or_default(),
            territory: territory.to_string(),
            network: self.network.clone().unwrap_or_default(),
            series: "messages".to_string(),
            limit: page.limit,
            skip: page.skip,
            ..Default::default()
        }
    }

    pub fn conditions(&self) -> BasicConditions {
        let mut conditions = BasicConditions::new().questions_only(self.questions.is_some());
        if let Some(gender) = &self.gender {
            conditions = conditions.gender(gender);
        }
        if let Some(lang) = &self.lang {
            conditions = conditions.lang(lang.as_str());
        }
        if let Some(country) = &self.country {
            conditions = conditions.country(country.as_str());
        }
        if let Some(geohash) = &self.geohash {
            conditions = conditions.geohash(geohash);
        }
        conditions
    }
}

// ============================================
// TERRITORY RESPONSES
// ============================================

/// `/territory/list` data
#[derive(Debug, Serialize, Deserialize)]
pub struct TerritoryListData {
    pub territories: Vec<TerritoryConfig>,
}

/// `/territory/count` data
#[derive(Debug, Serialize, Deserialize)]
pub struct CountData {
    pub count: u64,
    pub limit: u64,
    pub skip: u64,
}

/// `/territory/aggregate` and `/territory/top/*` data
#[derive(Debug, Serialize)]
pub struct AggregateData {
    pub aggregate: Vec<AggregateFieldResult>,
    pub total: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,
    /// Set when `total` could not be counted
    #[serde(rename = "totalFailed", skip_serializing_if = "std::ops::Not::not")]
    pub total_failed: bool,
}

impl From<FieldCounts> for AggregateData {
    fn from(counts: FieldCounts) -> Self {
        Self {
            aggregate: counts.results,
            total: counts.total.count,
            skipped: counts.skipped,
            total_failed: counts.total_failed,
        }
    }
}

// ============================================
// DATABASE / HEALTH
// ============================================

/// `/database/info` data
#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseInfo {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "hasAccess")]
    pub has_access: bool,
}

/// Full health status
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub store: String,
    pub uptime_seconds: u64,
    pub version: String,
}
