//! Territory Routes
//!
//! Counting, aggregation and listing over one harvested territory.
//!
//! - GET /territory/list - Configured territories
//! - GET /territory/count/:territory/:series/:field - Simple count
//! - GET /territory/timeseries/count/:territory/:series/:field - Windowed counts (NDJSON)
//! - GET /territory/aggregate/:territory/:series - Field counts
//! - GET /territory/messages/:territory - Paginated messages
//! - GET /territory/top/:kind/:territory - Top-N presets

use axum::{
    body::{Body, Bytes},
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use futures_util::StreamExt;
use std::convert::Infallible;
use std::sync::Arc;

use crate::api::dto::{
    AggregateData, AggregateQuery, CountData, CountQuery, HypermediaResource, MessagesQuery,
    TerritoryListData, TimeseriesQuery,
};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::query::{
    FieldExpr, MessagePage, Pagination, QueryError, QueryResult, ResultCount, TopPreset,
};

/// GET /territory/list
pub async fn list(State(state): State<Arc<AppState>>) -> Json<HypermediaResource<TerritoryListData>> {
    let data = TerritoryListData {
        territories: state.territories.as_ref().clone(),
    };

    Json(HypermediaResource::territory("territory:list", data).success())
}

/// GET /territory/count/:territory/:series/:field
///
/// Count rows of a series, optionally where `field = fieldValue`.
pub async fn count(
    State(state): State<Arc<AppState>>,
    Path((territory, series, field)): Path<(String, String, String)>,
    Query(query): Query<CountQuery>,
) -> ApiResult<Json<HypermediaResource<CountData>>> {
    let page = Pagination::clamp(query.limit, query.skip);
    let params = query.raw(&territory, &series, &field, page).validate()?;

    let result = state
        .executor
        .count(&params, query.field_value.as_deref())
        .await?;

    let data = CountData {
        count: result.count,
        limit: page.limit,
        skip: page.skip,
    };

    Ok(Json(
        HypermediaResource::territory("territory:count", data)
            .window(&result.time_from, &result.time_to)
            .success(),
    ))
}

/// GET /territory/timeseries/count/:territory/:series/:field
///
/// One JSON count per line, written as each window completes. A failure
/// after the first line ends the body with an error line.
pub async fn timeseries_count(
    State(state): State<Arc<AppState>>,
    Path((territory, series, field)): Path<(String, String, String)>,
    Query(query): Query<TimeseriesQuery>,
) -> ApiResult<Response> {
    let params = query.raw(&territory, &series, &field).validate()?;
    let resolution = query.resolution.unwrap_or(0);

    let counts = state
        .executor
        .timeseries_count(&params, query.field_value.as_deref(), resolution)
        .await?;

    tracing::debug!(
        territory = params.territory(),
        windows = counts.windows(),
        "Streaming time series"
    );

    let body = counts
        .into_stream()
        .map(|item| Ok::<_, Infallible>(ndjson_line(item)));

    Ok((
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(body),
    )
        .into_response())
}

fn ndjson_line(item: QueryResult<ResultCount>) -> Bytes {
    let encoded = match item {
        Ok(count) => serde_json::to_vec(&count).map_err(ApiError::from),
        Err(e) => Err(ApiError::from(e)),
    };

    let mut line = encoded.unwrap_or_else(|e| {
        let (_, code) = e.status();
        tracing::warn!(error = %e, "Time series window failed");
        serde_json::json!({ "error": { "code": code, "message": e.public_message() } })
            .to_string()
            .into_bytes()
    });
    line.push(b'\n');
    Bytes::from(line)
}

/// GET /territory/aggregate/:territory/:series
///
/// Grouped and distinct counts for each of `fields`. Every field must be
/// a column of the series, optionally wrapped in `LOWER`/`UPPER`.
pub async fn aggregate(
    State(state): State<Arc<AppState>>,
    Path((territory, series)): Path<(String, String)>,
    Query(query): Query<AggregateQuery>,
) -> ApiResult<Json<HypermediaResource<AggregateData>>> {
    let params = query.raw(&territory, &series).validate()?;

    let field_list = query.field_list();
    if field_list.is_empty() {
        return Err(ApiError::Validation("fields is required".to_string()));
    }

    let fields = field_list
        .into_iter()
        .map(|f| -> ApiResult<FieldExpr> {
            let expr = FieldExpr::parse(f)
                .ok_or_else(|| ApiError::Validation(format!("unsupported field '{}'", f)))?;
            match params.series() {
                Some(series) if !series.has_column(expr.ident().as_str()) => {
                    Err(QueryError::rejected("fields", f).into())
                }
                _ => Ok(expr),
            }
        })
        .collect::<ApiResult<Vec<_>>>()?;

    let counts = state.executor.field_counts(&params, &fields, &[]).await?;

    Ok(Json(
        HypermediaResource::territory("territory:aggregate", AggregateData::from(counts))
            .window(params.from(), params.to())
            .success(),
    ))
}

/// GET /territory/messages/:territory
pub async fn messages(
    State(state): State<Arc<AppState>>,
    Path(territory): Path<String>,
    Query(query): Query<MessagesQuery>,
) -> ApiResult<Json<HypermediaResource<MessagePage>>> {
    let page = Pagination::clamp(query.limit, query.skip);
    let params = query.raw(&territory, page).validate()?;

    let listing = state.executor.messages(&params, &query.conditions()).await?;

    Ok(Json(
        HypermediaResource::territory("territory:messages", listing)
            .window(params.from(), params.to())
            .success(),
    ))
}

/// GET /territory/top/:kind/:territory
///
/// `kind` is one of images, videos, audio, links, keywords, hashtags or
/// locations.
pub async fn top(
    State(state): State<Arc<AppState>>,
    Path((kind, territory)): Path<(String, String)>,
    Query(query): Query<AggregateQuery>,
) -> ApiResult<Json<HypermediaResource<AggregateData>>> {
    let preset = TopPreset::parse(&kind, query.precision)
        .ok_or_else(|| ApiError::NotFound(format!("No top report named '{}'", kind)))?;

    let params = query.raw(&territory, "").validate()?;
    let counts = state.executor.top(preset, &params).await?;

    let rel = format!("territory:top-{}", preset.name());
    Ok(Json(
        HypermediaResource::territory(&rel, AggregateData::from(counts))
            .window(params.from(), params.to())
            .success(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{get, get_json, test_app};
    use crate::store::StoreError;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_list_territories() {
        let (status, json) = get_json(test_app(), "/territory/list").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["meta"]["success"], true);
        assert_eq!(json["_links"]["self"]["href"], "/territory/list");
        assert_eq!(json["data"]["territories"][0]["name"], "north");
    }

    #[tokio::test]
    async fn test_count() {
        let (status, json) = get_json(
            test_app(),
            "/territory/count/north/messages/contributor_lang?from=2014-10-01&to=2014-10-02&fieldValue=en",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["count"], 2);
        assert_eq!(json["data"]["limit"], 100);
        assert_eq!(json["meta"]["from"], "2014-10-01");
        assert!(json["_links"]["self"]["href"]
            .as_str()
            .unwrap()
            .starts_with("/territory/count/"));
    }

    #[tokio::test]
    async fn test_count_rejects_unsafe_territory() {
        let (status, json) = get_json(
            test_app(),
            "/territory/count/north%3Bdrop/messages/contributor_lang",
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "REJECTED_PARAMETER");
    }

    #[tokio::test]
    async fn test_count_unknown_series_rejected() {
        let (status, _) = get_json(test_app(), "/territory/count/north/users/name").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_count_unknown_column_rejected() {
        let (status, json) = get_json(
            test_app(),
            "/territory/count/north/messages/no_such_column?fieldValue=x",
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "REJECTED_PARAMETER");
        assert!(!json["error"]["message"].as_str().unwrap().contains("SELECT"));
    }

    #[tokio::test]
    async fn test_timeseries_ndjson() {
        let response = get(
            test_app(),
            "/territory/timeseries/count/north/messages/network?from=2014-10-01&to=2014-10-02&resolution=720&fieldValue=twitter",
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/x-ndjson"
        );

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let lines: Vec<serde_json::Value> = std::str::from_utf8(&bytes)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["count"], 2);
        assert_eq!(lines[0]["timeFrom"], "2014-10-01 00:00:00");
        assert_eq!(lines[1]["count"], 1);
        assert_eq!(lines[1]["timeTo"], "2014-10-02 00:00:00");
    }

    #[tokio::test]
    async fn test_timeseries_requires_resolution() {
        let (status, json) = get_json(
            test_app(),
            "/territory/timeseries/count/north/messages/network?from=2014-10-01&to=2014-10-02",
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "INVALID_TIME_RANGE");
    }

    #[test]
    fn test_ndjson_error_line() {
        let line = ndjson_line(Err(QueryError::InvalidTimeRange("late".to_string())));
        let json: serde_json::Value = serde_json::from_slice(&line).unwrap();

        assert!(line.ends_with(b"\n"));
        assert_eq!(json["error"]["code"], "INVALID_TIME_RANGE");
    }

    #[test]
    fn test_ndjson_store_error_line_is_generic() {
        let line = ndjson_line(Err(QueryError::Store(StoreError::Mapping(
            "SELECT COUNT(*) FROM messages returned no rows".to_string(),
        ))));
        let json: serde_json::Value = serde_json::from_slice(&line).unwrap();

        assert_eq!(json["error"]["code"], "STORE_UNAVAILABLE");
        assert_eq!(json["error"]["message"], "Event store unavailable");
    }

    #[tokio::test]
    async fn test_aggregate() {
        let (status, json) = get_json(
            test_app(),
            "/territory/aggregate/north/messages?from=2014-10-01&to=2014-10-02&fields=contributor_lang,network",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["total"], 4);

        let aggregate = json["data"]["aggregate"].as_array().unwrap();
        assert_eq!(aggregate.len(), 2);
        assert_eq!(aggregate[0]["field"], "contributor_lang");
        assert_eq!(aggregate[0]["counts"][0]["value"], "en");
        assert_eq!(aggregate[0]["counts"][0]["count"], 2);
        assert!(json["data"].get("skipped").is_none());
    }

    #[tokio::test]
    async fn test_aggregate_rejects_bad_field() {
        let (status, json) = get_json(
            test_app(),
            "/territory/aggregate/north/messages?fields=contributor_lang,count(*)",
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_aggregate_rejects_unknown_column() {
        let (status, json) = get_json(
            test_app(),
            "/territory/aggregate/north/messages?fields=contributor_lang,LOWER(tag)",
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "REJECTED_PARAMETER");
    }

    #[tokio::test]
    async fn test_aggregate_requires_fields() {
        for uri in [
            "/territory/aggregate/north/messages",
            "/territory/aggregate/north/messages?fields=%20,",
        ] {
            let (status, json) = get_json(test_app(), uri).await;

            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
            assert!(json.get("meta").is_none());
        }
    }

    #[tokio::test]
    async fn test_messages_with_conditions() {
        let (status, json) = get_json(
            test_app(),
            "/territory/messages/north?from=2014-10-01&to=2014-10-02&gender=female&questions",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["total"], 1);
        assert_eq!(json["data"]["messages"][0]["messageId"], "m1");
        assert_eq!(json["data"]["messages"][0]["isQuestion"], true);
    }

    #[tokio::test]
    async fn test_messages_limit_clamped() {
        let (status, json) = get_json(test_app(), "/territory/messages/north?limit=5000&skip=1").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["limit"], 100);
        assert_eq!(json["data"]["skip"], 1);
        assert_eq!(json["data"]["total"], 5);
        assert_eq!(json["data"]["messages"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_top_images() {
        let (status, json) = get_json(
            test_app(),
            "/territory/top/images/north?from=2014-10-01&to=2014-10-02",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["total"], 3);
        assert_eq!(
            json["data"]["aggregate"][0]["counts"][0]["value"],
            "http://a.example/cat.jpg"
        );
        assert!(json["_links"]["self"]["href"]
            .as_str()
            .unwrap()
            .starts_with("/territory/top/images/"));
    }

    #[tokio::test]
    async fn test_top_unknown_kind() {
        let (status, json) = get_json(test_app(), "/territory/top/podcasts/north").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"], "NOT_FOUND");
    }
}
