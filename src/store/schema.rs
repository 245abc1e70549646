//! Series table definitions
//!
//! One table per registered series. Times are stored as `YYYY-MM-DD HH:MM:SS`
//! text so range predicates compare lexically, and every table carries a
//! `(territory, time)` index since every query is scoped that way.

use crate::query::Series;

/// DDL for a series table
pub fn table_ddl(series: Series) -> &'static str {
    match series {
        Series::Messages => {
            "CREATE TABLE IF NOT EXISTS messages (
                time TEXT NOT NULL,
                harvest_id TEXT NOT NULL DEFAULT '',
                territory TEXT NOT NULL,
                network TEXT NOT NULL DEFAULT '',
                message_id TEXT NOT NULL DEFAULT '',
                contributor_id TEXT NOT NULL DEFAULT '',
                contributor_screen_name TEXT NOT NULL DEFAULT '',
                contributor_name TEXT NOT NULL DEFAULT '',
                contributor_gender INTEGER NOT NULL DEFAULT 0,
                contributor_type TEXT NOT NULL DEFAULT '',
                contributor_longitude REAL,
                contributor_latitude REAL,
                contributor_geohash TEXT NOT NULL DEFAULT '',
                contributor_lang TEXT NOT NULL DEFAULT '',
                contributor_country TEXT NOT NULL DEFAULT '',
                contributor_city TEXT NOT NULL DEFAULT '',
                contributor_followers INTEGER NOT NULL DEFAULT 0,
                message TEXT NOT NULL DEFAULT '',
                is_question INTEGER NOT NULL DEFAULT 0,
                category TEXT NOT NULL DEFAULT ''
            )"
        }
        Series::SharedLinks => {
            "CREATE TABLE IF NOT EXISTS shared_links (
                time TEXT NOT NULL,
                harvest_id TEXT NOT NULL DEFAULT '',
                territory TEXT NOT NULL,
                network TEXT NOT NULL DEFAULT '',
                message_id TEXT NOT NULL DEFAULT '',
                contributor_id TEXT NOT NULL DEFAULT '',
                contributor_screen_name TEXT NOT NULL DEFAULT '',
                contributor_gender INTEGER NOT NULL DEFAULT 0,
                contributor_lang TEXT NOT NULL DEFAULT '',
                contributor_country TEXT NOT NULL DEFAULT '',
                contributor_geohash TEXT NOT NULL DEFAULT '',
                url TEXT NOT NULL DEFAULT '',
                expanded_url TEXT NOT NULL DEFAULT '',
                host TEXT NOT NULL DEFAULT '',
                domain TEXT NOT NULL DEFAULT '',
                path TEXT NOT NULL DEFAULT '',
                type TEXT NOT NULL DEFAULT '',
                source TEXT NOT NULL DEFAULT ''
            )"
        }
        Series::Mentions => {
            "CREATE TABLE IF NOT EXISTS mentions (
                time TEXT NOT NULL,
                harvest_id TEXT NOT NULL DEFAULT '',
                territory TEXT NOT NULL,
                network TEXT NOT NULL DEFAULT '',
                message_id TEXT NOT NULL DEFAULT '',
                contributor_id TEXT NOT NULL DEFAULT '',
                contributor_screen_name TEXT NOT NULL DEFAULT '',
                contributor_gender INTEGER NOT NULL DEFAULT 0,
                contributor_lang TEXT NOT NULL DEFAULT '',
                contributor_country TEXT NOT NULL DEFAULT '',
                contributor_geohash TEXT NOT NULL DEFAULT '',
                mentioned_id TEXT NOT NULL DEFAULT '',
                mentioned_screen_name TEXT NOT NULL DEFAULT '',
                mentioned_name TEXT NOT NULL DEFAULT '',
                mentioned_type TEXT NOT NULL DEFAULT ''
            )"
        }
        Series::Hashtags => {
            "CREATE TABLE IF NOT EXISTS hashtags (
                time TEXT NOT NULL,
                harvest_id TEXT NOT NULL DEFAULT '',
                territory TEXT NOT NULL,
                network TEXT NOT NULL DEFAULT '',
                message_id TEXT NOT NULL DEFAULT '',
                tag TEXT NOT NULL DEFAULT '',
                keyword TEXT NOT NULL DEFAULT '',
                contributor_id TEXT NOT NULL DEFAULT '',
                contributor_screen_name TEXT NOT NULL DEFAULT '',
                contributor_gender INTEGER NOT NULL DEFAULT 0,
                contributor_lang TEXT NOT NULL DEFAULT '',
                contributor_country TEXT NOT NULL DEFAULT '',
                contributor_geohash TEXT NOT NULL DEFAULT ''
            )"
        }
        Series::ContributorGrowth => {
            "CREATE TABLE IF NOT EXISTS contributor_growth (
                time TEXT NOT NULL,
                harvest_id TEXT NOT NULL DEFAULT '',
                territory TEXT NOT NULL,
                network TEXT NOT NULL DEFAULT '',
                contributor_id TEXT NOT NULL DEFAULT '',
                likes INTEGER NOT NULL DEFAULT 0,
                talking_about INTEGER NOT NULL DEFAULT 0,
                were_here INTEGER NOT NULL DEFAULT 0,
                checkins INTEGER NOT NULL DEFAULT 0,
                views INTEGER NOT NULL DEFAULT 0,
                status_updates INTEGER NOT NULL DEFAULT 0,
                listed INTEGER NOT NULL DEFAULT 0,
                favorites INTEGER NOT NULL DEFAULT 0,
                followers INTEGER NOT NULL DEFAULT 0,
                following INTEGER NOT NULL DEFAULT 0,
                comments INTEGER NOT NULL DEFAULT 0,
                plus_ones INTEGER NOT NULL DEFAULT 0
            )"
        }
    }
}

/// Columns of a series table, in DDL order
pub fn columns(series: Series) -> &'static [&'static str] {
    match series {
        Series::Messages => &[
            "time",
            "harvest_id",
            "territory",
            "network",
            "message_id",
            "contributor_id",
            "contributor_screen_name",
            "contributor_name",
            "contributor_gender",
            "contributor_type",
            "contributor_longitude",
            "contributor_latitude",
            "contributor_geohash",
            "contributor_lang",
            "contributor_country",
            "contributor_city",
            "contributor_followers",
            "message",
            "is_question",
            "category",
        ],
        Series::SharedLinks => &[
            "time",
            "harvest_id",
            "territory",
            "network",
            "message_id",
            "contributor_id",
            "contributor_screen_name",
            "contributor_gender",
            "contributor_lang",
            "contributor_country",
            "contributor_geohash",
            "url",
            "expanded_url",
            "host",
            "domain",
            "path",
            "type",
            "source",
        ],
        Series::Mentions => &[
            "time",
            "harvest_id",
            "territory",
            "network",
            "message_id",
            "contributor_id",
            "contributor_screen_name",
            "contributor_gender",
            "contributor_lang",
            "contributor_country",
            "contributor_geohash",
            "mentioned_id",
            "mentioned_screen_name",
            "mentioned_name",
            "mentioned_type",
        ],
        Series::Hashtags => &[
            "time",
            "harvest_id",
            "territory",
            "network",
            "message_id",
            "tag",
            "keyword",
            "contributor_id",
            "contributor_screen_name",
            "contributor_gender",
            "contributor_lang",
            "contributor_country",
            "contributor_geohash",
        ],
        Series::ContributorGrowth => &[
            "time",
            "harvest_id",
            "territory",
            "network",
            "contributor_id",
            "likes",
            "talking_about",
            "were_here",
            "checkins",
            "views",
            "status_updates",
            "listed",
            "favorites",
            "followers",
            "following",
            "comments",
            "plus_ones",
        ],
    }
}

/// Index DDL for a series table
pub fn index_ddl(series: Series) -> String {
    format!(
        "CREATE INDEX IF NOT EXISTS idx_{table}_territory_time ON {table}(territory, time)",
        table = series.table()
    )
}
