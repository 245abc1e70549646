//! Series registry
//!
//! The fixed set of logical datasets. A series name is the only table name
//! that can ever appear in statement text, and the only way to obtain one
//! is an exact match against this list.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A registered series (one table per series)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Series {
    /// Harvested messages / posts
    Messages,
    /// Links shared inside messages
    SharedLinks,
    /// Contributors mentioned in messages
    Mentions,
    /// Hashtags and keywords
    Hashtags,
    /// Follower/like growth snapshots
    ContributorGrowth,
}

impl Series {
    /// Every registered series
    pub const ALL: [Series; 5] = [
        Series::Messages,
        Series::SharedLinks,
        Series::Mentions,
        Series::Hashtags,
        Series::ContributorGrowth,
    ];

    /// Table name for this series
    pub fn table(&self) -> &'static str {
        match self {
            Self::Messages => "messages",
            Self::SharedLinks => "shared_links",
            Self::Mentions => "mentions",
            Self::Hashtags => "hashtags",
            Self::ContributorGrowth => "contributor_growth",
        }
    }

    /// Exact, case-sensitive lookup
    pub fn lookup(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.table() == name)
    }

    /// Whether `name` is a registered series
    pub fn is_allowed(name: &str) -> bool {
        Self::lookup(name).is_some()
    }

    /// Whether the series table has a column called `name`
    pub fn has_column(&self, name: &str) -> bool {
        crate::store::schema::columns(*self).contains(&name)
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registered_names() {
        for name in ["messages", "shared_links", "mentions", "hashtags", "contributor_growth"] {
            assert!(Series::is_allowed(name), "{} should be allowed", name);
        }
    }

    #[test]
    fn test_lookup_is_exact() {
        assert_eq!(Series::lookup("messages"), Some(Series::Messages));
        assert_eq!(Series::lookup("Messages"), None);
        assert_eq!(Series::lookup(" messages"), None);
        assert_eq!(Series::lookup("messages; DROP TABLE messages"), None);
        assert_eq!(Series::lookup("users"), None);
        assert_eq!(Series::lookup(""), None);
    }

    #[test]
    fn test_has_column() {
        assert!(Series::Messages.has_column("contributor_lang"));
        assert!(Series::Hashtags.has_column("tag"));
        assert!(!Series::Messages.has_column("tag"));
        assert!(!Series::Messages.has_column("no_such_column"));
        assert!(!Series::Messages.has_column("Contributor_lang"));
    }

    #[test]
    fn test_table_round_trip() {
        for series in Series::ALL {
            assert_eq!(Series::lookup(series.table()), Some(series));
            assert_eq!(series.to_string(), series.table());
        }
    }
}
