//! Message filter conditions
//!
//! Extra equality/prefix filters that only make sense on the `messages`
//! series. Invalid values are ignored rather than reported.

use crate::query::builder::{Ident, Predicate};
use crate::query::params::Policy;
use serde::Serialize;

/// Contributor gender as stored in `contributor_gender`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Female,
    Male,
    Unknown,
}

impl Gender {
    /// Accepts `f`/`female`/`-1`, `m`/`male`/`1` and `u`/`unknown`/`0`
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "f" | "female" | "-1" => Some(Self::Female),
            "m" | "male" | "1" => Some(Self::Male),
            "u" | "unknown" | "0" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// Stored integer code
    pub fn code(&self) -> i64 {
        match self {
            Self::Female => -1,
            Self::Male => 1,
            Self::Unknown => 0,
        }
    }
}

/// Optional filters for message listings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasicConditions {
    gender: Option<Gender>,
    lang: String,
    country: String,
    geohash: String,
    is_question: bool,
}

impl BasicConditions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by gender; unrecognised spellings are ignored
    pub fn gender(mut self, value: &str) -> Self {
        self.gender = Gender::parse(value);
        self
    }

    pub fn lang(mut self, value: impl Into<String>) -> Self {
        self.lang = value.into();
        self
    }

    pub fn country(mut self, value: impl Into<String>) -> Self {
        self.country = value.into();
        self
    }

    /// Filter by geohash prefix; anything but letters and digits is ignored
    pub fn geohash(mut self, value: &str) -> Self {
        self.geohash = if Policy::Alphanumeric.allows(value) {
            value.to_string()
        } else {
            String::new()
        };
        self
    }

    /// Only messages flagged as questions
    pub fn questions_only(mut self, flag: bool) -> Self {
        self.is_question = flag;
        self
    }

    pub fn gender_filter(&self) -> Option<Gender> {
        self.gender
    }

    pub fn geohash_filter(&self) -> &str {
        &self.geohash
    }

    /// Predicates for every condition that is set
    pub fn predicates(&self) -> Vec<Predicate> {
        let mut predicates = Vec::new();

        if let Some(gender) = self.gender {
            predicates.push(Predicate::eq("contributor_gender", gender.code()));
        }
        if !self.lang.is_empty() {
            predicates.push(Predicate::eq("contributor_lang", self.lang.as_str()));
        }
        if !self.country.is_empty() {
            predicates.push(Predicate::eq("contributor_country", self.country.as_str()));
        }
        if !self.geohash.is_empty() {
            predicates.push(Predicate::starts_with(
                Ident::trusted("contributor_geohash"),
                self.geohash.as_str(),
            ));
        }
        if self.is_question {
            predicates.push(Predicate::eq("is_question", 1_i64));
        }

        predicates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqlValue;

    #[test]
    fn test_gender_spellings() {
        for s in ["f", "female", "-1", "Female"] {
            assert_eq!(Gender::parse(s), Some(Gender::Female), "{}", s);
        }
        for s in ["m", "male", "1"] {
            assert_eq!(Gender::parse(s), Some(Gender::Male), "{}", s);
        }
        for s in ["u", "unknown", "0"] {
            assert_eq!(Gender::parse(s), Some(Gender::Unknown), "{}", s);
        }
        assert_eq!(Gender::parse("x"), None);
        assert_eq!(Gender::parse(""), None);

        assert_eq!(Gender::Female.code(), -1);
        assert_eq!(Gender::Male.code(), 1);
        assert_eq!(Gender::Unknown.code(), 0);
    }

    #[test]
    fn test_invalid_values_ignored() {
        let conds = BasicConditions::new().gender("robot").geohash("9q8'; --");
        assert_eq!(conds.gender_filter(), None);
        assert_eq!(conds.geohash_filter(), "");
        assert!(conds.predicates().is_empty());

        assert_eq!(BasicConditions::new().geohash("9q_8").geohash_filter(), "");
    }

    #[test]
    fn test_predicates_for_set_conditions() {
        let conds = BasicConditions::new()
            .gender("female")
            .lang("en")
            .country("US")
            .geohash("9q8")
            .questions_only(true);

        let predicates = conds.predicates();
        assert_eq!(predicates.len(), 5);
        assert_eq!(predicates[0], Predicate::eq("contributor_gender", SqlValue::Integer(-1)));
        assert_eq!(predicates[4], Predicate::eq("is_question", SqlValue::Integer(1)));
    }
}
