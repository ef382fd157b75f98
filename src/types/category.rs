//! Article categories and the category filter used by retrieval.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::ThreadsError;

/// Closed set of article categories.
///
/// Discriminants are stable: they are persisted in the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Category {
    Society = 0,
    Economy = 1,
    Technology = 2,
    Sports = 3,
    Entertainment = 4,
    Science = 5,
    Other = 6,
}

impl Category {
    /// All categories in classifier output order.
    pub const ALL: [Category; 7] = [
        Category::Society,
        Category::Economy,
        Category::Technology,
        Category::Sports,
        Category::Entertainment,
        Category::Science,
        Category::Other,
    ];

    /// Numeric identifier (classifier output index).
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Category for a classifier output index.
    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    /// Lowercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Society => "society",
            Category::Economy => "economy",
            Category::Technology => "technology",
            Category::Sports => "sports",
            Category::Entertainment => "entertainment",
            Category::Science => "science",
            Category::Other => "other",
        }
    }

    /// Ranking weight of threads in this category.
    pub fn weight(self) -> f32 {
        match self {
            Category::Society => 1.0,
            Category::Economy => 0.5,
            Category::Technology => 0.6,
            Category::Sports => 0.7,
            Category::Entertainment => 0.5,
            Category::Science => 0.65,
            Category::Other => 0.3,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ThreadsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ThreadsError::config(format!("Unknown category: {}", s)))
    }
}

/// Category restriction of a retrieval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryFilter {
    /// Every category; threads carry their category in the payload
    Any,
    /// A single category
    Only(Category),
}

impl CategoryFilter {
    /// Parse `"any"` or a category name. Anything else is rejected.
    pub fn parse(s: &str) -> Option<Self> {
        if s == "any" {
            return Some(CategoryFilter::Any);
        }
        s.parse().ok().map(CategoryFilter::Only)
    }

    /// Whether a record of `category` passes the filter.
    pub fn accepts(self, category: Category) -> bool {
        match self {
            CategoryFilter::Any => true,
            CategoryFilter::Only(wanted) => wanted == category,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_stable() {
        for (i, category) in Category::ALL.iter().enumerate() {
            assert_eq!(category.id() as usize, i);
            assert_eq!(Category::from_id(i as u8), Some(*category));
        }
        assert_eq!(Category::from_id(7), None);
    }

    #[test]
    fn test_weights() {
        assert_eq!(Category::Society.weight(), 1.0);
        assert_eq!(Category::Economy.weight(), 0.5);
        assert_eq!(Category::Technology.weight(), 0.6);
        assert_eq!(Category::Sports.weight(), 0.7);
        assert_eq!(Category::Entertainment.weight(), 0.5);
        assert_eq!(Category::Science.weight(), 0.65);
        assert_eq!(Category::Other.weight(), 0.3);
    }

    #[test]
    fn test_filter_parse() {
        assert_eq!(CategoryFilter::parse("any"), Some(CategoryFilter::Any));
        assert_eq!(
            CategoryFilter::parse("sports"),
            Some(CategoryFilter::Only(Category::Sports))
        );
        assert_eq!(CategoryFilter::parse("Sports"), None);
        assert_eq!(CategoryFilter::parse(""), None);
        assert_eq!(CategoryFilter::parse("weather"), None);
    }

    #[test]
    fn test_filter_accepts() {
        assert!(CategoryFilter::Any.accepts(Category::Other));
        assert!(CategoryFilter::Only(Category::Science).accepts(Category::Science));
        assert!(!CategoryFilter::Only(Category::Science).accepts(Category::Technology));
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&Category::Entertainment).unwrap();
        assert_eq!(json, "\"entertainment\"");
    }
}
