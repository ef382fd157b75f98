//! JSON reports printed by the batch stages.

use serde::Serialize;

use crate::types::Category;

/// Articles detected in one language.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageReport {
    pub lang_code: String,
    pub articles: Vec<String>,
}

/// Articles accepted as news, across languages.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewsReport {
    pub articles: Vec<String>,
}

/// News articles of one category, across languages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryReport {
    pub category: Category,
    pub articles: Vec<String>,
}

/// One thread of related news articles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreadReport {
    pub title: String,
    pub articles: Vec<String>,
}
