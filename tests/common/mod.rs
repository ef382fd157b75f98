#![allow(dead_code)]

use news_threads::config::{Config, LanguageConfig};
use news_threads::index::VectorIndex;
use news_threads::{Collaborators, Repository};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

pub const DIMENSIONS: usize = 8;

/// One keyword per category, in category order; each maps to its own axis.
pub const VOCABULARY: [&str; 7] = ["quake", "market", "gadget", "match", "film", "vaccine", "weather"];

/// Russian counterpart of [`VOCABULARY`].
pub const RU_VOCABULARY: [&str; 7] = ["землетрясение", "рынок", "гаджет", "матч", "фильм", "вакцина", "погода"];

/// Publication time of `at(0)`: 2024-03-01T10:00:00Z.
pub const BASE_TIME: u64 = 1_709_287_200;

pub fn at(offset: i64) -> String {
    chrono::DateTime::from_timestamp(BASE_TIME as i64 + offset, 0)
        .unwrap()
        .to_rfc3339()
}

pub fn article(title: &str, published: &str, text: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html><head>
  <meta property="og:title" content="{title}"/>
  <meta property="og:site_name" content="Daily Test"/>
  <meta property="article:published_time" content="{published}"/>
</head><body><article><p>{text}</p></article></body></html>"#
    )
}

/// Write a word2vec model, a news model and a category model for the test vocabulary.
pub fn write_models(dir: &Path, code: &str) -> LanguageConfig {
    let vocabulary = if code == "ru" { RU_VOCABULARY } else { VOCABULARY };
    let mut w2v = format!("{} {}\n", vocabulary.len(), DIMENSIONS);
    for (axis, word) in vocabulary.iter().enumerate() {
        let components: Vec<String> = (0..DIMENSIONS)
            .map(|i| if i == axis { "1".to_string() } else { "0".to_string() })
            .collect();
        w2v.push_str(&format!("{} {}\n", word, components.join(" ")));
    }
    let embedding_model = dir.join(format!("{code}.w2v"));
    fs::write(&embedding_model, w2v).unwrap();

    let news_model = dir.join(format!("{code}_news.json"));
    let news = serde_json::json!({ "weights": vec![1.0f32; DIMENSIONS], "bias": -0.5 });
    fs::write(&news_model, news.to_string()).unwrap();

    let rows: Vec<Vec<f32>> = (0..VOCABULARY.len())
        .map(|row| (0..DIMENSIONS).map(|i| if i == row { 1.0 } else { 0.0 }).collect())
        .collect();
    let category_model = dir.join(format!("{code}_category.json"));
    let categories = serde_json::json!({ "weights": rows, "bias": vec![0.0f32; VOCABULARY.len()] });
    fs::write(&category_model, categories.to_string()).unwrap();

    LanguageConfig {
        code: code.to_string(),
        embedding_model,
        news_model,
        category_model,
        similarity_threshold: 0.895,
        index_file: dir.join(format!("{code}.idx")),
    }
}

/// Temporary deployment, English only unless built with [`TestEnv::with_languages`].
pub struct TestEnv {
    pub dir: TempDir,
    pub config: Config,
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_languages(&["en"])
    }

    pub fn with_languages(codes: &[&str]) -> Self {
        let dir = TempDir::new().unwrap();
        let languages: Vec<LanguageConfig> = codes
            .iter()
            .map(|code| {
                let language = write_models(dir.path(), code);
                VectorIndex::new(DIMENSIONS).save(&language.index_file).unwrap();
                language
            })
            .collect();

        let config = Config {
            store_path: dir.path().join("db"),
            workers: 2,
            sync_interval_secs: 1,
            languages,
        };
        Self { dir, config }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators::load(&self.config).unwrap()
    }

    /// Repository without a background sync worker.
    pub fn load(&self) -> Repository {
        Repository::load(&self.config, self.collaborators()).unwrap()
    }

    pub fn index_file(&self) -> &Path {
        &self.config.languages[0].index_file
    }
}
