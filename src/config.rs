//! Service configuration and location management.
//!
//! Configuration is a YAML file listing the store location, the worker budget,
//! the sync interval and one entry per supported language. A language's id is
//! its position in the list.

use crate::types::{Result, ThreadsError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "~/.news-threads/config.yaml";

/// Lower bound of the default worker count.
const MIN_DEFAULT_WORKERS: usize = 8;

/// Per-language models, threshold and index file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageConfig {
    /// Language code reported by the language detector (e.g. `en`)
    pub code: String,
    /// Text word2vec model
    pub embedding_model: PathBuf,
    /// Linear news classifier weights (JSON)
    pub news_model: PathBuf,
    /// Linear category classifier weights (JSON)
    pub category_model: PathBuf,
    /// Base similarity threshold for clustering
    pub similarity_threshold: f32,
    /// Vector index file
    pub index_file: PathBuf,
}

/// Service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Metadata store directory
    pub store_path: PathBuf,
    /// Serving workers and batch worker budget
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Background sync interval
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,
    pub languages: Vec<LanguageConfig>,
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .max(MIN_DEFAULT_WORKERS)
}

fn default_sync_interval_secs() -> u64 {
    1
}

impl Config {
    /// Default configuration path with `~` expanded.
    pub fn default_path() -> PathBuf {
        expand(Path::new(DEFAULT_CONFIG_PATH))
    }

    /// Load, expand and validate the configuration at `path`.
    ///
    /// # Errors
    ///
    /// Returns `ThreadsError::ConfigError` if the file is missing or invalid
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let config = Config::load(Config::default_path())?;
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = expand(path.as_ref());
        let content = fs::read_to_string(&path).map_err(|e| {
            ThreadsError::config(format!("Cannot read config {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse, expand and validate a YAML configuration.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let mut config: Config = serde_yaml::from_str(content)?;
        config.expand_paths();
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the rest of the service relies on.
    pub fn validate(&self) -> Result<()> {
        if self.languages.is_empty() {
            return Err(ThreadsError::config("At least one language must be configured"));
        }
        if self.languages.len() > u8::MAX as usize + 1 {
            return Err(ThreadsError::config(format!(
                "Too many languages: {} (at most {})",
                self.languages.len(),
                u8::MAX as usize + 1
            )));
        }
        if self.workers == 0 {
            return Err(ThreadsError::config("workers must be greater than 0"));
        }
        if self.sync_interval_secs == 0 {
            return Err(ThreadsError::config("sync_interval_secs must be greater than 0"));
        }

        let mut seen = HashSet::new();
        for language in &self.languages {
            if language.code.is_empty() {
                return Err(ThreadsError::config("Language code must not be empty"));
            }
            if !seen.insert(language.code.as_str()) {
                return Err(ThreadsError::config(format!(
                    "Duplicate language code: {}",
                    language.code
                )));
            }
            if !language.similarity_threshold.is_finite() {
                return Err(ThreadsError::config(format!(
                    "similarity_threshold for '{}' must be a finite number",
                    language.code
                )));
            }
        }
        Ok(())
    }

    /// Language settings by code.
    pub fn language(&self, code: &str) -> Option<&LanguageConfig> {
        self.languages.iter().find(|l| l.code == code)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    fn expand_paths(&mut self) {
        self.store_path = expand(&self.store_path);
        for language in &mut self.languages {
            language.embedding_model = expand(&language.embedding_model);
            language.news_model = expand(&language.news_model);
            language.category_model = expand(&language.category_model);
            language.index_file = expand(&language.index_file);
        }
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
store_path: /var/lib/news-threads/db
workers: 4
languages:
  - code: en
    embedding_model: /models/en.w2v
    news_model: /models/en_news.json
    category_model: /models/en_category.json
    similarity_threshold: 0.895
    index_file: /var/lib/news-threads/en.idx
  - code: ru
    embedding_model: /models/ru.w2v
    news_model: /models/ru_news.json
    category_model: /models/ru_category.json
    similarity_threshold: 0.89
    index_file: /var/lib/news-threads/ru.idx
"#;

    #[test]
    fn test_parse_sample() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.workers, 4);
        assert_eq!(config.sync_interval_secs, 1);
        assert_eq!(config.languages.len(), 2);
        assert_eq!(config.language("ru").map(|l| l.similarity_threshold), Some(0.89));
        assert!(config.language("de").is_none());
    }

    #[test]
    fn test_default_workers_floor() {
        assert!(default_workers() >= MIN_DEFAULT_WORKERS);
    }

    #[test]
    fn test_tilde_expansion() {
        let yaml = SAMPLE.replace("/var/lib/news-threads/db", "~/threads-db");
        let config = Config::from_yaml(&yaml).unwrap();
        assert!(!config.store_path.to_string_lossy().starts_with('~'));
        assert!(config.store_path.ends_with("threads-db"));
    }

    #[test]
    fn test_rejects_duplicate_languages() {
        let yaml = SAMPLE.replace("code: ru", "code: en");
        let err = Config::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("Duplicate language code"));
    }

    #[test]
    fn test_rejects_empty_language_list() {
        let err = Config::from_yaml("store_path: /tmp/db\nlanguages: []\n").unwrap_err();
        assert!(matches!(err, ThreadsError::ConfigError(_)));
    }

    #[test]
    fn test_rejects_zero_workers() {
        let yaml = SAMPLE.replace("workers: 4", "workers: 0");
        assert!(Config::from_yaml(&yaml).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load("/nonexistent/news-threads.yaml").unwrap_err();
        assert!(matches!(err, ThreadsError::ConfigError(_)));
    }
}
