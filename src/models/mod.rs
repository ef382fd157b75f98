//! External collaborators of the repository and their file-backed defaults.
//!
//! The repository and the batch pipeline only see the traits below. Embedders
//! are shared between threads; classifiers and language detectors are assumed
//! not to be safe for concurrent invocation and are used behind a lock or one
//! handle per worker.

mod classifier;
mod embedder;
mod extractor;
mod language;

pub use classifier::{LinearCategoryClassifier, LinearNewsClassifier};
pub use embedder::Word2VecEmbedder;
pub use extractor::HtmlExtractor;
pub use language::ScriptLanguageDetector;

use std::path::Path;
use std::sync::Arc;

use crate::config::LanguageConfig;
use crate::types::{Category, Document, EmbeddingVector, Result, ThreadsError};

/// Turns raw article bytes into a `Document`.
pub trait Extractor: Send + Sync {
    fn extract(&self, raw: &[u8]) -> Result<Document>;
}

/// Identifies the language of a text.
pub trait LanguageDetector: Send {
    /// Language code, or `None` when the language cannot be determined.
    fn detect(&self, text: &str) -> Option<String>;
}

/// Embeds documents of one language.
pub trait Embedder: Send + Sync {
    fn dimensions(&self) -> usize;

    /// One RMS-normalized vector per document; a zero vector when no word is known.
    fn embed(&self, documents: &[Document]) -> Vec<EmbeddingVector>;
}

/// Decides whether vectors are news.
pub trait NewsClassifier: Send {
    fn classify(&self, vectors: &[EmbeddingVector]) -> Vec<bool>;
}

/// Assigns a category to vectors; `None` when a vector cannot be classified.
pub trait CategoryClassifier: Send {
    fn classify(&self, vectors: &[EmbeddingVector]) -> Vec<Option<Category>>;
}

/// Models of one language.
pub struct LanguageModels {
    pub embedder: Arc<dyn Embedder>,
    pub news: Box<dyn NewsClassifier>,
    pub categories: Box<dyn CategoryClassifier>,
}

impl LanguageModels {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        news: Box<dyn NewsClassifier>,
        categories: Box<dyn CategoryClassifier>,
    ) -> Self {
        Self {
            embedder,
            news,
            categories,
        }
    }

    /// Load the file-backed models configured for a language.
    ///
    /// # Errors
    ///
    /// Returns `ThreadsError::ConfigError` if a model file is missing and
    /// `ThreadsError::ModelError` if one cannot be parsed
    pub fn load(config: &LanguageConfig) -> Result<Self> {
        for path in [&config.embedding_model, &config.news_model, &config.category_model] {
            require_file(&config.code, path)?;
        }

        let embedder = Word2VecEmbedder::load(&config.embedding_model)?;
        let dimensions = embedder.dimensions();
        let news = LinearNewsClassifier::load(&config.news_model, dimensions)?;
        let categories = LinearCategoryClassifier::load(&config.category_model, dimensions)?;

        Ok(Self::new(Arc::new(embedder), Box::new(news), Box::new(categories)))
    }
}

fn require_file(code: &str, path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ThreadsError::config(format!(
            "Model file {} for language '{}' not found",
            path.display(),
            code
        )))
    }
}
