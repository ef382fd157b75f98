//! Per-language mutable state and the registry that owns it.
//!
//! Lock discipline: the vector index sits behind a read/write lock (exclusive
//! for set/erase, shared for lookups); each classifier sits behind its own
//! mutex. No method holds two of these locks at once.

use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::slice;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::LanguageConfig;
use crate::index::VectorIndex;
use crate::models::{CategoryClassifier, Embedder, LanguageModels, NewsClassifier};
use crate::otel::{background_span, record_background_metrics, BackgroundJobType};
use crate::types::{Category, EmbeddingVector, Record, Result, ThreadsError};

/// Mutable state of one supported language.
pub struct LanguageState {
    code: String,
    lang_id: u8,
    threshold: f32,
    last_id: AtomicU64,
    embedder: Arc<dyn Embedder>,
    news: Mutex<Box<dyn NewsClassifier>>,
    categories: Mutex<Box<dyn CategoryClassifier>>,
    index: RwLock<VectorIndex>,
    index_path: PathBuf,
}

impl LanguageState {
    /// Assemble the state of a language from its models and loaded index.
    ///
    /// # Arguments
    ///
    /// * `lang_id` - Position of the language in the configuration
    /// * `config` - Language settings
    /// * `models` - Embedder and classifiers
    /// * `index` - Vector index loaded from `config.index_file`
    /// * `last_id` - Highest vector id already used by this language
    pub fn new(
        lang_id: u8,
        config: &LanguageConfig,
        models: LanguageModels,
        index: VectorIndex,
        last_id: u64,
    ) -> Result<Self> {
        if index.dimensions() != models.embedder.dimensions() {
            return Err(ThreadsError::config(format!(
                "Index of '{}' has {} dimensions, embedder has {}",
                config.code,
                index.dimensions(),
                models.embedder.dimensions()
            )));
        }
        Ok(Self {
            code: config.code.clone(),
            lang_id,
            threshold: config.similarity_threshold,
            last_id: AtomicU64::new(last_id),
            embedder: models.embedder,
            news: Mutex::new(models.news),
            categories: Mutex::new(models.categories),
            index: RwLock::new(index),
            index_path: config.index_file.clone(),
        })
    }

    /// Load the index file of a language and assemble its state.
    ///
    /// # Errors
    ///
    /// Returns `ThreadsError::ConfigError` if the index file does not exist
    pub fn open(lang_id: u8, config: &LanguageConfig, models: LanguageModels, last_id: u64) -> Result<Self> {
        if !config.index_file.is_file() {
            return Err(ThreadsError::config(format!(
                "Index file {} for language '{}' not found (run `nthreads init`)",
                config.index_file.display(),
                config.code
            )));
        }

        let span = background_span(BackgroundJobType::IndexLoad, &config.code);
        let _guard = span.enter();
        let index = VectorIndex::load(&config.index_file, models.embedder.dimensions())?;
        record_background_metrics(Some(index.len()), None, "success");
        info!(lang = %config.code, vectors = index.len(), last_id, "Language loaded");

        Self::new(lang_id, config, models, index, last_id)
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn lang_id(&self) -> u8 {
        self.lang_id
    }

    /// Base similarity threshold for clustering.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Allocate the next vector id; ids are never reused.
    pub fn next_vector_id(&self) -> u64 {
        self.last_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn last_vector_id(&self) -> u64 {
        self.last_id.load(Ordering::SeqCst)
    }

    /// Run the news classifier on one vector.
    pub fn is_news(&self, vector: &EmbeddingVector) -> bool {
        let verdicts = self.news.lock().classify(slice::from_ref(vector));
        matches!(verdicts.as_slice(), [true])
    }

    /// Run the category classifier on one vector.
    pub fn categorize(&self, vector: &EmbeddingVector) -> Option<Category> {
        let categories = self.categories.lock().classify(slice::from_ref(vector));
        match categories.as_slice() {
            [category] => *category,
            _ => None,
        }
    }

    /// Store `vector` under `id`.
    pub fn set_vector(&self, id: u64, vector: EmbeddingVector) -> Result<()> {
        self.index.write().set(id, vector)
    }

    /// Remove `id`; returns whether it was present.
    pub fn erase_vector(&self, id: u64) -> bool {
        self.index.write().erase(id)
    }

    /// Erase `old_id` and store `vector` under `new_id` in one exclusive section.
    pub fn replace_vector(&self, old_id: u64, new_id: u64, vector: EmbeddingVector) -> Result<()> {
        let mut index = self.index.write();
        index.erase(old_id);
        index.set(new_id, vector)
    }

    pub fn contains_vector(&self, id: u64) -> bool {
        self.index.read().contains(id)
    }

    pub fn index_len(&self) -> usize {
        self.index.read().len()
    }

    /// Pair records with their vectors, grouped by category.
    ///
    /// Records whose vector is missing from the index are skipped.
    pub fn attach_vectors(&self, records: Vec<Record>) -> BTreeMap<Category, Vec<(Record, EmbeddingVector)>> {
        let index = self.index.read();
        let mut grouped: BTreeMap<Category, Vec<(Record, EmbeddingVector)>> = BTreeMap::new();
        let mut missing = 0usize;
        for record in records {
            match index.lookup(record.vector_id) {
                Some(vector) => grouped
                    .entry(record.category)
                    .or_default()
                    .push((record, vector.clone())),
                None => missing += 1,
            }
        }
        if missing > 0 {
            debug!(lang = %self.code, missing, "Records without vectors skipped");
        }
        grouped
    }

    /// Erase evicted ids and persist the index in one exclusive section.
    pub fn evict_and_save(&self, ids: &[u64]) -> Result<()> {
        let span = background_span(BackgroundJobType::IndexSave, &self.code);
        let _guard = span.enter();

        let mut index = self.index.write();
        for id in ids {
            index.erase(*id);
        }
        index.save(&self.index_path)?;
        record_background_metrics(Some(index.len()), None, "success");
        Ok(())
    }
}

/// Supported languages, addressable by code or by id.
pub struct LanguageRegistry {
    languages: Vec<LanguageState>,
    by_code: HashMap<String, usize>,
}

impl LanguageRegistry {
    /// Build a registry; each language's id must equal its position.
    pub fn new(languages: Vec<LanguageState>) -> Result<Self> {
        let mut by_code = HashMap::with_capacity(languages.len());
        for (position, language) in languages.iter().enumerate() {
            if language.lang_id() as usize != position {
                return Err(ThreadsError::internal(format!(
                    "Language '{}' has id {} at position {}",
                    language.code(),
                    language.lang_id(),
                    position
                )));
            }
            if by_code.insert(language.code().to_string(), position).is_some() {
                return Err(ThreadsError::config(format!(
                    "Duplicate language code: {}",
                    language.code()
                )));
            }
        }
        Ok(Self { languages, by_code })
    }

    pub fn get(&self, code: &str) -> Option<&LanguageState> {
        self.by_code.get(code).and_then(|&i| self.languages.get(i))
    }

    pub fn by_id(&self, lang_id: u8) -> Option<&LanguageState> {
        self.languages.get(lang_id as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LanguageState> {
        self.languages.iter()
    }

    pub fn len(&self) -> usize {
        self.languages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }
}
