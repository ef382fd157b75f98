//! Online repository: ingest, delete and windowed retrieval over per-language state.
//!
//! The repository owns the metadata store, one [`LanguageState`] per configured
//! language and a background sync worker that evicts expired records and
//! persists the vector indexes.
//!
//! # Example
//!
//! ```rust,ignore
//! let config = Config::load(Config::default_path())?;
//! let repository = Repository::open(&config, Collaborators::load(&config)?)?;
//!
//! let status = repository.put("story.html", 3600, html.as_bytes());
//! let threads = repository.get(86_400, "en", "any");
//!
//! repository.close()?;
//! ```

mod gate;
mod language;
mod retrieve;
mod sync;

pub use gate::{ActiveGuard, ActivityGate, SyncGuard};
pub use language::{LanguageRegistry, LanguageState};
pub use sync::{SyncReport, SyncWorker};

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn};

use crate::config::Config;
use crate::models::{
    Extractor, HtmlExtractor, LanguageDetector, LanguageModels, ScriptLanguageDetector,
};
use crate::otel::{background_span, record_background_metrics, BackgroundJobType};
use crate::storage::RecordStore;
use crate::types::{
    CategoryFilter, CreateKind, DeleteStatus, GetStatus, PutStatus, Record, Result, ThreadsError,
};

/// External collaborators the repository is built from.
pub struct Collaborators {
    pub extractor: Box<dyn Extractor>,
    pub detector: Box<dyn LanguageDetector>,
    /// Models per language code
    pub models: HashMap<String, LanguageModels>,
}

impl Collaborators {
    pub fn new(extractor: Box<dyn Extractor>, detector: Box<dyn LanguageDetector>) -> Self {
        Self {
            extractor,
            detector,
            models: HashMap::new(),
        }
    }

    /// Register the models of one language.
    pub fn with_language(mut self, code: impl Into<String>, models: LanguageModels) -> Self {
        self.models.insert(code.into(), models);
        self
    }

    /// File-backed collaborators for every configured language.
    pub fn load(config: &Config) -> Result<Self> {
        let mut collaborators = Self::new(
            Box::new(HtmlExtractor::new()),
            Box::new(ScriptLanguageDetector::default()),
        );
        for language in &config.languages {
            collaborators = collaborators.with_language(&language.code, LanguageModels::load(language)?);
        }
        Ok(collaborators)
    }
}

/// Diagnostics of one language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageStats {
    pub code: String,
    pub vectors: usize,
    pub last_vector_id: u64,
    pub newest_published: Option<u64>,
}

/// Online news repository.
pub struct Repository {
    store: RecordStore,
    languages: LanguageRegistry,
    extractor: Box<dyn Extractor>,
    detector: Mutex<Box<dyn LanguageDetector>>,
    gate: ActivityGate,
    /// Orders store writes together with their index updates
    mutations: Mutex<()>,
    dirty: AtomicBool,
    closed: AtomicBool,
    sync_worker: Mutex<Option<SyncWorker>>,
}

impl Repository {
    /// Open the repository and start the background sync worker.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid, a language has no models, an
    /// index file is missing or unreadable, or the store cannot be opened
    pub fn open(config: &Config, collaborators: Collaborators) -> Result<Arc<Self>> {
        let repository = Arc::new(Self::load(config, collaborators)?);
        let worker = SyncWorker::spawn(Arc::downgrade(&repository), config.sync_interval())?;
        *repository.sync_worker.lock() = Some(worker);
        Ok(repository)
    }

    /// Open the repository without a background sync worker.
    ///
    /// Syncing is then up to the caller (`sync`, `close`).
    pub fn load(config: &Config, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;
        let store = RecordStore::open(&config.store_path)?;

        let Collaborators {
            extractor,
            detector,
            mut models,
        } = collaborators;

        let mut languages = Vec::with_capacity(config.languages.len());
        for (position, language) in config.languages.iter().enumerate() {
            let lang_id = u8::try_from(position)
                .map_err(|_| ThreadsError::config("Too many languages configured"))?;
            let language_models = models.remove(&language.code).ok_or_else(|| {
                ThreadsError::config(format!("No models provided for language '{}'", language.code))
            })?;
            let last_id = store.max_vector_id(lang_id)?;
            languages.push(LanguageState::open(lang_id, language, language_models, last_id)?);
        }

        info!(
            store = %config.store_path.display(),
            languages = languages.len(),
            "Repository opened"
        );

        Ok(Self {
            store,
            languages: LanguageRegistry::new(languages)?,
            extractor,
            detector: Mutex::new(detector),
            gate: ActivityGate::new(),
            mutations: Mutex::new(()),
            dirty: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            sync_worker: Mutex::new(None),
        })
    }

    /// Ingest an article.
    ///
    /// # Arguments
    ///
    /// * `name` - Unique article name; re-ingesting a name replaces the article
    /// * `ttl` - Time to live in seconds, relative to the newest article of its language
    /// * `body` - Raw article bytes
    pub fn put(&self, name: &str, ttl: u64, body: &[u8]) -> PutStatus {
        let _active = self.gate.enter();
        let span = info_span!("repository.put", name = %name, ttl);
        let _guard = span.enter();

        let status = self.try_put(name, ttl, body).unwrap_or_else(|e| {
            error!(error = %e, "Ingest failed");
            PutStatus::InternalError
        });
        debug!(?status, "Ingest finished");
        status
    }

    fn try_put(&self, name: &str, ttl: u64, body: &[u8]) -> Result<PutStatus> {
        if ttl == 0 {
            return Ok(PutStatus::BadInput);
        }

        let mut document = match self.extractor.extract(body) {
            Ok(document) => document,
            Err(e) => {
                warn!(error = %e, "Extraction failed");
                return Ok(PutStatus::InternalError);
            }
        };
        document.name = name.to_string();
        if document.is_empty() {
            return Ok(PutStatus::NoContentExtracted);
        }

        let detected = self.detector.lock().detect(&document.full_text());
        let Some(language) = detected.as_deref().and_then(|code| self.languages.get(code)) else {
            debug!(lang = ?detected, "Language not supported");
            return Ok(PutStatus::Ignored);
        };

        let mut vectors = language.embedder().embed(std::slice::from_ref(&document));
        let vector = match vectors.pop() {
            Some(vector) if vectors.is_empty() => vector,
            _ => return Ok(PutStatus::Ignored),
        };
        if !language.is_news(&vector) {
            return Ok(PutStatus::Ignored);
        }
        let Some(category) = language.categorize(&vector) else {
            return Ok(PutStatus::Ignored);
        };

        let _mutation = self.mutations.lock();
        let record = Record {
            vector_id: language.next_vector_id(),
            lang_id: language.lang_id(),
            category,
            name: document.name,
            title: document.title,
            site: document.site,
            published: document.published,
            ttl,
        };
        let replaced = self.store.upsert(&record)?;

        match &replaced {
            Some(old) if old.lang_id == language.lang_id() => {
                language.replace_vector(old.vector_id, record.vector_id, vector)?;
            }
            Some(old) => {
                match self.languages.by_id(old.lang_id) {
                    Some(owner) => {
                        owner.erase_vector(old.vector_id);
                    }
                    None => warn!(lang_id = old.lang_id, "Replaced record of unknown language"),
                }
                language.set_vector(record.vector_id, vector)?;
            }
            None => language.set_vector(record.vector_id, vector)?,
        }
        self.mark_dirty();

        Ok(PutStatus::Created(if replaced.is_some() {
            CreateKind::Replaced
        } else {
            CreateKind::New
        }))
    }

    /// Delete an article by name.
    pub fn delete(&self, name: &str) -> DeleteStatus {
        let _active = self.gate.enter();
        let span = info_span!("repository.delete", name = %name);
        let _guard = span.enter();

        self.try_delete(name).unwrap_or_else(|e| {
            error!(error = %e, "Delete failed");
            DeleteStatus::InternalError
        })
    }

    fn try_delete(&self, name: &str) -> Result<DeleteStatus> {
        let _mutation = self.mutations.lock();
        let Some(removed) = self.store.remove(name)? else {
            return Ok(DeleteStatus::NotFound);
        };
        let owner = self.languages.by_id(removed.lang_id).ok_or_else(|| {
            ThreadsError::internal(format!(
                "Record '{}' belongs to unknown language id {}",
                removed.name, removed.lang_id
            ))
        })?;
        owner.erase_vector(removed.vector_id);
        self.mark_dirty();
        Ok(DeleteStatus::Deleted)
    }

    /// Ranked threads of a language within `period` seconds of its newest article.
    ///
    /// # Arguments
    ///
    /// * `period` - Window length in seconds
    /// * `lang_code` - Configured language code
    /// * `category` - Category name, or `"any"` for every category
    pub fn get(&self, period: u64, lang_code: &str, category: &str) -> GetStatus {
        let _active = self.gate.enter();
        let span = info_span!("repository.get", period, lang = %lang_code, category = %category);
        let _guard = span.enter();

        self.try_get(period, lang_code, category).unwrap_or_else(|e| {
            error!(error = %e, "Retrieval failed");
            GetStatus::InternalError
        })
    }

    fn try_get(&self, period: u64, lang_code: &str, category: &str) -> Result<GetStatus> {
        let (Some(language), Some(filter)) = (self.languages.get(lang_code), CategoryFilter::parse(category))
        else {
            return Ok(GetStatus::BadInput);
        };

        let records = self.store.window(language.lang_id(), filter, period)?;
        let payload = retrieve::collect_threads(language, records, filter);
        debug!(threads = payload.threads.len(), "Retrieval finished");
        Ok(GetStatus::Ok(payload))
    }

    /// Sync now if there are unsynced changes and no request is in flight.
    ///
    /// Returns `None` when nothing was done.
    pub fn sync_if_idle(&self) -> Option<SyncReport> {
        if !self.is_dirty() {
            return None;
        }
        let _sync = self.gate.try_begin_sync()?;
        Some(self.run_sync())
    }

    /// Sync unconditionally, waiting for in-flight requests to finish first.
    pub fn sync(&self) -> SyncReport {
        let _sync = self.gate.begin_sync();
        self.run_sync()
    }

    /// Evict expired records of every language and persist the indexes.
    fn run_sync(&self) -> SyncReport {
        let span = background_span(BackgroundJobType::Sync, "repository");
        let _guard = span.enter();
        let started = Instant::now();

        let mut report = SyncReport::default();
        for language in self.languages.iter() {
            report.languages += 1;
            match self.sync_language(language) {
                Ok(evicted) => report.evicted += evicted,
                Err(e) => {
                    report.failed += 1;
                    error!(lang = %language.code(), error = %e, "Language sync failed");
                }
            }
        }
        self.dirty.store(false, Ordering::SeqCst);

        let status = if report.failed == 0 { "success" } else { "partial" };
        let elapsed_ms = started.elapsed().as_millis() as u64;
        record_background_metrics(Some(report.evicted), Some(elapsed_ms), status);
        report
    }

    fn sync_language(&self, language: &LanguageState) -> Result<usize> {
        let span = background_span(BackgroundJobType::Eviction, language.code());
        let _guard = span.enter();

        let expired = self.store.evict_expired(language.lang_id())?;
        let ids: Vec<u64> = expired.iter().map(|r| r.vector_id).collect();
        language.evict_and_save(&ids)?;

        record_background_metrics(Some(ids.len()), None, "success");
        if !ids.is_empty() {
            info!(lang = %language.code(), evicted = ids.len(), "Expired records evicted");
        }
        Ok(ids.len())
    }

    /// Stop the sync worker, run a final sync and flush the store.
    ///
    /// Later calls do nothing.
    pub fn close(&self) -> Result<SyncReport> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(SyncReport::default());
        }

        let worker = self.sync_worker.lock().take();
        if let Some(mut worker) = worker {
            worker.stop();
        }

        let report = self.sync();
        self.store.flush()?;
        info!(evicted = report.evicted, "Repository closed");
        Ok(report)
    }

    /// Whether changes are waiting for a sync.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::SeqCst);
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn language(&self, code: &str) -> Option<&LanguageState> {
        self.languages.get(code)
    }

    pub fn languages(&self) -> &LanguageRegistry {
        &self.languages
    }

    /// Per-language diagnostics.
    pub fn stats(&self) -> Result<Vec<LanguageStats>> {
        self.languages
            .iter()
            .map(|language| {
                Ok(LanguageStats {
                    code: language.code().to_string(),
                    vectors: language.index_len(),
                    last_vector_id: language.last_vector_id(),
                    newest_published: self.store.max_published(language.lang_id())?,
                })
            })
            .collect()
    }
}
