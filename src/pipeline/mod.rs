//! Offline batch pipeline over a directory of article files.
//!
//! Stages build on each other: language detection, news detection,
//! categorization and threading. Per-file and per-document work runs through
//! a [`Dispatcher`] with one extractor or classifier handle per worker;
//! threading clusters every (language, category) group in parallel.

mod report;

pub use report::{CategoryReport, LanguageReport, NewsReport, ThreadReport};

use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::cluster::{assemble, ClusterMember, Dbscan, Dispatcher, DEFAULT_MIN_PTS};
use crate::config::{Config, LanguageConfig};
use crate::models::{
    CategoryClassifier, Embedder, Extractor, HtmlExtractor, LanguageDetector, LinearCategoryClassifier,
    LinearNewsClassifier, NewsClassifier, ScriptLanguageDetector, Word2VecEmbedder,
};
use crate::otel::{background_span, record_background_metrics, BackgroundJobType};
use crate::types::{Category, Document, EmbeddingVector, Result, ThreadsError};

/// Documents of one configured language.
#[derive(Debug, Clone)]
pub struct LanguageDocuments {
    pub code: String,
    pub documents: Vec<Document>,
}

/// News documents of one language with their embeddings.
#[derive(Debug, Clone)]
pub struct LanguageNews {
    pub code: String,
    pub news: Vec<(Document, EmbeddingVector)>,
}

/// Categorized news of one language.
#[derive(Debug, Clone)]
pub struct LanguageCategories {
    pub code: String,
    pub groups: BTreeMap<Category, Vec<(Document, EmbeddingVector)>>,
}

/// Batch stages over the languages of a configuration.
pub struct BatchPipeline {
    config: Config,
    workers: usize,
}

impl BatchPipeline {
    pub fn new(config: Config) -> Self {
        let workers = config.workers;
        Self { config, workers }
    }

    /// Override the worker budget of the configuration.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Every regular file under `root`, sorted by path.
    pub fn enumerate(root: &Path) -> Result<Vec<PathBuf>> {
        if !root.is_dir() {
            return Err(ThreadsError::config(format!("{} is not a directory", root.display())));
        }
        let mut files = Vec::new();
        for entry in WalkDir::new(root).follow_links(true) {
            let entry = entry.map_err(|e| ThreadsError::IoError(e.into()))?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    }

    /// Extract every file under `root` and group the documents by configured language.
    ///
    /// Files that cannot be read or extracted, come out empty, or are in an
    /// unconfigured language are skipped. Document names are file names.
    pub fn languages(&self, root: &Path) -> Result<Vec<LanguageDocuments>> {
        let span = background_span(BackgroundJobType::LanguageDetection, &root.to_string_lossy());
        let _guard = span.enter();

        let started = Instant::now();
        let files = Self::enumerate(root)?;
        let dispatcher = Dispatcher::new("languages", self.workers, || {
            Ok((HtmlExtractor::new(), ScriptLanguageDetector::default()))
        });
        let detected = dispatcher.run(&files, |resource, _, shard| {
            let (extractor, detector) = &*resource;
            Ok(shard
                .iter()
                .filter_map(|path| load_document(extractor, path))
                .filter_map(|document| detector.detect(&document.full_text()).map(|code| (code, document)))
                .collect())
        });

        let mut by_code: HashMap<String, Vec<Document>> = HashMap::new();
        for (code, document) in detected {
            by_code.entry(code).or_default().push(document);
        }

        let languages: Vec<LanguageDocuments> = self
            .config
            .languages
            .iter()
            .map(|language| {
                let mut documents = by_code.remove(&language.code).unwrap_or_default();
                documents.sort_by(|a, b| a.name.cmp(&b.name));
                LanguageDocuments {
                    code: language.code.clone(),
                    documents,
                }
            })
            .collect();

        let total: usize = languages.iter().map(|l| l.documents.len()).sum();
        let elapsed_ms = started.elapsed().as_millis() as u64;
        record_background_metrics(Some(files.len()), Some(elapsed_ms), "success");
        info!(files = files.len(), documents = total, "Language detection finished");
        Ok(languages)
    }

    /// Embed the documents of every language and keep the ones classified as news.
    pub fn news(&self, languages: Vec<LanguageDocuments>) -> Result<Vec<LanguageNews>> {
        languages
            .into_iter()
            .map(|language| {
                let config = self.language_config(&language.code)?;
                let span = background_span(BackgroundJobType::NewsDetection, &language.code);
                let _guard = span.enter();

                let embedder: Arc<dyn Embedder> = Arc::new(Word2VecEmbedder::load(&config.embedding_model)?);
                let dimensions = embedder.dimensions();
                let model = config.news_model.clone();
                let dispatcher = Dispatcher::new("news", self.workers, move || {
                    LinearNewsClassifier::load(&model, dimensions)
                });

                let mut accepted = dispatcher.run(&language.documents, |classifier, offset, shard| {
                    let vectors = embedder.embed(shard);
                    let verdicts = classifier.classify(&vectors);
                    Ok(vectors
                        .into_iter()
                        .zip(verdicts)
                        .enumerate()
                        .filter(|(_, (_, news))| *news)
                        .map(|(i, (vector, _))| (offset + i, vector))
                        .collect())
                });
                accepted.sort_by_key(|(index, _)| *index);

                let news: Vec<(Document, EmbeddingVector)> = accepted
                    .into_iter()
                    .filter_map(|(index, vector)| language.documents.get(index).map(|d| (d.clone(), vector)))
                    .collect();

                record_background_metrics(Some(language.documents.len()), None, "success");
                info!(lang = %language.code, documents = language.documents.len(), news = news.len(), "News detection finished");
                Ok(LanguageNews {
                    code: language.code,
                    news,
                })
            })
            .collect()
    }

    /// Assign a category to every news document.
    pub fn categories(&self, news: Vec<LanguageNews>) -> Result<Vec<LanguageCategories>> {
        news.into_iter()
            .map(|language| {
                let config = self.language_config(&language.code)?;
                let span = background_span(BackgroundJobType::Categorization, &language.code);
                let _guard = span.enter();

                let dimensions = Word2VecEmbedder::read_dimensions(&config.embedding_model)?;
                let model = config.category_model.clone();
                let dispatcher = Dispatcher::new("categories", self.workers, move || {
                    LinearCategoryClassifier::load(&model, dimensions)
                });

                let labels = dispatcher.run(&language.news, |classifier, offset, shard| {
                    let vectors: Vec<EmbeddingVector> = shard.iter().map(|(_, v)| v.clone()).collect();
                    Ok(classifier
                        .classify(&vectors)
                        .into_iter()
                        .enumerate()
                        .filter_map(|(i, category)| category.map(|c| (offset + i, c)))
                        .collect())
                });
                let labels: HashMap<usize, Category> = labels.into_iter().collect();

                let mut groups: BTreeMap<Category, Vec<(Document, EmbeddingVector)>> = BTreeMap::new();
                for (index, entry) in language.news.into_iter().enumerate() {
                    if let Some(category) = labels.get(&index) {
                        groups.entry(*category).or_default().push(entry);
                    }
                }

                debug!(lang = %language.code, categories = groups.len(), "Categorization finished");
                Ok(LanguageCategories {
                    code: language.code,
                    groups,
                })
            })
            .collect()
    }

    /// Cluster every (language, category) group into threads.
    ///
    /// Threads are listed language by language, category by category, in
    /// clustering order within a group.
    pub fn threads(&self, categorized: Vec<LanguageCategories>) -> Result<Vec<ThreadReport>> {
        let mut groups = Vec::new();
        for language in categorized {
            let threshold = self.language_config(&language.code)?.similarity_threshold;
            for (category, entries) in language.groups {
                groups.push((language.code.clone(), category, threshold, entries));
            }
        }

        let threads: Vec<Vec<ThreadReport>> = groups
            .into_par_iter()
            .map(|(code, category, threshold, entries)| {
                let span = background_span(BackgroundJobType::Threading, &code);
                let _guard = span.enter();
                thread_group(category, threshold, entries)
            })
            .collect();
        Ok(threads.into_iter().flatten().collect())
    }

    /// `languages` stage report.
    pub fn language_report(languages: &[LanguageDocuments]) -> Vec<LanguageReport> {
        languages
            .iter()
            .map(|language| LanguageReport {
                lang_code: language.code.clone(),
                articles: language.documents.iter().map(|d| d.name.clone()).collect(),
            })
            .collect()
    }

    /// `news` stage report.
    pub fn news_report(news: &[LanguageNews]) -> NewsReport {
        NewsReport {
            articles: news
                .iter()
                .flat_map(|language| language.news.iter().map(|(d, _)| d.name.clone()))
                .collect(),
        }
    }

    /// `categories` stage report, one entry per category.
    pub fn category_report(categorized: &[LanguageCategories]) -> Vec<CategoryReport> {
        Category::ALL
            .iter()
            .map(|category| CategoryReport {
                category: *category,
                articles: categorized
                    .iter()
                    .filter_map(|language| language.groups.get(category))
                    .flat_map(|entries| entries.iter().map(|(d, _)| d.name.clone()))
                    .collect(),
            })
            .collect()
    }

    fn language_config(&self, code: &str) -> Result<&LanguageConfig> {
        self.config
            .language(code)
            .ok_or_else(|| ThreadsError::config(format!("Language '{}' is not configured", code)))
    }
}

fn load_document(extractor: &HtmlExtractor, path: &Path) -> Option<Document> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Unreadable file skipped");
            return None;
        }
    };
    let mut document = match extractor.extract(&raw) {
        Ok(document) => document,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Extraction failed");
            return None;
        }
    };
    if document.is_empty() {
        return None;
    }
    document.name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    Some(document)
}

fn thread_group(category: Category, threshold: f32, entries: Vec<(Document, EmbeddingVector)>) -> Vec<ThreadReport> {
    let (documents, vectors): (Vec<Document>, Vec<EmbeddingVector>) = entries.into_iter().unzip();
    let dbscan = Dbscan::new(&vectors, threshold, DEFAULT_MIN_PTS);

    assemble(category, &dbscan, |index, weight| ClusterMember {
        name: documents[index].name.clone(),
        title: documents[index].title.clone(),
        weight,
    })
    .into_iter()
    .filter(|cluster| !cluster.is_empty())
    .map(|cluster| ThreadReport {
        title: cluster.representative_title().unwrap_or_default().to_string(),
        articles: cluster.article_names(),
    })
    .collect()
}
