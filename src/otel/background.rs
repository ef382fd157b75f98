//! Background job instrumentation.
//!
//! For the sync loop, time-to-live eviction, index persistence and the
//! offline pipeline stages. Uses INTERNAL span kind since these are not
//! database client operations.

use tracing::{field, span, Level, Span};

/// Background job types.
#[derive(Debug, Clone, Copy)]
pub enum BackgroundJobType {
    /// Periodic repository sync
    Sync,
    /// Time-to-live eviction for one language
    Eviction,
    /// Vector index save to disk
    IndexSave,
    /// Vector index load from disk
    IndexLoad,
    /// Batch extraction and language detection
    LanguageDetection,
    /// Batch embedding and news filtering
    NewsDetection,
    /// Batch categorization
    Categorization,
    /// Batch clustering into threads
    Threading,
}

impl BackgroundJobType {
    /// Get job type as string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sync => "repository.sync",
            Self::Eviction => "store.evict",
            Self::IndexSave => "index.save",
            Self::IndexLoad => "index.load",
            Self::LanguageDetection => "pipeline.languages",
            Self::NewsDetection => "pipeline.news",
            Self::Categorization => "pipeline.categories",
            Self::Threading => "pipeline.threads",
        }
    }
}

/// Create background job span.
///
/// # Arguments
///
/// * `job_type` - Type of background job
/// * `target` - Job target (language code, corpus directory, etc.)
///
/// # Example
///
/// ```rust,ignore
/// let span = background_span(BackgroundJobType::IndexSave, "en");
/// let _guard = span.entered();
/// ```
pub fn background_span(job_type: BackgroundJobType, target: &str) -> Span {
    span!(
        Level::INFO,
        "background.job",
        otel.name = %format!("{} {}", job_type.as_str(), target),
        otel.kind = "internal",
        job.type = job_type.as_str(),
        job.target = target,
        job.batch_size = field::Empty,
        job.duration_ms = field::Empty,
        job.status = field::Empty,
    )
}

/// Record background job metrics in the current span.
///
/// # Arguments
///
/// * `batch_size` - Number of items processed (optional)
/// * `duration_ms` - Processing duration in milliseconds (optional)
/// * `status` - Job status ("success", "failed", "partial")
///
/// # Example
///
/// ```rust,ignore
/// let span = background_span(BackgroundJobType::Eviction, "en");
/// let _guard = span.entered();
///
/// let removed = store.evict_expired(lang_id)?;
/// record_background_metrics(Some(removed.len()), None, "success");
/// ```
pub fn record_background_metrics(batch_size: Option<usize>, duration_ms: Option<u64>, status: &str) {
    let span = Span::current();
    if let Some(size) = batch_size {
        span.record("job.batch_size", size);
    }
    if let Some(duration) = duration_ms {
        span.record("job.duration_ms", duration);
    }
    span.record("job.status", status);
}
