//! OpenTelemetry-style instrumentation for the metadata store and background jobs.
//!
//! Follows OpenTelemetry semantic conventions for database operations:
//! - https://opentelemetry.io/docs/specs/semconv/database/database-spans/
//!
//! # Database Semantic Conventions
//!
//! **Span naming**: `{db.operation.name} {column family}`
//! - Example: `get records`, `window by_published`, `evict by_published`
//!
//! **Attributes**:
//! - `db.system.name`: Always `"rocksdb"`
//! - `db.collection.name`: Column family
//! - `db.namespace`: Language code, when the operation is scoped to one
//!
//! # Background Job Conventions
//!
//! Sync, eviction, index persistence and batch pipeline stages use the
//! `INTERNAL` span kind with `job.type`, `job.target`, `job.status` and
//! `job.batch_size` attributes.
//!
//! # Example
//!
//! ```rust,ignore
//! use news_threads::otel::{db_span, DbOperation};
//!
//! let span = db_span(DbOperation::Get, Some("records"), None);
//! let _guard = span.entered();
//! ```

pub mod background;
pub mod db;

pub use background::{background_span, record_background_metrics, BackgroundJobType};
pub use db::{db_span, record_db_metrics, DbOperation};
