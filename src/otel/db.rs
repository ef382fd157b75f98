//! Metadata store instrumentation.
//!
//! Implements OpenTelemetry semantic conventions for RocksDB operations.

use tracing::{field, span, Level, Span};

/// Metadata store operation types (maps to `db.operation.name`).
#[derive(Debug, Clone, Copy)]
pub enum DbOperation {
    /// Point lookup by name
    Get,
    /// Insert or replace a record
    Upsert,
    /// Remove a record by name
    Remove,
    /// Publication-time window scan
    Window,
    /// Newest publication time / highest vector id lookup
    MaxScan,
    /// Time-to-live sweep
    Evict,
    /// Full column family scan
    Scan,
}

impl DbOperation {
    /// Get operation name as string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Upsert => "upsert",
            Self::Remove => "remove",
            Self::Window => "window",
            Self::MaxScan => "max_scan",
            Self::Evict => "evict",
            Self::Scan => "scan",
        }
    }
}

/// Create metadata store operation span with semantic conventions.
///
/// # Arguments
///
/// * `operation` - Store operation type
/// * `collection` - Column family name (optional)
/// * `namespace` - Language code (optional)
///
/// # Returns
///
/// Tracing span with OpenTelemetry semantic attributes
///
/// # Example
///
/// ```rust,ignore
/// let span = db_span(DbOperation::Window, Some("by_published"), Some("en"));
/// let _guard = span.entered();
/// ```
pub fn db_span(operation: DbOperation, collection: Option<&str>, namespace: Option<&str>) -> Span {
    let span_name = if let Some(coll) = collection {
        format!("{} {}", operation.as_str(), coll)
    } else {
        operation.as_str().to_string()
    };

    let span = span!(
        Level::DEBUG,
        "db",
        otel.name = %span_name,
        otel.kind = "client",
        db.system.name = "rocksdb",
        db.operation.name = operation.as_str(),
        db.collection.name = field::Empty,
        db.namespace = field::Empty,
        db.response.returned_rows = field::Empty,
        db.response.affected_rows = field::Empty,
    );

    if let Some(coll) = collection {
        span.record("db.collection.name", coll);
    }
    if let Some(ns) = namespace {
        span.record("db.namespace", ns);
    }

    span
}

/// Record store operation metrics in the current span.
///
/// # Arguments
///
/// * `rows_returned` - Number of records returned (optional)
/// * `rows_affected` - Number of records written or removed (optional)
pub fn record_db_metrics(rows_returned: Option<usize>, rows_affected: Option<usize>) {
    let span = Span::current();
    if let Some(returned) = rows_returned {
        span.record("db.response.returned_rows", returned);
    }
    if let Some(affected) = rows_affected {
        span.record("db.response.affected_rows", affected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_operation_names() {
        assert_eq!(DbOperation::Get.as_str(), "get");
        assert_eq!(DbOperation::Upsert.as_str(), "upsert");
        assert_eq!(DbOperation::Evict.as_str(), "evict");
    }

    #[test]
    fn test_db_span_creation() {
        let span = db_span(DbOperation::Window, Some("by_published"), Some("en"));
        let _guard = span.enter();
        record_db_metrics(Some(3), None);
    }
}
