//! Result type alias for news thread operations.

use super::error::ThreadsError;

/// Result type for news thread operations.
pub type Result<T> = std::result::Result<T, ThreadsError>;
