//! Core data types for news threading.

pub mod category;
pub mod document;
pub mod error;
pub mod outcome;
pub mod record;
pub mod result;

pub use category::{Category, CategoryFilter};
pub use document::{rms_normalize, Document, EmbeddingVector};
pub use error::ThreadsError;
pub use outcome::{CreateKind, DeleteStatus, GetStatus, PutStatus, ThreadView, ThreadsPayload};
pub use record::Record;
pub use result::Result;
