//! News Threads - online news clustering core library
//!
//! Ingests news articles, keeps the ones that are news in a supported
//! language, and serves ranked threads of related stories:
//! - Density clustering with a size-adaptive similarity cutoff
//! - Per-language vector indexes persisted next to a RocksDB metadata store
//! - Windowed retrieval with time-to-live eviction in the background
//! - Offline batch stages over a directory of article files
//!
//! Can be used as:
//! - Standalone Rust library
//! - `nthreads` command line tool (serving loop and batch stages)

pub mod types;
pub mod config;
pub mod storage;
pub mod index;
pub mod cluster;
pub mod models;
pub mod otel;

// High-level service API
pub mod repository;
pub mod server;
pub mod pipeline;

pub use config::{Config, LanguageConfig};
pub use repository::{Collaborators, Repository};
pub use types::{Category, CategoryFilter, DeleteStatus, GetStatus, PutStatus, Result, ThreadsError};
