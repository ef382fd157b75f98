//! RocksDB storage layer.

pub mod column_families;
mod db;
pub mod keys;
mod records;

pub use db::Storage;
pub use records::RecordStore;
