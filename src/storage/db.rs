//! Core storage operations using RocksDB.
//!
//! Provides low-level get/put/delete operations with column family support,
//! atomic batches and ordered prefix scans.

use crate::types::{Result, ThreadsError};
use rocksdb::{BoundColumnFamily, WriteBatch, DB};
use std::path::Path;
use std::sync::Arc;

use super::keys::prefix_successor;

/// Storage wrapper around RocksDB with column family support.
///
/// Thread-safe; clones share the same database handle.
#[derive(Clone)]
pub struct Storage {
    db: Arc<DB>,
}

impl Storage {
    /// Open database at path with column families.
    ///
    /// Creates database and column families if they don't exist.
    ///
    /// # Arguments
    ///
    /// * `path` - Database directory path
    ///
    /// # Errors
    ///
    /// Returns `ThreadsError::StorageError` if RocksDB fails to open
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let storage = Storage::open("./data")?;
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = rocksdb::Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        opts.set_max_open_files(1000);
        opts.set_max_background_jobs(4);
        opts.set_write_buffer_size(64 * 1024 * 1024); // 64MB

        let cfs = super::column_families::create_column_family_descriptors();
        let db = DB::open_cf_descriptors(&opts, path, cfs)?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Get value from column family.
    ///
    /// # Returns
    ///
    /// `Some(Vec<u8>)` if key exists, `None` otherwise
    pub fn get(&self, cf_name: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let cf = self.cf_handle(cf_name)?;
        Ok(self.db.get_cf(&cf, key)?)
    }

    /// Write batch atomically.
    pub fn write(&self, batch: WriteBatch) -> Result<()> {
        Ok(self.db.write(batch)?)
    }

    /// Collect key/value pairs starting at `from` while keys carry `prefix`.
    ///
    /// # Arguments
    ///
    /// * `cf_name` - Column family name
    /// * `prefix` - Keys outside this prefix end the scan
    /// * `from` - Seek position; must itself start with `prefix`
    pub fn scan_from(&self, cf_name: &str, prefix: &[u8], from: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let cf = self.cf_handle(cf_name)?;
        let mut iter = self.db.raw_iterator_cf(&cf);
        iter.seek(from);

        let mut entries = Vec::new();
        while iter.valid() {
            match (iter.key(), iter.value()) {
                (Some(key), Some(value)) if key.starts_with(prefix) => {
                    entries.push((key.to_vec(), value.to_vec()));
                }
                _ => break,
            }
            iter.next();
        }
        iter.status()?;
        Ok(entries)
    }

    /// Collect every key/value pair carrying `prefix`.
    pub fn scan_prefix(&self, cf_name: &str, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        self.scan_from(cf_name, prefix, prefix)
    }

    /// Largest key carrying `prefix`.
    pub fn last_key_with_prefix(&self, cf_name: &str, prefix: &[u8]) -> Result<Option<Vec<u8>>> {
        let cf = self.cf_handle(cf_name)?;
        let mut iter = self.db.raw_iterator_cf(&cf);
        match prefix_successor(prefix) {
            Some(upper) => {
                iter.seek_for_prev(&upper);
                if iter.valid() && iter.key() == Some(upper.as_slice()) {
                    iter.prev();
                }
            }
            None => iter.seek_to_last(),
        }

        let found = if iter.valid() {
            iter.key().filter(|key| key.starts_with(prefix)).map(<[u8]>::to_vec)
        } else {
            None
        };
        iter.status()?;
        Ok(found)
    }

    /// Count keys in a column family.
    pub fn count(&self, cf_name: &str) -> Result<usize> {
        let cf = self.cf_handle(cf_name)?;
        let mut iter = self.db.raw_iterator_cf(&cf);
        iter.seek_to_first();
        let mut count = 0;
        while iter.valid() {
            count += 1;
            iter.next();
        }
        iter.status()?;
        Ok(count)
    }

    /// Get column family handle.
    ///
    /// # Errors
    ///
    /// Returns `ThreadsError::InternalError` if the column family was not created at open
    pub fn cf_handle(&self, cf_name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(cf_name)
            .ok_or_else(|| ThreadsError::internal(format!("Column family not found: {}", cf_name)))
    }

    /// Flush the memtables of every column family to disk.
    pub fn flush(&self) -> Result<()> {
        for cf_name in super::column_families::all_column_families() {
            let cf = self.cf_handle(cf_name)?;
            self.db.flush_cf(&cf)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::column_families::{CF_BY_PUBLISHED, CF_RECORDS};
    use tempfile::TempDir;

    fn put(storage: &Storage, cf_name: &str, key: &[u8], value: &[u8]) {
        let cf = storage.cf_handle(cf_name).unwrap();
        let mut batch = WriteBatch::default();
        batch.put_cf(&cf, key, value);
        storage.write(batch).unwrap();
    }

    #[test]
    fn test_batch_write_and_get() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::open(dir.path()).unwrap();

        put(&storage, CF_RECORDS, b"a", b"1");
        assert_eq!(storage.get(CF_RECORDS, b"a").unwrap(), Some(b"1".to_vec()));

        let cf = storage.cf_handle(CF_RECORDS).unwrap();
        let mut batch = WriteBatch::default();
        batch.delete_cf(&cf, b"a");
        storage.write(batch).unwrap();
        assert_eq!(storage.get(CF_RECORDS, b"a").unwrap(), None);
    }

    #[test]
    fn test_prefix_scans() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::open(dir.path()).unwrap();

        for key in [&[0u8, 5][..], &[1, 1], &[1, 3], &[1, 9], &[2, 0]] {
            put(&storage, CF_BY_PUBLISHED, key, b"");
        }

        let keys: Vec<Vec<u8>> = storage
            .scan_prefix(CF_BY_PUBLISHED, &[1])
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec![vec![1, 1], vec![1, 3], vec![1, 9]]);

        let tail = storage.scan_from(CF_BY_PUBLISHED, &[1], &[1, 2]).unwrap();
        assert_eq!(tail.len(), 2);

        assert_eq!(
            storage.last_key_with_prefix(CF_BY_PUBLISHED, &[1]).unwrap(),
            Some(vec![1, 9])
        );
        assert_eq!(storage.last_key_with_prefix(CF_BY_PUBLISHED, &[3]).unwrap(), None);
        assert_eq!(storage.count(CF_BY_PUBLISHED).unwrap(), 5);
    }

    #[test]
    fn test_unknown_column_family() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        assert!(matches!(
            storage.get("missing", b"k"),
            Err(ThreadsError::InternalError(_))
        ));
    }
}
