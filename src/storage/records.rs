//! Record store: persisted article metadata with per-language time and id indexes.

use parking_lot::Mutex;
use rocksdb::WriteBatch;
use std::path::Path;
use tracing::debug;

use super::column_families::{CF_BY_PUBLISHED, CF_BY_VECTOR_ID, CF_RECORDS};
use super::db::Storage;
use super::keys::{
    decode_published_key, decode_vector_id_key, encode_published_key, encode_record_key,
    encode_vector_id_key, language_prefix,
};
use crate::otel::{db_span, record_db_metrics, DbOperation};
use crate::types::{CategoryFilter, Record, Result};

/// Metadata store shared by every language.
///
/// Writes are serialized by one writer lock so that each read-modify-write
/// (upsert, remove, eviction) is linearizable; every write lands in a single
/// atomic `WriteBatch`.
pub struct RecordStore {
    storage: Storage,
    writer: Mutex<()>,
}

impl RecordStore {
    /// Open or create the store at `path`.
    ///
    /// # Errors
    ///
    /// Returns `ThreadsError::StorageError` if RocksDB fails to open
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            storage: Storage::open(path)?,
            writer: Mutex::new(()),
        })
    }

    /// Look up a record by name.
    pub fn get(&self, name: &str) -> Result<Option<Record>> {
        let span = db_span(DbOperation::Get, Some(CF_RECORDS), None);
        let _guard = span.enter();

        match self.storage.get(CF_RECORDS, &encode_record_key(name))? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Insert `record`, replacing any record with the same name.
    ///
    /// # Returns
    ///
    /// The replaced record, if there was one
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// match store.upsert(&record)? {
    ///     Some(old) => index.erase(old.vector_id),
    ///     None => {}
    /// }
    /// ```
    pub fn upsert(&self, record: &Record) -> Result<Option<Record>> {
        let _writer = self.writer.lock();
        let span = db_span(DbOperation::Upsert, Some(CF_RECORDS), None);
        let _guard = span.enter();

        let previous = self.get(&record.name)?;
        let mut batch = WriteBatch::default();
        if let Some(old) = &previous {
            self.stage_delete(&mut batch, old)?;
        }
        self.stage_insert(&mut batch, record)?;
        self.storage.write(batch)?;

        record_db_metrics(None, Some(if previous.is_some() { 2 } else { 1 }));
        Ok(previous)
    }

    /// Remove the record named `name`.
    ///
    /// # Returns
    ///
    /// The removed record, or `None` if no record had that name
    pub fn remove(&self, name: &str) -> Result<Option<Record>> {
        let _writer = self.writer.lock();
        let span = db_span(DbOperation::Remove, Some(CF_RECORDS), None);
        let _guard = span.enter();

        let Some(record) = self.get(name)? else {
            return Ok(None);
        };
        let mut batch = WriteBatch::default();
        self.stage_delete(&mut batch, &record)?;
        self.storage.write(batch)?;

        record_db_metrics(None, Some(1));
        Ok(Some(record))
    }

    /// Newest publication time among the records of a language.
    pub fn max_published(&self, lang_id: u8) -> Result<Option<u64>> {
        let span = db_span(DbOperation::MaxScan, Some(CF_BY_PUBLISHED), Some(&lang_id.to_string()));
        let _guard = span.enter();

        match self
            .storage
            .last_key_with_prefix(CF_BY_PUBLISHED, &language_prefix(lang_id))?
        {
            Some(key) => Ok(Some(decode_published_key(&key)?.1)),
            None => Ok(None),
        }
    }

    /// Highest vector id stored for a language, 0 when it has no records.
    pub fn max_vector_id(&self, lang_id: u8) -> Result<u64> {
        let span = db_span(DbOperation::MaxScan, Some(CF_BY_VECTOR_ID), Some(&lang_id.to_string()));
        let _guard = span.enter();

        match self
            .storage
            .last_key_with_prefix(CF_BY_VECTOR_ID, &language_prefix(lang_id))?
        {
            Some(key) => Ok(decode_vector_id_key(&key)?.1),
            None => Ok(0),
        }
    }

    /// Records of a language published within `period` seconds of its newest record.
    ///
    /// The window is `[max_published - period, max_published]`, anchored to the
    /// newest record rather than wall-clock time. Results are ordered by
    /// publication time.
    pub fn window(&self, lang_id: u8, filter: CategoryFilter, period: u64) -> Result<Vec<Record>> {
        let Some(max_published) = self.max_published(lang_id)? else {
            return Ok(Vec::new());
        };

        let span = db_span(DbOperation::Window, Some(CF_BY_PUBLISHED), Some(&lang_id.to_string()));
        let _guard = span.enter();

        let start = max_published.saturating_sub(period);
        let prefix = language_prefix(lang_id);
        let from = encode_published_key(lang_id, start, "");

        let mut records = Vec::new();
        for (key, _) in self.storage.scan_from(CF_BY_PUBLISHED, &prefix, &from)? {
            let (_, _, name) = decode_published_key(&key)?;
            match self.get(&name)? {
                Some(record) if filter.accepts(record.category) => records.push(record),
                Some(_) => {}
                None => debug!(name = %name, "Publication index entry without record"),
            }
        }

        record_db_metrics(Some(records.len()), None);
        Ok(records)
    }

    /// Remove and return the records of a language whose time to live has run out.
    ///
    /// A record expires when `published + ttl < max_published` for its language.
    pub fn evict_expired(&self, lang_id: u8) -> Result<Vec<Record>> {
        let _writer = self.writer.lock();
        let Some(max_published) = self.max_published(lang_id)? else {
            return Ok(Vec::new());
        };

        let span = db_span(DbOperation::Evict, Some(CF_BY_PUBLISHED), Some(&lang_id.to_string()));
        let _guard = span.enter();

        let mut batch = WriteBatch::default();
        let mut expired = Vec::new();
        for (key, _) in self
            .storage
            .scan_prefix(CF_BY_PUBLISHED, &language_prefix(lang_id))?
        {
            let (_, _, name) = decode_published_key(&key)?;
            if let Some(record) = self.get(&name)? {
                if record.is_expired(max_published) {
                    self.stage_delete(&mut batch, &record)?;
                    expired.push(record);
                }
            }
        }

        if !expired.is_empty() {
            self.storage.write(batch)?;
        }
        record_db_metrics(None, Some(expired.len()));
        Ok(expired)
    }

    /// Number of stored records across all languages.
    pub fn count(&self) -> Result<usize> {
        let span = db_span(DbOperation::Scan, Some(CF_RECORDS), None);
        let _guard = span.enter();
        self.storage.count(CF_RECORDS)
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> Result<()> {
        self.storage.flush()
    }

    fn stage_insert(&self, batch: &mut WriteBatch, record: &Record) -> Result<()> {
        let records = self.storage.cf_handle(CF_RECORDS)?;
        let by_published = self.storage.cf_handle(CF_BY_PUBLISHED)?;
        let by_vector_id = self.storage.cf_handle(CF_BY_VECTOR_ID)?;

        batch.put_cf(&records, encode_record_key(&record.name), bincode::serialize(record)?);
        batch.put_cf(
            &by_published,
            encode_published_key(record.lang_id, record.published, &record.name),
            b"",
        );
        batch.put_cf(
            &by_vector_id,
            encode_vector_id_key(record.lang_id, record.vector_id),
            record.name.as_bytes(),
        );
        Ok(())
    }

    fn stage_delete(&self, batch: &mut WriteBatch, record: &Record) -> Result<()> {
        let records = self.storage.cf_handle(CF_RECORDS)?;
        let by_published = self.storage.cf_handle(CF_BY_PUBLISHED)?;
        let by_vector_id = self.storage.cf_handle(CF_BY_VECTOR_ID)?;

        batch.delete_cf(&records, encode_record_key(&record.name));
        batch.delete_cf(
            &by_published,
            encode_published_key(record.lang_id, record.published, &record.name),
        );
        batch.delete_cf(&by_vector_id, encode_vector_id_key(record.lang_id, record.vector_id));
        Ok(())
    }
}
