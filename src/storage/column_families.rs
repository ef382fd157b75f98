//! Column family constants and setup for RocksDB.
//!
//! Records live in one column family keyed by name; two secondary column
//! families order them per language by publication time and by vector id.

use rocksdb::{BlockBasedOptions, ColumnFamilyDescriptor, DBCompressionType, Options};

/// Primary record storage (`name` -> bincode `Record`)
pub const CF_RECORDS: &str = "records";

/// Publication-time index (`lang_id | published | name` -> empty)
pub const CF_BY_PUBLISHED: &str = "by_published";

/// Vector id index (`lang_id | vector_id` -> name)
pub const CF_BY_VECTOR_ID: &str = "by_vector_id";

/// Get all column family names.
pub fn all_column_families() -> Vec<&'static str> {
    vec![CF_RECORDS, CF_BY_PUBLISHED, CF_BY_VECTOR_ID]
}

/// Create column family descriptors with per-family options.
pub fn create_column_family_descriptors() -> Vec<ColumnFamilyDescriptor> {
    all_column_families()
        .into_iter()
        .map(|name| {
            let opts = if name == CF_RECORDS {
                record_cf_options()
            } else {
                index_cf_options()
            };
            ColumnFamilyDescriptor::new(name, opts)
        })
        .collect()
}

/// Options for record storage: compressed values, bloom filter for point lookups by name.
pub fn record_cf_options() -> Options {
    let mut block = BlockBasedOptions::default();
    block.set_bloom_filter(10.0, false);

    let mut opts = Options::default();
    opts.set_compression_type(DBCompressionType::Lz4);
    opts.set_block_based_table_factory(&block);
    opts
}

/// Options for the secondary index families: small keys scanned in order.
pub fn index_cf_options() -> Options {
    let mut opts = Options::default();
    opts.set_compression_type(DBCompressionType::None);
    opts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_column_families() {
        let cfs = all_column_families();
        assert_eq!(cfs.len(), 3);
        assert!(cfs.contains(&CF_RECORDS));
        assert!(cfs.contains(&CF_BY_PUBLISHED));
        assert!(cfs.contains(&CF_BY_VECTOR_ID));
    }

    #[test]
    fn test_column_family_descriptors() {
        assert_eq!(create_column_family_descriptors().len(), all_column_families().len());
    }
}
