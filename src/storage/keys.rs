//! Key encoding and decoding functions for RocksDB.
//!
//! Numeric components are big-endian so that byte order equals numeric order
//! inside a language prefix.

use crate::types::{Result, ThreadsError};

const LANG_LEN: usize = 1;
const U64_LEN: usize = 8;

/// Encode record key.
///
/// Format: `{name}`
pub fn encode_record_key(name: &str) -> Vec<u8> {
    name.as_bytes().to_vec()
}

/// Prefix shared by every secondary-index key of one language.
pub fn language_prefix(lang_id: u8) -> [u8; 1] {
    [lang_id]
}

/// Encode publication-time index key.
///
/// Format: `{lang_id:u8}{published:u64 BE}{name}`
///
/// # Arguments
///
/// * `lang_id` - Language position in the configuration
/// * `published` - Publication time, seconds since epoch
/// * `name` - Record name
pub fn encode_published_key(lang_id: u8, published: u64, name: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(LANG_LEN + U64_LEN + name.len());
    key.push(lang_id);
    key.extend_from_slice(&published.to_be_bytes());
    key.extend_from_slice(name.as_bytes());
    key
}

/// Decode publication-time index key.
///
/// # Returns
///
/// `(lang_id, published, name)` tuple
///
/// # Errors
///
/// Returns `ThreadsError::InvalidKey` if the key is truncated or the name is not UTF-8
pub fn decode_published_key(key: &[u8]) -> Result<(u8, u64, String)> {
    if key.len() < LANG_LEN + U64_LEN {
        return Err(ThreadsError::InvalidKey(format!(
            "publication key too short: {} bytes",
            key.len()
        )));
    }
    let published = read_u64(&key[LANG_LEN..LANG_LEN + U64_LEN]);
    let name = std::str::from_utf8(&key[LANG_LEN + U64_LEN..])
        .map_err(|e| ThreadsError::InvalidKey(format!("publication key name: {}", e)))?;
    Ok((key[0], published, name.to_string()))
}

/// Encode vector id index key.
///
/// Format: `{lang_id:u8}{vector_id:u64 BE}`
pub fn encode_vector_id_key(lang_id: u8, vector_id: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(LANG_LEN + U64_LEN);
    key.push(lang_id);
    key.extend_from_slice(&vector_id.to_be_bytes());
    key
}

/// Decode vector id index key into `(lang_id, vector_id)`.
///
/// # Errors
///
/// Returns `ThreadsError::InvalidKey` if the key length is wrong
pub fn decode_vector_id_key(key: &[u8]) -> Result<(u8, u64)> {
    if key.len() != LANG_LEN + U64_LEN {
        return Err(ThreadsError::InvalidKey(format!(
            "vector id key must be {} bytes, got {}",
            LANG_LEN + U64_LEN,
            key.len()
        )));
    }
    Ok((key[0], read_u64(&key[LANG_LEN..])))
}

/// Smallest key greater than every key starting with `prefix`, if one exists.
pub fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut upper = prefix.to_vec();
    while let Some(last) = upper.pop() {
        if last < u8::MAX {
            upper.push(last + 1);
            return Some(upper);
        }
    }
    None
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; U64_LEN];
    buf.copy_from_slice(&bytes[..U64_LEN]);
    u64::from_be_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_published_key() {
        let key = encode_published_key(1, 1_590_000_000, "story.html");
        let (lang, published, name) = decode_published_key(&key).unwrap();
        assert_eq!(lang, 1);
        assert_eq!(published, 1_590_000_000);
        assert_eq!(name, "story.html");
    }

    #[test]
    fn test_published_keys_sort_by_time() {
        let early = encode_published_key(0, 255, "z");
        let late = encode_published_key(0, 256, "a");
        assert!(early < late);
        assert!(encode_published_key(0, u64::MAX, "z") < encode_published_key(1, 0, "a"));
    }

    #[test]
    fn test_vector_id_key() {
        let key = encode_vector_id_key(3, 42);
        assert_eq!(decode_vector_id_key(&key).unwrap(), (3, 42));
        assert!(decode_vector_id_key(&key[..5]).is_err());
    }

    #[test]
    fn test_truncated_published_key() {
        assert!(matches!(
            decode_published_key(&[0, 1, 2]),
            Err(ThreadsError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_prefix_successor() {
        assert_eq!(prefix_successor(&[0]), Some(vec![1]));
        assert_eq!(prefix_successor(&[4, 255]), Some(vec![5]));
        assert_eq!(prefix_successor(&[255]), None);
    }
}
