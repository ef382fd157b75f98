//! Per-language vector index with a memory-mapped on-disk format.
//!
//! # File Format
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ Header (24 bytes)                           │
//! │   Magic: "NTVINDEX" (8 bytes)               │
//! │   Version: u32                              │
//! │   Dimensionality: u32                       │
//! │   Count: u64                                │
//! ├─────────────────────────────────────────────┤
//! │ Entries (count × (8 + 4 × dim) bytes)       │
//! │   Vector id: u64                            │
//! │   Components: [f32; dim]                    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! All integers and floats are little-endian. Entries are written in
//! ascending id order.

use crate::types::{EmbeddingVector, Result, ThreadsError};
use memmap2::Mmap;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Magic number for file format validation.
const MAGIC: &[u8; 8] = b"NTVINDEX";

/// Current file format version.
const VERSION: u32 = 1;

/// Header size in bytes.
const HEADER_SIZE: usize = 24;

/// Index file header.
#[derive(Debug, Clone, Copy)]
struct Header {
    magic: [u8; 8],
    version: u32,
    dim: u32,
    count: u64,
}

impl Header {
    fn new(dim: u32, count: u64) -> Self {
        Self {
            magic: *MAGIC,
            version: VERSION,
            dim,
            count,
        }
    }

    /// Validate magic number and version.
    fn validate(&self) -> Result<()> {
        if &self.magic != MAGIC {
            return Err(ThreadsError::index(format!(
                "Invalid magic bytes: expected {:?}, got {:?}",
                MAGIC, self.magic
            )));
        }

        if self.version != VERSION {
            return Err(ThreadsError::index(format!(
                "Unsupported version: expected {}, got {}",
                VERSION, self.version
            )));
        }

        Ok(())
    }

    fn to_bytes(self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..8].copy_from_slice(&self.magic);
        bytes[8..12].copy_from_slice(&self.version.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.dim.to_le_bytes());
        bytes[16..24].copy_from_slice(&self.count.to_le_bytes());
        bytes
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(ThreadsError::index(format!(
                "Index file too short for header: {} bytes",
                bytes.len()
            )));
        }
        let mut magic = [0u8; 8];
        magic.copy_from_slice(&bytes[0..8]);

        let header = Self {
            magic,
            version: u32::from_le_bytes(le_array(&bytes[8..12])),
            dim: u32::from_le_bytes(le_array(&bytes[12..16])),
            count: u64::from_le_bytes(le_array(&bytes[16..24])),
        };
        header.validate()?;
        Ok(header)
    }
}

fn le_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut buf = [0u8; N];
    buf.copy_from_slice(&bytes[..N]);
    buf
}

/// Mutable mapping from vector id to embedding for one language.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    dimensions: usize,
    vectors: HashMap<u64, EmbeddingVector>,
}

impl VectorIndex {
    /// Create an empty index for vectors of `dimensions` components.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            vectors: HashMap::new(),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Insert or overwrite the vector stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns `ThreadsError::IndexError` if the vector has the wrong dimensionality
    pub fn set(&mut self, id: u64, vector: EmbeddingVector) -> Result<()> {
        if vector.len() != self.dimensions {
            return Err(ThreadsError::index(format!(
                "Vector dimension mismatch: index has {}, got {}",
                self.dimensions,
                vector.len()
            )));
        }
        self.vectors.insert(id, vector);
        Ok(())
    }

    /// Remove `id`; returns whether it was present.
    pub fn erase(&mut self, id: u64) -> bool {
        self.vectors.remove(&id).is_some()
    }

    pub fn lookup(&self, id: u64) -> Option<&EmbeddingVector> {
        self.vectors.get(&id)
    }

    pub fn contains(&self, id: u64) -> bool {
        self.vectors.contains_key(&id)
    }

    /// Persist the index to `path`.
    ///
    /// Writes `<path>.tmp` first and renames it over `path`, so a crash never
    /// leaves a truncated index behind.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// index.save("~/.news-threads/db/en.idx")?;
    /// ```
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let tmp = tmp_path(path);

        let mut ids: Vec<u64> = self.vectors.keys().copied().collect();
        ids.sort_unstable();

        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            let header = Header::new(self.dimensions as u32, ids.len() as u64);
            writer.write_all(&header.to_bytes())?;
            for id in ids {
                writer.write_all(&id.to_le_bytes())?;
                if let Some(vector) = self.vectors.get(&id) {
                    for value in vector {
                        writer.write_all(&value.to_le_bytes())?;
                    }
                }
            }
            writer.flush()?;
            writer
                .into_inner()
                .map_err(|e| ThreadsError::index(format!("Failed to flush index: {}", e.error())))?
                .sync_all()?;
        }

        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Load an index from `path`, expecting vectors of `dimensions` components.
    ///
    /// # Errors
    ///
    /// Returns `ThreadsError::IndexError` if the header is invalid, the file is
    /// truncated or its dimensionality differs from `dimensions`
    pub fn load<P: AsRef<Path>>(path: P, dimensions: usize) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        if (file.metadata()?.len() as usize) < HEADER_SIZE {
            return Err(ThreadsError::index(format!(
                "Index file {} is truncated",
                path.as_ref().display()
            )));
        }

        // SAFETY: the file is opened read-only and index files are only replaced
        // by rename, never modified in place.
        let mmap = unsafe { Mmap::map(&file)? };
        let header = Header::from_bytes(&mmap)?;

        if header.dim as usize != dimensions {
            return Err(ThreadsError::index(format!(
                "Index dimensionality {} does not match embedder dimensionality {}",
                header.dim, dimensions
            )));
        }

        let entry_size = 8 + 4 * dimensions;
        let expected = (header.count as usize)
            .checked_mul(entry_size)
            .and_then(|body| body.checked_add(HEADER_SIZE))
            .ok_or_else(|| ThreadsError::index("Index entry count overflows"))?;
        if mmap.len() != expected {
            return Err(ThreadsError::index(format!(
                "Index file size {} does not match header (expected {})",
                mmap.len(),
                expected
            )));
        }

        let mut vectors = HashMap::with_capacity(header.count as usize);
        for entry in mmap[HEADER_SIZE..].chunks_exact(entry_size) {
            let id = u64::from_le_bytes(le_array(&entry[..8]));
            let vector = entry[8..]
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes(le_array(c)))
                .collect();
            vectors.insert(id, vector);
        }

        Ok(Self { dimensions, vectors })
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
