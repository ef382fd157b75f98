//! Word2vec sentence embedding.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

use super::Embedder;
use crate::types::{rms_normalize, Document, EmbeddingVector, Result, ThreadsError};

/// Embeds documents as the RMS-normalized sum of their word vectors.
///
/// Models use the word2vec text format: a `count dim` header line followed by
/// one `word v1 .. vdim` line per word.
#[derive(Debug, Clone)]
pub struct Word2VecEmbedder {
    dimensions: usize,
    words: HashMap<String, Vec<f32>>,
}

impl Word2VecEmbedder {
    /// Build an embedder from in-memory word vectors.
    ///
    /// # Errors
    ///
    /// Returns `ThreadsError::ModelError` if a vector has the wrong dimensionality
    pub fn from_words(dimensions: usize, words: HashMap<String, Vec<f32>>) -> Result<Self> {
        if let Some((word, _)) = words.iter().find(|(_, v)| v.len() != dimensions) {
            return Err(ThreadsError::model(format!(
                "Word vector for '{}' does not have {} components",
                word, dimensions
            )));
        }
        Ok(Self { dimensions, words })
    }

    /// Load a text word2vec model.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut lines = BufReader::new(File::open(path)?).lines();
        let header = lines
            .next()
            .transpose()?
            .ok_or_else(|| ThreadsError::model(format!("{} is empty", path.display())))?;
        let (count, dimensions) = parse_header(&header)?;

        let mut words = HashMap::with_capacity(count);
        for (line_no, line) in lines.enumerate() {
            let line = line?;
            let mut fields = line.split_whitespace();
            let Some(word) = fields.next() else {
                continue;
            };
            let vector = fields
                .map(str::parse::<f32>)
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| {
                    ThreadsError::model(format!("{} line {}: {}", path.display(), line_no + 2, e))
                })?;
            if vector.len() != dimensions {
                return Err(ThreadsError::model(format!(
                    "{} line {}: expected {} components, got {}",
                    path.display(),
                    line_no + 2,
                    dimensions,
                    vector.len()
                )));
            }
            words.insert(word.to_string(), vector);
        }

        info!(path = %path.display(), words = words.len(), dimensions, "Loaded word2vec model");
        Ok(Self { dimensions, words })
    }

    /// Read only the dimensionality from a model header.
    pub fn read_dimensions<P: AsRef<Path>>(path: P) -> Result<usize> {
        let path = path.as_ref();
        let header = BufReader::new(File::open(path)?)
            .lines()
            .next()
            .transpose()?
            .ok_or_else(|| ThreadsError::model(format!("{} is empty", path.display())))?;
        Ok(parse_header(&header)?.1)
    }

    /// Embed one passage of text.
    pub fn embed_text(&self, text: &str) -> EmbeddingVector {
        let mut vector = vec![0.0f32; self.dimensions];
        let lowered = text.to_lowercase();
        for token in lowered.split(|c: char| !c.is_alphabetic()) {
            if token.is_empty() {
                continue;
            }
            if let Some(word) = self.words.get(token) {
                vector.iter_mut().zip(word).for_each(|(acc, x)| *acc += x);
            }
        }
        rms_normalize(&mut vector);
        vector
    }
}

fn parse_header(header: &str) -> Result<(usize, usize)> {
    let mut fields = header.split_whitespace().map(str::parse::<usize>);
    match (fields.next(), fields.next()) {
        (Some(Ok(count)), Some(Ok(dimensions))) if dimensions > 0 => Ok((count, dimensions)),
        _ => Err(ThreadsError::model(format!("Invalid word2vec header: '{}'", header))),
    }
}

impl Embedder for Word2VecEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, documents: &[Document]) -> Vec<EmbeddingVector> {
        documents.iter().map(|doc| self.embed_text(&doc.full_text())).collect()
    }
}
