//! Linear news and category classifiers loaded from JSON weights.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use super::{CategoryClassifier, NewsClassifier};
use crate::types::{Category, EmbeddingVector, Result, ThreadsError};

fn dot(weights: &[f32], vector: &[f32]) -> f32 {
    weights.iter().zip(vector).map(|(w, x)| w * x).sum()
}

/// Binary news filter: accepts a vector when `w·v + b > 0`.
#[derive(Debug, Clone, Deserialize)]
pub struct LinearNewsClassifier {
    weights: Vec<f32>,
    bias: f32,
}

impl LinearNewsClassifier {
    pub fn new(weights: Vec<f32>, bias: f32) -> Self {
        Self { weights, bias }
    }

    /// Load `{ "weights": [..], "bias": b }` and check it against `dimensions`.
    pub fn load<P: AsRef<Path>>(path: P, dimensions: usize) -> Result<Self> {
        let path = path.as_ref();
        let model: Self = serde_json::from_str(&fs::read_to_string(path)?)?;
        if model.weights.len() != dimensions {
            return Err(ThreadsError::model(format!(
                "{}: news model has {} weights, embedder has {} dimensions",
                path.display(),
                model.weights.len(),
                dimensions
            )));
        }
        Ok(model)
    }
}

impl NewsClassifier for LinearNewsClassifier {
    fn classify(&self, vectors: &[EmbeddingVector]) -> Vec<bool> {
        vectors
            .iter()
            .map(|v| v.len() == self.weights.len() && dot(&self.weights, v) + self.bias > 0.0)
            .collect()
    }
}

/// Seven-way category classifier: argmax of `W·v + b` in category order.
#[derive(Debug, Clone, Deserialize)]
pub struct LinearCategoryClassifier {
    weights: Vec<Vec<f32>>,
    bias: Vec<f32>,
}

impl LinearCategoryClassifier {
    /// Create a classifier from one weight row and one bias per category.
    pub fn new(weights: Vec<Vec<f32>>, bias: Vec<f32>) -> Result<Self> {
        let model = Self { weights, bias };
        model.check_shape(None)?;
        Ok(model)
    }

    /// Load `{ "weights": [[..]; 7], "bias": [..; 7] }` and check it against `dimensions`.
    pub fn load<P: AsRef<Path>>(path: P, dimensions: usize) -> Result<Self> {
        let path = path.as_ref();
        let model: Self = serde_json::from_str(&fs::read_to_string(path)?)?;
        model
            .check_shape(Some(dimensions))
            .map_err(|e| ThreadsError::model(format!("{}: {}", path.display(), e)))?;
        Ok(model)
    }

    fn check_shape(&self, dimensions: Option<usize>) -> Result<()> {
        let classes = Category::ALL.len();
        if self.weights.len() != classes || self.bias.len() != classes {
            return Err(ThreadsError::model(format!(
                "category model needs {} weight rows and biases, got {} and {}",
                classes,
                self.weights.len(),
                self.bias.len()
            )));
        }
        let width = dimensions.unwrap_or(self.weights[0].len());
        if self.weights.iter().any(|row| row.len() != width) {
            return Err(ThreadsError::model(format!(
                "category model rows must all have {} weights",
                width
            )));
        }
        Ok(())
    }

    fn predict(&self, vector: &[f32]) -> Option<Category> {
        if self.weights.first().map(Vec::len) != Some(vector.len()) {
            return None;
        }
        self.weights
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| dot(row, vector) + b)
            .enumerate()
            .filter(|(_, score)| score.is_finite())
            // first category wins ties
            .min_by(|a, b| b.1.total_cmp(&a.1))
            .and_then(|(i, _)| Category::from_id(i as u8))
    }
}

impl CategoryClassifier for LinearCategoryClassifier {
    fn classify(&self, vectors: &[EmbeddingVector]) -> Vec<Option<Category>> {
        vectors.iter().map(|v| self.predict(v)).collect()
    }
}
