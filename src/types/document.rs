//! Extracted documents and embedding vector helpers.

use serde::{Deserialize, Serialize};

/// Dense embedding of a document, RMS-normalized by the embedder.
pub type EmbeddingVector = Vec<f32>;

/// Article fields produced by an extractor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique article name (file name or request name)
    pub name: String,
    /// Publishing site
    pub site: String,
    pub title: String,
    /// Publication time, seconds since epoch (0 when unknown)
    pub published: u64,
    pub text: String,
}

impl Document {
    /// True when neither a title nor a body text was extracted.
    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.text.is_empty()
    }

    /// Title and text joined into one passage for language detection and embedding.
    pub fn full_text(&self) -> String {
        match (self.title.is_empty(), self.text.is_empty()) {
            (true, _) => self.text.clone(),
            (false, true) => self.title.clone(),
            (false, false) => format!("{}. {}", self.title, self.text),
        }
    }
}

/// Scale `vector` in place so that its root mean square is 1.
///
/// A zero vector stays zero.
pub fn rms_normalize(vector: &mut [f32]) {
    if vector.is_empty() {
        return;
    }
    let mean_square: f32 = vector.iter().map(|x| x * x).sum::<f32>() / vector.len() as f32;
    if mean_square > 0.0 {
        let scale = mean_square.sqrt().recip();
        vector.iter_mut().for_each(|x| *x *= scale);
    }
}
