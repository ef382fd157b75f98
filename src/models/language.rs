//! Script-based language detection.

use super::LanguageDetector;

/// Detects a language code from the dominant alphabet of a text.
///
/// Latin letters map to `en`, Cyrillic letters to `ru`. This is a
/// deterministic stand-in for a trained language identifier: it cannot tell
/// languages sharing an alphabet apart, and texts without a clear majority
/// are left undetermined.
#[derive(Debug, Clone)]
pub struct ScriptLanguageDetector {
    /// Share of letters the dominant alphabet must reach
    min_share: f32,
}

impl Default for ScriptLanguageDetector {
    fn default() -> Self {
        Self { min_share: 0.6 }
    }
}

impl ScriptLanguageDetector {
    pub fn new(min_share: f32) -> Self {
        Self { min_share }
    }
}

fn is_cyrillic(c: char) -> bool {
    matches!(c, '\u{0400}'..='\u{04FF}' | '\u{0500}'..='\u{052F}')
}

fn is_latin(c: char) -> bool {
    c.is_ascii_alphabetic() || matches!(c, '\u{00C0}'..='\u{024F}')
}

impl LanguageDetector for ScriptLanguageDetector {
    fn detect(&self, text: &str) -> Option<String> {
        let (mut latin, mut cyrillic) = (0usize, 0usize);
        for c in text.chars() {
            if is_latin(c) {
                latin += 1;
            } else if is_cyrillic(c) {
                cyrillic += 1;
            }
        }

        let letters = latin + cyrillic;
        if letters == 0 {
            return None;
        }
        let share = |count: usize| count as f32 / letters as f32;
        if share(latin) >= self.min_share {
            Some("en".to_string())
        } else if share(cyrillic) >= self.min_share {
            Some("ru".to_string())
        } else {
            None
        }
    }
}
