// ============================================================
// Layer 3 — Vocabulary
// ============================================================
// Token string → integer id, fitted once on the training text.
//
// Id layout:
//   0      padding
//   1      unknown word
//   2..    words, most frequent first
//
// The embedding matrix has one row per id, so `len()` is the
// largest id + 1 rather than the number of entries.

use std::collections::HashMap;

pub const PAD_TOKEN: &str = "[PAD]";
pub const UNK_TOKEN: &str = "[UNK]";
pub const PAD_ID: u32 = 0;
pub const UNK_ID: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vocabulary {
    index: HashMap<String, u32>,
}

impl Vocabulary {
    pub fn new(index: HashMap<String, u32>) -> Self {
        Self { index }
    }

    /// Number of embedding rows needed to cover every id.
    pub fn len(&self) -> usize {
        self.index
            .values()
            .max()
            .map(|&max_id| max_id as usize + 1)
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn id(&self, token: &str) -> Option<u32> {
        self.index.get(token).copied()
    }
}

impl FromIterator<(String, u32)> for Vocabulary {
    fn from_iter<I: IntoIterator<Item = (String, u32)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn len_covers_the_largest_id() {
        let vocab: Vocabulary = [("a".to_string(), 0), ("b".to_string(), 7)]
            .into_iter()
            .collect();
        assert_eq!(vocab.len(), 8);
    }

    #[test]
    fn empty_vocabulary_has_no_rows() {
        let vocab = Vocabulary::default();
        assert_eq!(vocab.len(), 0);
        assert!(vocab.is_empty());
    }
}
