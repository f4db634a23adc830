// ============================================================
// Layer 4 — Text Preprocessor
// ============================================================
// Normalises raw comment text before it reaches the word-level
// tokenizer, and fits token ids to the fixed sequence length.
//
// Cleaning steps (applied in order):
//   1. Lowercase
//   2. Replace filtered punctuation and control characters with a space
//   3. Collapse runs of whitespace into single spaces
//
// Filtered characters:
//   !"#$%&()*+,-./:;<=>?@[\]^_`{|}~  plus tab and newline.
// Apostrophes survive so "don't" stays one word.

const FILTERED: &str = "!\"#$%&()*+,-./:;<=>?@[\\]^_`{|}~";

pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Clean one text. The result contains only lowercase words
    /// separated by single spaces.
    pub fn clean(&self, text: &str) -> String {
        let filtered: String = text
            .chars()
            .flat_map(char::to_lowercase)
            .map(|c| {
                if FILTERED.contains(c) || c.is_control() || c.is_whitespace() {
                    ' '
                } else {
                    c
                }
            })
            .collect();

        filtered.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Fit `ids` to exactly `length` entries.
///
/// Long sequences lose their leading ids; short ones are padded with
/// `pad_id` at the front.
pub fn pad_sequence(ids: &[u32], length: usize, pad_id: u32) -> Vec<u32> {
    if ids.len() >= length {
        return ids[ids.len() - length..].to_vec();
    }

    let mut padded = vec![pad_id; length - ids.len()];
    padded.extend_from_slice(ids);
    padded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_strips_punctuation() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("Hello, World!"), "hello world");
    }

    #[test]
    fn test_keeps_apostrophes() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("Don't STOP"), "don't stop");
    }

    #[test]
    fn test_collapses_whitespace_and_newlines() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("  one\n\n two\tthree  "), "one two three");
    }

    #[test]
    fn test_empty_string() {
        let p = Preprocessor::new();
        assert_eq!(p.clean(""), "");
    }

    #[test]
    fn test_pad_sequence_pads_at_front() {
        assert_eq!(pad_sequence(&[5, 6], 4, 0), vec![0, 0, 5, 6]);
    }

    #[test]
    fn test_pad_sequence_truncates_leading_ids() {
        assert_eq!(pad_sequence(&[1, 2, 3, 4, 5], 3, 0), vec![3, 4, 5]);
    }

    #[test]
    fn test_pad_sequence_exact_length_is_unchanged() {
        assert_eq!(pad_sequence(&[7, 8, 9], 3, 0), vec![7, 8, 9]);
    }
}
