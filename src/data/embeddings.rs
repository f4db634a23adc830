// ============================================================
// Layer 4 — Pretrained Embedding Loader
// ============================================================
// Reads a GloVe-style text file and builds a dense matrix aligned
// to the vocabulary:
//
//   row id  = vocabulary id of the token
//   columns = embedding dimensions
//
// File format, one token per line:
//   the 0.418 0.24968 -0.41242 ...
//
// The vector is taken from the right (last `dim` fields) because a
// handful of GloVe tokens contain spaces. Lines for tokens outside
// the vocabulary are skipped before their floats are parsed, which
// keeps a full 42B-token file cheap to scan.
//
// Tokens that never appear in the file keep an all-zero row.
//
// The first line fixes the file's vector width; a width other than
// `dim`, or a file that covers no vocabulary token at all, is a
// data error rather than a silently all-zero matrix.

use anyhow::{Context, Result};
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use crate::domain::{error::DataError, vocabulary::Vocabulary};

/// Row-major `(rows, dim)` matrix of embedding vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingMatrix {
    pub values: Vec<f32>,
    pub rows:   usize,
    pub dim:    usize,
}

impl EmbeddingMatrix {
    pub fn zeros(rows: usize, dim: usize) -> Self {
        Self { values: vec![0.0; rows * dim], rows, dim }
    }

    pub fn row(&self, id: usize) -> &[f32] {
        &self.values[id * self.dim..(id + 1) * self.dim]
    }

    fn row_mut(&mut self, id: usize) -> &mut [f32] {
        &mut self.values[id * self.dim..(id + 1) * self.dim]
    }

    pub fn zero_rows(&self) -> usize {
        (0..self.rows)
            .filter(|&id| self.row(id).iter().all(|&v| v == 0.0))
            .count()
    }
}

/// Build the `(vocabulary.len(), dim)` matrix from the file at `path`.
pub fn load_embedding_matrix(
    path:       &Path,
    vocabulary: &Vocabulary,
    dim:        usize,
) -> Result<EmbeddingMatrix> {
    let file = File::open(path)
        .with_context(|| format!("Cannot open embedding file '{}'", path.display()))?;

    let mut matrix  = EmbeddingMatrix::zeros(vocabulary.len(), dim);
    let mut found   = 0usize;
    let mut skipped = 0usize;
    let mut lines   = 0usize;

    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line
            .with_context(|| format!("Cannot read line {} of '{}'", line_no + 1, path.display()))?;

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }

        lines += 1;
        if lines == 1 {
            let width = vector_width(&fields);
            if width != dim {
                return Err(DataError::EmbeddingWidth {
                    path:     path.display().to_string(),
                    line:     line_no + 1,
                    expected: dim,
                    found:    width,
                }
                .into());
            }
        }

        if fields.len() <= dim {
            skipped += 1;
            continue;
        }

        let split = fields.len() - dim;
        let token = fields[..split].join(" ");
        let Some(id) = vocabulary.id(&token) else {
            continue;
        };

        let vector: Result<Vec<f32>, _> = fields[split..].iter().map(|v| v.parse::<f32>()).collect();
        match vector {
            Ok(vector) => {
                matrix.row_mut(id as usize).copy_from_slice(&vector);
                found += 1;
            }
            Err(e) => {
                tracing::debug!("Skipping line {} of '{}': {}", line_no + 1, path.display(), e);
                skipped += 1;
            }
        }
    }

    if lines > 0 && found == 0 {
        return Err(DataError::NoEmbeddingsFound { path: path.display().to_string() }.into());
    }

    tracing::info!(
        "Embedding matrix {}x{}: {} tokens found, {} zero rows, {} malformed lines skipped",
        matrix.rows,
        dim,
        found,
        matrix.zero_rows(),
        skipped,
    );

    Ok(matrix)
}

/// Number of trailing numeric fields after the leading token.
fn vector_width(fields: &[&str]) -> usize {
    fields[1..]
        .iter()
        .rev()
        .take_while(|v| v.parse::<f32>().is_ok())
        .count()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn vocab_of(n: u32) -> Vocabulary {
        (0..n).map(|i| (format!("tok{i}"), i)).collect()
    }

    #[test]
    fn matrix_has_vocab_by_dim_shape_and_zero_rows_for_missing_tokens() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.txt");
        let mut f = File::create(&path).unwrap();

        // 40 of the 50 tokens, plus one token outside the vocabulary
        for i in 0..40 {
            writeln!(f, "tok{i} {}.5 -1.0 0.25", i + 1).unwrap();
        }
        writeln!(f, "stranger 9.0 9.0 9.0").unwrap();
        drop(f);

        let matrix = load_embedding_matrix(&path, &vocab_of(50), 3).unwrap();

        assert_eq!(matrix.rows, 50);
        assert_eq!(matrix.dim, 3);
        assert_eq!(matrix.values.len(), 150);
        assert_eq!(matrix.zero_rows(), 10);
        assert_eq!(matrix.row(0), &[1.5, -1.0, 0.25]);
        assert!(matrix.row(45).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn tokens_with_inner_spaces_and_bad_lines_are_handled() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.txt");
        std::fs::write(&path, "tok0 1.0 2.0\ntok1 x 2.0\ntok2\n. . 3.0 4.0\n").unwrap();

        let vocab: Vocabulary = [("tok0", 0), ("tok1", 1), ("tok2", 2), (". .", 3)]
            .into_iter()
            .map(|(t, id)| (t.to_string(), id))
            .collect();

        let matrix = load_embedding_matrix(&path, &vocab, 2).unwrap();
        assert_eq!(matrix.row(0), &[1.0, 2.0]);
        assert_eq!(matrix.row(1), &[0.0, 0.0]);
        assert_eq!(matrix.row(2), &[0.0, 0.0]);
        assert_eq!(matrix.row(3), &[3.0, 4.0]);
    }

    #[test]
    fn vector_width_other_than_dim_is_a_data_error() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.txt");
        std::fs::write(&path, "tok0 1.0 2.0 3.0\ntok1 4.0 5.0 6.0\n").unwrap();

        for dim in [2, 5] {
            let err = load_embedding_matrix(&path, &vocab_of(2), dim).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<DataError>(),
                Some(DataError::EmbeddingWidth { line: 1, found: 3, expected, .. }) if *expected == dim
            ));
        }
        assert!(load_embedding_matrix(&path, &vocab_of(2), 3).is_ok());
    }

    #[test]
    fn file_without_any_vocabulary_token_is_a_data_error() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("vectors.txt");
        std::fs::write(&path, "alpha 1.0 2.0\nbeta 3.0 4.0\n").unwrap();

        let err = load_embedding_matrix(&path, &vocab_of(3), 2).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataError>(),
            Some(DataError::NoEmbeddingsFound { .. })
        ));
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let result = load_embedding_matrix(Path::new("/nonexistent/glove.txt"), &vocab_of(3), 4);
        assert!(result.is_err());
    }
}
