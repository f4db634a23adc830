// ============================================================
// Layer 4 — K-Fold Splitter
// ============================================================
// Shuffles the row indices 0..n and cuts them into k contiguous
// validation blocks. Fold i trains on every row outside block i.
//
// Block sizes follow the usual k-fold rule: the first n % k folds
// get one extra row, so sizes differ by at most one.
//
// The shuffle is seeded (StdRng) so a results-only run sees the
// same folds as the training run that produced the checkpoints.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::domain::{error::DataError, fold::Fold};

/// Split `num_samples` rows into `folds` train/validation folds.
pub fn k_fold(num_samples: usize, folds: usize, seed: u64) -> Result<Vec<Fold>, DataError> {
    if folds < 2 || folds > num_samples {
        return Err(DataError::InvalidFoldCount {
            samples: num_samples,
            folds,
        });
    }

    let mut indices: Vec<usize> = (0..num_samples).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let base  = num_samples / folds;
    let extra = num_samples % folds;

    let mut result = Vec::with_capacity(folds);
    let mut start  = 0usize;

    for fold in 0..folds {
        let size = base + usize::from(fold < extra);
        let end  = start + size;

        let validation = indices[start..end].to_vec();
        let train = indices[..start]
            .iter()
            .chain(&indices[end..])
            .copied()
            .collect();

        result.push(Fold::new(train, validation));
        start = end;
    }

    tracing::debug!(
        "Built {} folds over {} samples ({}..={} validation rows each)",
        folds,
        num_samples,
        base,
        base + usize::from(extra > 0),
    );

    Ok(result)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_validation_sets_partition_all_rows() {
        for k in 2..=10 {
            let folds = k_fold(97, k, 7).unwrap();
            assert_eq!(folds.len(), k);

            let mut seen = HashSet::new();
            for fold in &folds {
                for &i in &fold.validation {
                    // every row is validated exactly once
                    assert!(seen.insert(i), "row {i} validated twice (k={k})");
                }
            }
            assert_eq!(seen, (0..97).collect::<HashSet<_>>());
        }
    }

    #[test]
    fn test_train_and_validation_are_disjoint() {
        for fold in k_fold(40, 4, 1).unwrap() {
            let train: HashSet<_> = fold.train.iter().collect();
            assert!(fold.validation.iter().all(|i| !train.contains(i)));
            assert_eq!(fold.train.len() + fold.validation.len(), 40);
        }
    }

    #[test]
    fn test_hundred_rows_five_folds() {
        let folds = k_fold(100, 5, 42).unwrap();
        let total: usize = folds.iter().map(|f| f.validation.len()).sum();
        assert_eq!(total, 100);
        assert!(folds.iter().all(|f| f.validation.len() == 20));
    }

    #[test]
    fn test_uneven_sizes_differ_by_at_most_one() {
        let sizes: Vec<usize> = k_fold(11, 3, 0)
            .unwrap()
            .iter()
            .map(|f| f.validation.len())
            .collect();
        assert_eq!(sizes, vec![4, 4, 3]);
    }

    #[test]
    fn test_same_seed_gives_same_folds() {
        assert_eq!(k_fold(30, 3, 9).unwrap(), k_fold(30, 3, 9).unwrap());
    }

    #[test]
    fn test_rejects_bad_fold_counts() {
        assert!(k_fold(10, 1, 0).is_err());
        assert!(k_fold(3, 4, 0).is_err());
    }
}
