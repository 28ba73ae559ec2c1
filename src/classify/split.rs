//! Seeded train/test partition.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::error::ScoringError;

/// Row indices of each partition, disjoint and together covering `0..n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n` with `seed` and hold out `ceil(n * test_fraction)` rows.
///
/// Both partitions keep at least one row, so `n` must be at least 2.
pub fn train_test_split(
    n: usize,
    test_fraction: f64,
    seed: u64,
) -> Result<TrainTestSplit, ScoringError> {
    if n < 2 {
        return Err(ScoringError::EmptyDataset(format!(
            "need at least 2 labeled rows to split, got {n}"
        )));
    }
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(ScoringError::InvalidConfig(format!(
            "test_fraction must be in (0, 1), got {test_fraction}"
        )));
    }

    let n_test = ((n as f64 * test_fraction).ceil() as usize).clamp(1, n - 1);

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train = indices.split_off(n_test);
    debug!(n, n_train = train.len(), n_test, seed, "train/test split");
    Ok(TrainTestSplit {
        train,
        test: indices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holds_out_ceil_of_fraction() {
        let split = train_test_split(11, 0.2, 42).unwrap();
        assert_eq!(split.test.len(), 3);
        assert_eq!(split.train.len(), 8);

        let mut all: Vec<usize> = split.train.iter().chain(split.test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..11).collect::<Vec<_>>());
    }

    #[test]
    fn deterministic_per_seed() {
        assert_eq!(
            train_test_split(50, 0.2, 42).unwrap(),
            train_test_split(50, 0.2, 42).unwrap()
        );
        assert_ne!(
            train_test_split(50, 0.2, 42).unwrap().test,
            train_test_split(50, 0.2, 7).unwrap().test
        );
    }

    #[test]
    fn tiny_datasets_keep_both_sides() {
        let split = train_test_split(2, 0.9, 1).unwrap();
        assert_eq!((split.train.len(), split.test.len()), (1, 1));
        assert!(matches!(
            train_test_split(1, 0.2, 1),
            Err(ScoringError::EmptyDataset(_))
        ));
    }
}
