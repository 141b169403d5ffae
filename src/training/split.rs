//! Train/test and k-fold partitioning

use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::{NbaError, Result};

/// One train/test partition of row indices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffled train/test split with a fixed seed
///
/// The test side gets `ceil(n * test_size)` rows, at least one, and the
/// train side always keeps at least one.
pub fn train_test_split(n: usize, test_size: f64, seed: u64) -> Result<Fold> {
    if !(0.0..1.0).contains(&test_size) || test_size == 0.0 {
        return Err(NbaError::InvalidArgument(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }
    if n < 2 {
        return Err(NbaError::InsufficientData {
            what: "rows to split".to_string(),
            have: n,
            need: 2,
        });
    }

    let n_test = ((n as f64 * test_size).ceil() as usize).clamp(1, n - 1);

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let test = indices[..n_test].to_vec();
    let train = indices[n_test..].to_vec();

    log::debug!("Split {} rows: train={}, test={}", n, train.len(), test.len());
    Ok(Fold { train, test })
}

/// Number of folds usable for `n` rows: `min(max_folds, n - 1)`
pub fn fold_count(n: usize, max_folds: usize) -> usize {
    max_folds.min(n.saturating_sub(1))
}

/// Contiguous k-fold partitions (no shuffling); earlier folds take the remainder
pub fn k_fold(n: usize, k: usize) -> Result<Vec<Fold>> {
    if k < 2 || k > n {
        return Err(NbaError::InsufficientData {
            what: format!("rows for {}-fold cross-validation", k),
            have: n,
            need: k.max(2),
        });
    }

    let base = n / k;
    let remainder = n % k;
    let mut folds = Vec::with_capacity(k);
    let mut start = 0;

    for i in 0..k {
        let size = base + usize::from(i < remainder);
        let test: Vec<usize> = (start..start + size).collect();
        let train: Vec<usize> = (0..start).chain(start + size..n).collect();
        folds.push(Fold { train, test });
        start += size;
    }

    Ok(folds)
}

/// Gather rows by index
pub fn select<T: Clone>(items: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| items[i].clone()).collect()
}
