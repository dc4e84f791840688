// ============================================================
// Layer 4 — Train/Test Splitter
// ============================================================
// Randomly shuffles manifest rows and splits them into two
// disjoint partitions:
//   - Training set: used to update model weights
//   - Test set:     used as the validation phase of every epoch
//
// Split sizes: test gets ceil(n * test_fraction) rows, train
// gets the rest, so the two always sum to n.
//
// There is no stratification: a rare class may end up entirely
// on one side of the split.
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom.
//
// Reference: Rust Book §8 (Vectors)
//            rand crate documentation

use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

/// Number of rows that go to the test partition.
pub fn test_len(total: usize, test_fraction: f64) -> usize {
    let fraction = test_fraction.clamp(0.0, 1.0);
    (((total as f64) * fraction).ceil() as usize).min(total)
}

/// Shuffle `rows` with `rng` and split into (train, test).
pub fn split_train_test_with<T, R: Rng + ?Sized>(
    mut rows:      Vec<T>,
    test_fraction: f64,
    rng:           &mut R,
) -> (Vec<T>, Vec<T>) {
    rows.shuffle(rng);

    let total    = rows.len();
    let split_at = total - test_len(total, test_fraction);

    // split_off(n) removes elements [n..] from the Vec and returns them
    let test = rows.split_off(split_at);

    tracing::debug!(
        "Dataset split: {} train, {} test ({}% / {}%)",
        rows.len(),
        test.len(),
        (rows.len() * 100) / total.max(1),
        (test.len() * 100) / total.max(1),
    );

    (rows, test)
}

/// Split with a fixed seed when given, otherwise with fresh entropy.
pub fn split_train_test<T>(rows: Vec<T>, test_fraction: f64, seed: Option<u64>) -> (Vec<T>, Vec<T>) {
    match seed {
        Some(seed) => split_train_test_with(rows, test_fraction, &mut StdRng::seed_from_u64(seed)),
        None       => split_train_test_with(rows, test_fraction, &mut rand::thread_rng()),
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_correct_split_sizes() {
        let items: Vec<usize> = (0..100).collect();
        let (train, test)     = split_train_test(items, 0.2, None);
        assert_eq!(train.len(), 80);
        assert_eq!(test.len(),  20);
    }

    #[test]
    fn test_test_side_rounds_up() {
        // 0.25 * 10 = 2.5 → 3 test rows
        let items: Vec<usize> = (0..10).collect();
        let (train, test)     = split_train_test(items, 0.25, Some(1));
        assert_eq!(test.len(), 3);
        assert_eq!(train.len(), 7);
    }

    #[test]
    fn test_partitions_are_disjoint_and_complete() {
        let items: Vec<usize> = (0..57).collect();
        let (train, test)     = split_train_test(items, 0.3, Some(7));
        assert_eq!(train.len() + test.len(), 57);

        let a: HashSet<usize> = train.into_iter().collect();
        let b: HashSet<usize> = test.into_iter().collect();
        assert!(a.is_disjoint(&b));
        assert_eq!(a.union(&b).count(), 57);
    }

    #[test]
    fn test_same_seed_same_split() {
        let (a, _) = split_train_test((0..40).collect::<Vec<usize>>(), 0.2, Some(42));
        let (b, _) = split_train_test((0..40).collect::<Vec<usize>>(), 0.2, Some(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_dataset() {
        let (train, test) = split_train_test(Vec::<usize>::new(), 0.2, None);
        assert!(train.is_empty());
        assert!(test.is_empty());
    }

    #[test]
    fn test_zero_fraction_keeps_everything_in_train() {
        let (train, test) = split_train_test((0..10).collect::<Vec<usize>>(), 0.0, None);
        assert_eq!(train.len(), 10);
        assert!(test.is_empty());
    }
}
