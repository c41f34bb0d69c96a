//! K-Fold splitting at book granularity
//!
//! Books, not pages, are shuffled and partitioned; page rows follow their
//! book so no book ever straddles train and test.

use crate::dataset::{BookIndex, RecordId};
use crate::deterministic::LcgRng;
use crate::errors::{Result, TrainerError};

/// K-Fold cross-validation splitter
#[derive(Clone, Debug)]
pub struct KFold {
    n_splits: usize,
    shuffle: bool,
    seed: u64,
}

impl Default for KFold {
    fn default() -> Self {
        Self::new(10)
    }
}

impl KFold {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: true,
            seed: 42,
        }
    }

    /// Set random seed for shuffling
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Disable shuffling
    pub fn without_shuffle(mut self) -> Self {
        self.shuffle = false;
        self
    }

    /// Generate `(train, test)` positions for each fold.
    ///
    /// Always yields `n_splits` folds. The first `n % k` folds take one
    /// extra sample; when `n < k` the trailing folds have empty test sets.
    pub fn split(&self, n_samples: usize) -> Result<Vec<(Vec<usize>, Vec<usize>)>> {
        if self.n_splits == 0 {
            return Err(TrainerError::Config("n_splits must be at least 1".to_string()));
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();
        if self.shuffle {
            LcgRng::new(self.seed).shuffle(&mut indices);
        }

        let fold_size = n_samples / self.n_splits;
        let remainder = n_samples % self.n_splits;

        let mut folds = Vec::with_capacity(self.n_splits);
        let mut start = 0;

        for i in 0..self.n_splits {
            let extra = usize::from(i < remainder);
            let end = start + fold_size + extra;

            let test_indices: Vec<usize> = indices[start..end].to_vec();
            let train_indices: Vec<usize> = indices[..start]
                .iter()
                .chain(indices[end..].iter())
                .copied()
                .collect();

            folds.push((train_indices, test_indices));
            start = end;
        }

        Ok(folds)
    }
}

/// Flatten nested row lists
pub fn flatten(groups: &[Vec<usize>]) -> impl Iterator<Item = usize> + '_ {
    groups.iter().flat_map(|rows| rows.iter().copied())
}

/// Flatten nested row lists and sort, e.g. `[[3, 1], [2]]` becomes `[1, 2, 3]`
pub fn flat_arr(groups: &[Vec<usize>]) -> Vec<usize> {
    let mut flat: Vec<usize> = flatten(groups).collect();
    flat.sort_unstable();
    flat
}

/// One book-level fold resolved to page rows
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookFold {
    pub train_books: Vec<RecordId>,
    pub test_books: Vec<RecordId>,
    /// Sorted row indices of every training page
    pub train_rows: Vec<usize>,
    /// Sorted row indices of every test page
    pub test_rows: Vec<usize>,
}

/// Split the sorted book set with `kfold` and resolve each side to rows.
pub fn book_folds(index: &BookIndex, kfold: &KFold) -> Result<Vec<BookFold>> {
    let books = index.books();
    let resolve = |positions: &[usize]| -> (Vec<RecordId>, Vec<usize>) {
        let picked: Vec<RecordId> = positions.iter().map(|&p| books[p].clone()).collect();
        let rows: Vec<Vec<usize>> = picked.iter().map(|b| index.rows_for(b).to_vec()).collect();
        (picked, flat_arr(&rows))
    };

    kfold
        .split(books.len())?
        .into_iter()
        .map(|(train, test)| {
            let (train_books, train_rows) = resolve(&train);
            let (test_books, test_rows) = resolve(&test);
            Ok(BookFold {
                train_books,
                test_books,
                train_rows,
                test_rows,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_flat_arr() {
        assert_eq!(flat_arr(&[vec![3, 1], vec![2]]), vec![1, 2, 3]);
        assert!(flat_arr(&[]).is_empty());
    }

    #[test]
    fn test_split_sizes() {
        let folds = KFold::new(3).split(10).unwrap();
        let sizes: Vec<usize> = folds.iter().map(|(_, test)| test.len()).collect();
        assert_eq!(sizes, vec![4, 3, 3]);
    }

    #[test]
    fn test_more_folds_than_samples() {
        let folds = KFold::new(10).split(4).unwrap();
        assert_eq!(folds.len(), 10);
        assert!(folds[..4].iter().all(|(_, test)| test.len() == 1));
        assert!(folds[4..].iter().all(|(train, test)| test.is_empty() && train.len() == 4));
    }

    #[test]
    fn test_zero_splits_rejected() {
        assert!(KFold::new(0).split(5).is_err());
    }

    #[test]
    fn test_unshuffled_is_contiguous() {
        let folds = KFold::new(2).without_shuffle().split(4).unwrap();
        assert_eq!(folds[0], (vec![2, 3], vec![0, 1]));
        assert_eq!(folds[1], (vec![0, 1], vec![2, 3]));
    }

    #[test]
    fn test_seed_changes_assignment() {
        let a = KFold::new(5).with_seed(42).split(50).unwrap();
        let b = KFold::new(5).with_seed(42).split(50).unwrap();
        let c = KFold::new(5).with_seed(7).split(50).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_single_page_book_is_never_split() {
        let books: Vec<RecordId> = vec!["a".into(), "a".into(), "solo".into(), "b".into(), "b".into()];
        let index = BookIndex::from_books(&books);

        for fold in book_folds(&index, &KFold::new(3)).unwrap() {
            let in_train = fold.train_rows.contains(&2);
            let in_test = fold.test_rows.contains(&2);
            assert!(in_train ^ in_test);
        }
    }

    proptest! {
        #[test]
        fn fold_rows_partition_every_page(
            book_of_page in prop::collection::vec(0i64..12, 1..80),
            n_splits in 1usize..12,
            seed in any::<u64>(),
        ) {
            let books: Vec<RecordId> = book_of_page.iter().map(|&b| RecordId::Int(b)).collect();
            let index = BookIndex::from_books(&books);
            let folds = book_folds(&index, &KFold::new(n_splits).with_seed(seed)).unwrap();
            prop_assert_eq!(folds.len(), n_splits);

            let mut tested = BTreeSet::new();
            for fold in &folds {
                let train: BTreeSet<usize> = fold.train_rows.iter().copied().collect();
                let test: BTreeSet<usize> = fold.test_rows.iter().copied().collect();
                prop_assert!(train.is_disjoint(&test));
                prop_assert_eq!(train.len() + test.len(), books.len());

                let train_books: BTreeSet<&RecordId> = fold.train_books.iter().collect();
                prop_assert!(fold.test_books.iter().all(|b| !train_books.contains(b)));

                for row in &fold.test_rows {
                    prop_assert!(tested.insert(*row));
                }
            }
            prop_assert_eq!(tested.len(), books.len());
        }

        #[test]
        fn flat_arr_sorts_the_same_multiset(groups in prop::collection::vec(prop::collection::vec(0usize..100, 0..8), 0..8)) {
            let flat = flat_arr(&groups);
            prop_assert!(flat.windows(2).all(|w| w[0] <= w[1]));

            let mut expected: Vec<usize> = groups.concat();
            expected.sort_unstable();
            prop_assert_eq!(flat, expected);
        }
    }
}
