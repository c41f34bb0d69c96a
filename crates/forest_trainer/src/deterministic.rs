//! Deterministic utilities for reproducible fold assignment
//!
//! A small LCG drives the book shuffle so that the same seed yields the
//! same folds on every platform and with any `rand` release. Tree fitting
//! uses `rand`'s `StdRng` instead.

use std::num::Wrapping;

/// 64-bit Linear Congruential Generator (Knuth MMIX constants)
#[derive(Clone, Debug)]
pub struct LcgRng {
    state: Wrapping<u64>,
}

impl LcgRng {
    const MULTIPLIER: u64 = 6364136223846793005;
    const INCREMENT: u64 = 1442695040888963407;

    pub fn new(seed: u64) -> Self {
        let mut rng = Self {
            state: Wrapping(seed),
        };
        // Decorrelate small neighbouring seeds.
        rng.next_u64();
        rng
    }

    /// Next raw value; the high bits are the best mixed.
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state * Wrapping(Self::MULTIPLIER) + Wrapping(Self::INCREMENT);
        self.state.0
    }

    /// Uniform value in `[0, max)`, or 0 when `max` is 0.
    ///
    /// Widening multiply with rejection, so the result is unbiased and
    /// taken from the high bits.
    pub fn next_range(&mut self, max: usize) -> usize {
        if max == 0 {
            return 0;
        }
        let range = max as u64;
        let zone = range.wrapping_neg() % range;
        loop {
            let wide = u128::from(self.next_u64()) * u128::from(range);
            if (wide as u64) >= zone {
                return (wide >> 64) as usize;
            }
        }
    }

    /// Fisher-Yates shuffle in place
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.next_range(i + 1);
            items.swap(i, j);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lcg_determinism() {
        let mut rng1 = LcgRng::new(42);
        let mut rng2 = LcgRng::new(42);

        for _ in 0..100 {
            assert_eq!(rng1.next_u64(), rng2.next_u64());
        }
    }

    #[test]
    fn test_lcg_different_seeds() {
        let mut rng1 = LcgRng::new(42);
        let mut rng2 = LcgRng::new(43);
        assert_ne!(rng1.next_u64(), rng2.next_u64());
    }

    #[test]
    fn test_lcg_range() {
        let mut rng = LcgRng::new(42);
        for _ in 0..100 {
            assert!(rng.next_range(10) < 10);
        }
        assert_eq!(rng.next_range(0), 0);
    }

    #[test]
    fn test_range_is_roughly_uniform() {
        let mut rng = LcgRng::new(42);
        let mut counts = [0usize; 3];
        for _ in 0..3000 {
            counts[rng.next_range(3)] += 1;
        }
        assert!(counts.iter().all(|&c| (900..1100).contains(&c)), "{:?}", counts);
        assert!((0..10).all(|_| rng.next_range(1) == 0));
    }

    #[test]
    fn test_shuffle_is_permutation() {
        let mut items: Vec<usize> = (0..50).collect();
        LcgRng::new(7).shuffle(&mut items);

        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..50).collect::<Vec<_>>());
        assert_ne!(items, sorted);
    }
}
