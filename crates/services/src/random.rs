use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use rand::rand_core::impls;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};

/// Shared handle to a random generator used for sampling and shuffling.
///
/// Selection never reaches for a global RNG directly so tests can pin the
/// exact words a session or distractor set contains.
pub trait RandomSource: Send + Sync {
    /// Runs `f` with exclusive access to the underlying generator.
    fn with_rng(&self, f: &mut dyn FnMut(&mut dyn RngCore));
}

/// Thread-local OS-seeded randomness; fresh on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRandom;

impl RandomSource for SystemRandom {
    fn with_rng(&self, f: &mut dyn FnMut(&mut dyn RngCore)) {
        f(&mut rand::rng());
    }
}

/// Reproducible randomness from a fixed seed.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn with_rng(&self, f: &mut dyn FnMut(&mut dyn RngCore)) {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *rng);
    }
}

/// Generator that replays a fixed list of raw words and then yields zeros.
///
/// An all-zero stream makes every index draw return `0`, which turns a
/// shuffle into a fixed permutation tests can predict.
#[derive(Debug, Default)]
pub struct ScriptedRng {
    words: VecDeque<u32>,
}

impl RngCore for ScriptedRng {
    fn next_u32(&mut self) -> u32 {
        self.words.pop_front().unwrap_or(0)
    }

    fn next_u64(&mut self) -> u64 {
        impls::next_u64_via_u32(self)
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        impls::fill_bytes_via_next(self, dst);
    }
}

/// [`RandomSource`] over a [`ScriptedRng`].
#[derive(Debug, Default)]
pub struct ScriptedRandom {
    rng: Mutex<ScriptedRng>,
}

impl ScriptedRandom {
    #[must_use]
    pub fn new(words: impl IntoIterator<Item = u32>) -> Self {
        Self {
            rng: Mutex::new(ScriptedRng {
                words: words.into_iter().collect(),
            }),
        }
    }
}

impl RandomSource for ScriptedRandom {
    fn with_rng(&self, f: &mut dyn FnMut(&mut dyn RngCore)) {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *rng);
    }
}

/// Picks up to `count` items uniformly at random without replacement.
/// Returns everything, shuffled, when `count` exceeds the number of items.
pub fn sample<T>(random: &dyn RandomSource, mut items: Vec<T>, count: usize) -> Vec<T> {
    let take = count.min(items.len());
    if take == 0 {
        return Vec::new();
    }
    random.with_rng(&mut |rng| {
        items.partial_shuffle(rng, take);
    });
    // partial_shuffle leaves the chosen items at the tail
    items.split_off(items.len() - take)
}

/// In-place uniform shuffle.
pub fn shuffle<T>(random: &dyn RandomSource, items: &mut [T]) {
    random.with_rng(&mut |rng| items.shuffle(rng));
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn sample_never_repeats_and_caps_at_len() {
        let random = SeededRandom::new(7);
        for count in 0..8 {
            let picked = sample(&random, (0..5).collect::<Vec<_>>(), count);
            assert_eq!(picked.len(), count.min(5));
            let unique: HashSet<_> = picked.iter().collect();
            assert_eq!(unique.len(), picked.len());
        }
    }

    #[test]
    fn zero_stream_pins_the_sample() {
        // every draw is 0: positions 2 and 3 swap with the front in turn
        let random = ScriptedRandom::default();
        assert_eq!(sample(&random, vec!['a', 'b', 'c', 'd'], 2), vec!['a', 'c']);
    }

    #[test]
    fn zero_stream_pins_the_shuffle() {
        let random = ScriptedRandom::default();
        let mut items = vec![1, 2, 3];
        shuffle(&random, &mut items);
        assert_eq!(items, vec![3, 1, 2]);
    }

    #[test]
    fn identical_scripts_agree() {
        let script = [0xdead_beef, 7, 0x1234_5678, 99, 3];
        let a = sample(&ScriptedRandom::new(script), (0..10).collect::<Vec<u32>>(), 4);
        let b = sample(&ScriptedRandom::new(script), (0..10).collect::<Vec<u32>>(), 4);
        assert_eq!(a, b);
    }

    #[test]
    fn shuffle_keeps_elements() {
        let random = SeededRandom::new(42);
        let mut items: Vec<u32> = (0..20).collect();
        shuffle(&random, &mut items);
        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn seeded_sources_agree() {
        let a = SeededRandom::new(99);
        let b = SeededRandom::new(99);
        let left = sample(&a, (0..100).collect::<Vec<u32>>(), 10);
        let right = sample(&b, (0..100).collect::<Vec<u32>>(), 10);
        assert_eq!(left, right);
    }

    #[test]
    fn system_random_samples_within_bounds() {
        for _ in 0..20 {
            let picked = sample(&SystemRandom, vec![1, 2, 3], 2);
            assert_eq!(picked.len(), 2);
            assert!(picked.iter().all(|x| (1..=3).contains(x)));
        }
    }
}
