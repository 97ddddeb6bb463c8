//! Round candidates: shuffle, then cut into contiguous thread-capped batches.

use rand::seq::SliceRandom;
use rand::Rng;

/// Randomize candidate order for a round.
pub fn shuffle_candidates<R: Rng + ?Sized>(candidates: &mut [String], rng: &mut R) {
    candidates.shuffle(rng);
}

/// Consecutive slices of at most `batch_size` links; only the last may be shorter.
pub fn partition(candidates: &[String], batch_size: usize) -> Vec<&[String]> {
    candidates.chunks(batch_size.max(1)).collect()
}
