//! Thread-local random state shared by every random transform.
//!
//! Each data-loading worker owns its own generator. Seed it once per worker
//! and epoch to make augmentation reproducible; threads that never seed
//! draw from an OS-seeded generator.

use rand::rngs::StdRng;
use rand::Rng as _;
use rand::SeedableRng;
use std::cell::RefCell;

thread_local! {
    /// Thread-local RNG for deterministic randomness in workers
    pub static WORKER_RNG: RefCell<Option<StdRng>> = const { RefCell::new(None) };
}

/// Initialize worker's RNG based on worker_id, epoch, and base seed.
/// Seed formula: base_seed + (epoch << 32) + worker_id
pub fn init_worker_rng(worker_id: usize, epoch: usize, base_seed: u64) {
    let seed = base_seed
        .wrapping_add((epoch as u64) << 32)
        .wrapping_add(worker_id as u64);
    seed_rng(seed);
}

/// Reseeds the current thread's RNG.
pub fn seed_rng(seed: u64) {
    WORKER_RNG.with(|rng| {
        *rng.borrow_mut() = Some(StdRng::seed_from_u64(seed));
    })
}

/// Runs `f` with the current thread's RNG, seeding it from the OS on first use.
pub fn with_rng<R>(f: impl FnOnce(&mut StdRng) -> R) -> R {
    WORKER_RNG.with(|rng| {
        let mut rng_ref = rng.borrow_mut();
        let rng = rng_ref.get_or_insert_with(StdRng::from_os_rng);
        f(rng)
    })
}

/// Bernoulli draw. `p` must already be validated to lie in [0, 1].
pub fn worker_gen_bool(p: f64) -> bool {
    match p {
        p if p <= 0.0 => false,
        p if p >= 1.0 => true,
        p => with_rng(|rng| rng.random_bool(p)),
    }
}

/// Uniform float in `[low, high]`; returns `low` for a degenerate range.
pub fn worker_gen_uniform(low: f32, high: f32) -> f32 {
    if high <= low {
        return low;
    }
    with_rng(|rng| rng.random_range(low..=high))
}

/// Uniform integer in `[low, high)`; returns `low` for an empty range.
pub fn worker_gen_range(low: u32, high: u32) -> u32 {
    if high <= low {
        return low;
    }
    with_rng(|rng| rng.random_range(low..high))
}

/// Uniform index in `0..len`. `len` must be non-zero.
pub fn worker_gen_index(len: usize) -> usize {
    with_rng(|rng| rng.random_range(0..len))
}
