//! The masking-key source (spec §5's "sole module-global mutable
//! state permitted... should expose a seedable or injectable RNG").

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Produces a fresh masking key for each outgoing frame (spec
/// invariant I4). Deliberately not required to be cryptographically
/// strong (spec §1's explicit non-goal) — only unpredictable enough
/// that payload bytes aren't trivially recoverable on the wire.
pub trait MaskKeySource: Send {
    fn next_key(&mut self) -> u32;
}

/// The default source, backed by `rand`'s non-deterministic `StdRng`,
/// matching the teacher crate's `StdRng::from_rng(rand::thread_rng())`
/// call in its write path.
pub struct DefaultMaskKeySource {
    rng: StdRng,
}

impl DefaultMaskKeySource {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_rng(rand::thread_rng()),
        }
    }
}

impl Default for DefaultMaskKeySource {
    fn default() -> Self {
        Self::new()
    }
}

impl MaskKeySource for DefaultMaskKeySource {
    fn next_key(&mut self) -> u32 {
        self.rng.random()
    }
}
