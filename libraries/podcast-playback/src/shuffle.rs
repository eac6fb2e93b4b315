//! Random episode selection for shuffle mode
//!
//! Shuffle does not reorder the playlist. Each next/previous request draws a
//! fresh uniform index, so the current episode can be drawn again.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;

/// Uniform index picker with an optionally fixed seed
pub struct ShufflePicker {
    rng: StdRng,
    seeded: bool,
}

impl ShufflePicker {
    /// Create a picker; `None` seeds from OS entropy
    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self {
                rng: StdRng::seed_from_u64(seed),
                seeded: true,
            },
            None => Self {
                rng: StdRng::from_entropy(),
                seeded: false,
            },
        }
    }

    /// Pick an index in `[0, len)`, or `None` for an empty playlist
    pub fn pick(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        Some(self.rng.gen_range(0..len))
    }
}

impl Default for ShufflePicker {
    fn default() -> Self {
        Self::new(None)
    }
}

impl fmt::Debug for ShufflePicker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShufflePicker")
            .field("seeded", &self.seeded)
            .finish_non_exhaustive()
    }
}
