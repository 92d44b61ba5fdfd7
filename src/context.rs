//! Per-session RNG state for reproducible sampling.

/// RNG state for a single decoding session.
///
/// Every sampling call that draws randomness takes `&mut SamplingContext`,
/// so concurrent sessions never share mutable state: give each session (or
/// thread) its own context, or serialize access to a shared one.
///
/// # Determinism
///
/// Created with a seed, the same seed produces the identical token stream
/// across runs and threads. Without a seed, draws mix system time with a
/// call counter.
pub struct SamplingContext {
    mode: RngMode,
}

enum RngMode {
    /// PCG XSH RR 64/32 stream.
    Seeded { state: u64 },
    /// System-entropy fallback: nanosecond clock mixed with a call counter.
    Entropy { counter: u64 },
}

/// Mix a user seed into a PCG state that avoids degenerate streams.
fn mix_seed(seed: u64) -> u64 {
    seed.wrapping_mul(2685821657736338717)
        .wrapping_add(1442695040888963407)
}

impl SamplingContext {
    /// Create a new context with an optional seed.
    ///
    /// `Some(seed)` makes every draw deterministic and reproducible;
    /// `None` uses system entropy.
    pub fn new(seed: Option<u64>) -> Self {
        let mode = match seed {
            Some(s) => RngMode::Seeded { state: mix_seed(s) },
            None => RngMode::Entropy { counter: 0 },
        };
        Self { mode }
    }

    /// Rewind the context to the initial state for `seed`.
    ///
    /// Also switches an entropy-mode context into seeded mode.
    pub fn reset(&mut self, seed: u64) {
        self.mode = RngMode::Seeded { state: mix_seed(seed) };
    }

    /// Whether this context was created (or reset) with a seed.
    pub fn is_seeded(&self) -> bool {
        matches!(self.mode, RngMode::Seeded { .. })
    }

    /// Next random f32 in [0, 1].
    pub(crate) fn next_f32(&mut self) -> f32 {
        match &mut self.mode {
            RngMode::Seeded { state } => {
                // PCG XSH RR 64/32
                let old_state = *state;
                *state = old_state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);

                let xorshifted = (((old_state >> 18) ^ old_state) >> 27) as u32;
                let rot = (old_state >> 59) as u32;
                let output = xorshifted.rotate_right(rot);

                (output as f32) / (u32::MAX as f32)
            }
            RngMode::Entropy { counter } => {
                use std::time::{SystemTime, UNIX_EPOCH};

                let nanos = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or_default()
                    .subsec_nanos() as u64;
                let count = *counter;
                *counter += 1;

                // LCG over clock + counter
                let state = nanos
                    .wrapping_add(count)
                    .wrapping_mul(1103515245)
                    .wrapping_add(12345);
                (state as f32) / (u64::MAX as f32)
            }
        }
    }
}
