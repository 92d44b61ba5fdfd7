//! # ras-sampling
//!
//! Repetition-aware nucleus sampling for autoregressive speech/text token
//! decoding.
//!
//! Given a vector of unnormalized per-step scores from a model, this crate
//! picks the next token id:
//!
//! 1. **Stable softmax** turns scores into a probability distribution
//!    (max-shifted, with a uniform fallback when every weight underflows).
//! 2. **Nucleus sampling** restricts candidates to the top-`top_k` tokens
//!    and the smallest descending-probability prefix reaching `top_p`,
//!    then draws one in proportion to probability.
//! 3. **Repetition check**: when the drawn token already fills
//!    `win_size * tau_r` slots of the recent history window, the draw is
//!    replaced with an unrestricted sample from the full distribution.
//! 4. **End-of-sequence policy**: [`next_token`] rejects draws equal to a
//!    configured eos id (up to `max_trials` retries) so generation keeps
//!    going until the host decides otherwise.
//!
//! The host decoding loop owns the token history and the per-step score
//! tensor; this crate owns nothing across calls except the
//! [`SamplingContext`] RNG the caller passes in.
//!
//! ## Quick start
//!
//! ```
//! use candle_core::{Device, Tensor};
//! use ras_sampling::{next_token, SamplingConfig, SamplingContext};
//!
//! # fn main() -> ras_sampling::Result<()> {
//! let config = SamplingConfig {
//!     eos_token_id: Some(0),
//!     ..Default::default()
//! };
//! let mut ctx = SamplingContext::new(Some(42));
//! let mut history: Vec<u32> = Vec::new();
//!
//! // One step of the host decode loop: model scores in, token id out.
//! let scores = Tensor::new(&[1.2f32, 3.4, 0.5, 5.6, 2.1], &Device::Cpu)?;
//! let id = next_token(&scores, &history, &config, &mut ctx)?;
//! history.push(id);
//! # Ok(())
//! # }
//! ```
//!
//! ## Sessions and threading
//!
//! All sampling is synchronous and CPU-bound. The only mutable state is
//! the [`SamplingContext`]; it is not synchronized, so concurrent decoding
//! sessions must each hold their own context (or serialize access to a
//! shared one). A seeded context reproduces the same token stream across
//! runs and threads.

pub mod config;
pub mod context;
pub mod distribution;
pub mod error;
pub mod sampling;

pub use config::SamplingConfig;
pub use context::SamplingContext;
pub use distribution::softmax;
pub use error::{Result, SamplingError};
pub use sampling::{greedy_sample, next_token, nucleus_sample, ras_sample, unrestricted_sample};
