//! Error types for the sampling pipeline.

use thiserror::Error;

/// Errors surfaced by the sampling entry points.
///
/// `InvalidInput` and `ExhaustedRetries` are terminal for the call that
/// produced them; neither is retried internally.
#[derive(Error, Debug)]
pub enum SamplingError {
    /// An empty score vector or an empty/degenerate weight set reached a
    /// sampler.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The end-of-sequence retry budget ran out: every draw kept landing on
    /// the suppressed eos id. The distribution is concentrated on the
    /// terminal token for the current configuration.
    #[error(
        "sampling reached max_trials {max_trials} and still drew the end-of-sequence \
         token while ignore_eos is set; check your input distribution"
    )]
    ExhaustedRetries {
        /// The configured retry budget that was exceeded.
        max_trials: usize,
    },

    /// Tensor conversion failed at the API boundary.
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),
}

pub type Result<T> = std::result::Result<T, SamplingError>;
