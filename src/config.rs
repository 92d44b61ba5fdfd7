//! Sampling configuration.

use serde::{Deserialize, Serialize};

/// Configuration for one decoding session (or one call — but keep it
/// consistent across a session).
///
/// Every knob of the pipeline lives here and is threaded through the
/// top-level entry points down to the repetition check, so configuring
/// e.g. `win_size` or `tau_r` changes behavior end to end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Cumulative-probability cutoff for nucleus filtering, in (0, 1].
    #[serde(default = "default_top_p")]
    pub top_p: f64,
    /// Maximum number of candidates considered before the nucleus scan.
    /// 0 degenerates to a single-candidate draw of the top-ranked token.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Recent-history window length for the repetition check.
    #[serde(default = "default_win_size")]
    pub win_size: usize,
    /// Repetition fraction threshold: the fallback triggers once the
    /// candidate fills `win_size * tau_r` (truncated) slots of the window.
    #[serde(default = "default_tau_r")]
    pub tau_r: f64,
    /// Token id treated as terminal, or `None` when the vocabulary has no
    /// end-of-sequence convention.
    #[serde(default)]
    pub eos_token_id: Option<u32>,
    /// When true, draws equal to `eos_token_id` are rejected and retried
    /// (up to `max_trials`).
    #[serde(default = "default_ignore_eos")]
    pub ignore_eos: bool,
    /// Retry budget for the end-of-sequence controller.
    #[serde(default = "default_max_trials")]
    pub max_trials: usize,
    /// Sampling temperature applied to scores before softmax
    /// (1.0 = no change; values <= 0 are treated as 1.0).
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

fn default_top_p() -> f64 {
    0.8
}

fn default_top_k() -> usize {
    25
}

fn default_win_size() -> usize {
    10
}

fn default_tau_r() -> f64 {
    0.1
}

fn default_ignore_eos() -> bool {
    true
}

fn default_max_trials() -> usize {
    100
}

fn default_temperature() -> f64 {
    1.0
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            top_p: default_top_p(),
            top_k: default_top_k(),
            win_size: default_win_size(),
            tau_r: default_tau_r(),
            eos_token_id: None,
            ignore_eos: default_ignore_eos(),
            max_trials: default_max_trials(),
            temperature: default_temperature(),
        }
    }
}

impl SamplingConfig {
    /// Repetition count at which the fallback triggers: the integer
    /// truncation of `win_size * tau_r`.
    ///
    /// A threshold of 0 (from `win_size == 0` or `tau_r == 0.0`) means the
    /// fallback always triggers.
    pub fn repetition_threshold(&self) -> usize {
        (self.win_size as f64 * self.tau_r) as usize
    }
}
