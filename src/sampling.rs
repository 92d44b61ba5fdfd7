//! Token selection for autoregressive decoding.
//!
//! The pipeline: nucleus (top-p/top-k) sampling picks a candidate, the
//! repetition check swaps it for an unrestricted draw when the candidate
//! has saturated the recent history window, and [`next_token`] wraps the
//! whole thing in the end-of-sequence retry policy.

use candle_core::Tensor;

use crate::config::SamplingConfig;
use crate::context::SamplingContext;
use crate::distribution::{rank_descending, scores_to_vec, stable_softmax, weighted_draw};
use crate::error::{Result, SamplingError};

/// Scale scores by the configured temperature before softmax.
///
/// 1.0 and non-positive values leave the scores untouched.
fn apply_temperature(scores: &[f32], temperature: f64) -> Vec<f32> {
    if temperature == 1.0 || temperature <= 0.0 {
        return scores.to_vec();
    }
    let t = temperature as f32;
    scores.iter().map(|&s| s / t).collect()
}

fn nucleus_from_scores(
    scores: &[f32],
    config: &SamplingConfig,
    ctx: &mut SamplingContext,
) -> Result<u32> {
    let scaled = apply_temperature(scores, config.temperature);
    let probs = stable_softmax(&scaled);
    let ranked = rank_descending(&probs);

    let top_p = config.top_p as f32;
    let limit = config.top_k.min(ranked.len());

    let mut kept_probs = Vec::with_capacity(limit);
    let mut kept_indices = Vec::with_capacity(limit);
    let mut cumulative = 0.0f32;
    for &idx in &ranked[..limit] {
        // Include a candidate while the mass accumulated *before* it is
        // still below top_p: the top-ranked token always gets in, and the
        // scan keeps exactly the token that first reaches the cutoff.
        if cumulative >= top_p {
            break;
        }
        cumulative += probs[idx];
        kept_probs.push(probs[idx]);
        kept_indices.push(idx);
    }

    if kept_indices.is_empty() {
        // top_k == 0 leaves nothing to scan; keep the single best-ranked
        // token with full weight.
        kept_probs.push(1.0);
        kept_indices.push(ranked[0]);
    }

    let choice = weighted_draw(&kept_probs, ctx)?;
    Ok(kept_indices[choice] as u32)
}

fn unrestricted_from_scores(
    scores: &[f32],
    config: &SamplingConfig,
    ctx: &mut SamplingContext,
) -> Result<u32> {
    let scaled = apply_temperature(scores, config.temperature);
    let probs = stable_softmax(&scaled);
    Ok(weighted_draw(&probs, ctx)? as u32)
}

fn ras_from_scores(
    scores: &[f32],
    history: &[u32],
    config: &SamplingConfig,
    ctx: &mut SamplingContext,
) -> Result<u32> {
    let candidate = nucleus_from_scores(scores, config, ctx)?;

    let window_start = history.len().saturating_sub(config.win_size);
    let rep_count = history[window_start..]
        .iter()
        .filter(|&&id| id == candidate)
        .count();

    if rep_count >= config.repetition_threshold() {
        tracing::trace!(
            candidate,
            rep_count,
            "repetition fallback: redrawing from the full distribution"
        );
        return unrestricted_from_scores(scores, config, ctx);
    }
    Ok(candidate)
}

/// Sample one token under top-p/top-k constraints.
///
/// Softmax the scores, rank descending, truncate to `top_k`, scan the
/// ranked prefix until the cumulative probability reaches `top_p`, then
/// draw from the kept candidates in proportion to their probabilities.
/// Returns the original vocabulary index.
pub fn nucleus_sample(
    scores: &Tensor,
    config: &SamplingConfig,
    ctx: &mut SamplingContext,
) -> Result<u32> {
    let scores = scores_to_vec(scores)?;
    nucleus_from_scores(&scores, config, ctx)
}

/// Sample one token from the full softmax distribution, no filtering.
///
/// This is the repetition-avoidance fallback: when nucleus sampling keeps
/// landing on a looping token, drawing from the whole distribution
/// maximizes the chance of breaking out.
pub fn unrestricted_sample(
    scores: &Tensor,
    config: &SamplingConfig,
    ctx: &mut SamplingContext,
) -> Result<u32> {
    let scores = scores_to_vec(scores)?;
    unrestricted_from_scores(&scores, config, ctx)
}

/// Nucleus sampling with a repetition check against recent history.
///
/// Counts the nucleus candidate in the last `win_size` entries of
/// `history`; once the count reaches `trunc(win_size * tau_r)`, the
/// candidate is discarded in favor of an [`unrestricted_sample`] draw.
pub fn ras_sample(
    scores: &Tensor,
    history: &[u32],
    config: &SamplingConfig,
    ctx: &mut SamplingContext,
) -> Result<u32> {
    let scores = scores_to_vec(scores)?;
    ras_from_scores(&scores, history, config, ctx)
}

/// Sample the next token, retrying while the draw lands on a suppressed
/// end-of-sequence id.
///
/// When `ignore_eos` is false, or no `eos_token_id` is configured, the
/// first draw is returned as-is. Otherwise draws equal to the eos id are
/// rejected and resampled; after `max_trials` rejections the call fails
/// with [`SamplingError::ExhaustedRetries`].
pub fn next_token(
    scores: &Tensor,
    history: &[u32],
    config: &SamplingConfig,
    ctx: &mut SamplingContext,
) -> Result<u32> {
    let scores = scores_to_vec(scores)?;

    let mut num_trials = 0usize;
    loop {
        let candidate = ras_from_scores(&scores, history, config, ctx)?;
        let suppressed = config.ignore_eos && config.eos_token_id == Some(candidate);
        if !suppressed {
            return Ok(candidate);
        }

        num_trials += 1;
        if num_trials > config.max_trials {
            return Err(SamplingError::ExhaustedRetries {
                max_trials: config.max_trials,
            });
        }
        tracing::trace!(num_trials, "drew a suppressed eos token, retrying");
    }
}

/// Deterministic argmax over the scores. Ties go to the lowest index.
///
/// Not part of the repetition-aware pipeline; a utility for hosts that
/// want greedy decoding.
pub fn greedy_sample(scores: &Tensor) -> Result<u32> {
    let scores = scores_to_vec(scores)?;
    let mut best = 0usize;
    for (i, &s) in scores.iter().enumerate() {
        if s > scores[best] {
            best = i;
        }
    }
    Ok(best as u32)
}
