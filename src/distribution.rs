//! Distribution primitives: stable softmax, descending rank, weighted draw.
//!
//! Everything here runs on the CPU over native `f32` vectors; the tensor
//! boundary exists only so hosts can pass logits straight out of a model
//! step.

use candle_core::{DType, Tensor};

use crate::context::SamplingContext;
use crate::error::{Result, SamplingError};

/// Pull a score vector out of a logits tensor.
///
/// Accepts a rank-1 `[vocab]` tensor, or `[1, vocab]` as produced by a
/// single-sequence model step. Rejects empty vectors and any other shape —
/// this crate samples one sequence at a time.
pub(crate) fn scores_to_vec(scores: &Tensor) -> Result<Vec<f32>> {
    let scores = scores.to_dtype(DType::F32)?;
    let scores = match scores.rank() {
        1 => scores,
        2 if scores.dim(0)? == 1 => scores.squeeze(0)?,
        _ => {
            return Err(SamplingError::InvalidInput(format!(
                "expected a [vocab] or [1, vocab] score tensor, got shape {:?}",
                scores.shape()
            )))
        }
    };
    let values: Vec<f32> = scores.to_vec1()?;
    if values.is_empty() {
        return Err(SamplingError::InvalidInput(
            "score vector is empty".to_string(),
        ));
    }
    Ok(values)
}

/// Numerically stable softmax over a non-empty score slice.
///
/// Subtracting the maximum keeps `exp` from overflowing and leaves the
/// distribution unchanged. When the exponential sum still rounds to zero
/// (non-finite inputs), every entry gets uniform probability `1/n` rather
/// than dividing by zero.
pub(crate) fn stable_softmax(scores: &[f32]) -> Vec<f32> {
    debug_assert!(!scores.is_empty());

    let max_val = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut probs: Vec<f32> = scores.iter().map(|&s| (s - max_val).exp()).collect();
    let sum: f32 = probs.iter().sum();

    if sum > 0.0 {
        for p in &mut probs {
            *p /= sum;
        }
    } else {
        let uniform = 1.0 / probs.len() as f32;
        for p in &mut probs {
            *p = uniform;
        }
    }
    probs
}

/// Indices of `probs` ordered by probability, descending.
///
/// The sort is stable, so equal probabilities keep their original index
/// order and the ranking is reproducible.
pub(crate) fn rank_descending(probs: &[f32]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..probs.len()).collect();
    indices.sort_by(|&a, &b| {
        probs[b]
            .partial_cmp(&probs[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    indices
}

/// Draw one index from a set of non-negative weights, with probability
/// proportional to each weight.
///
/// The weights need not sum to 1. Fails on an empty set, and on a set whose
/// sum is zero or non-finite (no renormalization exists for those).
pub(crate) fn weighted_draw(weights: &[f32], ctx: &mut SamplingContext) -> Result<usize> {
    if weights.is_empty() {
        return Err(SamplingError::InvalidInput(
            "cannot draw from an empty weight set".to_string(),
        ));
    }
    let total: f32 = weights.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        return Err(SamplingError::InvalidInput(format!(
            "weight set does not sum to a positive finite value (sum = {total})"
        )));
    }

    let target = ctx.next_f32() * total;
    let mut cumulative = 0.0f32;
    for (i, &w) in weights.iter().enumerate() {
        cumulative += w;
        if target < cumulative {
            return Ok(i);
        }
    }
    // Rounding can leave `target` at or past the final cumulative sum;
    // settle on the last entry that carries weight.
    Ok(weights
        .iter()
        .rposition(|&w| w > 0.0)
        .unwrap_or(weights.len() - 1))
}

/// Convert a score tensor into a probability distribution.
///
/// Stable softmax: shift-invariant, and degenerates to the uniform
/// distribution when every unnormalized weight underflows to zero.
/// Fails with [`SamplingError::InvalidInput`] on an empty score vector.
pub fn softmax(scores: &Tensor) -> Result<Tensor> {
    let values = scores_to_vec(scores)?;
    let probs = stable_softmax(&values);
    Ok(Tensor::new(probs, scores.device())?)
}
