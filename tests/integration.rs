//! Integration tests for the repetition-aware sampling pipeline.
//!
//! The statistical tests use seeded contexts, so every run draws the same
//! stream and the assertions are deterministic.

use std::collections::HashSet;

use candle_core::{Device, Tensor};
use ras_sampling::{
    next_token, nucleus_sample, ras_sample, softmax, unrestricted_sample, SamplingConfig,
    SamplingContext, SamplingError,
};

/// Ten-token score vector used throughout. Its softmax puts ~0.65 on id 3,
/// and the default top_p=0.8/top_k=25 nucleus set is exactly {3, 5, 1}.
const SCORES: [f32; 10] = [1.2, 3.4, 0.5, 5.6, 2.1, 4.0, 1.8, 0.9, 2.7, 3.3];

fn scores_tensor() -> Tensor {
    Tensor::new(&SCORES, &Device::Cpu).unwrap()
}

fn full_probs() -> Vec<f32> {
    softmax(&scores_tensor()).unwrap().to_vec1().unwrap()
}

/// Pearson chi-square statistic of observed counts against expected
/// probabilities. With 10k trials every bin here has an expected count
/// well above 5, so no pooling is needed.
fn chi_square(observed: &[usize], expected_probs: &[f32], trials: usize) -> f64 {
    observed
        .iter()
        .zip(expected_probs)
        .map(|(&obs, &p)| {
            let expected = p as f64 * trials as f64;
            let diff = obs as f64 - expected;
            diff * diff / expected
        })
        .sum()
}

fn count_draws<F>(trials: usize, vocab: usize, mut draw: F) -> Vec<usize>
where
    F: FnMut() -> u32,
{
    let mut counts = vec![0usize; vocab];
    for _ in 0..trials {
        counts[draw() as usize] += 1;
    }
    counts
}

#[test]
fn unrestricted_matches_softmax_distribution() {
    let scores = scores_tensor();
    let config = SamplingConfig::default();
    let mut ctx = SamplingContext::new(Some(1234));

    let trials = 10_000;
    let counts = count_draws(trials, SCORES.len(), || {
        unrestricted_sample(&scores, &config, &mut ctx).unwrap()
    });

    // df = 9; the 0.999 quantile is 27.88, tested with margin.
    let stat = chi_square(&counts, &full_probs(), trials);
    assert!(stat < 35.0, "chi-square statistic too large: {stat}");
}

#[test]
fn triggered_ras_falls_back_to_the_full_distribution() {
    let scores = scores_tensor();
    let config = SamplingConfig::default();
    // threshold = trunc(10 * 0.1) = 1, and every nucleus candidate
    // ({3, 5, 1}) already appears in this window, so the fallback fires on
    // every call.
    let history = [3u32, 7, 1, 4, 9, 6, 1, 0, 2, 5];
    let mut ctx = SamplingContext::new(Some(5678));

    let trials = 10_000;
    let counts = count_draws(trials, SCORES.len(), || {
        ras_sample(&scores, &history, &config, &mut ctx).unwrap()
    });

    // The output must match the unrestricted softmax distribution, not the
    // nucleus-only one. Nucleus-only output would leave seven bins empty
    // and blow the statistic up by orders of magnitude.
    let stat = chi_square(&counts, &full_probs(), trials);
    assert!(stat < 35.0, "chi-square statistic too large: {stat}");

    // Every vocabulary id shows up, including the ones the nucleus filter
    // would have excluded (the rarest id has expected count ~39).
    assert!(counts.iter().all(|&c| c > 0), "missing support: {counts:?}");
}

#[test]
fn untriggered_ras_stays_inside_the_nucleus() {
    let scores = scores_tensor();
    let config = SamplingConfig::default();
    // No nucleus candidate appears in this history, so the window count is
    // always 0 < threshold 1 and the fallback never fires.
    let history = [0u32, 2, 4, 6, 7];
    let mut ctx = SamplingContext::new(Some(42));

    let trials = 5_000;
    let counts = count_draws(trials, SCORES.len(), || {
        ras_sample(&scores, &history, &config, &mut ctx).unwrap()
    });

    let support: HashSet<usize> = counts
        .iter()
        .enumerate()
        .filter(|(_, &c)| c > 0)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(support, [1usize, 3, 5].into_iter().collect());
}

#[test]
fn untriggered_ras_matches_nucleus_proportions() {
    let scores = scores_tensor();
    let config = SamplingConfig::default();
    let history = [0u32, 2, 4, 6, 7];
    let mut ctx = SamplingContext::new(Some(99));

    let trials = 10_000;
    let counts = count_draws(trials, SCORES.len(), || {
        ras_sample(&scores, &history, &config, &mut ctx).unwrap()
    });

    // Within the nucleus set the draw weights are the original softmax
    // probabilities, renormalized over {3, 5, 1}.
    let probs = full_probs();
    let mass: f32 = probs[3] + probs[5] + probs[1];
    let expected = [probs[3] / mass, probs[5] / mass, probs[1] / mass];
    let observed = [counts[3], counts[5], counts[1]];

    // df = 2; the 0.999 quantile is 13.82, tested with margin.
    let stat = chi_square(&observed, &expected, trials);
    assert!(stat < 18.0, "chi-square statistic too large: {stat}");
}

#[test]
fn next_token_never_emits_a_suppressed_eos() {
    let scores = scores_tensor();
    // id 3 holds ~0.65 of the mass but not all of it, so retries always
    // find another token.
    let config = SamplingConfig {
        eos_token_id: Some(3),
        ..Default::default()
    };
    let mut ctx = SamplingContext::new(Some(7));

    for _ in 0..2_000 {
        let id = next_token(&scores, &[], &config, &mut ctx).unwrap();
        assert_ne!(id, 3);
    }
}

#[test]
fn next_token_fails_fast_on_an_all_eos_distribution() {
    // Essentially the whole probability mass sits on the eos id, so every
    // draw hits it and the retry budget runs out.
    let scores = Tensor::new(&[0.0f32, 50.0], &Device::Cpu).unwrap();
    let config = SamplingConfig {
        eos_token_id: Some(1),
        max_trials: 5,
        ..Default::default()
    };
    let mut ctx = SamplingContext::new(Some(21));

    match next_token(&scores, &[], &config, &mut ctx) {
        Err(SamplingError::ExhaustedRetries { max_trials }) => assert_eq!(max_trials, 5),
        other => panic!("expected ExhaustedRetries, got {other:?}"),
    }
}

#[test]
fn next_token_may_return_eos_when_not_ignored() {
    let scores = scores_tensor();
    let config = SamplingConfig {
        eos_token_id: Some(3),
        ignore_eos: false,
        ..Default::default()
    };
    let mut ctx = SamplingContext::new(Some(11));

    let mut saw_eos = false;
    for _ in 0..200 {
        if next_token(&scores, &[], &config, &mut ctx).unwrap() == 3 {
            saw_eos = true;
            break;
        }
    }
    assert!(saw_eos, "eos id never surfaced despite ignore_eos = false");
}

#[test]
fn repetition_knobs_are_threaded_through_next_token() {
    let scores = scores_tensor();
    // Each nucleus candidate appears exactly once in the history.
    let history = [3u32, 5, 1];

    // threshold 1: one occurrence is enough, every call falls back and the
    // output escapes the nucleus set.
    let tight = SamplingConfig::default();
    let mut ctx = SamplingContext::new(Some(31));
    let escaped = (0..4_000)
        .map(|_| next_token(&scores, &history, &tight, &mut ctx).unwrap())
        .any(|id| !matches!(id, 1 | 3 | 5));
    assert!(escaped, "tau_r/win_size never reached the repetition check");

    // Same history, tau_r raised to 0.5 (threshold 5): one occurrence is
    // no longer enough, so the output stays inside the nucleus set.
    let loose = SamplingConfig {
        tau_r: 0.5,
        ..Default::default()
    };
    let mut ctx = SamplingContext::new(Some(31));
    for _ in 0..4_000 {
        let id = next_token(&scores, &history, &loose, &mut ctx).unwrap();
        assert!(matches!(id, 1 | 3 | 5), "unexpected fallback drew {id}");
    }

    // win_size 0 zeroes the threshold: the fallback fires even with an
    // empty history.
    let degenerate = SamplingConfig {
        win_size: 0,
        ..Default::default()
    };
    let mut ctx = SamplingContext::new(Some(31));
    let escaped = (0..4_000)
        .map(|_| next_token(&scores, &[], &degenerate, &mut ctx).unwrap())
        .any(|id| !matches!(id, 1 | 3 | 5));
    assert!(escaped, "win_size = 0 never triggered the fallback");
}

#[test]
fn nucleus_sample_always_lands_in_the_top_k() {
    let scores = scores_tensor();
    let config = SamplingConfig {
        top_k: 3,
        top_p: 1.0,
        ..Default::default()
    };
    let mut ctx = SamplingContext::new(Some(3));

    // The three highest-probability ids are 3, 5, 1.
    for _ in 0..1_000 {
        let id = nucleus_sample(&scores, &config, &mut ctx).unwrap();
        assert!(matches!(id, 1 | 3 | 5), "id {id} is outside the top 3");
    }
}

#[test]
fn seeded_sessions_reproduce_the_token_stream() {
    let scores = scores_tensor();
    let config = SamplingConfig {
        eos_token_id: Some(3),
        ..Default::default()
    };

    let run = |seed: u64| -> Vec<u32> {
        let mut ctx = SamplingContext::new(Some(seed));
        let mut history = Vec::new();
        for _ in 0..40 {
            let id = next_token(&scores, &history, &config, &mut ctx).unwrap();
            history.push(id);
        }
        history
    };

    assert_eq!(run(424242), run(424242));
    assert_ne!(run(424242), run(171717));
}
