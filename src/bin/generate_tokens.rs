//! CLI tool for running a sampling session with a deterministic seed.
//!
//! Feeds a fixed score vector through the repetition-aware pipeline for a
//! number of steps and prints the sampled token stream, allowing direct
//! comparison of runs across seeds and configurations.
//!
//! Usage:
//!     cargo run --features cli --bin generate_tokens -- --steps 64 --seed 42
//!     cargo run --features cli --bin generate_tokens -- --scores scores.json --eos-id 3

use anyhow::{Context, Result};
use candle_core::{Device, Tensor};
use clap::Parser;
use std::collections::HashMap;
use std::fs;

use ras_sampling::{next_token, softmax, SamplingConfig, SamplingContext};

/// Run the repetition-aware sampler over a fixed score vector.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON file holding the score vector (an array of numbers, one per
    /// vocabulary slot). When omitted, a synthetic vector is used.
    #[arg(short, long)]
    scores: Option<String>,

    /// Vocabulary size for the synthetic score vector.
    #[arg(long, default_value_t = 64)]
    vocab: usize,

    /// Number of tokens to sample.
    #[arg(long, default_value_t = 32)]
    steps: usize,

    /// Random seed for reproducible sampling. Omit for system entropy.
    #[arg(long)]
    seed: Option<u64>,

    /// Top-p (nucleus) cumulative-probability cutoff.
    #[arg(long, default_value_t = 0.8)]
    top_p: f64,

    /// Top-k candidate cap.
    #[arg(long, default_value_t = 25)]
    top_k: usize,

    /// Repetition window length.
    #[arg(long, default_value_t = 10)]
    win_size: usize,

    /// Repetition fraction threshold.
    #[arg(long, default_value_t = 0.1)]
    tau_r: f64,

    /// Sampling temperature.
    #[arg(long, default_value_t = 1.0)]
    temperature: f64,

    /// End-of-sequence token id to suppress during sampling.
    #[arg(long)]
    eos_id: Option<u32>,

    /// Accept end-of-sequence draws instead of retrying them.
    #[arg(long)]
    allow_eos: bool,

    /// Retry budget when suppressing the end-of-sequence token.
    #[arg(long, default_value_t = 100)]
    max_trials: usize,
}

/// Load scores from a JSON array file, or synthesize a fixed pattern.
fn load_scores(args: &Args) -> Result<Vec<f32>> {
    if let Some(path) = &args.scores {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read score file {path}"))?;
        let scores: Vec<f32> = serde_json::from_str(&text)
            .with_context(|| format!("{path} is not a JSON array of numbers"))?;
        anyhow::ensure!(!scores.is_empty(), "score file {path} holds an empty array");
        Ok(scores)
    } else {
        Ok((0..args.vocab)
            .map(|i| (i as f32 * 0.1).sin() * 5.0)
            .collect())
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let config = SamplingConfig {
        top_p: args.top_p,
        top_k: args.top_k,
        win_size: args.win_size,
        tau_r: args.tau_r,
        eos_token_id: args.eos_id,
        ignore_eos: !args.allow_eos,
        max_trials: args.max_trials,
        temperature: args.temperature,
    };

    let device = Device::Cpu;
    let scores = Tensor::new(load_scores(&args)?, &device)?;
    let vocab = scores.dim(0)?;
    tracing::info!(vocab, steps = args.steps, seed = ?args.seed, "sampling session");

    let probs: Vec<f32> = softmax(&scores)?.to_vec1()?;
    let mut ranked: Vec<usize> = (0..vocab).collect();
    ranked.sort_by(|&a, &b| probs[b].total_cmp(&probs[a]));
    for &idx in ranked.iter().take(5) {
        tracing::debug!(token = idx, prob = probs[idx], "top candidate");
    }

    let mut ctx = SamplingContext::new(args.seed);
    let mut history: Vec<u32> = Vec::new();
    for step in 0..args.steps {
        let id = next_token(&scores, &history, &config, &mut ctx)
            .with_context(|| format!("sampling failed at step {step}"))?;
        history.push(id);
    }

    let stream = history
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    println!("{stream}");

    let mut counts: HashMap<u32, usize> = HashMap::new();
    for &id in &history {
        *counts.entry(id).or_insert(0) += 1;
    }
    let mut by_count: Vec<(u32, usize)> = counts.into_iter().collect();
    by_count.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    tracing::info!(
        distinct = by_count.len(),
        most_frequent = ?by_count.first(),
        "session finished"
    );

    Ok(())
}
