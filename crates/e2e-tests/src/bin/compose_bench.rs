use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use e2e_tests::{fixed_now, random_request, random_wardrobe, TEST_USER};
use outfit_compose::{MockWardrobeSource, OutfitComposer};
use outfit_types::ComposerSettings;

const DEFAULT_ITERATIONS: usize = 200;
const DEFAULT_WARDROBE_SIZE: usize = 60;
const DEFAULT_SEED: u64 = 42;

#[derive(Parser, Debug)]
#[command(name = "compose_bench", about = "Outfit composer latency benchmark harness")]
struct Args {
    #[arg(long, default_value_t = DEFAULT_ITERATIONS)]
    iterations: usize,
    #[arg(long, default_value_t = DEFAULT_WARDROBE_SIZE)]
    wardrobe_size: usize,
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,
    /// Fetch each wardrobe through the async source seam
    #[arg(long)]
    via_source: bool,
    /// Composer config file
    #[arg(long)]
    config: Option<String>,
}

#[derive(Debug, Serialize)]
struct LatencySummary {
    p50_ms: f64,
    p90_ms: f64,
    p99_ms: f64,
    max_ms: f64,
}

#[derive(Debug, Serialize)]
struct BenchmarkOutput {
    iterations: usize,
    wardrobe_size: usize,
    seed: u64,
    via_source: bool,
    latency: LatencySummary,
    /// Results per generation strategy label
    strategies: BTreeMap<String, usize>,
    incomplete: usize,
    mean_items: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let settings =
        ComposerSettings::load(args.config.as_deref()).context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let composer = OutfitComposer::new(settings).context("Invalid composer settings")?;
    let mut rng = StdRng::seed_from_u64(args.seed);

    let mut samples = Vec::with_capacity(args.iterations);
    let mut strategies: BTreeMap<String, usize> = BTreeMap::new();
    let mut incomplete = 0;
    let mut total_items = 0;

    for _ in 0..args.iterations {
        let wardrobe = random_wardrobe(&mut rng, args.wardrobe_size);
        let request = random_request(&mut rng);

        let started = Instant::now();
        let response = if args.via_source {
            let source = MockWardrobeSource::default().with_items(TEST_USER, &wardrobe);
            composer.compose_for_user(&source, TEST_USER, &request).await
        } else {
            composer.compose_at(&request, &wardrobe, fixed_now())
        };
        samples.push(duration_ms(started.elapsed()));

        *strategies
            .entry(response.generation_strategy.as_str().to_string())
            .or_insert(0) += 1;
        if !response.is_complete() {
            incomplete += 1;
        }
        total_items += response.items.len();
    }

    samples.sort_by(|a, b| a.total_cmp(b));
    let output = BenchmarkOutput {
        iterations: args.iterations,
        wardrobe_size: args.wardrobe_size,
        seed: args.seed,
        via_source: args.via_source,
        latency: LatencySummary {
            p50_ms: percentile(&samples, 50.0),
            p90_ms: percentile(&samples, 90.0),
            p99_ms: percentile(&samples, 99.0),
            max_ms: samples.last().copied().unwrap_or(0.0),
        },
        strategies,
        incomplete,
        mean_items: if args.iterations == 0 {
            0.0
        } else {
            total_items as f64 / args.iterations as f64
        },
    };

    info!(
        iterations = output.iterations,
        p50_ms = output.latency.p50_ms,
        p99_ms = output.latency.p99_ms,
        "Benchmark complete"
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&output).context("Failed to serialize results")?
    );
    Ok(())
}

fn duration_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

fn percentile(values: &[f64], percentile: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let rank = (percentile / 100.0) * (values.len() as f64 - 1.0);
    let low = rank.floor() as usize;
    let high = rank.ceil() as usize;
    if low == high {
        values[low]
    } else {
        let weight = rank - low as f64;
        values[low] + (values[high] - values[low]) * weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_interpolates() {
        let values = [10.0, 20.0, 30.0, 40.0, 50.0];
        assert_eq!(percentile(&values, 50.0), 30.0);
        assert!((percentile(&values, 90.0) - 46.0).abs() < 1e-9);
        assert_eq!(percentile(&[], 99.0), 0.0);
    }
}
