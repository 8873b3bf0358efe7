//! Benchmarking tool that outputs CSV data for plotting chart and enumeration cost
//! against the degree of prepositional-phrase attachment ambiguity.
//!
//! Usage:
//!   cargo run --release --bin ambiguity_csv
//!
//! Output:
//!   Creates results/ambiguity.csv with columns:
//!   phrases, tokens, derivations, stage, median_time_ns, mad_ns, peak_memory_bytes, iterations
use anyhow::Result;
use memory_stats::memory_stats;
use np_chunker::chunks::np_chunks;
use np_chunker::grammars::Grammar;
use np_chunker::parsers::{ChartParser, ParseError};
use std::fs::{self, File};
use std::hint::black_box;
use std::io::Write;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};
use std::thread;
use std::time::{Duration, Instant};

// ============================================================================
// Configuration
// ============================================================================

const GRAMMAR: &str = r#"
S -> NP VP
NP -> N | Det N | NP PP
VP -> V NP | VP PP
PP -> P NP
N -> "i" | "man" | "park" | "telescope" | "hill"
Det -> "the" | "a"
V -> "saw"
P -> "in" | "with" | "on"
"#;

const BASE_SENTENCE: &str = "i saw the man";
const PHRASES: &[&str] = &["on the hill", "in the park", "with a telescope"];
const MAX_PHRASES: usize = 9;

/// Trees pulled from the lazy sequence in the enumeration stage
const ENUMERATION_CAP: usize = 1000;

const WARMUP_ITERATIONS: u32 = 1;
const MIN_ITERATIONS: u32 = 5;
const MAX_ITERATIONS: u32 = 20;
const TARGET_TIME: Duration = Duration::from_millis(500);

struct BenchmarkResult {
    phrases: usize,
    token_count: usize,
    derivations: u128,
    stage: &'static str,
    median_time_ns: f64,
    mad_ns: f64,
    peak_memory_bytes: usize,
    iterations: u32,
}

impl BenchmarkResult {
    fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{},{:.2},{:.2},{},{}",
            self.phrases,
            self.token_count,
            self.derivations,
            self.stage,
            self.median_time_ns,
            self.mad_ns,
            self.peak_memory_bytes,
            self.iterations
        )
    }
}

// ============================================================================
// Measurement Functions
// ============================================================================

/// Measure peak memory usage of one run using a sampling thread
fn measure_peak_memory<F, T>(mut run: F) -> usize
where
    F: FnMut() -> T,
{
    let start_mem = memory_stats().map(|u| u.physical_mem).unwrap_or(0);

    let peak_mem = Arc::new(AtomicUsize::new(start_mem));
    let stop_signal = Arc::new(AtomicBool::new(false));

    let t_peak = peak_mem.clone();
    let t_stop = stop_signal.clone();

    // Spawn sampler thread (1ms interval)
    let sampler = thread::spawn(move || {
        while !t_stop.load(Ordering::Relaxed) {
            if let Some(usage) = memory_stats() {
                t_peak.fetch_max(usage.physical_mem, Ordering::Relaxed);
            }
            thread::sleep(Duration::from_millis(1));
        }
    });

    black_box(run());

    stop_signal.store(true, Ordering::Relaxed);
    let _ = sampler.join();

    peak_mem.load(Ordering::Relaxed).saturating_sub(start_mem)
}

fn median(sorted: &[f64]) -> f64 {
    if sorted.len() % 2 == 0 {
        (sorted[sorted.len() / 2 - 1] + sorted[sorted.len() / 2]) / 2.0
    } else {
        sorted[sorted.len() / 2]
    }
}

/// Median and MAD (Median Absolute Deviation) of the run time, plus iterations used
fn measure<F, T>(mut run: F) -> (f64, f64, u32)
where
    F: FnMut() -> T,
{
    for _ in 0..WARMUP_ITERATIONS {
        black_box(run());
    }

    let mut times: Vec<f64> = Vec::new();
    let start_measure = Instant::now();
    while (times.len() as u32) < MAX_ITERATIONS {
        if times.len() as u32 >= MIN_ITERATIONS && start_measure.elapsed() >= TARGET_TIME {
            break;
        }
        let start = Instant::now();
        black_box(run());
        times.push(start.elapsed().as_nanos() as f64);
    }

    times.sort_by(f64::total_cmp);
    let mid = median(&times);

    let mut deviations: Vec<f64> = times.iter().map(|t| (t - mid).abs()).collect();
    deviations.sort_by(f64::total_cmp);

    (mid, median(&deviations), times.len() as u32)
}

fn sentence(phrases: usize) -> Vec<String> {
    let mut text = BASE_SENTENCE.to_string();
    for phrase in PHRASES.iter().cycle().take(phrases) {
        text.push(' ');
        text.push_str(phrase);
    }
    text.split_whitespace().map(str::to_string).collect()
}

fn main() -> Result<()> {
    let grammar = Grammar::load(GRAMMAR)?;
    let parser = ChartParser::new(&grammar);

    fs::create_dir_all("results")?;
    let filename = "results/ambiguity.csv";
    let mut csv_file = File::create(filename)?;
    writeln!(
        csv_file,
        "phrases,tokens,derivations,stage,median_time_ns,mad_ns,peak_memory_bytes,iterations"
    )?;
    println!("✓ Writing results to: {}", filename);

    for phrases in 0..=MAX_PHRASES {
        let tokens = sentence(phrases);
        let derivations = parser.chart(&tokens)?.count_derivations(grammar.start);
        println!(
            "\n  {} phrases: {} tokens, {} derivations",
            phrases,
            tokens.len(),
            derivations
        );

        let chart_stage = || parser.chart(&tokens).map(|chart| chart.num_ways());
        let enumerate_stage = || {
            parser.chart(&tokens).map(|chart| {
                chart
                    .derivations(grammar.start)
                    .take(ENUMERATION_CAP)
                    .map(|tree| np_chunks(&tree).len())
                    .sum::<usize>()
            })
        };

        let stages: [(&'static str, &dyn Fn() -> Result<usize, ParseError>); 2] =
            [("chart", &chart_stage), ("enumerate", &enumerate_stage)];
        for (stage, run) in stages {
            let peak_memory_bytes = measure_peak_memory(run);
            let (median_time_ns, mad_ns, iterations) = measure(run);
            let result = BenchmarkResult {
                phrases,
                token_count: tokens.len(),
                derivations,
                stage,
                median_time_ns,
                mad_ns,
                peak_memory_bytes,
                iterations,
            };
            println!(
                "    [{}] {:.0}ns ± {:.0}ns ({} iterations)",
                stage, median_time_ns, mad_ns, iterations
            );
            writeln!(csv_file, "{}", result.to_csv_row())?;
        }
    }

    println!("\nBenchmark complete!");
    Ok(())
}
