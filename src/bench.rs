//! db_bench iteration loop
//!
//! Drives an external `db_bench` binary for a configured number of
//! iterations, captures its stdout, and writes the per-op summary lines
//! (`fillrandom`, `readrandom`, `seekrandom`) to a results file grouped
//! by operation. A `metadata.json` with the exact command line, host, and
//! timing is written next to the results file.
//!
//! Deliberately synchronous and sequential: each iteration must finish
//! before the next starts so runs do not contend for the database
//! directory or the page cache.

use anyhow::{bail, Context, Result};
use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;
use tracing::{debug, info};

/// Per-op summary prefixes kept from db_bench stdout, in report order.
pub const OP_PREFIXES: [&str; 3] = ["fillrandom", "readrandom", "seekrandom"];

/// One db_bench invocation template.
///
/// Flags other than `--db`, `--num`, and `--reads` are fixed: the loop
/// always starts from a fresh database with a 4 MiB write buffer, 1 KiB
/// values, and compression off.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Path to the db_bench binary.
    pub db_bench: PathBuf,
    /// Database directory handed to `--db`.
    pub db_dir: PathBuf,
    /// Number of keys to insert (`--num`).
    pub num: u64,
    /// Number of reads to issue (`--reads`).
    pub reads: u64,
    /// How many times to run the full benchmark.
    pub iterations: usize,
    /// Directory the results file and metadata are written to.
    pub out_dir: PathBuf,
}

impl BenchConfig {
    /// Full argv for one db_bench run.
    pub fn args(&self) -> Vec<String> {
        vec![
            "--use_existing_db=0".to_string(),
            "--benchmarks=fillrandom,stats,sstables".to_string(),
            "--open_files=1000".to_string(),
            format!("--db={}", self.db_dir.display()),
            format!("--num={}", self.num),
            format!("--reads={}", self.reads),
            "--value_size=1024".to_string(),
            "--write_buffer_size=4194304".to_string(),
            "--level0_slowdown_writes_trigger=20".to_string(),
            "--level0_stop_writes_trigger=24".to_string(),
            "--compression_type=none".to_string(),
        ]
    }

    /// Results filename encodes the workload shape: `results<num><reads>`.
    pub fn results_path(&self) -> PathBuf {
        self.out_dir.join(format!("results{}{}", self.num, self.reads))
    }
}

/// Metadata about a benchmark run, written next to the results file.
#[derive(Debug, Serialize, Deserialize)]
pub struct RunMetadata {
    pub version: String,
    pub command_line: Vec<String>,
    pub iterations: usize,
    pub hostname: String,
    pub start_time: String,
    pub end_time: Option<String>,
    pub duration_secs: Option<f64>,
}

impl RunMetadata {
    pub fn new(cfg: &BenchConfig) -> Self {
        let mut command_line = vec![cfg.db_bench.display().to_string()];
        command_line.extend(cfg.args());
        let hostname = hostname::get()
            .unwrap_or_else(|_| "unknown".into())
            .to_string_lossy()
            .to_string();

        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            command_line,
            iterations: cfg.iterations,
            hostname,
            start_time: Local::now().to_rfc3339(),
            end_time: None,
            duration_secs: None,
        }
    }

    pub fn finalize(&mut self, duration_secs: f64) {
        self.end_time = Some(Local::now().to_rfc3339());
        self.duration_secs = Some(duration_secs);
    }
}

/// Keep the per-op summary lines from one iteration's stdout, one bucket
/// per entry of [`OP_PREFIXES`].
pub fn filter_op_lines(stdout: &str) -> Vec<Vec<String>> {
    OP_PREFIXES
        .iter()
        .map(|prefix| {
            stdout
                .lines()
                .filter(|line| line.starts_with(prefix))
                .map(str::to_string)
                .collect()
        })
        .collect()
}

/// Run one db_bench iteration and return its stdout.
fn run_once(cfg: &BenchConfig) -> Result<String> {
    debug!("Spawning {} {}", cfg.db_bench.display(), cfg.args().join(" "));
    let output = Command::new(&cfg.db_bench)
        .args(cfg.args())
        .output()
        .with_context(|| format!("Failed to execute {}", cfg.db_bench.display()))?;

    if !output.status.success() {
        bail!(
            "db_bench exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr)
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Run the full iteration loop and write the grouped results file.
///
/// The results file lists, for each op in [`OP_PREFIXES`] order, the
/// captured summary lines of every iteration followed by a blank
/// separator line. Returns the results file path.
pub fn run_loop(cfg: &BenchConfig) -> Result<PathBuf> {
    fs::create_dir_all(&cfg.out_dir)
        .with_context(|| format!("Failed to create output directory {}", cfg.out_dir.display()))?;

    let mut metadata = RunMetadata::new(cfg);
    let t0 = Instant::now();

    let pb = ProgressBar::new(cfg.iterations as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} iterations ({eta_precise}) {msg}",
        )?
        .progress_chars("#>-"),
    );
    pb.set_message(format!("num={} reads={}", cfg.num, cfg.reads));

    // per_iteration[i][t] holds iteration i's lines for op t
    let mut per_iteration = Vec::with_capacity(cfg.iterations);
    for iteration in 0..cfg.iterations {
        let stdout = run_once(cfg)
            .with_context(|| format!("Iteration {} failed", iteration + 1))?;
        per_iteration.push(filter_op_lines(&stdout));
        pb.inc(1);
    }
    pb.finish_with_message("done");

    let results_path = cfg.results_path();
    let mut out = File::create(&results_path)
        .with_context(|| format!("Failed to create {}", results_path.display()))?;
    for op_idx in 0..OP_PREFIXES.len() {
        for lines in &per_iteration {
            for line in &lines[op_idx] {
                writeln!(out, "{}", line)?;
            }
        }
        writeln!(out)?;
    }

    metadata.finalize(t0.elapsed().as_secs_f64());
    write_metadata(&cfg.out_dir, &metadata)?;

    info!("Results saved to: {}", results_path.display());
    Ok(results_path)
}

fn write_metadata(out_dir: &Path, metadata: &RunMetadata) -> Result<()> {
    let metadata_path = out_dir.join("metadata.json");
    let json = serde_json::to_string_pretty(metadata)
        .with_context(|| "Failed to serialize metadata")?;
    fs::write(&metadata_path, json)
        .with_context(|| format!("Failed to write {}", metadata_path.display()))?;
    Ok(())
}
