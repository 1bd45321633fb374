// -----------------------------------------------------------------------------
// guard-bench - db_bench driver & guard-key extractor for guarded LSM stores
// -----------------------------------------------------------------------------

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use guard_bench::bench::{run_loop, BenchConfig};
use guard_bench::guards::extract_guards;

// -----------------------------------------------------------------------------
// CLI definition
// -----------------------------------------------------------------------------
#[derive(Parser)]
#[command(name = "guard-bench", version, about = "Drives db_bench and extracts guard keys from its results logs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (-v for info, -vv for debug, -vvv for trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract guard keys and level markers from a results log
    ///
    /// Examples:
    ///   guard-bench guards --input results500000100000
    ///   guard-bench guards --input tmp.txt --output /tmp/guards.txt
    Guards {
        /// Results log produced by a db_bench run with the sstables benchmark
        #[arg(long)]
        input: PathBuf,

        /// Side file to write; created or truncated each run
        #[arg(long, default_value = "guards.txt")]
        output: PathBuf,
    },
    /// Run the db_bench iteration loop and save grouped per-op results
    ///
    /// Examples:
    ///   guard-bench run --db-bench ./db_bench --num 500000 --reads 125000
    ///   guard-bench run --db-bench ./db_bench --iterations 10 --out-dir results/
    Run {
        /// Path to the db_bench binary
        #[arg(long)]
        db_bench: PathBuf,

        /// Database directory handed to --db
        #[arg(long, default_value = "/tmp/rocksdbtest-1000")]
        db: PathBuf,

        /// Number of keys to insert (--num)
        #[arg(long, default_value_t = 500_000)]
        num: u64,

        /// Number of reads to issue (--reads)
        #[arg(long, default_value_t = 100_000)]
        reads: u64,

        /// How many times to repeat the full benchmark
        #[arg(long, default_value_t = 1)]
        iterations: usize,

        /// Directory for the results file and metadata.json
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

// -----------------------------------------------------------------------------
// main
// -----------------------------------------------------------------------------
fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level
    let level = match cli.verbose {
        0 => "warn",  // Default: only warnings and errors
        1 => "info",  // -v: per-run summaries
        2 => "debug", // -vv: per-iteration command lines
        _ => "trace", // -vvv+: everything
    };
    use tracing_subscriber::{fmt, EnvFilter};
    let filter = EnvFilter::new(format!("guard_bench={}", level));
    fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Guards { input, output } => {
            let count = extract_guards(&input, &output)?;
            println!("Wrote {} records to {}", count, output.display());
        }
        Commands::Run { db_bench, db, num, reads, iterations, out_dir } => {
            let cfg = BenchConfig {
                db_bench,
                db_dir: db,
                num,
                reads,
                iterations,
                out_dir,
            };
            let results_path = run_loop(&cfg)?;
            println!("Results written to {}", results_path.display());
        }
    }

    Ok(())
}
