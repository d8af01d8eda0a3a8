use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use log::LevelFilter;
use qlocal::bench::{self, BenchConfig};
use qlocal::runtime::configure_thread_pool;
use qlocal::Execution;

#[cfg(not(target_env = "msvc"))]
use jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;


const QLOCAL_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(name = "qlocal", version = QLOCAL_VERSION,
    about = "Benchmarks controlled statevector updates and two QFT compositions.\n\
             Without a subcommand, runs every strategy once and checks that they agree.",
    long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Worker threads for parallel execution (default: physical cores).
    #[arg(long, global = true)]
    threads: Option<usize>,

    /// Run every kernel on the calling thread.
    #[arg(long, global = true)]
    serial: bool,

    /// Seed for random states and control sets.
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Digits after the decimal point in exported numbers (default: 5).
    #[arg(long, global = true)]
    precision: Option<usize>,

    /// Add keys to an existing association instead of overwriting it.
    #[arg(long, global = true)]
    append: bool,

    /// Also write the report as pretty printed json.
    #[arg(long, global = true, value_name = "FILE")]
    json: Option<PathBuf>,

    /// Base settings from a json file, overridden by any flags given.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Register size for the smoke run.
    #[arg(long, default_value_t = 27)]
    smoke_qubits: usize,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Times the controlled-update strategies, one control at every position.
    Controls {
        num_qubits: usize,
        num_reps: usize,
        /// Output association file
        out: PathBuf,
        /// Also sweep random control sets of every size.
        #[arg(long)]
        multi: bool,
    },
    /// Times the QFT compositions on a random state.
    Qft {
        num_qubits: usize,
        num_reps: usize,
        /// Output association file
        out: PathBuf,
    },
}

// -v flags win over RUST_LOG, without any the environment (or warn) applies
fn log_level(verbosity: u8) -> Option<LevelFilter> {
    match verbosity {
        0 => None,
        1 => Some(LevelFilter::Info),
        2 => Some(LevelFilter::Debug),
        _ => Some(LevelFilter::Trace),
    }
}

fn init_logging(verbosity: u8) -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if let Some(level) = log_level(verbosity) {
        builder.filter_level(level);
    }
    builder.try_init().map_err(|err| err.into())
}

fn execution(cli: &Cli) -> Execution {
    if cli.serial {
        Execution::Serial
    } else {
        Execution::Parallel
    }
}

fn load_config(cli: &Cli, num_qubits: usize, num_reps: usize) -> Result<BenchConfig> {
    let mut config = match &cli.config {
        Some(path) => BenchConfig::from_json_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => BenchConfig::default(),
    };

    config.num_qubits = num_qubits;
    config.num_reps = num_reps;
    if let Some(precision) = cli.precision {
        config.precision = precision;
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if cli.serial {
        config.execution = Execution::Serial;
    }
    config.progress = config.progress && cli.verbose < 2;

    config.validate()?;
    if config.num_reps == 0 {
        bail!("num_reps must be at least 1");
    }
    log::debug!("effective config: {:?}", config);
    Ok(config)
}

fn write_json_if_requested<T: serde::Serialize>(report: &T, json: Option<&Path>) -> Result<()> {
    if let Some(path) = json {
        bench::write_json(report, path)
            .with_context(|| format!("writing json report {}", path.display()))?;
    }
    Ok(())
}

fn run_smoke(cli: &Cli) -> Result<()> {
    let report = bench::run_smoke(cli.smoke_qubits, execution(cli))?;

    println!("{} qubits, single control on qubit {}", report.num_qubits, report.control);
    println!("multiple controls on qubits {:?}", report.controls);

    let mut section = "";
    for line in &report.lines {
        if line.section != section {
            section = line.section;
            println!("\n{}:", section);
        }
        println!("  method {}: {:.6} s", line.label, line.seconds);
    }

    println!();
    println!("single-control strategies agree: {}", report.single_agree);
    println!("multi-control strategies agree:  {}", report.multi_agree);
    println!("qft circuit vs merged phases:    {:.3e}", report.qft_deviation);

    write_json_if_requested(&report, cli.json.as_deref())?;

    if !report.single_agree || !report.multi_agree {
        bail!("controlled-update strategies disagree");
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let workers = configure_thread_pool(cli.threads).context("configuring thread pool")?;
    log::info!("{} execution, {} workers", execution(&cli).label(), workers);

    match &cli.command {
        None => run_smoke(&cli)?,
        Some(Commands::Controls {
            num_qubits,
            num_reps,
            out,
            multi,
        }) => {
            let mut config = load_config(&cli, *num_qubits, *num_reps)?;
            config.multi |= *multi;

            let report = bench::run_controls(&config)?;
            bench::write_controls_assoc(&report, out, cli.append)
                .with_context(|| format!("writing {}", out.display()))?;
            write_json_if_requested(&report, cli.json.as_deref())?;
            println!("wrote '{}'", out.display());
        }
        Some(Commands::Qft {
            num_qubits,
            num_reps,
            out,
        }) => {
            let config = load_config(&cli, *num_qubits, *num_reps)?;

            let report = bench::run_qft(&config)?;
            bench::write_qft_assoc(&report, out, cli.append)
                .with_context(|| format!("writing {}", out.display()))?;
            write_json_if_requested(&report, cli.json.as_deref())?;
            println!(
                "wrote '{}' (methods differ by at most {:.3e})",
                out.display(),
                report.max_deviation
            );
        }
    }
    Ok(())
}
