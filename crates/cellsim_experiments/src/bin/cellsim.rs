use std::error::Error;
use std::path::{Path, PathBuf};

use cellsim_core::{ModePolicy, ScenarioParams};
use cellsim_experiments::export::{export_report_to_json, export_ticks_to_parquet};
use cellsim_experiments::runner::{
    run_parallel_experiments_with_progress, run_single_simulation_with_sink,
};
use cellsim_experiments::{
    export_to_csv, export_to_json, export_to_parquet, init_logging, load_scenario_params,
    CsvRecordSink, LogLevel, ParameterSet, ParameterSpace,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "cellsim",
    about = "Cellular handover and dynamic PRB simulation",
    long_about = "Runs the handover simulation once with CSV record logs, or sweeps\n\
                  parameter combinations in parallel and exports one row per run."
)]
struct Cli {
    /// Log level; RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "info")]
    log_level: LogLevel,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one scenario and append its records to out_log.csv / out_prb.csv
    Run(RunArgs),
    /// Run a parameter sweep in parallel
    Sweep(SweepArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Scenario configuration (JSON); defaults apply to missing fields
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    seed: Option<u64>,
    /// Number of ticks, overriding the configured run length
    #[arg(long)]
    ticks: Option<u64>,
    #[arg(value_enum, long, default_value_t = PolicyArg::Both)]
    policy: PolicyArg,
    /// Directory receiving the CSV logs
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
    /// Write the full run (report, ticks, handovers) as JSON
    #[arg(long)]
    report: Option<PathBuf>,
    /// Write per-terminal tick snapshots as Parquet
    #[arg(long)]
    ticks_parquet: Option<PathBuf>,
}

#[derive(Args)]
struct SweepArgs {
    /// Base scenario configuration (JSON)
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_delimiter = ',')]
    cells: Vec<usize>,
    #[arg(long, value_delimiter = ',')]
    terminals_per_cell: Vec<usize>,
    #[arg(long, value_delimiter = ',')]
    bandwidths: Vec<f64>,
    #[arg(long, value_delimiter = ',')]
    look_back: Vec<u64>,
    #[arg(long, value_delimiter = ',')]
    look_forward: Vec<u64>,
    #[arg(long, value_delimiter = ',')]
    dynamic_allocation: Vec<bool>,
    /// Seeds per combination
    #[arg(long, default_value_t = 1)]
    replications: usize,
    /// Sample this many random combinations instead of the full grid
    #[arg(long)]
    samples: Option<usize>,
    #[arg(long, default_value_t = 42)]
    sample_seed: u64,
    #[arg(value_enum, long, default_value_t = PolicyArg::Both)]
    policy: PolicyArg,
    /// Worker threads; rayon's default when absent
    #[arg(long, env = "CELLSIM_THREADS")]
    threads: Option<usize>,
    #[arg(long)]
    csv: Option<PathBuf>,
    #[arg(long)]
    json: Option<PathBuf>,
    #[arg(long)]
    parquet: Option<PathBuf>,
    #[arg(long)]
    no_progress: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    Dynamic,
    Regular,
    Both,
}

impl From<PolicyArg> for ModePolicy {
    fn from(policy: PolicyArg) -> Self {
        match policy {
            PolicyArg::Dynamic => ModePolicy::Dynamic,
            PolicyArg::Regular => ModePolicy::Regular,
            PolicyArg::Both => ModePolicy::Both,
        }
    }
}

// ── helpers ────────────────────────────────────────────────────────

fn base_params(config: Option<&Path>) -> Result<ScenarioParams, Box<dyn Error>> {
    match config {
        Some(path) => load_scenario_params(path),
        None => Ok(ScenarioParams::default()),
    }
}

// ── commands ───────────────────────────────────────────────────────

fn run(args: RunArgs) -> Result<(), Box<dyn Error>> {
    let mut params = base_params(args.config.as_deref())?;
    if let Some(ticks) = args.ticks {
        params = params.with_run_length(ticks);
    }
    let seed = args.seed.or(params.seed).unwrap_or_else(rand::random);
    let mut param_set = ParameterSet::new(params, "run".to_string(), 0, seed);
    param_set.policy = args.policy.into();

    let sink = CsvRecordSink::open(&args.out_dir)?;
    info!(
        seed,
        metrics_log = %sink.metrics_path().display(),
        prb_log = %sink.prb_path().display(),
        "running scenario"
    );
    let artifacts = run_single_simulation_with_sink(&param_set, Box::new(sink))?;

    println!("{}", artifacts.report);
    if let Some(path) = &args.report {
        export_report_to_json(&artifacts, path)?;
    }
    if let Some(path) = &args.ticks_parquet {
        export_ticks_to_parquet(&artifacts.ticks, path)?;
    }
    Ok(())
}

fn sweep(args: SweepArgs) -> Result<(), Box<dyn Error>> {
    let space = ParameterSpace::new(base_params(args.config.as_deref())?)
        .cell_counts(args.cells)
        .terminals_per_cell(args.terminals_per_cell)
        .bandwidths(args.bandwidths)
        .look_back(args.look_back)
        .look_forward(args.look_forward)
        .dynamic_allocation(args.dynamic_allocation)
        .replications(args.replications)
        .policy(args.policy.into());
    let parameter_sets = match args.samples {
        Some(count) => space.sample_random(count, args.sample_seed),
        None => space.generate(),
    };

    let results =
        run_parallel_experiments_with_progress(parameter_sets, args.threads, !args.no_progress)?;

    if let Some(path) = &args.csv {
        export_to_csv(&results, path)?;
    }
    if let Some(path) = &args.json {
        export_to_json(&results, path)?;
    }
    if let Some(path) = &args.parquet {
        export_to_parquet(&results, path)?;
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.log_level)?;

    match cli.command {
        Commands::Run(args) => run(args),
        Commands::Sweep(args) => sweep(args),
    }
}
