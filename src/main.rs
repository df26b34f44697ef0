use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing::error;

use factory_floor::{logging, sim};

#[derive(Parser, Debug)]
#[command(name = "factory_floor", version, about = "Factory floor simulator")]
struct Cli {
    /// Log per-command detail to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Mode>,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Short scripted run with one deliberately misrouted job (default).
    Demo,
    /// Time a batch of cut jobs and print one CSV row.
    Bench(BenchArgs),
    /// Run generation and the job spawner for a fixed time.
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct BenchArgs {
    #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u64).range(1..))]
    jobs: u64,
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u64).range(1..))]
    workers: u64,
    #[arg(long, default_value_t = 5)]
    cut_ms: u64,
    #[arg(long, default_value_t = 1)]
    transit_ms: u64,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    seconds: u64,
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..))]
    spawn_interval_ms: u64,
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u64).range(1..))]
    workers: u64,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = match cli.command.unwrap_or(Mode::Demo) {
        Mode::Demo => sim::run_demo(),
        Mode::Bench(args) => sim::run_benchmark(
            args.jobs as usize,
            args.workers as usize,
            args.cut_ms,
            args.transit_ms,
        ),
        Mode::Run(args) => sim::run_timed(
            Duration::from_secs(args.seconds),
            Duration::from_millis(args.spawn_interval_ms),
            args.workers as usize,
        ),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "simulation failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
