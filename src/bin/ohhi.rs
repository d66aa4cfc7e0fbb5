use std::path::PathBuf;
use std::process::ExitCode;
use clap::{CommandFactory, Parser};
use color_eyre::eyre::{eyre, Result, WrapErr};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;
use ohhi_dfs::debug::{StatsObserver, TracingObserver};
use ohhi_dfs::ohhi::{count_solutions, read_problem, report_violation, solve_with_observer};
use ohhi_dfs::problem::ProblemState;

/// Solve a 0h h1 puzzle read from a file.
///
/// The file holds one row of the grid per line: 'r' for a red cell, 'b' for
/// a blue cell and '.' for an open cell.
#[derive(Parser, Debug)]
#[command(name = "ohhi", version, about)]
struct Cli {
    /// Path to the puzzle file.
    file: Option<PathBuf>,

    /// Log every branching decision (overridden by RUST_LOG).
    #[arg(long, default_value_t = false)]
    trace: bool,

    /// Print search statistics after solving.
    #[arg(long, default_value_t = false)]
    stats: bool,

    /// Count the solutions instead of printing the first one.
    #[arg(long, default_value_t = false)]
    count: bool,

    /// Stop counting after this many solutions.
    #[arg(long, requires = "count")]
    limit: Option<usize>,
}

fn init_tracing(trace: bool) -> Result<()> {
    let mut filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();
    if trace {
        filter = filter.add_directive("ohhi_dfs=debug".parse()?);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| eyre!("failed to install tracing subscriber: {}", e))?;
    Ok(())
}

fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.trace)?;

    let Some(path) = cli.file.as_ref() else {
        eprintln!("No puzzle file provided");
        eprintln!("{}", Cli::command().render_usage());
        return Ok(ExitCode::FAILURE);
    };
    let problem = read_problem(path)
        .wrap_err_with(|| format!("Could not load puzzle {}", path.display()))?;

    let mut observer = (TracingObserver, StatsObserver::new());
    if cli.count {
        let n = count_solutions(problem, cli.limit, Some(&mut observer));
        println!("Solutions: {}", n);
    } else {
        let solution = solve_with_observer(problem, &mut observer);
        println!("Problem {}", solution.state());
        println!("{}", solution);
        if solution.state() == ProblemState::Infeasible {
            if let Some(reason) = report_violation(&solution) {
                println!("{}", reason);
            }
        }
    }
    if cli.stats {
        println!("{}", observer.1.stats());
    }
    Ok(ExitCode::SUCCESS)
}
