mod logging;
mod memory;

use std::fs::{File, create_dir_all};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use partita_core::Model;
use partita_decomp::{
    BlockPartition, ColumnGeneration, ColumnGenerationConfig, ColumnGenerationReport,
    ConstructiveConfig, HeuristicConfig, HeuristicReport, JdecInstance, LocalSearchConfig,
    PartitionConfig, PricingConfig, solve_heuristic,
};
use partita_highs::{HighsEngine, highs_version};
use partita_solver::SolverConfig;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

use crate::memory::{StageProbe, StageRecord};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Column generation and decomposition heuristics for block-structured MIPs"
)]
struct Cli {
    /// Event filter (for example `info` or `partita_decomp=debug`); falls
    /// back to PARTITA_TRACE, then `info`
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Solve the Dantzig-Wolfe relaxation of a model by column generation
    Colgen(ColgenArgs),
    /// Run the constructive heuristic and local search on a .jdec descriptor
    Heuristic(HeuristicArgs),
    /// Rewrite a .cpart or .vpart partition as .dec
    Convert(ConvertArgs),
}

#[derive(Parser, Debug)]
struct ColgenArgs {
    /// JSON model file
    #[arg(long)]
    model: PathBuf,

    /// Block partition (.dec, .cpart or .vpart)
    #[arg(long)]
    partition: PathBuf,

    /// Keep continuous variables out of the blocks
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    continuous_in_master: bool,

    /// Pricing and phase tolerance
    #[arg(long, default_value_t = partita_decomp::EPS)]
    eps: f64,

    /// Re-solve the master after the first block that yields columns
    #[arg(long)]
    run_once: bool,

    /// Request up to this many solutions from every pricing solve
    #[arg(long)]
    populate: Option<usize>,

    /// Stop each pricing MIP after this many improving solutions
    #[arg(long)]
    pricing_solution_limit: Option<usize>,

    /// Time limit in seconds per pricing solve
    #[arg(long)]
    pricing_time_limit: Option<f64>,

    /// Time limit in seconds per master solve
    #[arg(long)]
    master_time_limit: Option<f64>,

    /// Directory for LP dumps of an infeasible master
    #[arg(long)]
    diagnostics: Option<PathBuf>,

    /// Write the JSON run report here
    #[arg(long)]
    report: Option<PathBuf>,

    /// Output format for stdout
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,
}

#[derive(Parser, Debug)]
struct HeuristicArgs {
    /// Decomposition descriptor
    #[arg(long)]
    jdec: PathBuf,

    /// Seed for every shuffle
    #[arg(long, default_value_t = 2)]
    seed: u64,

    /// Blocks per constructive subproblem
    #[arg(long, default_value_t = 3)]
    eta: usize,

    /// Maximum seed advance between constructive subproblems
    #[arg(long, default_value_t = 3)]
    step: usize,

    /// Candidate solutions kept per constructive subproblem
    #[arg(long, default_value_t = 3)]
    solution_limit: usize,

    /// Initial blocks per local search subproblem
    #[arg(long, default_value_t = 4)]
    ls_eta: usize,

    /// Initial local search seed advance
    #[arg(long, default_value_t = 2)]
    ls_step: usize,

    /// Keep going through the round after an improvement instead of restarting it
    #[arg(long)]
    no_reoptimize: bool,

    /// Overall time limit in seconds
    #[arg(long, default_value_t = 900)]
    time_limit: u64,

    /// Directory for LP dumps of infeasible completions
    #[arg(long)]
    diagnostics: Option<PathBuf>,

    /// Write the final solution here
    #[arg(long)]
    solution: Option<PathBuf>,

    /// Write the JSON run report here
    #[arg(long)]
    report: Option<PathBuf>,

    /// Output format for stdout
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,
}

#[derive(Parser, Debug)]
struct ConvertArgs {
    /// JSON model file
    #[arg(long)]
    model: PathBuf,

    /// Partition to read (.dec, .cpart or .vpart)
    #[arg(long)]
    input: PathBuf,

    /// Destination .dec file
    #[arg(long)]
    output: PathBuf,

    /// Keep continuous variables out of the blocks
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    continuous_in_master: bool,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Serialize)]
struct RunReport<'a, T: Serialize> {
    command: &'static str,
    input: String,
    solver: &'static str,
    solver_version: Option<String>,
    result: &'a T,
    stages: &'a [StageRecord],
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(cli.log_level.as_deref())?;
    match cli.command {
        Command::Colgen(args) => colgen_command(args),
        Command::Heuristic(args) => heuristic_command(args),
        Command::Convert(args) => convert_command(args),
    }
}

fn colgen_command(args: ColgenArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.eps <= 0.0 {
        return Err(boxed_input_error("eps must be greater than zero"));
    }
    let mut probe = StageProbe::start();
    let model = Model::read_json(&args.model)?;
    let partition = BlockPartition::read(
        &model,
        &args.partition,
        PartitionConfig::new().with_continuous_in_master(args.continuous_in_master),
    )?;
    probe.finish("load");

    let mut pricing = PricingConfig::new();
    if let Some(limit) = args.populate {
        pricing = pricing.with_populate(limit);
    }
    if let Some(count) = args.pricing_solution_limit {
        pricing = pricing.with_solution_limit(count);
    }
    if let Some(seconds) = args.pricing_time_limit {
        pricing = pricing.with_time_limit(seconds);
    }
    let mut master = SolverConfig::new();
    if let Some(seconds) = args.master_time_limit {
        master = master.with_time_limit(seconds);
    }
    let mut config = ColumnGenerationConfig::new()
        .with_eps(args.eps)
        .with_run_once(args.run_once)
        .with_pricing(pricing)
        .with_master(master);
    if let Some(dir) = &args.diagnostics {
        create_dir_all(dir)?;
        config = config.with_diagnostics(dir.clone());
    }

    let mut colgen: ColumnGeneration<'_, HighsEngine> =
        ColumnGeneration::new(&model, &partition, config)?;
    probe.finish("build");
    let result = colgen.solve()?;
    probe.finish("solve");

    let report = RunReport {
        command: "colgen",
        input: args.model.display().to_string(),
        solver: "HiGHS",
        solver_version: highs_version(),
        result: &result,
        stages: probe.records(),
    };
    if let Some(path) = &args.report {
        write_json(path, &report)?;
    }
    match args.format {
        OutputFormat::Table => print_colgen_table(&result, probe.records()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

fn heuristic_command(args: HeuristicArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut probe = StageProbe::start();
    let mut instance = JdecInstance::load(&args.jdec, &mut rng)?;
    probe.finish("load");

    let mut config = HeuristicConfig::new()
        .with_seed(args.seed)
        .with_constructive(
            ConstructiveConfig::new()
                .with_eta(args.eta)
                .with_step(args.step)
                .with_solution_limit(args.solution_limit),
        )
        .with_local_search(
            LocalSearchConfig::new()
                .with_eta(args.ls_eta)
                .with_step(args.ls_step)
                .with_reoptimize(!args.no_reoptimize)
                .with_time_limit(Duration::from_secs(args.time_limit)),
        );
    if let Some(dir) = &args.diagnostics {
        create_dir_all(dir)?;
        config = config.with_diagnostics(dir.clone());
    }

    let initial = instance.initial_solution.take();
    let outcome = solve_heuristic::<HighsEngine, _>(
        instance.model.clone(),
        &mut instance.decompositions,
        initial,
        &config,
        &mut rng,
    )?;
    probe.finish("solve");

    match (&outcome.solution, &args.solution) {
        (Some(solution), Some(path)) => solution.write(&instance.model, path)?,
        (None, _) => tracing::warn!(
            component = "cli",
            operation = "heuristic",
            status = "warn",
            "No solution found"
        ),
        _ => {}
    }

    let report = RunReport {
        command: "heuristic",
        input: args.jdec.display().to_string(),
        solver: "HiGHS",
        solver_version: highs_version(),
        result: &outcome.report,
        stages: probe.records(),
    };
    if let Some(path) = &args.report {
        write_json(path, &report)?;
    }
    match args.format {
        OutputFormat::Table => print_heuristic_table(&outcome.report, probe.records()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

fn convert_command(args: ConvertArgs) -> Result<(), Box<dyn std::error::Error>> {
    let model = Model::read_json(&args.model)?;
    let partition = BlockPartition::read(
        &model,
        &args.input,
        PartitionConfig::new().with_continuous_in_master(args.continuous_in_master),
    )?;
    partition.write_dec(&model, &args.output)?;
    println!(
        "{}: {} blocks, {} linking variables -> {}",
        args.input.display(),
        partition.num_blocks(),
        partition.num_linking(),
        args.output.display()
    );
    Ok(())
}

fn print_colgen_table(report: &ColumnGenerationReport, stages: &[StageRecord]) {
    println!(
        "{:>6} {:<6} {:>16} {:>14} {:>8} {:>7} {:>10} {:>10}",
        "iter", "phase", "objective", "pricing", "columns", "blocks", "master_vars", "elapsed_s"
    );
    for record in &report.iterations {
        println!(
            "{:>6} {:<6} {:>16.6} {:>14} {:>8} {:>7} {:>10} {:>10.3}",
            record.iteration,
            record.phase.as_str(),
            record.objective,
            format_option_f64(record.pricing),
            record.columns,
            record.blocks,
            record.master_variables,
            record.elapsed_seconds,
        );
    }
    println!(
        "phase: {}  objective: {:.6}  columns: {}",
        report.phase.as_str(),
        report.objective,
        report.columns
    );
    print_stage_table(stages);
}

fn print_heuristic_table(report: &HeuristicReport, stages: &[StageRecord]) {
    println!("{:<24} {:>16}", "metric", "value");
    println!(
        "{:<24} {:>16}",
        "constructed_objective",
        format_option_f64(report.constructed_objective)
    );
    println!("{:<24} {:>16}", "objective", format_option_f64(report.objective));
    println!("{:<24} {:>16.3}", "constructive_s", report.constructive_seconds);
    if let Some(stats) = &report.local_search {
        println!("{:<24} {:>16}", "rounds", stats.rounds);
        println!("{:<24} {:>16}", "subproblems", stats.subproblems_solved);
        println!("{:<24} {:>16}", "improvements", stats.improvements);
        println!("{:<24} {:>16}", "timed_out", stats.timed_out);
        println!("{:<24} {:>16.3}", "local_search_s", stats.elapsed_seconds);
    }
    println!("{:<24} {:>16.3}", "total_s", report.total_seconds);
    print_stage_table(stages);
}

fn print_stage_table(stages: &[StageRecord]) {
    println!("{:<12} {:>12} {:>14}", "stage", "ms", "rss_delta_mb");
    for stage in stages {
        println!(
            "{:<12} {:>12.3} {:>14}",
            stage.stage,
            stage.duration_ms,
            format_option_mb(stage.rss_delta_bytes)
        );
    }
}

fn format_option_f64(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |value| format!("{value:.6}"))
}

fn format_option_mb(value: Option<i64>) -> String {
    value.map_or_else(
        || "-".to_string(),
        |bytes| format!("{:.3}", bytes as f64 / (1024.0 * 1024.0)),
    )
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent)?;
        }
    }
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

fn boxed_input_error(message: &str) -> Box<dyn std::error::Error> {
    Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidInput,
        message.to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn heuristic_defaults_match_library_defaults() {
        let cli = Cli::parse_from(["partita", "heuristic", "--jdec", "case.jdec"]);
        let Command::Heuristic(args) = cli.command else {
            panic!("expected heuristic");
        };
        let constructive = ConstructiveConfig::default();
        let local_search = LocalSearchConfig::default();
        assert_eq!(args.seed, HeuristicConfig::default().seed);
        assert_eq!((args.eta, args.step), (constructive.eta, constructive.step));
        assert_eq!(args.solution_limit, constructive.solution_limit);
        assert_eq!((args.ls_eta, args.ls_step), (local_search.eta, local_search.step));
        assert_eq!(Duration::from_secs(args.time_limit), local_search.time_limit);
        assert!(!args.no_reoptimize);
    }

    #[test]
    fn continuous_in_master_can_be_disabled() {
        let cli = Cli::parse_from([
            "partita",
            "colgen",
            "--model",
            "m.json",
            "--partition",
            "m.dec",
            "--continuous-in-master",
            "false",
            "--populate",
            "5",
        ]);
        let Command::Colgen(args) = cli.command else {
            panic!("expected colgen");
        };
        assert!(!args.continuous_in_master);
        assert_eq!(args.populate, Some(5));
        assert_eq!(args.format, OutputFormat::Table);
    }

    #[test]
    fn option_formatting() {
        assert_eq!(format_option_f64(None), "-");
        assert_eq!(format_option_f64(Some(1.5)), "1.500000");
        assert_eq!(format_option_mb(Some(1024 * 1024)), "1.000");
    }
}
