use std::path::PathBuf;

use clap::Parser;

use inquest_bench::config::{EvalConfig, ResolvedOutputs};
use inquest_bench::arena::EvalRunner;
use inquest_bench::logging::init_logging;

/// Simulated-game evaluation harness for the guessing engine.
#[derive(Debug, Parser)]
#[command(
    name = "inquest-bench",
    author,
    version,
    about = "Deterministic guessing-engine evaluation harness"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "configs/eval.yaml")]
    config: PathBuf,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Override the number of games each agent plays.
    #[arg(long, value_name = "GAMES")]
    games: Option<usize>,

    /// Override the RNG seed for game generation.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Exit after validating the configuration (no games are played).
    #[arg(long)]
    validate_only: bool,

    /// Enable structured telemetry regardless of config.
    #[arg(long)]
    structured_logs: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = EvalConfig::from_path(&cli.config)?;

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }

    if let Some(games) = cli.games {
        config.games.count = games;
    }

    if let Some(seed) = cli.seed {
        config.games.seed = Some(seed);
    }

    if cli.structured_logs {
        config.logging.enable_structured = true;
    }

    config.validate()?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let agent_count = config.agents.len();
    let run_id = config.run_id.clone();
    let games = config.games.count;

    println!(
        "Loaded configuration '{run_id}' with {agent_count} agent{} ({games} games each)",
        if agent_count == 1 { "" } else { "s" }
    );

    if cli.validate_only {
        println!("Validation-only mode: evaluation skipped.");
        return Ok(());
    }

    let _logging_guard = init_logging(&config.logging, &outputs)?;
    let runner = EvalRunner::new(config, outputs)?;

    let summary = runner.run()?;
    println!(
        "Evaluation complete for '{run_id}': {} games × {} agents → {} rows at {}",
        summary.games_played,
        summary.agents,
        summary.rows_written,
        summary.jsonl_path.display()
    );
    println!("Summary table: {}", summary.summary_path.display());
    if let Some(plot_path) = summary.plot_path.as_ref() {
        println!("Questions histogram: {}", plot_path.display());
    }
    for kb_path in &summary.kb_paths {
        println!("Learned catalog: {}", kb_path.display());
    }

    Ok(())
}
