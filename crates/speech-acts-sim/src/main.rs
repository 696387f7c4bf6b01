use std::path::PathBuf;

use clap::Parser;

use speech_acts_core::AppInfo;
use speech_acts_sim::config::{ResolvedOutputs, SimulationConfig};
use speech_acts_sim::logging::init_logging;
use speech_acts_sim::simulation::SimulationRunner;

/// Speaker simulation harness for the Rational Speech Acts engine.
#[derive(Debug, Parser)]
#[command(
    name = "speech-acts-sim",
    author,
    version,
    about = "Score utterances for RSA speakers across action contexts"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "configs/reference.yaml")]
    config: PathBuf,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Override the literal listener's temperature.
    #[arg(long, value_name = "BETA")]
    listener_beta: Option<f64>,

    /// Override the RNG seed used when sampling action contexts.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Exit after validating the configuration (no simulation is run).
    #[arg(long)]
    validate_only: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = SimulationConfig::from_path(&cli.config)?;

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }

    if let Some(beta) = cli.listener_beta {
        config.model.listener_beta = beta;
    }

    if let Some(seed) = cli.seed {
        if !config.contexts.override_seed(seed) {
            eprintln!("WARN: --seed ignored; contexts are not sampled in this configuration");
        }
    }

    config.validate()?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let speaker_count = config.speakers.len();
    let run_id = config.run_id.clone();

    println!(
        "{} {}: loaded configuration '{run_id}' with {speaker_count} speaker{} over {} feature{}",
        AppInfo::name(),
        AppInfo::version(),
        if speaker_count == 1 { "" } else { "s" },
        config.model.features.len(),
        if config.model.features.len() == 1 { "" } else { "s" },
    );

    if cli.validate_only {
        println!("Validation-only mode: simulation skipped.");
        return Ok(());
    }

    let _logging_guard = init_logging(&config.logging, &outputs)?;
    let runner = SimulationRunner::new(config, outputs)?;

    let summary = runner.run()?;
    println!(
        "Simulation complete for '{run_id}': {} contexts × {} utterances → {} rows at {}",
        summary.contexts,
        summary.utterances,
        summary.rows_written,
        summary.jsonl_path.display()
    );
    println!("Summary table: {}", summary.summary_path.display());
    println!("Summary (JSON): {}", summary.summary_json_path.display());
    for path in &summary.plot_paths {
        println!("Heatmap: {}", path.display());
    }
    if let Some(telemetry_path) = summary.telemetry_path.as_ref() {
        println!("Telemetry log: {}", telemetry_path.display());
    }
    println!(
        "Belief cache: {} entries, {} hits, {} misses",
        summary.cache.entries, summary.cache.hits, summary.cache.misses
    );
    for aggregate in &summary.summary.speakers {
        println!(
            "  {}: P(truthful) {:.3}, P(optimal action) {:.3}, expected reward {:+.3}",
            aggregate.speaker,
            aggregate.prob_truthful.mean,
            aggregate.prob_optimal_action.mean,
            aggregate.expected_rewards.mean
        );
    }

    Ok(())
}
