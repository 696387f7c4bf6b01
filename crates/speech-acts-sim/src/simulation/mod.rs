mod contexts;
mod rows;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use speech_acts_core::generate::worlds_from_feature_values;
use speech_acts_core::listener::CacheStats;
use speech_acts_core::{LiteralListener, ModelError, Speaker, Utterance};
use thiserror::Error;
use tracing::{Level, event};

use crate::analytics::{AnalyticsError, SimulationSummary, summarize};
use crate::config::{ResolvedOutputs, SimulationConfig, SpeakerPair};
use crate::plot::{HeatmapStyle, collapse, render_heatmap};

pub use contexts::ContextPlan;
pub use rows::{
    PROBABILITY_SUFFIX, SimulationError, UtteranceRow, multiple_contexts, probability_column,
    single_context,
};

/// Primary entry point for running a configured simulation.
pub struct SimulationRunner {
    config: SimulationConfig,
    outputs: ResolvedOutputs,
    listener: LiteralListener,
    contexts: ContextPlan,
    utterances: Vec<Utterance>,
}

/// Summary details returned after a run.
pub struct RunSummary {
    pub contexts: usize,
    pub utterances: usize,
    pub rows_written: usize,
    pub jsonl_path: PathBuf,
    pub summary_path: PathBuf,
    pub summary_json_path: PathBuf,
    pub plot_paths: Vec<PathBuf>,
    pub telemetry_path: Option<PathBuf>,
    pub cache: CacheStats,
    pub summary: SimulationSummary,
}

impl SimulationRunner {
    /// Build a runner from a validated configuration.
    pub fn new(config: SimulationConfig, outputs: ResolvedOutputs) -> Result<Self, RunnerError> {
        let worlds = worlds_from_feature_values(&config.model.features, &config.model.values)?;
        let listener =
            LiteralListener::new(config.model.listener_beta, &config.model.features, worlds)?
                .with_schema_mode(config.model.schema_mode);
        let contexts = ContextPlan::from_config(&config.contexts)?;
        if contexts.is_empty() {
            return Err(RunnerError::NoContexts);
        }
        let utterances = config.utterance_list();

        Ok(Self {
            config,
            outputs,
            listener,
            contexts,
            utterances,
        })
    }

    pub fn contexts(&self) -> &ContextPlan {
        &self.contexts
    }

    pub fn utterances(&self) -> &[Utterance] {
        &self.utterances
    }

    /// Score every utterance in every context and write the run's artifacts.
    pub fn run(&self) -> Result<RunSummary, RunnerError> {
        ensure_parent(self.outputs.jsonl.parent())?;
        ensure_parent(self.outputs.summary_md.parent())?;
        ensure_parent(self.outputs.summary_json.parent())?;

        let speakers = self
            .config
            .speakers
            .iter()
            .map(|speaker| {
                Speaker::new(
                    speaker.kind,
                    &self.listener,
                    speaker.beta,
                    &self.config.rewards,
                    speaker.name.clone(),
                )
            })
            .collect::<Result<Vec<_>, ModelError>>()?;

        let rows = multiple_contexts(
            self.contexts.as_slice(),
            &speakers,
            &self.utterances,
            &self.config.rewards,
        )?;

        let mut writer = BufWriter::new(File::create(&self.outputs.jsonl)?);
        for row in &rows {
            serde_json::to_writer(&mut writer, row)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;

        let names: Vec<String> = speakers.iter().map(|s| s.name().to_string()).collect();
        let summary = summarize(&self.config.run_id, &rows, &names)?;
        summary.write_markdown(&self.outputs.summary_md)?;
        summary.write_json(&self.outputs.summary_json)?;

        let plot_paths = if self.config.plots.enabled {
            self.render_plots(&rows, &names)
        } else {
            Vec::new()
        };

        let telemetry_path = if self.config.logging.enable_structured {
            Some(
                self.outputs
                    .summary_md
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("telemetry.jsonl"),
            )
        } else {
            None
        };

        let cache = self.listener.cache_stats();
        if tracing::enabled!(target: "speech_acts_sim::run", Level::INFO) {
            event!(
                target: "speech_acts_sim::run",
                Level::INFO,
                run_id = %self.config.run_id,
                contexts = self.contexts.len(),
                utterances = self.utterances.len(),
                rows = rows.len(),
                cache_entries = cache.entries,
                cache_hits = cache.hits,
                cache_misses = cache.misses,
            );
        }

        Ok(RunSummary {
            contexts: self.contexts.len(),
            utterances: self.utterances.len(),
            rows_written: rows.len(),
            jsonl_path: self.outputs.jsonl.clone(),
            summary_path: self.outputs.summary_md.clone(),
            summary_json_path: self.outputs.summary_json.clone(),
            plot_paths,
            telemetry_path,
            cache,
            summary,
        })
    }

    /// Failed heatmaps are logged and skipped.
    fn render_plots(&self, rows: &[UtteranceRow], speakers: &[String]) -> Vec<PathBuf> {
        let dir = &self.outputs.plots_dir;
        let w = &self.config.rewards;
        let mut paths = Vec::new();

        for speaker in speakers {
            let cells = collapse(rows, |row| row.probability(speaker));
            let title = format!("Utterance Probabilities for {speaker} Speaker");
            let path = dir.join(format!("{speaker}_heatmap.png"));
            record_plot(
                render_heatmap(&cells, w, HeatmapStyle::Probability, &title, path),
                &mut paths,
            );
        }

        for SpeakerPair { left, right } in &self.config.plots.differences {
            let cells = collapse(rows, |row| {
                Some(row.probability(left)? - row.probability(right)?)
            });
            let title = format!("Difference in Probabilities: {left} (gold) vs {right} (purple)");
            let path = dir.join(format!("{left}_minus_{right}_heatmap.png"));
            record_plot(
                render_heatmap(&cells, w, HeatmapStyle::Difference, &title, path),
                &mut paths,
            );
        }

        paths
    }
}

fn record_plot(result: Result<PathBuf, AnalyticsError>, paths: &mut Vec<PathBuf>) {
    match result {
        Ok(path) => paths.push(path),
        Err(err) => {
            eprintln!("WARN: {}", err);
            event!(target: "speech_acts_sim::run", Level::WARN, error = %err, "heatmap skipped");
        }
    }
}

fn ensure_parent(path: Option<&Path>) -> Result<(), RunnerError> {
    if let Some(dir) = path.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("model error: {0}")]
    Model(#[from] ModelError),
    #[error("simulation failed: {0}")]
    Simulation(#[from] SimulationError),
    #[error("context selection produced no action contexts")]
    NoContexts,
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("failed to serialize row: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
    #[error("analytics error: {0}")]
    Analytics(#[from] AnalyticsError),
}
