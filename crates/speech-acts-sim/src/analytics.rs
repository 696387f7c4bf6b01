use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Serialize;
use statrs::statistics::Statistics;
use thiserror::Error;

use crate::simulation::UtteranceRow;

/// Group label for rows produced without an action context label.
pub const UNLABELLED_CONTEXT: &str = "All";

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("speaker '{0}' has no probability column in the simulation rows")]
    MissingSpeaker(String),
    #[error("no rows to summarize")]
    Empty,
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize summary: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to render plot: {0}")]
    Plot(String),
}

/// How one speaker's utterance distribution performs in one context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeakerMetrics {
    pub speaker: String,
    /// Probability mass on utterances that are true of the world.
    pub prob_truthful: f64,
    /// Chance the listener ends up choosing an optimal action.
    pub prob_optimal_action: f64,
    pub expected_rewards: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextSummary {
    pub action_context: String,
    pub speakers: Vec<SpeakerMetrics>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricStats {
    pub mean: f64,
    pub std_dev: f64,
}

impl MetricStats {
    fn from_values(values: &[f64]) -> Self {
        let mean = values.iter().mean();
        // sample deviation is undefined for one context
        let std_dev = if values.len() < 2 {
            0.0
        } else {
            values.iter().std_dev()
        };
        Self { mean, std_dev }
    }
}

/// A speaker's metrics across every context of the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeakerAggregate {
    pub speaker: String,
    pub contexts: usize,
    pub prob_truthful: MetricStats,
    pub prob_optimal_action: MetricStats,
    pub expected_rewards: MetricStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationSummary {
    pub run_id: String,
    pub contexts: Vec<ContextSummary>,
    pub speakers: Vec<SpeakerAggregate>,
}

/// Weigh each row by the speaker's utterance probability, per action context.
///
/// Contexts are reported in label order.
pub fn summarize(
    run_id: &str,
    rows: &[UtteranceRow],
    speakers: &[String],
) -> Result<SimulationSummary, AnalyticsError> {
    if rows.is_empty() {
        return Err(AnalyticsError::Empty);
    }

    let mut groups: BTreeMap<&str, Vec<&UtteranceRow>> = BTreeMap::new();
    for row in rows {
        let label = row.action_context.as_deref().unwrap_or(UNLABELLED_CONTEXT);
        groups.entry(label).or_default().push(row);
    }

    let mut contexts = Vec::with_capacity(groups.len());
    for (label, members) in &groups {
        let mut metrics = Vec::with_capacity(speakers.len());
        for speaker in speakers {
            metrics.push(speaker_metrics(speaker, members)?);
        }
        contexts.push(ContextSummary {
            action_context: label.to_string(),
            speakers: metrics,
        });
    }

    let aggregates = speakers
        .iter()
        .enumerate()
        .map(|(index, speaker)| {
            let column = |select: fn(&SpeakerMetrics) -> f64| -> Vec<f64> {
                contexts
                    .iter()
                    .map(|context| select(&context.speakers[index]))
                    .collect()
            };
            SpeakerAggregate {
                speaker: speaker.clone(),
                contexts: contexts.len(),
                prob_truthful: MetricStats::from_values(&column(|m| m.prob_truthful)),
                prob_optimal_action: MetricStats::from_values(&column(|m| m.prob_optimal_action)),
                expected_rewards: MetricStats::from_values(&column(|m| m.expected_rewards)),
            }
        })
        .collect();

    Ok(SimulationSummary {
        run_id: run_id.to_string(),
        contexts,
        speakers: aggregates,
    })
}

fn speaker_metrics(speaker: &str, rows: &[&UtteranceRow]) -> Result<SpeakerMetrics, AnalyticsError> {
    let mut metrics = SpeakerMetrics {
        speaker: speaker.to_string(),
        prob_truthful: 0.0,
        prob_optimal_action: 0.0,
        expected_rewards: 0.0,
    };
    for row in rows {
        let p = row
            .probability(speaker)
            .ok_or_else(|| AnalyticsError::MissingSpeaker(speaker.to_string()))?;
        if row.truthful {
            metrics.prob_truthful += p;
        }
        metrics.prob_optimal_action += p * row.prob_optimal_action;
        metrics.expected_rewards += p * row.expected_rewards;
    }
    Ok(metrics)
}

impl SimulationSummary {
    pub fn write_markdown(&self, path: impl AsRef<Path>) -> Result<(), AnalyticsError> {
        let mut out = String::new();
        out.push_str(&format!("# Speaker Summary: {}\n\n", self.run_id));
        out.push_str(&format!(
            "{} action context{}\n\n",
            self.contexts.len(),
            if self.contexts.len() == 1 { "" } else { "s" }
        ));

        out.push_str("## Across contexts\n\n");
        out.push_str("| Speaker | P(truthful) | P(optimal action) | Expected reward |\n");
        out.push_str("|---------|-------------|-------------------|-----------------|\n");
        for aggregate in &self.speakers {
            out.push_str(&format!(
                "| {name} | {pt:.3} ± {pt_sd:.3} | {po:.3} ± {po_sd:.3} | {er:+.3} ± {er_sd:.3} |\n",
                name = aggregate.speaker,
                pt = aggregate.prob_truthful.mean,
                pt_sd = aggregate.prob_truthful.std_dev,
                po = aggregate.prob_optimal_action.mean,
                po_sd = aggregate.prob_optimal_action.std_dev,
                er = aggregate.expected_rewards.mean,
                er_sd = aggregate.expected_rewards.std_dev,
            ));
        }

        out.push_str("\n## Per context\n\n");
        out.push_str("| Action context | Speaker | P(truthful) | P(optimal action) | Expected reward |\n");
        out.push_str("|----------------|---------|-------------|-------------------|-----------------|\n");
        for context in &self.contexts {
            for metrics in &context.speakers {
                out.push_str(&format!(
                    "| {ctx} | {name} | {pt:.3} | {po:.3} | {er:+.3} |\n",
                    ctx = context.action_context,
                    name = metrics.speaker,
                    pt = metrics.prob_truthful,
                    po = metrics.prob_optimal_action,
                    er = metrics.expected_rewards,
                ));
            }
        }

        fs::write(path.as_ref(), out).map_err(|e| AnalyticsError::Io {
            context: "writing summary markdown",
            source: e,
        })?;
        Ok(())
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), AnalyticsError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json).map_err(|e| AnalyticsError::Io {
            context: "writing summary json",
            source: e,
        })?;
        Ok(())
    }

    pub fn aggregate(&self, speaker: &str) -> Option<&SpeakerAggregate> {
        self.speakers.iter().find(|aggregate| aggregate.speaker == speaker)
    }
}
