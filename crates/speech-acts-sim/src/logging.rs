use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::Level;
use tracing_appender::non_blocking::{self, WorkerGuard};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LoggingConfig, ResolvedOutputs};

pub struct LoggingGuard {
    _guard: WorkerGuard,
    pub telemetry_path: PathBuf,
}

/// Install the JSON telemetry subscriber next to the summary artifacts.
pub fn init_logging(
    logging: &LoggingConfig,
    outputs: &ResolvedOutputs,
) -> Result<Option<LoggingGuard>> {
    if !logging.enable_structured {
        return Ok(None);
    }

    let telemetry_dir = outputs
        .summary_md
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&telemetry_dir).with_context(|| {
        format!(
            "creating telemetry directory at {}",
            telemetry_dir.display()
        )
    })?;

    let telemetry_path = telemetry_dir.join("telemetry.jsonl");
    let file = File::create(&telemetry_path)
        .with_context(|| format!("creating telemetry file at {}", telemetry_path.display()))?;

    let (writer, guard) = non_blocking::NonBlockingBuilder::default()
        .lossy(false)
        .finish(file);

    let level = logging.level().unwrap_or(Level::INFO);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .json()
        .with_current_span(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(writer)
        .finish();

    // a subscriber may already be installed when several runs share a process
    let _ = tracing::subscriber::set_global_default(subscriber);

    Ok(Some(LoggingGuard {
        _guard: guard,
        telemetry_path,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn outputs(dir: &Path) -> ResolvedOutputs {
        ResolvedOutputs {
            jsonl: dir.join("utterances.jsonl"),
            summary_md: dir.join("reports").join("summary.md"),
            summary_json: dir.join("reports").join("summary.json"),
            plots_dir: dir.join("plots"),
        }
    }

    #[test]
    fn disabled_logging_installs_nothing() {
        let dir = tempdir().expect("temp dir");
        let guard = init_logging(&LoggingConfig::default(), &outputs(dir.path()))
            .expect("init succeeds");
        assert!(guard.is_none());
        assert!(!dir.path().join("reports").exists());
    }

    #[test]
    fn structured_logging_creates_telemetry_file() {
        let dir = tempdir().expect("temp dir");
        let config = LoggingConfig {
            enable_structured: true,
            tracing_level: "debug".into(),
        };
        let guard = init_logging(&config, &outputs(dir.path()))
            .expect("init succeeds")
            .expect("guard returned");
        assert_eq!(
            guard.telemetry_path,
            dir.path().join("reports").join("telemetry.jsonl")
        );
        assert!(guard.telemetry_path.exists());
    }
}
