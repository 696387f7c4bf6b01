use serde::Deserialize;
use speech_acts_core::generate::utterances_from_feature_values;
use speech_acts_core::model::FeatureValue;
use speech_acts_core::{RewardVector, SchemaMode, SpeakerKind, Utterance};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

const DEFAULT_SPEAKER_BETA: f64 = 3.0;
const RUN_ID_ALLOWED: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// Column names every simulation row already uses; speaker names must not shadow them.
pub const RESERVED_COLUMNS: [&str; 7] = [
    "utterance",
    "feature",
    "value",
    "truthful",
    "expected_rewards",
    "prob_optimal_action",
    "action_context",
];

/// Root simulation configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SimulationConfig {
    pub run_id: String,
    pub model: ModelConfig,
    pub rewards: RewardVector,
    pub speakers: Vec<SpeakerConfig>,
    pub contexts: ContextsConfig,
    /// Utterances to score; every `(feature, value)` pair when empty.
    #[serde(default)]
    pub utterances: Vec<Utterance>,
    pub outputs: OutputsConfig,
    #[serde(default)]
    pub plots: PlotsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut cfg: SimulationConfig =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(cfg)
    }

    /// Validate the configuration without performing I/O.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        validate_run_id(&self.run_id)?;
        self.model.validate()?;
        let features: HashSet<&str> = self.model.features.iter().map(String::as_str).collect();
        validate_rewards(&self.rewards, &features)?;
        validate_speakers(&self.speakers)?;
        self.contexts.validate(&features)?;
        validate_utterances(&self.utterances, &features, &self.model.values)?;
        self.outputs.validate(&self.run_id)?;
        self.plots.validate(&self.speakers)?;
        self.logging.normalize();
        Ok(())
    }

    /// Resolve output templates (e.g., `{run_id}` placeholders) into concrete paths.
    pub fn resolved_outputs(&self) -> ResolvedOutputs {
        ResolvedOutputs {
            jsonl: resolve_template(&self.run_id, &self.outputs.jsonl),
            summary_md: resolve_template(&self.run_id, &self.outputs.summary_md),
            summary_json: resolve_template(&self.run_id, &self.outputs.summary_json),
            plots_dir: resolve_template(&self.run_id, &self.outputs.plots_dir),
        }
    }

    /// Configured utterances, or every feature/value pair.
    pub fn utterance_list(&self) -> Vec<Utterance> {
        if self.utterances.is_empty() {
            utterances_from_feature_values(&self.model.features, &self.model.values)
        } else {
            self.utterances.clone()
        }
    }
}

/// Feature space and listener settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ModelConfig {
    pub features: Vec<String>,
    pub values: Vec<FeatureValue>,
    pub listener_beta: f64,
    #[serde(default)]
    pub schema_mode: SchemaMode,
}

impl ModelConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.features.is_empty() {
            return Err(invalid("model.features", "at least one feature is required"));
        }
        let mut seen = HashSet::new();
        for feature in &self.features {
            if feature.trim().is_empty() {
                return Err(invalid("model.features", "feature names must not be empty"));
            }
            if !seen.insert(feature.as_str()) {
                return Err(invalid(
                    "model.features",
                    format!("feature '{feature}' listed more than once"),
                ));
            }
        }

        if self.values.is_empty() {
            return Err(invalid("model.values", "at least one value is required"));
        }
        let distinct: HashSet<FeatureValue> = self.values.iter().copied().collect();
        if distinct.len() != self.values.len() {
            return Err(invalid("model.values", "values must be distinct"));
        }

        validate_beta("model.listener_beta", self.listener_beta)
    }
}

/// One speaker participating in the simulation.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SpeakerConfig {
    pub name: String,
    pub kind: SpeakerKind,
    #[serde(default = "default_speaker_beta")]
    pub beta: f64,
}

fn default_speaker_beta() -> f64 {
    DEFAULT_SPEAKER_BETA
}

/// How the action contexts of a run are chosen.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ContextsConfig {
    /// Every `size`-subset of the product of `groups`.
    Combinations {
        groups: Vec<Vec<String>>,
        size: usize,
    },
    /// `count` distinct `size`-subsets drawn with a seeded RNG.
    Sampled {
        groups: Vec<Vec<String>>,
        size: usize,
        count: usize,
        #[serde(default)]
        seed: Option<u64>,
    },
    /// Contexts listed action by action.
    Explicit { contexts: Vec<Vec<Vec<String>>> },
}

impl ContextsConfig {
    fn validate(&self, features: &HashSet<&str>) -> Result<(), ValidationError> {
        match self {
            ContextsConfig::Combinations { groups, size } => {
                validate_groups(groups, *size, features)
            }
            ContextsConfig::Sampled {
                groups,
                size,
                count,
                ..
            } => {
                validate_groups(groups, *size, features)?;
                if *count == 0 {
                    return Err(invalid("contexts.count", "count must be at least 1"));
                }
                Ok(())
            }
            ContextsConfig::Explicit { contexts } => validate_explicit(contexts, features),
        }
    }

    /// Replace the sampling seed; returns `false` when the mode does not sample.
    pub fn override_seed(&mut self, new_seed: u64) -> bool {
        match self {
            ContextsConfig::Sampled { seed, .. } => {
                *seed = Some(new_seed);
                true
            }
            _ => false,
        }
    }
}

fn validate_groups(
    groups: &[Vec<String>],
    size: usize,
    features: &HashSet<&str>,
) -> Result<(), ValidationError> {
    if groups.is_empty() {
        return Err(invalid("contexts.groups", "at least one feature group is required"));
    }
    let mut product = 1usize;
    for group in groups {
        if group.is_empty() {
            return Err(invalid("contexts.groups", "feature groups must not be empty"));
        }
        for feature in group {
            if !features.contains(feature.as_str()) {
                return Err(invalid(
                    "contexts.groups",
                    format!("feature '{feature}' is not listed in model.features"),
                ));
            }
        }
        product = product.saturating_mul(group.len());
    }
    if size == 0 || size > product {
        return Err(invalid(
            "contexts.size",
            format!("size must be between 1 and {product}"),
        ));
    }
    Ok(())
}

fn validate_explicit(
    contexts: &[Vec<Vec<String>>],
    features: &HashSet<&str>,
) -> Result<(), ValidationError> {
    if contexts.is_empty() {
        return Err(invalid("contexts.contexts", "at least one context is required"));
    }
    for (index, context) in contexts.iter().enumerate() {
        let field = format!("contexts.contexts[{index}]");
        if context.is_empty() {
            return Err(invalid(field, "context has no actions"));
        }
        let mut names = HashSet::new();
        for action in context {
            if action.is_empty() {
                return Err(invalid(field, "actions need at least one feature"));
            }
            if let Some(unknown) = action.iter().find(|f| !features.contains(f.as_str())) {
                return Err(invalid(
                    field,
                    format!("feature '{unknown}' is not listed in model.features"),
                ));
            }
            let name = action.join(" ");
            if !names.insert(name.clone()) {
                return Err(invalid(field, format!("action '{name}' listed more than once")));
            }
        }
    }
    Ok(())
}

/// Output artifact configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OutputsConfig {
    pub jsonl: String,
    pub summary_md: String,
    pub summary_json: String,
    pub plots_dir: String,
}

impl OutputsConfig {
    fn validate(&self, run_id: &str) -> Result<(), ValidationError> {
        for (label, value) in [
            ("outputs.jsonl", &self.jsonl),
            ("outputs.summary_md", &self.summary_md),
            ("outputs.summary_json", &self.summary_json),
            ("outputs.plots_dir", &self.plots_dir),
        ] {
            if value.trim().is_empty() {
                return Err(invalid(label, "path must not be empty"));
            }

            let resolved = resolve_template(run_id, value);
            if resolved.components().count() == 0 {
                return Err(invalid(label, "resolved path is invalid"));
            }
        }
        Ok(())
    }
}

/// Heatmap rendering options.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PlotsConfig {
    #[serde(default = "default_plots_enabled")]
    pub enabled: bool,
    /// Speaker pairs rendered as probability-difference heatmaps.
    #[serde(default)]
    pub differences: Vec<SpeakerPair>,
}

impl Default for PlotsConfig {
    fn default() -> Self {
        Self {
            enabled: default_plots_enabled(),
            differences: Vec::new(),
        }
    }
}

impl PlotsConfig {
    fn validate(&self, speakers: &[SpeakerConfig]) -> Result<(), ValidationError> {
        for pair in &self.differences {
            for name in [&pair.left, &pair.right] {
                if !speakers.iter().any(|speaker| &speaker.name == name) {
                    return Err(invalid(
                        "plots.differences",
                        format!("speaker '{name}' is not defined in speakers list"),
                    ));
                }
            }
            if pair.left == pair.right {
                return Err(invalid(
                    "plots.differences",
                    "a difference needs two distinct speakers",
                ));
            }
        }
        Ok(())
    }
}

fn default_plots_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SpeakerPair {
    pub left: String,
    pub right: String,
}

/// Logging configuration defaults to disabled structured logs.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: default_tracing_level(),
        }
    }
}

impl LoggingConfig {
    fn normalize(&mut self) {
        if self.tracing_level.trim().is_empty() {
            self.tracing_level = default_tracing_level();
        }
    }

    pub fn level(&self) -> Option<Level> {
        match self.tracing_level.to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }
}

fn default_tracing_level() -> String {
    "info".to_string()
}

fn validate_run_id(run_id: &str) -> Result<(), ValidationError> {
    if run_id.trim().is_empty() {
        return Err(invalid("run_id", "run_id must not be empty"));
    }

    if !run_id.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
        return Err(invalid(
            "run_id",
            "run_id may only contain alphanumeric characters, '.', '_' or '-'",
        ));
    }

    Ok(())
}

fn validate_beta(field: &str, beta: f64) -> Result<(), ValidationError> {
    if !beta.is_finite() || beta <= 0.0 {
        return Err(invalid(
            field,
            format!("temperature must be finite and greater than zero, got {beta}"),
        ));
    }
    Ok(())
}

fn validate_rewards(rewards: &RewardVector, features: &HashSet<&str>) -> Result<(), ValidationError> {
    if let Some(unknown) = rewards.features().find(|f| !features.contains(f)) {
        return Err(invalid(
            "rewards",
            format!("feature '{unknown}' is not listed in model.features"),
        ));
    }
    let mut sorted: Vec<&str> = features.iter().copied().collect();
    sorted.sort_unstable();
    if let Some(missing) = sorted.into_iter().find(|f| !rewards.contains(f)) {
        return Err(invalid("rewards", format!("missing reward for feature '{missing}'")));
    }
    Ok(())
}

fn validate_speakers(speakers: &[SpeakerConfig]) -> Result<(), ValidationError> {
    if speakers.is_empty() {
        return Err(invalid("speakers", "at least one speaker must be specified"));
    }

    let mut seen = HashSet::new();
    for speaker in speakers {
        if speaker.name.trim().is_empty() {
            return Err(invalid("speakers.name", "speaker name must not be empty"));
        }

        if !speaker.name.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
            return Err(invalid(
                format!("speakers[{}].name", speaker.name),
                "speaker name contains invalid characters",
            ));
        }

        if RESERVED_COLUMNS.contains(&speaker.name.as_str()) || speaker.name.ends_with("_prob") {
            return Err(invalid(
                format!("speakers[{}].name", speaker.name),
                "speaker name collides with a result column",
            ));
        }

        if !seen.insert(speaker.name.as_str()) {
            return Err(invalid(
                "speakers",
                format!("speaker name '{}' defined more than once", speaker.name),
            ));
        }

        validate_beta(&format!("speakers[{}].beta", speaker.name), speaker.beta)?;
    }

    Ok(())
}

fn validate_utterances(
    utterances: &[Utterance],
    features: &HashSet<&str>,
    values: &[FeatureValue],
) -> Result<(), ValidationError> {
    for utterance in utterances {
        if !features.contains(utterance.feature.as_str()) {
            return Err(invalid(
                "utterances",
                format!("feature '{}' is not listed in model.features", utterance.feature),
            ));
        }
        if !values.contains(&utterance.value) {
            return Err(invalid(
                "utterances",
                format!("value {} is not listed in model.values", utterance.value),
            ));
        }
    }
    Ok(())
}

fn resolve_template(run_id: &str, template: &str) -> PathBuf {
    let replaced = template.replace("{run_id}", run_id);
    PathBuf::from(replaced)
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ValidationError {
    ValidationError::InvalidField {
        field: field.into(),
        message: message.into(),
    }
}

/// Fully resolved output paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub jsonl: PathBuf,
    pub summary_md: PathBuf,
    pub summary_json: PathBuf,
    pub plots_dir: PathBuf,
}

/// Errors surfaced when loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid configuration in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => path.as_path(),
        }
    }
}

/// Validation failures captured with contextual metadata.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC_YAML: &str = r#"
run_id: "reference_smoke"
model:
  features: ["blue", "green", "circle", "square"]
  values: [-1, 1]
  listener_beta: 3.0
rewards:
  green: 1
  blue: -1
  circle: 1
  square: -1
speakers:
  - name: "Belief"
    kind: "belief"
  - name: "Action"
    kind: "action"
    beta: 2.5
  - name: "Combined"
    kind: "combined"
contexts:
  mode: "combinations"
  groups: [["blue", "green"], ["circle", "square"]]
  size: 2
outputs:
  jsonl: "out/{run_id}/utterances.jsonl"
  summary_md: "out/{run_id}/summary.md"
  summary_json: "out/{run_id}/summary.json"
  plots_dir: "out/{run_id}/plots"
plots:
  differences:
    - left: "Combined"
      right: "Belief"
logging:
  enable_structured: true
  tracing_level: "debug"
"#;

    fn parse(yaml: &str) -> SimulationConfig {
        serde_yaml::from_str(yaml).expect("parse yaml")
    }

    fn field_of(err: ValidationError) -> String {
        match err {
            ValidationError::InvalidField { field, .. } => field,
        }
    }

    #[test]
    fn loads_and_validates_basic_config() {
        let mut cfg = parse(BASIC_YAML);
        cfg.validate().expect("validate");

        assert_eq!(cfg.speakers[0].beta, DEFAULT_SPEAKER_BETA);
        assert_eq!(cfg.speakers[1].beta, 2.5);
        assert_eq!(cfg.model.schema_mode, SchemaMode::Strict);
        assert!(cfg.logging.enable_structured);
        assert!(cfg.plots.enabled);
        assert_eq!(cfg.logging.level(), Some(Level::DEBUG));

        let outputs = cfg.resolved_outputs();
        assert_eq!(
            outputs.jsonl,
            PathBuf::from("out/reference_smoke/utterances.jsonl")
        );
    }

    #[test]
    fn default_utterances_cover_every_pair() {
        let cfg = parse(BASIC_YAML);
        let utterances = cfg.utterance_list();
        assert_eq!(utterances.len(), 8);
        assert_eq!(utterances[0], Utterance::new("blue", -1));
    }

    #[test]
    fn explicit_utterances_and_lenient_mode_parse() {
        let yaml = BASIC_YAML.replace(
            "  listener_beta: 3.0\n",
            "  listener_beta: 3.0\n  schema_mode: \"lenient\"\n",
        ) + "utterances:\n  - feature: \"green\"\n    value: 1\n";
        let mut cfg = parse(&yaml);
        cfg.validate().expect("valid");
        assert_eq!(cfg.model.schema_mode, SchemaMode::Lenient);
        assert_eq!(cfg.utterance_list(), vec![Utterance::new("green", 1)]);
    }

    #[test]
    fn rejects_duplicate_speakers() {
        let yaml = BASIC_YAML.replace("name: \"Action\"", "name: \"Belief\"");
        let err = parse(&yaml).validate().expect_err("duplicate speakers should fail");
        assert_eq!(field_of(err), "speakers");
    }

    #[test]
    fn rejects_reserved_speaker_names() {
        let yaml = BASIC_YAML.replace("name: \"Action\"", "name: \"truthful\"");
        let err = parse(&yaml).validate().expect_err("reserved name");
        assert_eq!(field_of(err), "speakers[truthful].name");
    }

    #[test]
    fn rejects_invalid_run_id() {
        let yaml = BASIC_YAML.replace("reference_smoke", "reference smoke");
        let err = parse(&yaml).validate().expect_err("invalid run id");
        assert_eq!(field_of(err), "run_id");
    }

    #[test]
    fn rejects_non_positive_temperatures() {
        let yaml = BASIC_YAML.replace("listener_beta: 3.0", "listener_beta: 0.0");
        let err = parse(&yaml).validate().expect_err("zero beta");
        assert_eq!(field_of(err), "model.listener_beta");

        let yaml = BASIC_YAML.replace("beta: 2.5", "beta: -1.0");
        let err = parse(&yaml).validate().expect_err("negative beta");
        assert_eq!(field_of(err), "speakers[Action].beta");
    }

    #[test]
    fn rejects_unknown_features() {
        let yaml = BASIC_YAML.replace("[\"circle\", \"square\"]]", "[\"circle\", \"star\"]]");
        let err = parse(&yaml).validate().expect_err("unknown context feature");
        assert_eq!(field_of(err), "contexts.groups");

        let yaml = BASIC_YAML.replace("  square: -1\n", "  square: -1\n  star: 2\n");
        let err = parse(&yaml).validate().expect_err("unknown reward feature");
        assert_eq!(field_of(err), "rewards");

        let yaml = BASIC_YAML.replace("  square: -1\n", "");
        let err = parse(&yaml).validate().expect_err("missing reward");
        assert_eq!(field_of(err), "rewards");
    }

    #[test]
    fn rejects_oversized_contexts() {
        let yaml = BASIC_YAML.replace("size: 2", "size: 5");
        let err = parse(&yaml).validate().expect_err("only four actions exist");
        assert_eq!(field_of(err), "contexts.size");
    }

    #[test]
    fn explicit_contexts_reject_duplicate_actions() {
        let yaml = BASIC_YAML.replace(
            "  mode: \"combinations\"\n  groups: [[\"blue\", \"green\"], [\"circle\", \"square\"]]\n  size: 2\n",
            "  mode: \"explicit\"\n  contexts:\n    - [[\"green\", \"circle\"], [\"green\", \"circle\"]]\n",
        );
        let err = parse(&yaml).validate().expect_err("duplicate action");
        assert_eq!(field_of(err), "contexts.contexts[0]");
    }

    #[test]
    fn seed_override_only_applies_to_sampling() {
        let mut cfg = parse(BASIC_YAML);
        assert!(!cfg.contexts.override_seed(7));

        let yaml = BASIC_YAML.replace("size: 2", "size: 2\n  count: 3");
        let yaml = yaml.replace("mode: \"combinations\"", "mode: \"sampled\"");
        let mut cfg = parse(&yaml);
        cfg.validate().expect("valid");
        assert!(cfg.contexts.override_seed(7));
        assert!(matches!(cfg.contexts, ContextsConfig::Sampled { seed: Some(7), .. }));
    }

    #[test]
    fn difference_plots_need_known_speakers() {
        let yaml = BASIC_YAML.replace("right: \"Belief\"", "right: \"Literal\"");
        let err = parse(&yaml).validate().expect_err("unknown speaker");
        assert_eq!(field_of(err), "plots.differences");
    }
}
