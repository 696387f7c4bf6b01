//! Feature × value heatmaps of speaker utterance probabilities.
//!
//! Columns are features ordered by descending true reward and rows are values
//! in ascending order, bottom to top. Cells true of the world carry a cross and
//! a colour bar on the right maps the data range to the palette.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use plotters::prelude::*;
use speech_acts_core::RewardVector;
use speech_acts_core::model::FeatureValue;
use statrs::statistics::Statistics;
use tracing::{Level, event};

use crate::analytics::AnalyticsError;
use crate::simulation::UtteranceRow;

const CELL_SIZE: u32 = 60;
const MARGIN: u32 = 10;
const LABEL_AREA: u32 = 50;
const CAPTION_AREA: u32 = 30;
const COLOUR_BAR_AREA: u32 = 90;
const COLOUR_BAR_STEPS: usize = 64;
const MIN_WIDTH: u32 = 560;

const SEQUENTIAL_LOW: RGBColor = RGBColor(255, 255, 255);
const SEQUENTIAL_HIGH: RGBColor = RGBColor(8, 48, 107);
const DIVERGING_LOW: RGBColor = RGBColor(84, 39, 136);
const DIVERGING_MID: RGBColor = RGBColor(247, 247, 247);
const DIVERGING_HIGH: RGBColor = RGBColor(179, 88, 6);

/// Mean of one metric for a `(feature, value)` utterance across contexts.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapCell {
    pub feature: String,
    pub value: FeatureValue,
    pub mean: f64,
    pub truthful: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeatmapStyle {
    /// Probabilities, white to blue across the data range.
    Probability,
    /// Signed differences between two speakers, purple through orange.
    Difference,
}

/// Average `metric` per utterance; rows where it is absent are skipped.
pub fn collapse<F>(rows: &[UtteranceRow], metric: F) -> Vec<HeatmapCell>
where
    F: Fn(&UtteranceRow) -> Option<f64>,
{
    let mut grouped: BTreeMap<(&str, FeatureValue), (Vec<f64>, bool)> = BTreeMap::new();
    for row in rows {
        let Some(sample) = metric(row) else {
            continue;
        };
        let entry = grouped
            .entry((row.feature.as_str(), row.value))
            .or_insert_with(|| (Vec::new(), row.truthful));
        entry.0.push(sample);
    }

    grouped
        .into_iter()
        .map(|((feature, value), (samples, truthful))| HeatmapCell {
            feature: feature.to_string(),
            value,
            mean: samples.iter().mean(),
            truthful,
        })
        .collect()
}

/// Feature columns, highest true reward first; ties broken by name.
pub fn feature_order(cells: &[HeatmapCell], w: &RewardVector) -> Vec<String> {
    let mut features: Vec<String> = Vec::new();
    for cell in cells {
        if !features.contains(&cell.feature) {
            features.push(cell.feature.clone());
        }
    }
    let reward = |feature: &str| w.get(feature).unwrap_or(0.0);
    features.sort_by(|a, b| {
        reward(b.as_str())
            .total_cmp(&reward(a.as_str()))
            .then_with(|| a.cmp(b))
    });
    features
}

fn value_order(cells: &[HeatmapCell]) -> Vec<FeatureValue> {
    let mut values: Vec<FeatureValue> = cells.iter().map(|cell| cell.value).collect();
    values.sort_unstable();
    values.dedup();
    values
}

/// Colour range fitted to the plotted data.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ColourScale {
    style: HeatmapStyle,
    low: f64,
    high: f64,
}

impl ColourScale {
    /// Probabilities span the data's min..max; differences are centred on zero.
    fn fit(cells: &[HeatmapCell], style: HeatmapStyle) -> Self {
        let low = cells.iter().map(|cell| cell.mean).fold(f64::INFINITY, f64::min);
        let high = cells.iter().map(|cell| cell.mean).fold(f64::NEG_INFINITY, f64::max);
        match style {
            HeatmapStyle::Probability => Self { style, low, high },
            HeatmapStyle::Difference => {
                let bound = low.abs().max(high.abs());
                Self {
                    style,
                    low: -bound,
                    high: bound,
                }
            }
        }
    }

    /// Position of `value` in `[0, 1]`; a flat scale sits at the midpoint.
    fn position(&self, value: f64) -> f64 {
        let span = self.high - self.low;
        if span > f64::EPSILON {
            ((value - self.low) / span).clamp(0.0, 1.0)
        } else {
            0.5
        }
    }

    fn colour(&self, value: f64) -> RGBColor {
        let t = self.position(value);
        match self.style {
            HeatmapStyle::Probability => blend(SEQUENTIAL_LOW, SEQUENTIAL_HIGH, t),
            HeatmapStyle::Difference => diverging(2.0 * t - 1.0),
        }
    }

    /// Axis range for the colour bar, widened when the data is flat.
    fn bar_range(&self) -> (f64, f64) {
        if self.high - self.low > f64::EPSILON {
            (self.low, self.high)
        } else {
            (self.low - 0.5, self.high + 0.5)
        }
    }
}

/// Everything needed to draw one heatmap, fixed before touching the backend.
struct HeatmapFrame {
    title: String,
    features: Vec<String>,
    values: Vec<FeatureValue>,
    placed: Vec<(f64, f64, RGBColor, bool)>,
    scale: ColourScale,
    width: u32,
    height: u32,
}

/// Render `cells` to `path` as a PNG titled `title` and return the path written.
///
/// The title, axis ticks and colour bar labels need a font. When plotters
/// cannot draw text the heatmap is redrawn without them and a DEBUG event is
/// emitted; only a failure of that plain redraw is returned.
pub fn render_heatmap(
    cells: &[HeatmapCell],
    w: &RewardVector,
    style: HeatmapStyle,
    title: &str,
    path: impl AsRef<Path>,
) -> Result<PathBuf, AnalyticsError> {
    if cells.is_empty() {
        return Err(AnalyticsError::Plot("no cells to draw".into()));
    }

    let output_path = path.as_ref().to_path_buf();
    if let Some(dir) = output_path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| AnalyticsError::Io {
            context: "creating plots directory",
            source: e,
        })?;
    }

    let features = feature_order(cells, w);
    let values = value_order(cells);
    let scale = ColourScale::fit(cells, style);
    let placed = cells
        .iter()
        .filter_map(|cell| {
            let x = features.iter().position(|f| *f == cell.feature)?;
            let y = values.iter().position(|v| *v == cell.value)?;
            Some((x as f64, y as f64, scale.colour(cell.mean), cell.truthful))
        })
        .collect();

    let heat_width = LABEL_AREA + features.len() as u32 * CELL_SIZE + 2 * MARGIN;
    let frame = HeatmapFrame {
        title: title.to_string(),
        width: (heat_width + COLOUR_BAR_AREA).max(MIN_WIDTH),
        height: CAPTION_AREA + LABEL_AREA + values.len().max(3) as u32 * CELL_SIZE + 2 * MARGIN,
        features,
        values,
        placed,
        scale,
    };

    let prev_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(|_| {}));

    let labelled = guarded(|| draw_heatmap(&frame, &output_path, true));
    let plot_attempt = match labelled {
        Err(AnalyticsError::Plot(reason)) => {
            event!(
                target: "speech_acts_sim::plot",
                Level::DEBUG,
                path = %output_path.display(),
                reason = %reason,
                "redrawing heatmap without text",
            );
            guarded(|| draw_heatmap(&frame, &output_path, false))
        }
        other => other,
    };

    std::panic::set_hook(prev_hook);

    plot_attempt.map(|()| output_path)
}

fn guarded<F>(attempt: F) -> Result<(), AnalyticsError>
where
    F: FnOnce() -> Result<(), AnalyticsError> + std::panic::UnwindSafe,
{
    match std::panic::catch_unwind(attempt) {
        Ok(result) => result,
        Err(_) => Err(AnalyticsError::Plot(
            "plotters panicked while rendering heatmap (missing font support?)".into(),
        )),
    }
}

fn plot_err<E: std::fmt::Display>(e: E) -> AnalyticsError {
    AnalyticsError::Plot(e.to_string())
}

fn draw_heatmap(frame: &HeatmapFrame, target: &Path, labelled: bool) -> Result<(), AnalyticsError> {
    let text_area = if labelled { LABEL_AREA } else { 0 };

    let root = BitMapBackend::new(target, (frame.width, frame.height)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let (heat_area, bar_area) = root.split_horizontally(frame.width - COLOUR_BAR_AREA);

    let x_centres = (0..frame.features.len()).map(|i| i as f64 + 0.5).collect();
    let y_centres = (0..frame.values.len()).map(|i| i as f64 + 0.5).collect();
    let mut builder = ChartBuilder::on(&heat_area);
    builder.margin(MARGIN);
    if labelled {
        builder.caption(&frame.title, ("sans-serif", 20));
    } else {
        builder.margin_top(CAPTION_AREA + MARGIN);
    }
    let mut chart = builder
        .set_label_area_size(LabelAreaPosition::Left, text_area)
        .set_label_area_size(LabelAreaPosition::Bottom, text_area)
        .build_cartesian_2d(
            (0.0..frame.features.len() as f64)
                .partial_axis(0.0..frame.features.len() as f64)
                .with_key_points(x_centres),
            (0.0..frame.values.len() as f64)
                .partial_axis(0.0..frame.values.len() as f64)
                .with_key_points(y_centres),
        )
        .map_err(plot_err)?;

    if labelled {
        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc("Feature")
            .y_desc("Value")
            .x_labels(frame.features.len())
            .y_labels(frame.values.len())
            .x_label_formatter(&|x| {
                frame
                    .features
                    .get(x.floor() as usize)
                    .cloned()
                    .unwrap_or_default()
            })
            .y_label_formatter(&|y| {
                frame
                    .values
                    .get(y.floor() as usize)
                    .map(|value| value.to_string())
                    .unwrap_or_default()
            })
            .draw()
            .map_err(plot_err)?;
    }

    chart
        .draw_series(frame.placed.iter().map(|&(x, y, colour, _)| {
            Rectangle::new([(x, y), (x + 1.0, y + 1.0)], colour.filled())
        }))
        .map_err(plot_err)?;

    chart
        .draw_series(
            frame
                .placed
                .iter()
                .filter(|(_, _, _, truthful)| *truthful)
                .map(|&(x, y, _, _)| Cross::new((x + 0.5, y + 0.5), 8, BLACK.stroke_width(2))),
        )
        .map_err(plot_err)?;

    drop(chart);

    let (bar_low, bar_high) = frame.scale.bar_range();
    let mut bar = ChartBuilder::on(&bar_area)
        .margin(MARGIN)
        .margin_top(CAPTION_AREA + MARGIN)
        .margin_bottom(LABEL_AREA + MARGIN)
        .set_label_area_size(LabelAreaPosition::Right, text_area)
        .build_cartesian_2d(0.0..1.0, bar_low..bar_high)
        .map_err(plot_err)?;

    if labelled {
        bar.configure_mesh()
            .disable_mesh()
            .disable_x_axis()
            .y_labels(5)
            .y_label_formatter(&|v| format!("{:.2}", v.abs()))
            .draw()
            .map_err(plot_err)?;
    }

    let step = (bar_high - bar_low) / COLOUR_BAR_STEPS as f64;
    bar.draw_series((0..COLOUR_BAR_STEPS).map(|i| {
        let from = bar_low + step * i as f64;
        let colour = frame.scale.colour(from + step / 2.0);
        Rectangle::new([(0.0, from), (1.0, from + step)], colour.filled())
    }))
    .map_err(plot_err)?;

    drop(bar);

    root.present().map_err(plot_err)?;
    Ok(())
}

fn blend(from: RGBColor, to: RGBColor, t: f64) -> RGBColor {
    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    RGBColor(mix(from.0, to.0), mix(from.1, to.1), mix(from.2, to.2))
}

/// `t` in `[-1, 1]`; zero maps to the neutral midpoint.
fn diverging(t: f64) -> RGBColor {
    let t = t.clamp(-1.0, 1.0);
    if t < 0.0 {
        blend(DIVERGING_MID, DIVERGING_LOW, -t)
    } else {
        blend(DIVERGING_MID, DIVERGING_HIGH, t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(context: &str, feature: &str, value: FeatureValue, truthful: bool, p: f64) -> UtteranceRow {
        let mut columns = BTreeMap::new();
        columns.insert("S_prob".to_string(), p);
        UtteranceRow {
            action_context: Some(context.to_string()),
            utterance: format!("({feature}, {value})"),
            feature: feature.to_string(),
            value,
            truthful,
            expected_rewards: 0.0,
            prob_optimal_action: 0.0,
            columns,
        }
    }

    fn rewards() -> RewardVector {
        RewardVector::new([("blue", -1.0), ("green", 1.0)])
    }

    #[test]
    fn collapse_averages_across_contexts() {
        let rows = vec![
            row("[a]", "green", 1, true, 0.6),
            row("[b]", "green", 1, true, 0.2),
            row("[a]", "blue", -1, true, 0.1),
        ];
        let cells = collapse(&rows, |r| r.probability("S"));
        assert_eq!(cells.len(), 2);
        let green = cells.iter().find(|c| c.feature == "green").expect("green");
        assert!((green.mean - 0.4).abs() < 1e-12);
        assert!(green.truthful);
    }

    #[test]
    fn collapse_skips_missing_metrics() {
        let rows = vec![row("[a]", "green", 1, true, 0.6)];
        assert!(collapse(&rows, |r| r.probability("Other")).is_empty());
    }

    #[test]
    fn features_are_ordered_by_descending_reward() {
        let rows = vec![
            row("[a]", "blue", 1, false, 0.5),
            row("[a]", "green", 1, true, 0.5),
            row("[a]", "circle", 1, false, 0.5),
        ];
        let cells = collapse(&rows, |r| r.probability("S"));
        assert_eq!(feature_order(&cells, &rewards()), vec!["green", "circle", "blue"]);
    }

    #[test]
    fn diverging_palette_is_neutral_at_zero() {
        assert_eq!(diverging(0.0), DIVERGING_MID);
        assert_eq!(diverging(-2.0), DIVERGING_LOW);
        assert_eq!(diverging(1.0), DIVERGING_HIGH);
    }

    fn cell(feature: &str, value: FeatureValue, mean: f64) -> HeatmapCell {
        HeatmapCell {
            feature: feature.to_string(),
            value,
            mean,
            truthful: feature == "green" && value == 1,
        }
    }

    #[test]
    fn probability_colours_span_the_data_range() {
        let cells = vec![cell("green", 1, 0.2), cell("blue", 1, 0.4)];
        let scale = ColourScale::fit(&cells, HeatmapStyle::Probability);
        assert_eq!(scale.colour(0.2), SEQUENTIAL_LOW);
        assert_eq!(scale.colour(0.4), SEQUENTIAL_HIGH);
        assert!((scale.position(0.3) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn difference_colours_are_symmetric_about_zero() {
        let cells = vec![cell("green", 1, 0.1), cell("blue", 1, -0.3)];
        let scale = ColourScale::fit(&cells, HeatmapStyle::Difference);
        assert_eq!((scale.low, scale.high), (-0.3, 0.3));
        assert_eq!(scale.colour(0.0), DIVERGING_MID);
        assert_eq!(scale.colour(-0.3), DIVERGING_LOW);
        assert_eq!(scale.colour(0.3), DIVERGING_HIGH);
    }

    #[test]
    fn flat_data_sits_mid_scale() {
        let cells = vec![cell("green", 1, 0.25), cell("blue", 1, 0.25)];
        let scale = ColourScale::fit(&cells, HeatmapStyle::Probability);
        assert_eq!(scale.position(0.25), 0.5);
        assert_eq!(scale.bar_range(), (-0.25, 0.75));
    }

    #[test]
    fn renders_titled_heatmap_or_reports_plot_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let cells = vec![
            cell("green", 1, 0.6),
            cell("green", -1, 0.1),
            cell("blue", 1, 0.2),
            cell("blue", -1, 0.1),
        ];
        let path = dir.path().join("plots").join("Belief_heatmap.png");
        match render_heatmap(
            &cells,
            &rewards(),
            HeatmapStyle::Probability,
            "Utterance Probabilities for Belief Speaker",
            &path,
        ) {
            Ok(written) => {
                assert_eq!(written, path);
                assert!(written.exists());
            }
            Err(AnalyticsError::Plot(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_heatmaps_are_rejected() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = render_heatmap(
            &[],
            &rewards(),
            HeatmapStyle::Probability,
            "empty",
            dir.path().join("empty.png"),
        )
        .expect_err("nothing to draw");
        assert!(matches!(err, AnalyticsError::Plot(_)));
    }
}
