//! View models for the chart and report templates.
//! Numbers are formatted here so the templates stay free of logic.

use anyhow::Result;
use askama::Template;

use crate::report::{ColumnSummary, ScoreReport};

const CHART_WIDTH: f64 = 800.0;
const CHART_HEIGHT: f64 = 480.0;
const PLOT_LEFT: f64 = 70.0;
const PLOT_RIGHT: f64 = 780.0;
const PLOT_TOP: f64 = 50.0;
const PLOT_BOTTOM: f64 = 370.0;
const BAR_FILL_RATIO: f64 = 0.8;
const Y_TICKS: usize = 5;

struct BarView {
    x: String,
    y: String,
    width: String,
    height: String,
    label_x: String,
    label: String,
    count: usize,
}

struct TickView {
    y: String,
    label: String,
}

#[derive(Template)]
#[template(path = "score_distribution.svg")]
struct ChartTemplate {
    width: String,
    height: String,
    center_x: String,
    center_y: String,
    plot_left: String,
    plot_right: String,
    plot_top: String,
    plot_bottom: String,
    tick_label_x: String,
    label_y: String,
    x_title_y: String,
    y_ticks: Vec<TickView>,
    bars: Vec<BarView>,
}

fn px(v: f64) -> String {
    format!("{v:.1}")
}

/// Round the tallest bar up to a value divisible into `Y_TICKS - 1` whole steps.
fn axis_max(max_count: usize) -> usize {
    let steps = Y_TICKS - 1;
    max_count.max(1).div_ceil(steps) * steps
}

pub fn render_chart(report: &ScoreReport) -> Result<String> {
    let max_count = report.bins.iter().map(|b| b.count).max().unwrap_or(0);
    let y_max = axis_max(max_count) as f64;
    let plot_height = PLOT_BOTTOM - PLOT_TOP;
    let slot = (PLOT_RIGHT - PLOT_LEFT) / report.bins.len().max(1) as f64;
    let bar_width = slot * BAR_FILL_RATIO;

    let bars = report
        .bins
        .iter()
        .enumerate()
        .map(|(i, bin)| {
            let height = plot_height * bin.count as f64 / y_max;
            let x = PLOT_LEFT + slot * i as f64 + (slot - bar_width) / 2.0;
            BarView {
                x: px(x),
                y: px(PLOT_BOTTOM - height),
                width: px(bar_width),
                height: px(height),
                label_x: px(x + bar_width / 2.0),
                label: bin.label(),
                count: bin.count,
            }
        })
        .collect();

    let y_ticks = (0..Y_TICKS)
        .map(|i| {
            let value = y_max * i as f64 / (Y_TICKS - 1) as f64;
            TickView {
                y: px(PLOT_BOTTOM - plot_height * value / y_max),
                label: format!("{value:.0}"),
            }
        })
        .collect();

    let chart = ChartTemplate {
        width: px(CHART_WIDTH),
        height: px(CHART_HEIGHT),
        center_x: px((PLOT_LEFT + PLOT_RIGHT) / 2.0),
        center_y: px((PLOT_TOP + PLOT_BOTTOM) / 2.0),
        plot_left: px(PLOT_LEFT),
        plot_right: px(PLOT_RIGHT),
        plot_top: px(PLOT_TOP),
        plot_bottom: px(PLOT_BOTTOM),
        tick_label_x: px(PLOT_LEFT - 8.0),
        label_y: px(PLOT_BOTTOM + 16.0),
        x_title_y: px(CHART_HEIGHT - 16.0),
        y_ticks,
        bars,
    };
    Ok(chart.render()?)
}

struct BinRow {
    label: String,
    count: usize,
}

struct StatRow {
    stat: &'static str,
    cells: Vec<String>,
}

struct CohortView {
    title: &'static str,
    criterion: String,
    wallets: usize,
    columns: Vec<String>,
    rows: Vec<StatRow>,
}

#[derive(Template)]
#[template(path = "analysis.md")]
struct AnalysisTemplate {
    wallets: usize,
    chart_path: String,
    bins: Vec<BinRow>,
    cohorts: Vec<CohortView>,
}

fn cell(v: Option<f64>) -> String {
    v.map_or_else(|| "-".to_string(), |x| format!("{x:.2}"))
}

fn stat_rows(columns: &[ColumnSummary]) -> Vec<StatRow> {
    let stats: [(&'static str, fn(&ColumnSummary) -> String); 8] = [
        ("count", |c| c.count.to_string()),
        ("mean", |c| cell(c.mean)),
        ("std", |c| cell(c.std)),
        ("min", |c| cell(c.min)),
        ("25%", |c| cell(c.q25)),
        ("50%", |c| cell(c.median)),
        ("75%", |c| cell(c.q75)),
        ("max", |c| cell(c.max)),
    ];
    stats
        .into_iter()
        .map(|(stat, get)| StatRow {
            stat,
            cells: columns.iter().map(get).collect(),
        })
        .collect()
}

/// Markdown summary. `chart_path` is the link target written into the report.
pub fn render_analysis(report: &ScoreReport, chart_path: &str) -> Result<String> {
    let cohorts = [&report.low, &report.high]
        .into_iter()
        .map(|cohort| CohortView {
            title: cohort.kind.title(),
            criterion: cohort.criterion.clone(),
            wallets: cohort.wallets,
            columns: cohort.columns.iter().map(|c| c.name.clone()).collect(),
            rows: stat_rows(&cohort.columns),
        })
        .collect();

    let analysis = AnalysisTemplate {
        wallets: report.wallets,
        chart_path: chart_path.to_string(),
        bins: report
            .bins
            .iter()
            .map(|b| BinRow {
                label: b.label(),
                count: b.count,
            })
            .collect(),
        cohorts,
    };
    Ok(analysis.render()?)
}
