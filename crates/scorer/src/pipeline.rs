use std::path::Path;

use anyhow::{Context, Result};
use common::config::Config;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::export::{chart_link, scores_csv, RenderedOutputs};
use crate::forest::fit_with_holdout;
use crate::loader::{load_transactions, TransactionRow};
use crate::metrics::timed;
use crate::render::{render_analysis, render_chart};
use crate::report::{build_report, ScoreReport};
use crate::scaler::StandardScaler;
use crate::wallet_features::{aggregate_wallet_features, WalletFeatures, FEATURE_NAMES};
use crate::wallet_scoring::{min_max_scale, synthetic_scores};

/// Per-wallet results, index-aligned and sorted by wallet.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredWallets {
    pub features: Vec<WalletFeatures>,
    pub credit_scores: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub transactions: usize,
    pub wallets: usize,
    pub low_cohort: usize,
    pub high_cohort: usize,
}

/// Aggregate, label, fit, predict and normalize. Pure apart from logging and metrics.
pub fn score_wallets(transactions: &[TransactionRow], config: &Config) -> Result<ScoredWallets> {
    let features = timed("aggregate", || aggregate_wallet_features(transactions));
    tracing::debug!(
        window_start = features.iter().map(|f| f.first_tx_time).min(),
        window_end = features.iter().map(|f| f.last_tx_time).max(),
        "transaction window"
    );

    let labels = timed("label", || synthetic_scores(&features, &config.synthetic_score));

    let vectors: Vec<_> = features.iter().map(WalletFeatures::feature_vector).collect();
    let scaler = StandardScaler::fit(&vectors);
    let x = scaler.transform(&vectors);

    let model = timed("fit", || fit_with_holdout(&x, &labels, &config.model))
        .context("failed to fit credit score model")?;
    tracing::info!(
        trees = model.n_trees(),
        features = FEATURE_NAMES.len(),
        "credit score model fitted"
    );

    let raw = timed("predict", || model.predict(&x));
    let credit_scores = min_max_scale(&raw);
    tracing::info!(wallets = credit_scores.len(), "credit scores normalized");

    Ok(ScoredWallets {
        features,
        credit_scores,
    })
}

/// Render every output in memory. Nothing is written here.
pub fn render_outputs(
    scored: &ScoredWallets,
    report: &ScoreReport,
    config: &Config,
) -> Result<RenderedOutputs> {
    let paths = &config.paths;
    let mut outputs = RenderedOutputs::default();

    let csv = scores_csv(&scored.features, &scored.credit_scores)
        .context("failed to render scores csv")?;
    outputs.add(&paths.scores_csv, csv);
    outputs.add(
        &paths.chart,
        render_chart(report).context("failed to render score chart")?,
    );
    let link = chart_link(Path::new(&paths.report), Path::new(&paths.chart));
    outputs.add(
        &paths.report,
        render_analysis(report, &link).context("failed to render analysis")?,
    );
    Ok(outputs)
}

/// One full batch run: load, score, report and export. When `metrics_handle` is given
/// and `observability.metrics_path` is set, the metrics snapshot is written
/// together with the other outputs, so a failed run leaves no files behind.
pub fn run(config: &Config, metrics_handle: Option<&PrometheusHandle>) -> Result<RunSummary> {
    let input = Path::new(&config.paths.input);
    let transactions = timed("load", || load_transactions(input))?;
    metrics::counter!("scorer_transactions_loaded_total").increment(transactions.len() as u64);

    let scored = score_wallets(&transactions, config)?;
    let report = build_report(&scored.features, &scored.credit_scores, &config.report);
    let mut outputs = timed("render", || render_outputs(&scored, &report, config))?;

    metrics::gauge!("scorer_wallets_scored").set(report.wallets as f64);
    metrics::gauge!("scorer_low_cohort_wallets").set(report.low.wallets as f64);
    metrics::gauge!("scorer_high_cohort_wallets").set(report.high.wallets as f64);

    if let (Some(handle), Some(path)) = (metrics_handle, &config.observability.metrics_path) {
        outputs.add(path, handle.render());
    }
    timed("export", || outputs.write_all())?;

    Ok(RunSummary {
        transactions: transactions.len(),
        wallets: report.wallets,
        low_cohort: report.low.wallets,
        high_cohort: report.high.wallets,
    })
}
