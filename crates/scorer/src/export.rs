use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::wallet_features::WalletFeatures;

#[derive(Debug, Serialize)]
struct ScoreRecord<'a> {
    #[serde(rename = "userWallet")]
    user_wallet: &'a str,
    credit_score: f64,
}

/// `userWallet,credit_score` table, one row per wallet.
pub fn scores_csv(features: &[WalletFeatures], credit_scores: &[f64]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for (f, &credit_score) in features.iter().zip(credit_scores) {
        writer.serialize(ScoreRecord {
            user_wallet: &f.wallet,
            credit_score,
        })?;
    }
    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("failed to finish scores csv: {e}"))
}

/// Link from the report file to the chart, relative to the report's directory
/// when the chart lives below it.
pub fn chart_link(report_path: &Path, chart_path: &Path) -> String {
    let base = report_path.parent().unwrap_or_else(|| Path::new(""));
    let relative = chart_path.strip_prefix(base).unwrap_or(chart_path);
    let link = relative.to_string_lossy().replace('\\', "/");
    if relative.is_relative() && !link.starts_with('.') {
        format!("./{link}")
    } else {
        link
    }
}

/// Everything a run produces, fully rendered before the first write.
#[derive(Debug, Clone, Default)]
pub struct RenderedOutputs {
    pub files: Vec<(PathBuf, Vec<u8>)>,
}

impl RenderedOutputs {
    pub fn add(&mut self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) {
        self.files.push((path.into(), contents.into()));
    }

    pub fn write_all(&self) -> Result<()> {
        for (path, contents) in &self.files {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::write(path, contents)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), bytes = contents.len(), "output written");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet(name: &str) -> WalletFeatures {
        WalletFeatures {
            wallet: name.to_string(),
            total_txs: 1,
            deposit_count: 1,
            borrow_count: 0,
            repay_count: 0,
            redeem_count: 0,
            liquidation_count: 0,
            total_usd: 0.0,
            avg_usd_per_tx: 0.0,
            first_tx_time: 0,
            last_tx_time: 0,
            unique_assets: 1,
            activity_span_days: 1.0,
            deposit_to_borrow_ratio: 1.0,
            repay_ratio: 0.0,
            has_liquidation: false,
            txs_per_day: 1.0,
        }
    }

    #[test]
    fn test_scores_csv_header_and_rows() {
        let bytes = scores_csv(&[wallet("0xa"), wallet("0xb")], &[0.0, 512.5]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["userWallet,credit_score", "0xa,0.0", "0xb,512.5"]);
    }

    #[test]
    fn test_chart_link_relative_to_report() {
        assert_eq!(
            chart_link(
                Path::new("analysis.md"),
                Path::new("outputs/score_distribution.svg")
            ),
            "./outputs/score_distribution.svg"
        );
        assert_eq!(
            chart_link(
                Path::new("outputs/analysis.md"),
                Path::new("outputs/score_distribution.svg")
            ),
            "./score_distribution.svg"
        );
        assert_eq!(
            chart_link(Path::new("reports/analysis.md"), Path::new("/tmp/chart.svg")),
            "/tmp/chart.svg"
        );
    }

    #[test]
    fn test_write_all_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("outputs").join("deep").join("scores.csv");
        let mut outputs = RenderedOutputs::default();
        outputs.add(&nested, "userWallet,credit_score\n");
        outputs.write_all().unwrap();
        assert_eq!(
            std::fs::read_to_string(&nested).unwrap(),
            "userWallet,credit_score\n"
        );
    }
}
