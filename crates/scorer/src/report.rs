use crate::wallet_features::WalletFeatures;
use crate::wallet_scoring::SCORE_SCALE;

pub const BIN_COUNT: usize = 10;
pub const BIN_WIDTH: f64 = SCORE_SCALE / BIN_COUNT as f64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CohortColumn {
    CreditScore,
    DepositCount,
    BorrowCount,
    RepayCount,
    LiquidationCount,
}

impl CohortColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreditScore => "credit_score",
            Self::DepositCount => "deposit_count",
            Self::BorrowCount => "borrow_count",
            Self::RepayCount => "repay_count",
            Self::LiquidationCount => "liquidation_count",
        }
    }

    fn value(self, features: &WalletFeatures, credit_score: f64) -> f64 {
        match self {
            Self::CreditScore => credit_score,
            Self::DepositCount => f64::from(features.deposit_count),
            Self::BorrowCount => f64::from(features.borrow_count),
            Self::RepayCount => f64::from(features.repay_count),
            Self::LiquidationCount => f64::from(features.liquidation_count),
        }
    }
}

/// Columns summarized for each cohort, in report order.
pub const COHORT_COLUMNS: [CohortColumn; 5] = [
    CohortColumn::CreditScore,
    CohortColumn::DepositCount,
    CohortColumn::BorrowCount,
    CohortColumn::RepayCount,
    CohortColumn::LiquidationCount,
];

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

impl ScoreBin {
    /// Half-open range label, with the top bin closed at the scale maximum.
    pub fn label(&self) -> String {
        let close = if self.upper >= SCORE_SCALE { ']' } else { ')' };
        format!("[{:.0}, {:.0}{close}", self.lower, self.upper)
    }
}

fn bin_index(score: f64) -> usize {
    let idx = (score.max(0.0) / BIN_WIDTH).floor() as usize;
    idx.min(BIN_COUNT - 1)
}

/// Count scores into ten fixed-width bins `[0,100) .. [900,1000]`.
pub fn bin_scores(scores: &[f64]) -> Vec<ScoreBin> {
    let mut bins: Vec<ScoreBin> = (0..BIN_COUNT)
        .map(|i| ScoreBin {
            lower: i as f64 * BIN_WIDTH,
            upper: (i + 1) as f64 * BIN_WIDTH,
            count: 0,
        })
        .collect();
    for &score in scores {
        bins[bin_index(score)].count += 1;
    }
    bins
}

/// pandas-style `describe()` of one numeric column. Statistics that are
/// undefined for the sample size are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub name: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub median: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

/// Linear interpolation between closest ranks, on an ascending slice.
fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

pub fn describe(name: &str, values: &[f64]) -> ColumnSummary {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let count = values.len();
    let mean = (count > 0).then(|| values.iter().sum::<f64>() / count as f64);
    // Sample standard deviation (ddof = 1).
    let std = mean.filter(|_| count > 1).map(|m| {
        let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
        (ss / (count - 1) as f64).sqrt()
    });

    ColumnSummary {
        name: name.to_string(),
        count,
        mean,
        std,
        min: sorted.first().copied(),
        q25: quantile(&sorted, 0.25),
        median: quantile(&sorted, 0.5),
        q75: quantile(&sorted, 0.75),
        max: sorted.last().copied(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CohortKind {
    Low,
    High,
}

impl CohortKind {
    pub fn title(&self) -> &'static str {
        match self {
            Self::Low => "Low-Score Wallets",
            Self::High => "High-Score Wallets",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cohort {
    pub kind: CohortKind,
    /// Inclusive/exclusive bound description, e.g. `credit_score < 200`.
    pub criterion: String,
    pub wallets: usize,
    pub columns: Vec<ColumnSummary>,
}

fn build_cohort(
    kind: CohortKind,
    criterion: String,
    features: &[WalletFeatures],
    scores: &[f64],
    selected: impl Fn(f64) -> bool,
) -> Cohort {
    let members: Vec<(&WalletFeatures, f64)> = features
        .iter()
        .zip(scores.iter().copied())
        .filter(|(_, score)| selected(*score))
        .collect();

    let columns = COHORT_COLUMNS
        .iter()
        .map(|column| {
            let values: Vec<f64> = members
                .iter()
                .map(|(f, score)| column.value(f, *score))
                .collect();
            describe(column.as_str(), &values)
        })
        .collect();

    Cohort {
        kind,
        criterion,
        wallets: members.len(),
        columns,
    }
}

/// Wallets scoring strictly below `threshold`.
pub fn low_cohort(features: &[WalletFeatures], scores: &[f64], threshold: f64) -> Cohort {
    build_cohort(
        CohortKind::Low,
        format!("credit_score < {threshold}"),
        features,
        scores,
        |s| s < threshold,
    )
}

/// Wallets scoring at or above `threshold`.
pub fn high_cohort(features: &[WalletFeatures], scores: &[f64], threshold: f64) -> Cohort {
    build_cohort(
        CohortKind::High,
        format!("credit_score >= {threshold}"),
        features,
        scores,
        |s| s >= threshold,
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreReport {
    pub wallets: usize,
    pub bins: Vec<ScoreBin>,
    pub low: Cohort,
    pub high: Cohort,
}

pub fn build_report(
    features: &[WalletFeatures],
    credit_scores: &[f64],
    cfg: &common::config::Report,
) -> ScoreReport {
    let report = ScoreReport {
        wallets: features.len(),
        bins: bin_scores(credit_scores),
        low: low_cohort(features, credit_scores, cfg.low_score_threshold),
        high: high_cohort(features, credit_scores, cfg.high_score_threshold),
    };
    tracing::info!(
        wallets = report.wallets,
        low_cohort = report.low.wallets,
        high_cohort = report.high.wallets,
        "score report built"
    );
    report
}
