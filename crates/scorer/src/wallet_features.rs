use std::collections::{BTreeMap, BTreeSet};

use crate::loader::{ActionKind, TransactionRow};

pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Span assigned to wallets whose first and last transaction share a timestamp.
/// Keeps `txs_per_day` bounded for single-transaction wallets.
pub const MIN_ACTIVITY_SPAN_DAYS: f64 = 1.0;

/// Added to `borrow_count` in the ratio denominators. Zero-borrow wallets get a
/// finite ratio equal to their raw count instead of infinity.
pub const BORROW_SMOOTHING: f64 = 1.0;

/// Added to the span before dividing in `txs_per_day`.
pub const TXS_PER_DAY_EPSILON: f64 = 1e-10;

/// Column order of [`WalletFeatures::feature_vector`].
pub const FEATURE_NAMES: [&str; 14] = [
    "total_txs",
    "deposit_count",
    "borrow_count",
    "repay_count",
    "redeem_count",
    "liquidation_count",
    "total_usd",
    "avg_usd_per_tx",
    "activity_span_days",
    "deposit_to_borrow_ratio",
    "repay_ratio",
    "has_liquidation",
    "txs_per_day",
    "unique_assets",
];

#[derive(Debug, Clone, PartialEq)]
pub struct WalletFeatures {
    pub wallet: String,
    pub total_txs: u32,
    pub deposit_count: u32,
    pub borrow_count: u32,
    pub repay_count: u32,
    pub redeem_count: u32,
    pub liquidation_count: u32,
    pub total_usd: f64,
    pub avg_usd_per_tx: f64,
    pub first_tx_time: i64,
    pub last_tx_time: i64,
    pub unique_assets: u32,
    pub activity_span_days: f64,
    pub deposit_to_borrow_ratio: f64,
    pub repay_ratio: f64,
    pub has_liquidation: bool,
    pub txs_per_day: f64,
}

impl WalletFeatures {
    pub fn feature_vector(&self) -> [f64; 14] {
        [
            f64::from(self.total_txs),
            f64::from(self.deposit_count),
            f64::from(self.borrow_count),
            f64::from(self.repay_count),
            f64::from(self.redeem_count),
            f64::from(self.liquidation_count),
            self.total_usd,
            self.avg_usd_per_tx,
            self.activity_span_days,
            self.deposit_to_borrow_ratio,
            self.repay_ratio,
            if self.has_liquidation { 1.0 } else { 0.0 },
            self.txs_per_day,
            f64::from(self.unique_assets),
        ]
    }
}

#[derive(Debug, Default)]
struct WalletAccumulator<'a> {
    total_txs: u32,
    deposit_count: u32,
    borrow_count: u32,
    repay_count: u32,
    redeem_count: u32,
    liquidation_count: u32,
    usd_sum: f64,
    usd_observations: u32,
    first_tx_time: Option<i64>,
    last_tx_time: Option<i64>,
    assets: BTreeSet<&'a str>,
}

impl<'a> WalletAccumulator<'a> {
    fn push(&mut self, tx: &'a TransactionRow) {
        self.total_txs += 1;
        match tx.action {
            ActionKind::Deposit => self.deposit_count += 1,
            ActionKind::Borrow => self.borrow_count += 1,
            ActionKind::Repay => self.repay_count += 1,
            ActionKind::RedeemUnderlying => self.redeem_count += 1,
            ActionKind::LiquidationCall => self.liquidation_count += 1,
            ActionKind::Other(ref name) => {
                tracing::trace!(wallet = %tx.wallet, action = %name, "action not counted");
            }
        }
        if let Some(usd) = tx.usd_value() {
            self.usd_sum += usd;
            self.usd_observations += 1;
        }
        let ts = tx.timestamp;
        self.first_tx_time = Some(self.first_tx_time.map_or(ts, |t| t.min(ts)));
        self.last_tx_time = Some(self.last_tx_time.map_or(ts, |t| t.max(ts)));
        if let Some(symbol) = tx.asset_symbol.as_deref() {
            self.assets.insert(symbol);
        }
    }

    fn finish(self, wallet: &str) -> WalletFeatures {
        let first_tx_time = self.first_tx_time.unwrap_or_default();
        let last_tx_time = self.last_tx_time.unwrap_or_default();

        let avg_usd_per_tx = if self.usd_observations > 0 {
            self.usd_sum / f64::from(self.usd_observations)
        } else {
            0.0
        };
        let activity_span_days = if last_tx_time > first_tx_time {
            (last_tx_time - first_tx_time) as f64 / SECONDS_PER_DAY
        } else {
            MIN_ACTIVITY_SPAN_DAYS
        };
        let borrow_denominator = f64::from(self.borrow_count) + BORROW_SMOOTHING;

        WalletFeatures {
            wallet: wallet.to_string(),
            total_txs: self.total_txs,
            deposit_count: self.deposit_count,
            borrow_count: self.borrow_count,
            repay_count: self.repay_count,
            redeem_count: self.redeem_count,
            liquidation_count: self.liquidation_count,
            total_usd: self.usd_sum,
            avg_usd_per_tx,
            first_tx_time,
            last_tx_time,
            unique_assets: self.assets.len() as u32,
            activity_span_days,
            deposit_to_borrow_ratio: f64::from(self.deposit_count) / borrow_denominator,
            repay_ratio: f64::from(self.repay_count) / borrow_denominator,
            has_liquidation: self.liquidation_count > 0,
            txs_per_day: f64::from(self.total_txs) / (activity_span_days + TXS_PER_DAY_EPSILON),
        }
    }
}

/// Group transactions by wallet and derive one feature row per wallet, sorted by wallet id.
pub fn aggregate_wallet_features(transactions: &[TransactionRow]) -> Vec<WalletFeatures> {
    let mut by_wallet: BTreeMap<&str, WalletAccumulator<'_>> = BTreeMap::new();
    for tx in transactions {
        by_wallet.entry(tx.wallet.as_str()).or_default().push(tx);
    }

    let features: Vec<WalletFeatures> = by_wallet
        .into_iter()
        .map(|(wallet, acc)| acc.finish(wallet))
        .collect();

    tracing::info!(
        transactions = transactions.len(),
        wallets = features.len(),
        "wallet features aggregated"
    );
    features
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(
        wallet: &str,
        action: &str,
        amount: Option<f64>,
        price: Option<f64>,
        symbol: &str,
        ts: i64,
    ) -> TransactionRow {
        TransactionRow {
            wallet: wallet.to_string(),
            action: ActionKind::parse(action),
            amount,
            asset_price_usd: price,
            asset_symbol: Some(symbol.to_string()),
            timestamp: ts,
        }
    }

    #[test]
    fn test_deposit_borrow_repay_scenario() {
        let day = 86_400;
        let rows = vec![
            tx("0xa", "deposit", Some(100.0), Some(1.0), "USDC", 0),
            tx("0xa", "deposit", Some(100.0), Some(1.0), "USDC", day),
            tx("0xa", "deposit", Some(100.0), Some(1.0), "USDC", 2 * day),
            tx("0xa", "borrow", Some(50.0), Some(1.0), "DAI", 3 * day),
            tx("0xa", "repay", Some(50.0), Some(1.0), "DAI", 4 * day),
        ];
        let features = aggregate_wallet_features(&rows);
        assert_eq!(features.len(), 1);
        let f = &features[0];

        assert_eq!(f.total_txs, 5);
        assert_eq!(f.deposit_count, 3);
        assert_eq!(f.borrow_count, 1);
        assert_eq!(f.repay_count, 1);
        assert_eq!(f.liquidation_count, 0);
        assert!(!f.has_liquidation);
        assert_eq!(f.unique_assets, 2);
        assert!((f.deposit_to_borrow_ratio - 1.5).abs() < 1e-12);
        assert!((f.repay_ratio - 0.5).abs() < 1e-12);
        assert!((f.total_usd - 400.0).abs() < 1e-9);
        assert!((f.avg_usd_per_tx - 80.0).abs() < 1e-9);
        assert!((f.activity_span_days - 4.0).abs() < 1e-12);
        assert!((f.txs_per_day - 1.25).abs() < 1e-6);
    }

    #[test]
    fn test_zero_borrows_gives_finite_ratios() {
        let rows = vec![
            tx("0xa", "deposit", Some(1.0), Some(1.0), "USDC", 10),
            tx("0xa", "deposit", Some(1.0), Some(1.0), "USDC", 20),
        ];
        let f = &aggregate_wallet_features(&rows)[0];
        assert_eq!(f.borrow_count, 0);
        assert!(f.deposit_to_borrow_ratio.is_finite());
        assert!((f.deposit_to_borrow_ratio - 2.0).abs() < 1e-12);
        assert!(f.repay_ratio.abs() < 1e-12);
    }

    #[test]
    fn test_single_transaction_span_is_one_day() {
        let rows = vec![tx("0xa", "deposit", Some(5.0), Some(2.0), "WETH", 1_700_000_000)];
        let f = &aggregate_wallet_features(&rows)[0];
        assert_eq!(f.first_tx_time, f.last_tx_time);
        assert!((f.activity_span_days - MIN_ACTIVITY_SPAN_DAYS).abs() < f64::EPSILON);
        assert!((f.txs_per_day - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_missing_usd_values_excluded_from_mean() {
        let rows = vec![
            tx("0xa", "deposit", Some(10.0), Some(3.0), "USDC", 1),
            tx("0xa", "deposit", None, Some(3.0), "USDC", 2),
            tx("0xa", "deposit", Some(10.0), None, "USDC", 3),
        ];
        let f = &aggregate_wallet_features(&rows)[0];
        assert!((f.total_usd - 30.0).abs() < 1e-12);
        assert!((f.avg_usd_per_tx - 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_all_usd_missing_defaults_to_zero() {
        let rows = vec![
            tx("0xa", "borrow", None, None, "USDC", 1),
            tx("0xa", "repay", None, Some(1.0), "USDC", 2),
        ];
        let f = &aggregate_wallet_features(&rows)[0];
        assert!(f.total_usd.abs() < f64::EPSILON);
        assert!(f.avg_usd_per_tx.abs() < f64::EPSILON);
    }

    #[test]
    fn test_unknown_actions_count_toward_total_only() {
        let rows = vec![
            tx("0xa", "swap", Some(1.0), Some(1.0), "USDC", 1),
            tx("0xa", "liquidationcall", Some(1.0), Some(1.0), "USDC", 2),
            tx("0xa", "redeemunderlying", Some(1.0), Some(1.0), "USDC", 3),
        ];
        let f = &aggregate_wallet_features(&rows)[0];
        assert_eq!(f.total_txs, 3);
        assert_eq!(f.liquidation_count, 1);
        assert_eq!(f.redeem_count, 1);
        assert!(f.has_liquidation);
        assert_eq!(f.deposit_count + f.borrow_count + f.repay_count, 0);
    }

    #[test]
    fn test_missing_asset_symbol_not_counted() {
        let mut no_symbol = tx("0xa", "deposit", Some(1.0), Some(1.0), "USDC", 2);
        no_symbol.asset_symbol = None;
        let rows = vec![tx("0xa", "deposit", Some(1.0), Some(1.0), "USDC", 1), no_symbol];
        assert_eq!(aggregate_wallet_features(&rows)[0].unique_assets, 1);
    }

    #[test]
    fn test_empty_asset_symbol_counts_as_distinct_asset() {
        let rows = vec![
            tx("0xa", "deposit", Some(1.0), Some(1.0), "USDC", 1),
            tx("0xa", "deposit", Some(1.0), Some(1.0), "", 2),
            tx("0xa", "borrow", Some(1.0), Some(1.0), "", 3),
        ];
        assert_eq!(aggregate_wallet_features(&rows)[0].unique_assets, 2);
    }

    #[test]
    fn test_grouping_is_order_independent_and_sorted() {
        let mut rows = vec![
            tx("0xb", "deposit", Some(1.0), Some(1.0), "USDC", 5),
            tx("0xa", "borrow", Some(2.0), Some(1.0), "DAI", 3),
            tx("0xb", "repay", Some(1.0), Some(1.0), "USDC", 1),
            tx("0xa", "deposit", Some(4.0), Some(1.0), "USDC", 9),
        ];
        let forward = aggregate_wallet_features(&rows);
        rows.reverse();
        let backward = aggregate_wallet_features(&rows);

        assert_eq!(forward, backward);
        let wallets: Vec<&str> = forward.iter().map(|f| f.wallet.as_str()).collect();
        assert_eq!(wallets, vec!["0xa", "0xb"]);
    }

    #[test]
    fn test_feature_vector_order_matches_names() {
        let rows = vec![tx("0xa", "liquidationcall", Some(2.0), Some(3.0), "USDC", 1)];
        let f = &aggregate_wallet_features(&rows)[0];
        let v = f.feature_vector();
        assert_eq!(v.len(), FEATURE_NAMES.len());
        assert_eq!(FEATURE_NAMES[11], "has_liquidation");
        assert!((v[11] - 1.0).abs() < f64::EPSILON);
        assert_eq!(FEATURE_NAMES[6], "total_usd");
        assert!((v[6] - 6.0).abs() < f64::EPSILON);
    }
}
