use common::config::SyntheticScore;

use crate::wallet_features::WalletFeatures;

/// Upper bound of every published score. Lower bound is 0.
pub const SCORE_SCALE: f64 = 1000.0;

/// Value assigned to every wallet when a score column has no spread
/// (single wallet, or all wallets identical). Midpoint of the scale.
pub const DEGENERATE_SCORE: f64 = SCORE_SCALE / 2.0;

/// Hand-built label: rewards collateral-heavy, repaying, diversified wallets and
/// penalizes any liquidation. Unbounded; see [`synthetic_scores`] for the scaled version.
pub fn synthetic_score_raw(features: &WalletFeatures, w: &SyntheticScore) -> f64 {
    let liquidated = if features.has_liquidation { 1.0 } else { 0.0 };
    w.deposit_to_borrow_weight * features.deposit_to_borrow_ratio
        + w.repay_ratio_weight * features.repay_ratio
        + w.unique_assets_weight * f64::from(features.unique_assets)
        - w.liquidation_penalty * liquidated
}

/// Synthetic label for every wallet, min-max scaled to `[0, SCORE_SCALE]`.
pub fn synthetic_scores(features: &[WalletFeatures], w: &SyntheticScore) -> Vec<f64> {
    let raw: Vec<f64> = features
        .iter()
        .map(|f| synthetic_score_raw(f, w))
        .collect();
    min_max_scale(&raw)
}

/// Rescale to `[0, SCORE_SCALE]`. When max and min coincide every value becomes
/// [`DEGENERATE_SCORE`]; the output never contains NaN for finite input.
pub fn min_max_scale(values: &[f64]) -> Vec<f64> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    if !(range.is_finite() && range > 0.0) {
        if !values.is_empty() {
            tracing::warn!(
                values = values.len(),
                "score column has no spread, assigning midpoint score"
            );
        }
        return vec![DEGENERATE_SCORE; values.len()];
    }

    values
        .iter()
        .map(|v| (SCORE_SCALE * (v - min) / range).clamp(0.0, SCORE_SCALE))
        .collect()
}
