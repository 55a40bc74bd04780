//! Seeded random-forest regressor.
//!
//! CART trees on squared error, grown to purity on bootstrap samples. Every
//! split considers all features, visited in a per-node shuffled order, so the
//! only randomness is the bootstrap and tie-breaking. Both come from
//! `ChaCha8Rng`, which makes a fit reproducible across runs and platforms.

use anyhow::{bail, Result};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};
use common::config::Model;
use rand_chacha::ChaCha8Rng;

/// Adjacent feature values closer than this are treated as equal and never split between.
const FEATURE_THRESHOLD: f64 = 1e-7;

/// Nodes whose targets all lie within this distance of each other become leaves.
const PURITY_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    fn predict(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[feature] <= threshold { left } else { right };
                }
            }
        }
    }

    fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((idx, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            if let Node::Split { left, right, .. } = self.nodes[idx] {
                stack.push((left, depth + 1));
                stack.push((right, depth + 1));
            }
        }
        max_depth
    }
}

struct BestSplit {
    feature: usize,
    threshold: f64,
}

fn mean_of(y: &[f64], samples: &[usize]) -> f64 {
    samples.iter().map(|&i| y[i]).sum::<f64>() / samples.len() as f64
}

fn is_pure(y: &[f64], samples: &[usize]) -> bool {
    let (lo, hi) = samples
        .iter()
        .map(|&i| y[i])
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    hi - lo <= PURITY_TOLERANCE
}

/// Best squared-error split of `samples`, or `None` when every feature is constant.
///
/// Maximizes `sum_l^2 / n_l + sum_r^2 / n_r`, which is equivalent to minimizing
/// the children's summed squared error.
fn best_split(
    x: &[Vec<f64>],
    y: &[f64],
    samples: &[usize],
    rng: &mut ChaCha8Rng,
) -> Option<BestSplit> {
    let n = samples.len();
    let n_features = x[samples[0]].len();
    let total_sum: f64 = samples.iter().map(|&i| y[i]).sum();

    let mut features: Vec<usize> = (0..n_features).collect();
    features.shuffle(rng);

    let mut order = samples.to_vec();
    let mut best: Option<BestSplit> = None;
    let mut best_proxy = f64::NEG_INFINITY;

    for feature in features {
        order.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

        let mut left_sum = 0.0;
        for k in 0..n - 1 {
            let current = x[order[k]][feature];
            let next = x[order[k + 1]][feature];
            left_sum += y[order[k]];
            if next <= current + FEATURE_THRESHOLD {
                continue;
            }

            let n_left = (k + 1) as f64;
            let n_right = (n - k - 1) as f64;
            let right_sum = total_sum - left_sum;
            let proxy = left_sum * left_sum / n_left + right_sum * right_sum / n_right;
            if proxy > best_proxy {
                let mut threshold = current + (next - current) / 2.0;
                if !threshold.is_finite() || threshold >= next {
                    threshold = current;
                }
                best_proxy = proxy;
                best = Some(BestSplit { feature, threshold });
            }
        }
    }
    best
}

fn build_tree(
    x: &[Vec<f64>],
    y: &[f64],
    samples: Vec<usize>,
    params: &Model,
    rng: &mut ChaCha8Rng,
) -> RegressionTree {
    let mut nodes = vec![Node::Leaf { value: 0.0 }];
    let mut stack = vec![(0usize, samples, 0usize)];
    let min_split = params.min_samples_split.max(2);

    while let Some((id, samples, depth)) = stack.pop() {
        let value = mean_of(y, &samples);
        let splittable = samples.len() >= min_split
            && params.max_depth.is_none_or(|max| depth < max)
            && !is_pure(y, &samples);

        let Some(split) = splittable
            .then(|| best_split(x, y, &samples, rng))
            .flatten()
        else {
            nodes[id] = Node::Leaf { value };
            continue;
        };

        let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = samples
            .into_iter()
            .partition(|&i| x[i][split.feature] <= split.threshold);

        let left = nodes.len();
        let right = left + 1;
        nodes.push(Node::Leaf { value: 0.0 });
        nodes.push(Node::Leaf { value: 0.0 });
        nodes[id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        stack.push((left, left_samples, depth + 1));
        stack.push((right, right_samples, depth + 1));
    }

    RegressionTree { nodes }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RandomForestRegressor {
    trees: Vec<RegressionTree>,
}

impl RandomForestRegressor {
    /// Fit on the rows of `x` listed in `train`. Each tree gets its own
    /// bootstrap sample drawn from a seed derived from `params.seed`.
    pub fn fit(
        x: &[Vec<f64>],
        y: &[f64],
        train: &[usize],
        params: &Model,
    ) -> Result<Self> {
        if x.len() != y.len() {
            bail!("feature rows ({}) and labels ({}) differ in length", x.len(), y.len());
        }
        if train.is_empty() {
            bail!("cannot fit a forest on zero training rows");
        }
        if params.n_trees == 0 {
            bail!("forest needs at least one tree");
        }

        let mut master = ChaCha8Rng::seed_from_u64(params.seed);
        let trees: Vec<RegressionTree> = (0..params.n_trees)
            .map(|_| {
                let mut rng = ChaCha8Rng::seed_from_u64(master.next_u64());
                let bootstrap: Vec<usize> = (0..train.len())
                    .map(|_| train[rng.gen_range(0..train.len())])
                    .collect();
                build_tree(x, y, bootstrap, params, &mut rng)
            })
            .collect();

        let max_depth = trees.iter().map(RegressionTree::depth).max().unwrap_or(0);
        tracing::debug!(
            trees = trees.len(),
            train_rows = train.len(),
            max_depth,
            "forest fitted"
        );
        Ok(Self { trees })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn predict_one(&self, row: &[f64]) -> f64 {
        self.trees.iter().map(|t| t.predict(row)).sum::<f64>() / self.trees.len() as f64
    }

    pub fn predict(&self, x: &[Vec<f64>]) -> Vec<f64> {
        x.iter().map(|row| self.predict_one(row)).collect()
    }
}

/// Shuffled train/test partition of `0..n`. The test side gets `ceil(n * test_fraction)`
/// rows, but never all of them.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let fraction = test_fraction.clamp(0.0, 1.0);
    let n_test = ((n as f64 * fraction).ceil() as usize).min(n.saturating_sub(1));
    let train = indices.split_off(n_test);
    (train, indices)
}

/// Coefficient of determination. `None` for empty input or constant targets.
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> Option<f64> {
    if y_true.is_empty() || y_true.len() != y_pred.len() {
        return None;
    }
    let mean = y_true.iter().sum::<f64>() / y_true.len() as f64;
    let ss_tot: f64 = y_true.iter().map(|y| (y - mean).powi(2)).sum();
    if ss_tot <= 0.0 {
        return None;
    }
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(y, p)| (y - p).powi(2))
        .sum();
    Some(1.0 - ss_res / ss_tot)
}

/// Split, fit on the training side, score the held-out side internally, and
/// return the model. The held-out R² is only logged.
pub fn fit_with_holdout(
    x: &[Vec<f64>],
    y: &[f64],
    params: &Model,
) -> Result<RandomForestRegressor> {
    let (train, test) = train_test_split(x.len(), params.test_fraction, params.seed);
    let model = RandomForestRegressor::fit(x, y, &train, params)?;

    let test_true: Vec<f64> = test.iter().map(|&i| y[i]).collect();
    let test_pred: Vec<f64> = test.iter().map(|&i| model.predict_one(&x[i])).collect();
    tracing::debug!(
        train_rows = train.len(),
        test_rows = test.len(),
        holdout_r2 = ?r2_score(&test_true, &test_pred),
        "holdout evaluated"
    );
    Ok(model)
}
