use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::{EstimatorError, Result};

/// A node of a regression tree, stored in a flat arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Samples with `x[feature] <= threshold` continue at `left`, the rest at `right`.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf { value: f64 },
}

/// Growth limits of a single tree.
#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    pub min_samples_split: usize,
    pub max_depth: Option<usize>,
}

/// A CART regression tree using the squared-error criterion.
///
/// Nodes are kept in pre-order: the root is at index 0 and every child is
/// stored after its parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
    n_features: usize,
}

struct Split {
    feature: usize,
    threshold: f64,
}

impl RegressionTree {
    /// Grows a tree on the rows of `x` listed in `samples`.
    ///
    /// `samples` may contain repeated indices (bootstrap draws).
    ///
    /// # Errors
    /// Returns `InvalidInput` if `samples` is empty, if `x` and `y` differ in
    /// length, or if an index is not a row of `x`.
    pub fn fit(
        x: ArrayView2<f64>,
        y: ArrayView1<f64>,
        samples: &[usize],
        params: TreeParams,
    ) -> Result<Self> {
        let n = x.nrows();
        if samples.is_empty() {
            return Err(EstimatorError::InvalidInput(
                "cannot grow a tree without samples".into(),
            ));
        }
        if y.len() != n {
            return Err(EstimatorError::InvalidInput(format!(
                "feature rows ({n}) and targets ({}) differ in length",
                y.len()
            )));
        }
        if let Some(&i) = samples.iter().find(|&&i| i >= n) {
            return Err(EstimatorError::InvalidInput(format!(
                "sample index {i} out of range for {n} rows"
            )));
        }

        let mut tree = Self {
            nodes: Vec::new(),
            n_features: x.ncols(),
        };

        tree.grow(x, y, samples.to_vec(), 0, params);
        Ok(tree)
    }

    fn grow(
        &mut self,
        x: ArrayView2<f64>,
        y: ArrayView1<f64>,
        samples: Vec<usize>,
        depth: usize,
        params: TreeParams,
    ) -> usize {
        let id = self.nodes.len();
        let value = samples.iter().map(|&i| y[i]).sum::<f64>() / samples.len() as f64;

        let stop = samples.len() < params.min_samples_split
            || params.max_depth.is_some_and(|max| depth >= max)
            || is_pure(y, &samples);

        let split = if stop { None } else { best_split(x, y, &samples) };
        let Some(Split { feature, threshold }) = split else {
            self.nodes.push(Node::Leaf { value });
            return id;
        };

        let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = samples
            .iter()
            .partition(|&&i| x[[i, feature]] <= threshold);

        // Reserve the slot so the children land after their parent.
        self.nodes.push(Node::Leaf { value });
        let left = self.grow(x, y, left_samples, depth + 1, params);
        let right = self.grow(x, y, right_samples, depth + 1, params);
        self.nodes[id] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };

        id
    }

    /// Predicts the target of a single row.
    ///
    /// # Panics
    /// If `row` has fewer than `n_features` entries.
    pub fn predict(&self, row: ArrayView1<f64>) -> f64 {
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

    /// Checks the invariants a deserialized tree must hold before it is traversed.
    ///
    /// # Errors
    /// Returns `CorruptArtifact` if the tree is empty, a child index is out of
    /// range or points backwards, a split uses an unknown feature, or a value is
    /// not finite.
    pub fn validate(&self) -> Result<()> {
        let corrupt = |msg: String| Err(EstimatorError::CorruptArtifact(msg));

        if self.nodes.is_empty() {
            return corrupt("tree has no nodes".into());
        }

        let len = self.nodes.len();
        for (id, node) in self.nodes.iter().enumerate() {
            match *node {
                Node::Leaf { value } if !value.is_finite() => {
                    return corrupt(format!("node {id}: leaf value {value} is not finite"));
                }
                Node::Leaf { .. } => {}
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if feature >= self.n_features {
                        return corrupt(format!(
                            "node {id}: feature {feature} out of range ({} features)",
                            self.n_features
                        ));
                    }
                    if !threshold.is_finite() {
                        return corrupt(format!("node {id}: threshold is not finite"));
                    }
                    for child in [left, right] {
                        if child <= id || child >= len {
                            return corrupt(format!("node {id}: invalid child index {child}"));
                        }
                    }
                }
            }
        }

        Ok(())
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    /// Longest root-to-leaf path, counted in edges.
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }

        let mut depths = vec![0; self.nodes.len()];
        let mut max = 0;
        for (id, node) in self.nodes.iter().enumerate() {
            if let Node::Split { left, right, .. } = *node {
                depths[left] = depths[id] + 1;
                depths[right] = depths[id] + 1;
                max = max.max(depths[id] + 1);
            }
        }

        max
    }
}

fn is_pure(y: ArrayView1<f64>, samples: &[usize]) -> bool {
    let first = y[samples[0]];
    samples.iter().all(|&i| y[i] == first)
}

/// Finds the split with the largest squared-error reduction.
///
/// Minimizing the children's squared error is the same as maximizing
/// `sum_l^2 / n_l + sum_r^2 / n_r`, which only needs running sums. Ties keep
/// the first candidate found, scanning features in column order.
fn best_split(x: ArrayView2<f64>, y: ArrayView1<f64>, samples: &[usize]) -> Option<Split> {
    let n = samples.len();
    let total: f64 = samples.iter().map(|&i| y[i]).sum();

    let mut best: Option<(f64, Split)> = None;
    let mut order = samples.to_vec();

    for feature in 0..x.ncols() {
        order.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));

        let mut left_sum = 0.0;
        for k in 1..n {
            left_sum += y[order[k - 1]];

            let lo = x[[order[k - 1], feature]];
            let hi = x[[order[k], feature]];
            if lo >= hi {
                continue;
            }

            let right_sum = total - left_sum;
            let score = left_sum * left_sum / k as f64 + right_sum * right_sum / (n - k) as f64;
            if best.as_ref().is_some_and(|(s, _)| score <= *s) {
                continue;
            }

            // The midpoint can round up to `hi`, which would send `hi` left.
            let mut threshold = lo + (hi - lo) / 2.0;
            if threshold >= hi {
                threshold = lo;
            }

            best = Some((score, Split { feature, threshold }));
        }
    }

    best.map(|(_, split)| split)
}
