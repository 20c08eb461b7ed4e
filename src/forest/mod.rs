//! Random forest regression.
//!
//! Every tree is grown on a bootstrap sample of the training rows and
//! considers all features at every split. The forest predicts the mean of its
//! trees. Each tree draws its own RNG seed from a master generator, so a fixed
//! [`ForestConfig::seed`] always reproduces the same forest.

mod tree;

use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

pub use tree::{Node, RegressionTree, TreeParams};

use crate::{
    config::ForestConfig,
    error::{EstimatorError, Result},
};

/// An ensemble of bagged regression trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl RandomForestRegressor {
    /// Fits a forest on the rows of `x` against the targets `y`.
    ///
    /// # Errors
    /// Returns `EstimatorError::InvalidInput` if `x` and `y` disagree in length,
    /// or if there are no rows or no features.
    pub fn fit(x: ArrayView2<f64>, y: ArrayView1<f64>, config: &ForestConfig) -> Result<Self> {
        let (n, n_features) = x.dim();
        if n != y.len() {
            return Err(EstimatorError::InvalidInput(format!(
                "feature rows ({n}) and targets ({}) differ in length",
                y.len()
            )));
        }
        if n == 0 || n_features == 0 {
            return Err(EstimatorError::InvalidInput(format!(
                "cannot fit a forest on a {n}x{n_features} feature matrix"
            )));
        }

        let params = TreeParams {
            min_samples_split: config.min_samples_split,
            max_depth: config.max_depth,
        };

        let mut seeds = StdRng::seed_from_u64(config.seed);
        let trees = (0..config.n_trees.get())
            .map(|_| {
                let mut rng = StdRng::seed_from_u64(seeds.random());
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
                RegressionTree::fit(x, y, &bootstrap, params)
            })
            .collect::<Result<Vec<_>>>()?;

        let forest = Self { trees, n_features };
        log::debug!(
            "grew {} trees: {} nodes, {} leaves, average depth {:.1}",
            forest.n_trees(),
            forest.trees.iter().map(RegressionTree::n_nodes).sum::<usize>(),
            forest.n_leaves(),
            forest.avg_depth()
        );

        Ok(forest)
    }

    /// Predicts the target of a single row.
    ///
    /// # Errors
    /// Returns `EstimatorError::InvalidInput` if the row has the wrong width.
    pub fn predict(&self, row: ArrayView1<f64>) -> Result<f64> {
        if row.len() != self.n_features {
            return Err(EstimatorError::InvalidInput(format!(
                "expected {} features, got {}",
                self.n_features,
                row.len()
            )));
        }

        let sum: f64 = self.trees.iter().map(|t| t.predict(row)).sum();
        Ok(sum / self.trees.len() as f64)
    }

    /// Predicts every row of `x`.
    ///
    /// # Errors
    /// Same as [`RandomForestRegressor::predict`].
    pub fn predict_batch(&self, x: ArrayView2<f64>) -> Result<Array1<f64>> {
        x.rows().into_iter().map(|row| self.predict(row)).collect()
    }

    /// Checks a deserialized forest before it is used for prediction.
    ///
    /// # Errors
    /// Returns `CorruptArtifact` if the forest is empty or any tree is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.trees.is_empty() {
            return Err(EstimatorError::CorruptArtifact("forest has no trees".into()));
        }

        for (i, tree) in self.trees.iter().enumerate() {
            if tree.n_features() != self.n_features {
                return Err(EstimatorError::CorruptArtifact(format!(
                    "tree {i} expects {} features, forest expects {}",
                    tree.n_features(),
                    self.n_features
                )));
            }
            tree.validate()?;
        }

        Ok(())
    }

    #[inline]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Total number of leaves across the forest.
    pub fn n_leaves(&self) -> usize {
        self.trees.iter().map(RegressionTree::n_leaves).sum()
    }

    /// Average tree depth across the forest.
    pub fn avg_depth(&self) -> f64 {
        let total: usize = self.trees.iter().map(RegressionTree::depth).sum();
        total as f64 / self.trees.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use ndarray::{array, Array2};

    use super::*;

    fn config(n_trees: usize, seed: u64) -> ForestConfig {
        ForestConfig {
            n_trees: NonZeroUsize::new(n_trees).unwrap(),
            seed,
            ..ForestConfig::default()
        }
    }

    fn linear_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((50, 2), |(i, j)| if j == 0 { i as f64 } else { 1.0 });
        let y = x.column(0).mapv(|v| 3.0 * v + 5.0);
        (x, y)
    }

    #[test]
    fn same_seed_same_forest() {
        let (x, y) = linear_data();
        let a = RandomForestRegressor::fit(x.view(), y.view(), &config(10, 42)).unwrap();
        let b = RandomForestRegressor::fit(x.view(), y.view(), &config(10, 42)).unwrap();
        assert_eq!(a, b);

        let c = RandomForestRegressor::fit(x.view(), y.view(), &config(10, 43)).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn predictions_stay_within_target_range() {
        let (x, y) = linear_data();
        let forest = RandomForestRegressor::fit(x.view(), y.view(), &config(20, 1)).unwrap();
        assert_eq!(forest.n_trees(), 20);

        let preds = forest.predict_batch(x.view()).unwrap();
        for p in preds.iter() {
            assert!((5.0..=152.0).contains(p));
        }

        let mid = forest.predict(array![25.0, 1.0].view()).unwrap();
        assert!((mid - 80.0).abs() < 10.0, "mid prediction {mid}");
    }

    #[test]
    fn constant_target_is_predicted_exactly() {
        let x = Array2::from_shape_fn((10, 3), |(i, j)| (i + j) as f64);
        let y = Array1::from_elem(10, 7.5);
        let forest = RandomForestRegressor::fit(x.view(), y.view(), &config(5, 0)).unwrap();
        assert_eq!(forest.predict(array![100.0, -3.0, 0.5].view()).unwrap(), 7.5);
        assert_eq!(forest.avg_depth(), 0.0);
        assert_eq!(forest.n_leaves(), 5);
    }

    #[test]
    fn wrong_width_is_rejected() {
        let (x, y) = linear_data();
        let forest = RandomForestRegressor::fit(x.view(), y.view(), &config(3, 0)).unwrap();
        assert!(matches!(
            forest.predict(array![1.0].view()),
            Err(EstimatorError::InvalidInput(_))
        ));
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let x = Array2::<f64>::zeros((4, 2));
        let y = Array1::<f64>::zeros(3);
        assert!(RandomForestRegressor::fit(x.view(), y.view(), &config(3, 0)).is_err());

        let x = Array2::<f64>::zeros((0, 2));
        let y = Array1::<f64>::zeros(0);
        assert!(RandomForestRegressor::fit(x.view(), y.view(), &config(3, 0)).is_err());
    }

    #[test]
    fn serde_round_trip_keeps_predictions() {
        let (x, y) = linear_data();
        let forest = RandomForestRegressor::fit(x.view(), y.view(), &config(8, 9)).unwrap();

        let json = serde_json::to_string(&forest).unwrap();
        let back: RandomForestRegressor = serde_json::from_str(&json).unwrap();
        back.validate().unwrap();

        let row = array![17.3, 1.0];
        assert_eq!(
            forest.predict(row.view()).unwrap().to_bits(),
            back.predict(row.view()).unwrap().to_bits()
        );
    }

    #[test]
    fn empty_forest_fails_validation() {
        let forest: RandomForestRegressor =
            serde_json::from_str(r#"{"trees":[],"n_features":6}"#).unwrap();
        assert!(matches!(
            forest.validate(),
            Err(EstimatorError::CorruptArtifact(_))
        ));
    }
}
