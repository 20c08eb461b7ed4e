use std::{env, num::NonZeroUsize, path::PathBuf};

use crate::error::{EstimatorError, Result};

pub const DEFAULT_DATA_PATH: &str = "data/modal_usaha.csv";
pub const DEFAULT_MODEL_PATH: &str = "model/model.json";

const DATA_PATH_VAR: &str = "CAPITAL_DATA_PATH";
const MODEL_PATH_VAR: &str = "CAPITAL_MODEL_PATH";

const DEFAULT_TREES: NonZeroUsize = match NonZeroUsize::new(100) {
    Some(n) => n,
    None => unreachable!(),
};

/// Hyperparameters of the random forest regressor.
#[derive(Debug, Clone, Copy)]
pub struct ForestConfig {
    pub n_trees: NonZeroUsize,
    pub seed: u64,
    /// Nodes with fewer samples than this become leaves.
    pub min_samples_split: usize,
    pub max_depth: Option<usize>,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: DEFAULT_TREES,
            seed: 42,
            min_samples_split: 2,
            max_depth: None,
        }
    }
}

/// Everything a training run needs.
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    pub data_path: PathBuf,
    pub model_path: PathBuf,
    /// Fraction of the rows held out for evaluation.
    pub test_size: f64,
    pub split_seed: u64,
    pub forest: ForestConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            test_size: 0.2,
            split_seed: 42,
            forest: ForestConfig::default(),
        }
    }
}

impl TrainingConfig {
    /// Default configuration with paths taken from the environment when set.
    pub fn from_env() -> Self {
        Self {
            data_path: data_path_from_env(),
            model_path: model_path_from_env(),
            ..Self::default()
        }
    }

    /// Checks the numeric bounds before any file is touched.
    ///
    /// # Errors
    /// Returns `EstimatorError::InvalidInput` describing the first violated bound.
    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(EstimatorError::InvalidInput(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }

        if self.forest.min_samples_split < 2 {
            return Err(EstimatorError::InvalidInput(format!(
                "min_samples_split must be at least 2, got {}",
                self.forest.min_samples_split
            )));
        }

        Ok(())
    }
}

/// Returns `CAPITAL_DATA_PATH` or the default dataset location.
pub fn data_path_from_env() -> PathBuf {
    env::var(DATA_PATH_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_PATH))
}

/// Returns `CAPITAL_MODEL_PATH` or the default artifact location.
pub fn model_path_from_env() -> PathBuf {
    env::var(MODEL_PATH_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_MODEL_PATH))
}
