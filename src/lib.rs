//! Business capital estimation.
//!
//! A random forest is trained on a CSV of business profiles (type, location,
//! employees, material cost, production target, revenue) against the capital
//! they needed. The fitted forest and the two category encoders are saved as a
//! single [`ModelArtifact`], which [`predict`] loads to estimate the capital of
//! a new profile.

pub mod artifact;
pub mod config;
pub mod dataset;
pub mod encoder;
pub mod error;
pub mod forest;
pub mod metrics;
pub mod predict;
pub mod stats;
pub mod train;

pub use artifact::ModelArtifact;
pub use config::{ForestConfig, TrainingConfig};
pub use dataset::{BusinessRecord, Dataset, NumericColumn, ScatterPoint};
pub use encoder::CategoryEncoder;
pub use error::{EstimatorError, Result};
pub use forest::RandomForestRegressor;
pub use predict::{format_rupiah, predict, BusinessProfile};
pub use stats::{correlation_matrix, scatter_table, CorrelationMatrix, SCATTER_SERIES};
pub use train::{train, TrainingReport};
