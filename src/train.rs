use std::path::PathBuf;

use ndarray::{Array1, Array2, Axis};

use crate::{
    artifact::ModelArtifact,
    config::TrainingConfig,
    dataset::{
        train_test_split, Dataset, NumericColumn, BUSINESS_TYPE, FEATURE_COLUMNS, LOCATION,
    },
    encoder::CategoryEncoder,
    error::{EstimatorError, Result},
    forest::RandomForestRegressor,
    metrics,
};

const PREVIEW_ROWS: usize = 5;

/// What a training run did, for the operator to read.
///
/// The scores are observational only; they never decide whether the
/// artifact is written.
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub mae: f64,
    pub r2: f64,
    pub business_types: Vec<String>,
    pub locations: Vec<String>,
    /// The first rows of the dataset, rendered as a table.
    pub preview: String,
    pub model_path: PathBuf,
}

/// Runs a full training job: load the dataset, fit, evaluate, save.
///
/// Nothing is written unless every step before the save succeeds.
///
/// # Errors
/// Any error from validating the config, loading the dataset, fitting the model
/// or writing the artifact aborts the run.
pub fn train(config: &TrainingConfig) -> Result<TrainingReport> {
    config.validate()?;
    let dataset = Dataset::from_path(&config.data_path)?;

    let (artifact, report) = fit(&dataset, config)?;
    artifact.save(&config.model_path)?;
    Ok(report)
}

/// Fits the encoders and the forest on an in-memory dataset.
///
/// # Errors
/// `InvalidInput` if the dataset is too small to split, or any fitting error.
pub fn fit(dataset: &Dataset, config: &TrainingConfig) -> Result<(ModelArtifact, TrainingReport)> {
    let business_type_encoder =
        CategoryEncoder::fit(dataset.records().iter().map(|r| &r.business_type));
    let location_encoder = CategoryEncoder::fit(dataset.records().iter().map(|r| &r.location));

    let (x, y) = encode(dataset, &business_type_encoder, &location_encoder)?;

    let (train_idx, test_idx) =
        train_test_split(dataset.len(), config.test_size, config.split_seed)?;
    log::info!(
        "split {} rows into {} train / {} test",
        dataset.len(),
        train_idx.len(),
        test_idx.len()
    );

    let x_train = x.select(Axis(0), &train_idx);
    let y_train = y.select(Axis(0), &train_idx);
    let x_test = x.select(Axis(0), &test_idx);
    let y_test = y.select(Axis(0), &test_idx);

    log::info!(
        "fitting random forest with {} trees (seed {})",
        config.forest.n_trees,
        config.forest.seed
    );
    let model = RandomForestRegressor::fit(x_train.view(), y_train.view(), &config.forest)?;

    let y_pred = model.predict_batch(x_test.view())?;
    let mae = metrics::mean_absolute_error(y_test.view(), y_pred.view())?;
    let r2 = metrics::r2_score(y_test.view(), y_pred.view())?;
    log::info!("held-out MAE {mae:.2}, R2 {r2:.4}");
    if r2 < 0.0 {
        log::warn!("model does worse than predicting the mean on the test split (R2 {r2:.4})");
    }

    let report = TrainingReport {
        rows: dataset.len(),
        train_rows: train_idx.len(),
        test_rows: test_idx.len(),
        mae,
        r2,
        business_types: business_type_encoder.classes().to_vec(),
        locations: location_encoder.classes().to_vec(),
        preview: dataset.preview(PREVIEW_ROWS),
        model_path: config.model_path.clone(),
    };

    let artifact = ModelArtifact::new(model, business_type_encoder, location_encoder);
    Ok((artifact, report))
}

/// Replaces the category columns by their codes and splits off the label.
fn encode(
    dataset: &Dataset,
    business_types: &CategoryEncoder,
    locations: &CategoryEncoder,
) -> Result<(Array2<f64>, Array1<f64>)> {
    let code_of = |enc: &CategoryEncoder, column: &'static str, label: &str| {
        enc.code(label)
            .map(|c| c as f64)
            .ok_or_else(|| EstimatorError::UnknownCategory {
                column,
                label: label.to_string(),
            })
    };

    let mut x = Array2::zeros((dataset.len(), FEATURE_COLUMNS.len()));
    for (mut row, r) in x.rows_mut().into_iter().zip(dataset.records()) {
        row[0] = code_of(business_types, BUSINESS_TYPE, &r.business_type)?;
        row[1] = code_of(locations, LOCATION, &r.location)?;
        row[2] = f64::from(r.employees);
        row[3] = r.material_cost;
        row[4] = f64::from(r.production_target);
        row[5] = r.revenue;
    }

    let y = dataset.column(NumericColumn::Capital);
    Ok((x, y))
}
