use std::{
    fmt::Write as _,
    fs::File,
    io::Read,
    path::Path,
};

use ndarray::Array1;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::Deserialize;

use crate::error::{EstimatorError, Result};

pub const BUSINESS_TYPE: &str = "Jenis Usaha";
pub const LOCATION: &str = "Lokasi";
pub const EMPLOYEES: &str = "Karyawan";
pub const MATERIAL_COST: &str = "Harga Bahan";
pub const PRODUCTION_TARGET: &str = "Target Produksi";
pub const REVENUE: &str = "Omset";
pub const CAPITAL: &str = "Modal";

/// Predictor columns, in the order the model consumes them.
pub const FEATURE_COLUMNS: [&str; 6] = [
    BUSINESS_TYPE,
    LOCATION,
    EMPLOYEES,
    MATERIAL_COST,
    PRODUCTION_TARGET,
    REVENUE,
];

/// One row of the business dataset.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BusinessRecord {
    #[serde(rename = "Jenis Usaha")]
    pub business_type: String,
    #[serde(rename = "Lokasi")]
    pub location: String,
    #[serde(rename = "Karyawan")]
    pub employees: u32,
    #[serde(rename = "Harga Bahan")]
    pub material_cost: f64,
    #[serde(rename = "Target Produksi")]
    pub production_target: u32,
    #[serde(rename = "Omset")]
    pub revenue: f64,
    #[serde(rename = "Modal")]
    pub capital: f64,
}

impl BusinessRecord {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.business_type.is_empty() {
            return Err(format!("'{BUSINESS_TYPE}' is empty"));
        }
        if self.location.is_empty() {
            return Err(format!("'{LOCATION}' is empty"));
        }
        if self.employees == 0 {
            return Err(format!("'{EMPLOYEES}' must be at least 1"));
        }
        if self.production_target == 0 {
            return Err(format!("'{PRODUCTION_TARGET}' must be at least 1"));
        }

        for (name, value) in [(MATERIAL_COST, self.material_cost), (REVENUE, self.revenue)] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("'{name}' must be a non-negative amount, got {value}"));
            }
        }

        if !self.capital.is_finite() {
            return Err(format!("'{CAPITAL}' must be finite, got {}", self.capital));
        }

        Ok(())
    }
}

/// The numeric columns of the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericColumn {
    Employees,
    MaterialCost,
    ProductionTarget,
    Revenue,
    Capital,
}

impl NumericColumn {
    pub const ALL: [NumericColumn; 5] = [
        NumericColumn::Employees,
        NumericColumn::MaterialCost,
        NumericColumn::ProductionTarget,
        NumericColumn::Revenue,
        NumericColumn::Capital,
    ];

    /// The CSV header of this column.
    pub fn name(self) -> &'static str {
        match self {
            NumericColumn::Employees => EMPLOYEES,
            NumericColumn::MaterialCost => MATERIAL_COST,
            NumericColumn::ProductionTarget => PRODUCTION_TARGET,
            NumericColumn::Revenue => REVENUE,
            NumericColumn::Capital => CAPITAL,
        }
    }

    fn value(self, record: &BusinessRecord) -> f64 {
        match self {
            NumericColumn::Employees => f64::from(record.employees),
            NumericColumn::MaterialCost => record.material_cost,
            NumericColumn::ProductionTarget => f64::from(record.production_target),
            NumericColumn::Revenue => record.revenue,
            NumericColumn::Capital => record.capital,
        }
    }
}

/// A row of the dataset projected onto two numeric columns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterPoint<'a> {
    pub business_type: &'a str,
    pub location: &'a str,
    pub x: f64,
    pub y: f64,
}

/// An in-memory, validated copy of the business dataset.
#[derive(Debug, Clone)]
pub struct Dataset {
    records: Vec<BusinessRecord>,
}

impl Dataset {
    /// Reads and validates the CSV dataset at `path`.
    ///
    /// # Errors
    /// `NotFound` if the file does not exist, `MissingColumn` if the header lacks
    /// a required column, `Csv` or `InvalidRecord` for malformed rows.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| EstimatorError::io("dataset", path, e))?;
        let dataset = Self::from_reader(file)?;
        log::info!("loaded {} rows from {}", dataset.len(), path.display());
        Ok(dataset)
    }

    /// Reads and validates CSV data from any reader.
    ///
    /// The header is checked for every required column before any row is read.
    ///
    /// # Errors
    /// Same as [`Dataset::from_path`], minus the file errors.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        for column in FEATURE_COLUMNS.iter().chain([CAPITAL].iter()) {
            if !headers.iter().any(|h| h == *column) {
                return Err(EstimatorError::MissingColumn(*column));
            }
        }

        let mut records = Vec::new();
        for (i, record) in rdr.deserialize::<BusinessRecord>().enumerate() {
            let record = record?;
            record
                .validate()
                .map_err(|msg| EstimatorError::InvalidRecord { row: i + 1, msg })?;
            records.push(record);
        }

        Ok(Self { records })
    }

    /// Builds a dataset from already parsed rows, validating each one.
    ///
    /// # Errors
    /// `InvalidRecord` for the first row that violates the data model.
    pub fn from_records(records: Vec<BusinessRecord>) -> Result<Self> {
        for (i, record) in records.iter().enumerate() {
            record
                .validate()
                .map_err(|msg| EstimatorError::InvalidRecord { row: i + 1, msg })?;
        }

        Ok(Self { records })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn records(&self) -> &[BusinessRecord] {
        &self.records
    }

    /// All values of a numeric column, in row order.
    pub fn column(&self, column: NumericColumn) -> Array1<f64> {
        self.records.iter().map(|r| column.value(r)).collect()
    }

    /// One point per row for plotting one numeric column against another, each
    /// tagged with the row's business type and location.
    pub fn scatter(&self, x: NumericColumn, y: NumericColumn) -> Vec<ScatterPoint<'_>> {
        self.records
            .iter()
            .map(|r| ScatterPoint {
                business_type: &r.business_type,
                location: &r.location,
                x: x.value(r),
                y: y.value(r),
            })
            .collect()
    }

    /// Renders the first `n` rows as an aligned text table.
    pub fn preview(&self, n: usize) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:>4}  {:<16} {:<14} {:>8} {:>14} {:>15} {:>14} {:>14}",
            "", BUSINESS_TYPE, LOCATION, EMPLOYEES, MATERIAL_COST, PRODUCTION_TARGET, REVENUE,
            CAPITAL
        );

        for (i, r) in self.records.iter().take(n).enumerate() {
            let _ = writeln!(
                out,
                "{:>4}  {:<16} {:<14} {:>8} {:>14.2} {:>15} {:>14.2} {:>14.2}",
                i,
                r.business_type,
                r.location,
                r.employees,
                r.material_cost,
                r.production_target,
                r.revenue,
                r.capital
            );
        }

        out
    }
}

/// Splits `0..n` into `(train, test)` index sets.
///
/// The indices are shuffled with a generator seeded by `seed`; the first
/// `ceil(test_size * n)` of them form the test set and the rest the training set.
///
/// # Errors
/// Returns `EstimatorError::InvalidInput` if either side would be empty.
pub fn train_test_split(n: usize, test_size: f64, seed: u64) -> Result<(Vec<usize>, Vec<usize>)> {
    let n_test = (test_size * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(EstimatorError::InvalidInput(format!(
            "cannot split {n} rows with test_size {test_size}: one side would be empty"
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train = indices.split_off(n_test);
    Ok((train, indices))
}
