use std::{error::Error, fmt, io, path::PathBuf};

/// The result type used across the whole crate.
pub type Result<T> = std::result::Result<T, EstimatorError>;

/// All errors that can occur while training or querying the estimator.
#[derive(Debug)]
pub enum EstimatorError {
    /// A required input file does not exist.
    NotFound { what: &'static str, path: PathBuf },
    /// Any other I/O failure, with the path that caused it.
    Io { path: PathBuf, source: io::Error },
    /// The dataset is not valid CSV or a cell has the wrong type.
    Csv(csv::Error),
    /// The dataset header lacks an expected column.
    MissingColumn(&'static str),
    /// A dataset row violates the data model.
    InvalidRecord { row: usize, msg: String },
    /// A category label was never seen during training.
    UnknownCategory { column: &'static str, label: String },
    /// A category code is outside the encoder's range.
    UnknownCode { column: &'static str, code: usize },
    /// Invalid parameters or inputs (ranges, sizes).
    InvalidInput(String),
    /// The artifact could not be serialized or deserialized.
    Artifact(serde_json::Error),
    /// The artifact deserialized but is structurally unusable.
    CorruptArtifact(String),
}

impl EstimatorError {
    /// Maps an I/O error on `path`, turning `NotFound` into its own variant.
    pub(crate) fn io(what: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound { what, path },
            _ => Self::Io { path, source },
        }
    }
}

impl fmt::Display for EstimatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { what, path } => {
                write!(f, "{what} file not found: {}", path.display())
            }
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Csv(e) => write!(f, "csv error: {e}"),
            Self::MissingColumn(column) => {
                write!(f, "dataset is missing required column '{column}'")
            }
            Self::InvalidRecord { row, msg } => write!(f, "invalid record at row {row}: {msg}"),
            Self::UnknownCategory { column, label } => {
                write!(f, "unknown {column} '{label}': not seen during training")
            }
            Self::UnknownCode { column, code } => {
                write!(f, "unknown {column} code {code}")
            }
            Self::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Self::Artifact(e) => write!(f, "artifact error: {e}"),
            Self::CorruptArtifact(msg) => write!(f, "corrupt artifact: {msg}"),
        }
    }
}

impl Error for EstimatorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Csv(e) => Some(e),
            Self::Artifact(e) => Some(e),
            _ => None,
        }
    }
}

impl From<csv::Error> for EstimatorError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

impl From<serde_json::Error> for EstimatorError {
    fn from(value: serde_json::Error) -> Self {
        Self::Artifact(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_split_from_other_io() {
        let err = EstimatorError::io(
            "dataset",
            "data/missing.csv",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, EstimatorError::NotFound { what: "dataset", .. }));
        assert!(err.to_string().contains("missing.csv"));

        let err = EstimatorError::io(
            "dataset",
            "data/locked.csv",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, EstimatorError::Io { .. }));
        assert!(err.source().is_some());
    }

    #[test]
    fn display_unknown_category() {
        let err = EstimatorError::UnknownCategory {
            column: "Lokasi",
            label: "Atlantis".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Lokasi"));
        assert!(msg.contains("Atlantis"));
        assert!(err.source().is_none());
    }
}
