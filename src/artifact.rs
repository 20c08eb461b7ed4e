use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::{
    dataset::{BUSINESS_TYPE, FEATURE_COLUMNS, LOCATION},
    encoder::CategoryEncoder,
    error::{EstimatorError, Result},
    forest::RandomForestRegressor,
};

/// The trained model bundled with the two category encoders it was fit with.
///
/// Built once by a training run and only read afterwards; there is no way to
/// mutate it, so a loaded artifact can be shared freely between callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    model: RandomForestRegressor,
    business_type_encoder: CategoryEncoder,
    location_encoder: CategoryEncoder,
}

impl ModelArtifact {
    pub(crate) fn new(
        model: RandomForestRegressor,
        business_type_encoder: CategoryEncoder,
        location_encoder: CategoryEncoder,
    ) -> Self {
        Self {
            model,
            business_type_encoder,
            location_encoder,
        }
    }

    /// Reads and validates an artifact written by [`ModelArtifact::save`].
    ///
    /// # Errors
    /// `NotFound` if there is no file at `path`, `Artifact` if it is not a valid
    /// artifact document, `CorruptArtifact` if its contents are inconsistent.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| EstimatorError::io("model artifact", path, e))?;
        let artifact: Self = serde_json::from_reader(BufReader::new(file))?;
        artifact.validate()?;

        log::debug!(
            "loaded model artifact from {} ({} trees)",
            path.display(),
            artifact.model.n_trees()
        );
        Ok(artifact)
    }

    /// Writes the artifact to `path`, creating missing parent directories.
    ///
    /// The document is written next to `path` first and renamed into place. On
    /// failure the temporary file is removed and `path` is left untouched.
    ///
    /// # Errors
    /// `Io` if the directory, the file or the rename fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| EstimatorError::io("model directory", dir, e))?;
        }

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = Path::new(&tmp);

        let committed = self.write_json(tmp).and_then(|()| {
            fs::rename(tmp, path).map_err(|e| EstimatorError::io("model artifact", path, e))
        });
        if let Err(e) = committed {
            let _ = fs::remove_file(tmp);
            return Err(e);
        }

        log::info!("saved model artifact to {}", path.display());
        Ok(())
    }

    fn write_json(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| EstimatorError::io("model artifact", path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self)?;
        writer
            .flush()
            .map_err(|e| EstimatorError::io("model artifact", path, e))
    }

    fn validate(&self) -> Result<()> {
        self.business_type_encoder.validate(BUSINESS_TYPE)?;
        self.location_encoder.validate(LOCATION)?;
        self.model.validate()?;

        if self.model.n_features() != FEATURE_COLUMNS.len() {
            return Err(EstimatorError::CorruptArtifact(format!(
                "model expects {} features, the business schema has {}",
                self.model.n_features(),
                FEATURE_COLUMNS.len()
            )));
        }

        Ok(())
    }

    pub fn model(&self) -> &RandomForestRegressor {
        &self.model
    }

    pub fn business_type_encoder(&self) -> &CategoryEncoder {
        &self.business_type_encoder
    }

    pub fn location_encoder(&self) -> &CategoryEncoder {
        &self.location_encoder
    }

    /// Code of a business type, failing on labels unseen during training.
    ///
    /// # Errors
    /// Returns `UnknownCategory` for an unseen label.
    pub fn encode_business_type(&self, label: &str) -> Result<usize> {
        self.business_type_encoder
            .code(label)
            .ok_or_else(|| EstimatorError::UnknownCategory {
                column: BUSINESS_TYPE,
                label: label.to_string(),
            })
    }

    /// Code of a location, failing on labels unseen during training.
    ///
    /// # Errors
    /// Returns `UnknownCategory` for an unseen label.
    pub fn encode_location(&self, label: &str) -> Result<usize> {
        self.location_encoder
            .code(label)
            .ok_or_else(|| EstimatorError::UnknownCategory {
                column: LOCATION,
                label: label.to_string(),
            })
    }

    /// Label behind a business-type code.
    ///
    /// # Errors
    /// Returns `UnknownCode` if the code is out of range.
    pub fn decode_business_type(&self, code: usize) -> Result<&str> {
        self.business_type_encoder
            .label(code)
            .ok_or(EstimatorError::UnknownCode {
                column: BUSINESS_TYPE,
                code,
            })
    }

    /// Label behind a location code.
    ///
    /// # Errors
    /// Returns `UnknownCode` if the code is out of range.
    pub fn decode_location(&self, code: usize) -> Result<&str> {
        self.location_encoder
            .label(code)
            .ok_or(EstimatorError::UnknownCode {
                column: LOCATION,
                code,
            })
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use ndarray::{Array1, Array2};

    use super::*;
    use crate::config::ForestConfig;

    fn tiny_artifact() -> ModelArtifact {
        let x = Array2::from_shape_fn((8, 6), |(i, j)| (i * (j + 1)) as f64);
        let y: Array1<f64> = (0..8).map(|i| i as f64 * 10.0).collect();
        let config = ForestConfig {
            n_trees: NonZeroUsize::new(4).unwrap(),
            ..ForestConfig::default()
        };
        let model = RandomForestRegressor::fit(x.view(), y.view(), &config).unwrap();

        ModelArtifact::new(
            model,
            CategoryEncoder::fit(["Kuliner", "Fashion"]),
            CategoryEncoder::fit(["Jakarta", "Bandung"]),
        )
    }

    #[test]
    fn save_creates_directories_and_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("model").join("model.json");

        let artifact = tiny_artifact();
        artifact.save(&path).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());

        let loaded = ModelArtifact::load(&path).unwrap();
        assert_eq!(loaded, artifact);
    }

    #[test]
    fn failed_save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        fs::create_dir_all(path.join("occupied")).unwrap();

        assert!(tiny_artifact().save(&path).is_err());
        assert!(!dir.path().join("model.json.tmp").exists());
        assert!(path.join("occupied").is_dir());
    }

    #[test]
    fn artifact_can_be_shared_between_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ModelArtifact>();

        let artifact = std::sync::Arc::new(tiny_artifact());
        let expected = artifact.decode_location(0).unwrap().to_string();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let artifact = std::sync::Arc::clone(&artifact);
                std::thread::spawn(move || artifact.decode_location(0).unwrap().to_string())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    }

    #[test]
    fn missing_artifact_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = ModelArtifact::load(dir.path().join("model.json")).unwrap_err();
        assert!(matches!(
            err,
            EstimatorError::NotFound {
                what: "model artifact",
                ..
            }
        ));
    }

    #[test]
    fn garbage_is_an_artifact_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        fs::write(&path, b"{\"model\": 3}").unwrap();
        assert!(matches!(
            ModelArtifact::load(&path),
            Err(EstimatorError::Artifact(_))
        ));
    }

    #[test]
    fn unsorted_encoder_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        tiny_artifact().save(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let text = text.replace(r#"["Bandung","Jakarta"]"#, r#"["Jakarta","Bandung"]"#);
        fs::write(&path, text).unwrap();

        assert!(matches!(
            ModelArtifact::load(&path),
            Err(EstimatorError::CorruptArtifact(_))
        ));
    }

    #[test]
    fn encode_and_decode_categories() {
        let artifact = tiny_artifact();
        let code = artifact.encode_location("Jakarta").unwrap();
        assert_eq!(code, 1);
        assert_eq!(artifact.decode_location(code).unwrap(), "Jakarta");
        assert_eq!(artifact.decode_business_type(0).unwrap(), "Fashion");

        assert!(matches!(
            artifact.encode_business_type("Otomotif"),
            Err(EstimatorError::UnknownCategory {
                column: BUSINESS_TYPE,
                ..
            })
        ));
        assert!(matches!(
            artifact.decode_location(2),
            Err(EstimatorError::UnknownCode { code: 2, .. })
        ));
    }
}
