use std::path::Path;

use ndarray::{array, Array1};

use crate::{
    artifact::ModelArtifact,
    error::{EstimatorError, Result},
};

/// The attributes of one business, as entered for a single estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct BusinessProfile {
    pub business_type: String,
    pub location: String,
    pub employees: u32,
    pub material_cost: f64,
    pub production_target: u32,
    pub revenue: f64,
}

impl BusinessProfile {
    fn validate(&self) -> Result<()> {
        if self.employees == 0 {
            return Err(EstimatorError::InvalidInput(
                "employee count must be at least 1".into(),
            ));
        }
        if self.production_target == 0 {
            return Err(EstimatorError::InvalidInput(
                "production target must be at least 1".into(),
            ));
        }

        for (what, value) in [
            ("material cost", self.material_cost),
            ("revenue", self.revenue),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(EstimatorError::InvalidInput(format!(
                    "{what} must be a non-negative amount, got {value}"
                )));
            }
        }

        Ok(())
    }
}

impl ModelArtifact {
    /// Builds the feature row the model was trained on for `profile`.
    ///
    /// # Errors
    /// Returns `UnknownCategory` if either category was not seen during training.
    pub fn features(&self, profile: &BusinessProfile) -> Result<Array1<f64>> {
        let business_type = self.encode_business_type(&profile.business_type)?;
        let location = self.encode_location(&profile.location)?;

        Ok(array![
            business_type as f64,
            location as f64,
            f64::from(profile.employees),
            profile.material_cost,
            f64::from(profile.production_target),
            profile.revenue,
        ])
    }

    /// Estimates the capital needed by `profile`, rounded to two decimals.
    ///
    /// # Errors
    /// `InvalidInput` for out-of-domain numbers, `UnknownCategory` for a
    /// business type or location unseen during training.
    pub fn predict(&self, profile: &BusinessProfile) -> Result<f64> {
        profile.validate()?;
        let row = self.features(profile)?;
        let estimate = self.model().predict(row.view())?;
        Ok(round_to_cents(estimate))
    }
}

/// Loads the artifact at `model_path` and estimates the capital for one business.
///
/// The artifact is read again on every call; load a [`ModelArtifact`] once and
/// call [`ModelArtifact::predict`] to avoid that.
///
/// # Errors
/// `NotFound` if the artifact is missing, plus everything
/// [`ModelArtifact::predict`] can return.
pub fn predict<P: AsRef<Path>>(
    model_path: P,
    business_type: &str,
    location: &str,
    employees: u32,
    material_cost: f64,
    production_target: u32,
    revenue: f64,
) -> Result<f64> {
    let artifact = ModelArtifact::load(model_path)?;
    artifact.predict(&BusinessProfile {
        business_type: business_type.to_string(),
        location: location.to_string(),
        employees,
        material_cost,
        production_target,
        revenue,
    })
}

/// Rounds half away from zero to two decimal places.
pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Formats an amount as whole Rupiah with thousands separators, e.g. `Rp 1,250,000`.
pub fn format_rupiah(amount: f64) -> String {
    let rounded = amount.round();
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if rounded < 0.0 {
        format!("-Rp {grouped}")
    } else {
        format!("Rp {grouped}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> BusinessProfile {
        BusinessProfile {
            business_type: "Kuliner".into(),
            location: "Bandung".into(),
            employees: 3,
            material_cost: 1_500_000.0,
            production_target: 200,
            revenue: 9_000_000.0,
        }
    }

    #[test]
    fn rounds_to_two_decimals() {
        assert_eq!(round_to_cents(1234.5678), 1234.57);
        assert_eq!(round_to_cents(1234.561), 1234.56);
        assert_eq!(round_to_cents(-0.005), -0.01);
        assert_eq!(round_to_cents(42.0), 42.0);
    }

    #[test]
    fn rupiah_grouping() {
        assert_eq!(format_rupiah(0.0), "Rp 0");
        assert_eq!(format_rupiah(999.4), "Rp 999");
        assert_eq!(format_rupiah(1000.0), "Rp 1,000");
        assert_eq!(format_rupiah(25_000_000.49), "Rp 25,000,000");
        assert_eq!(format_rupiah(123_456_789.5), "Rp 123,456,790");
        assert_eq!(format_rupiah(-1500.0), "-Rp 1,500");
    }

    #[test]
    fn profile_bounds() {
        assert!(profile().validate().is_ok());

        let p = BusinessProfile {
            employees: 0,
            ..profile()
        };
        assert!(matches!(p.validate(), Err(EstimatorError::InvalidInput(_))));

        let p = BusinessProfile {
            production_target: 0,
            ..profile()
        };
        assert!(p.validate().is_err());

        let p = BusinessProfile {
            revenue: -1.0,
            ..profile()
        };
        assert!(p.validate().is_err());

        let p = BusinessProfile {
            material_cost: f64::NAN,
            ..profile()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn missing_artifact_propagates_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = predict(
            dir.path().join("model.json"),
            "Kuliner",
            "Bandung",
            3,
            1_500_000.0,
            200,
            9_000_000.0,
        )
        .unwrap_err();
        assert!(matches!(err, EstimatorError::NotFound { .. }));
    }
}
