use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{EstimatorError, Result};

/// Bijective mapping between the labels of one categorical column and the
/// dense codes `0..k`.
///
/// Codes follow the byte-wise lexicographic order of the labels, so the same
/// set of labels always yields the same codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryEncoder {
    classes: Vec<String>,
}

impl CategoryEncoder {
    /// Fits an encoder over every distinct label in `labels`.
    pub fn fit<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let classes: BTreeSet<String> = labels
            .into_iter()
            .map(|l| l.as_ref().to_string())
            .collect();

        Self {
            classes: classes.into_iter().collect(),
        }
    }

    /// The known labels, indexed by code.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Returns the code of `label`, or `None` if it was not seen while fitting.
    pub fn code(&self, label: &str) -> Option<usize> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(label))
            .ok()
    }

    /// Returns the label behind `code`, or `None` if it is out of range.
    pub fn label(&self, code: usize) -> Option<&str> {
        self.classes.get(code).map(String::as_str)
    }

    /// Checks that a deserialized encoder is still a valid bijection.
    ///
    /// # Errors
    /// Returns `CorruptArtifact` if the classes are empty or not strictly sorted.
    pub(crate) fn validate(&self, column: &str) -> Result<()> {
        if self.classes.is_empty() {
            return Err(EstimatorError::CorruptArtifact(format!(
                "{column} encoder has no classes"
            )));
        }

        if self.classes.windows(2).any(|w| w[0] >= w[1]) {
            return Err(EstimatorError::CorruptArtifact(format!(
                "{column} encoder classes are not strictly sorted"
            )));
        }

        Ok(())
    }
}
