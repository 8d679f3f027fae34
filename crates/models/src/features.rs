use serde::{Deserialize, Serialize};

use crate::error::{CourtsideError, Result};

/// Ordered, versioned list of feature names a model was trained with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeatureSchema {
    pub version: String,
    pub fields: Vec<String>,
}

impl FeatureSchema {
    pub fn new(version: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            version: version.into(),
            fields,
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == name)
    }

    /// Checks that `vector` carries exactly these fields in exactly this order.
    /// Nothing is padded or reordered.
    pub fn validate(&self, vector: &FeatureVector) -> Result<()> {
        if vector.names.len() != vector.values.len() {
            return Err(CourtsideError::schema_mismatch(format!(
                "vector has {} names but {} values",
                vector.names.len(),
                vector.values.len()
            )));
        }
        if vector.len() != self.len() {
            return Err(CourtsideError::schema_mismatch(format!(
                "expected {} features for schema {}, got {}",
                self.len(),
                self.version,
                vector.len()
            )));
        }
        if let Some((idx, (expected, actual))) = self
            .fields
            .iter()
            .zip(&vector.names)
            .enumerate()
            .find(|(_, (expected, actual))| expected != actual)
        {
            return Err(CourtsideError::schema_mismatch(format!(
                "feature {idx} should be '{expected}' but was '{actual}'"
            )));
        }
        Ok(())
    }
}

/// Fixed-order numeric encoding of a game or player situation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureVector {
    pub schema_version: String,
    pub names: Vec<String>,
    pub values: Vec<f64>,
}

impl FeatureVector {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.values[idx])
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> FeatureSchema {
        FeatureSchema::new("test", vec!["a".into(), "b".into(), "c".into()])
    }

    fn vector(names: &[&str], values: &[f64]) -> FeatureVector {
        FeatureVector {
            schema_version: "test".into(),
            names: names.iter().map(|s| s.to_string()).collect(),
            values: values.to_vec(),
        }
    }

    #[test]
    fn test_validate_accepts_exact_match() {
        assert!(schema().validate(&vector(&["a", "b", "c"], &[1.0, 2.0, 3.0])).is_ok());
    }

    #[test]
    fn test_validate_rejects_short_vector() {
        let err = schema().validate(&vector(&["a", "b"], &[1.0, 2.0])).unwrap_err();
        assert!(matches!(err, CourtsideError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_validate_rejects_reordered_vector() {
        let err = schema()
            .validate(&vector(&["a", "c", "b"], &[1.0, 3.0, 2.0]))
            .unwrap_err();
        assert!(err.to_string().contains("feature 1"));
    }

    #[test]
    fn test_get_by_name() {
        let v = vector(&["a", "b", "c"], &[1.0, 2.0, 3.0]);
        assert_eq!(v.get("b"), Some(2.0));
        assert_eq!(v.get("z"), None);
    }
}
