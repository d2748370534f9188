use crate::data::{CorrectionRecord, CorrectionSource, RejectedRecord, SuppliedCorrections, SupplierError};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

const CORRECTIONS_FILE: &str = "corrected_code.json";

/// File-backed implementation of CorrectionSource
///
/// Reads the corrections file a supplier wrote for the current build. Two
/// shapes are accepted: a single path-keyed object, or an array of
/// path-keyed objects merged in order. Records that fail typed decoding are
/// rejected individually without discarding the rest of the set.
#[derive(Debug, Clone)]
pub struct FileCorrectionSource {
    path: PathBuf,
}

impl FileCorrectionSource {
    /// Creates a new FileCorrectionSource
    ///
    /// # Arguments
    /// * `corrections_path` - Optional path to the corrections file (defaults to "Data/corrected_code.json")
    pub fn new(corrections_path: Option<PathBuf>) -> Self {
        Self {
            path: corrections_path
                .unwrap_or_else(|| PathBuf::from("Data").join(CORRECTIONS_FILE)),
        }
    }

    fn decode_object(
        &self,
        object: &serde_json::Map<String, Value>,
        supplied: &mut SuppliedCorrections,
    ) {
        for (file, records) in object {
            let Some(array) = records.as_array() else {
                supplied.rejected.push(RejectedRecord {
                    file: file.clone(),
                    detail: "expected an array of correction records".to_string(),
                });
                continue;
            };

            for value in array {
                match serde_json::from_value::<CorrectionRecord>(value.clone()) {
                    Ok(record) => supplied.set.push_record(file, record),
                    Err(e) => supplied.rejected.push(RejectedRecord {
                        file: file.clone(),
                        detail: e.to_string(),
                    }),
                }
            }
        }
    }
}

impl CorrectionSource for FileCorrectionSource {
    fn load(&self) -> Result<SuppliedCorrections, SupplierError> {
        if !self.path.exists() {
            return Err(SupplierError::NotFound(self.path.display().to_string()));
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            SupplierError::Malformed(format!("{}: {}", self.path.display(), e))
        })?;

        let value: Value = serde_json::from_str(&content)
            .map_err(|e| SupplierError::Malformed(e.to_string()))?;

        let mut supplied = SuppliedCorrections::default();
        match value {
            Value::Object(object) => self.decode_object(&object, &mut supplied),
            Value::Array(items) => {
                for item in items {
                    if let Value::Object(object) = item {
                        self.decode_object(&object, &mut supplied);
                    } else {
                        supplied.rejected.push(RejectedRecord {
                            file: self.path.display().to_string(),
                            detail: "array element is not a path-keyed object".to_string(),
                        });
                    }
                }
            }
            _ => {
                return Err(SupplierError::Malformed(
                    "top level must be an object or an array of objects".to_string(),
                ));
            }
        }

        Ok(supplied)
    }
}
