use crate::data::CorrectionSet;
use std::fmt;

/// A record the supplier had to discard while decoding its output.
#[derive(Debug, Clone)]
pub struct RejectedRecord {
    /// File key the record was filed under.
    pub file: String,
    /// Decoder message explaining the rejection.
    pub detail: String,
}

/// The corrections produced for one run, plus any records rejected while
/// decoding them.
#[derive(Debug, Clone, Default)]
pub struct SuppliedCorrections {
    pub set: CorrectionSet,
    pub rejected: Vec<RejectedRecord>,
}

/// Errors that can occur while obtaining a correction set
#[derive(Debug)]
pub enum SupplierError {
    /// The supplier's output does not exist (yet).
    NotFound(String),
    /// The output exists but is not decodable at all.
    Malformed(String),
}

impl fmt::Display for SupplierError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SupplierError::NotFound(path) => {
                write!(f, "No corrections available at '{}'", path)
            }
            SupplierError::Malformed(details) => {
                write!(f, "Correction data is malformed: {}", details)
            }
        }
    }
}

impl std::error::Error for SupplierError {}

/// Produces the correction set for a run.
///
/// Implementations should reject individual undecodable records (reporting
/// them in `SuppliedCorrections::rejected`) rather than failing the whole
/// set; `SupplierError` is reserved for output that cannot be read at all.
pub trait CorrectionSource {
    fn load(&self) -> Result<SuppliedCorrections, SupplierError>;
}
