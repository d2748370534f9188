mod correction;
mod report;
mod supplier;

pub use correction::{
    CorrectionRecord, CorrectionSet, PatchStyle, LINKER_ERROR_KEY, NO_SUGGESTION,
};
pub use report::{CompilerError, ErrorReport};
pub use supplier::{CorrectionSource, RejectedRecord, SuppliedCorrections, SupplierError};
