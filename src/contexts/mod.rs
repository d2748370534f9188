mod file_store;
mod patch_run;

pub use file_store::FileLineStore;
pub use patch_run::{
    DescriptionEntry, DescriptionSink, FileOutcome, FileReport, LineSeparator, LineStore,
    PatchFailure, PatchRun, RunSummary, SourceLines, StoreError,
};
