//! Applies externally proposed source-code corrections to files on disk,
//! with a history store to keep already-applied fixes from being re-proposed.

pub mod correction_history;
pub mod contexts;
pub mod data;
pub mod registries;
