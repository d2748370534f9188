mod correction_source;
mod description_log;
mod settings;

pub use correction_source::FileCorrectionSource;
pub use description_log::FileDescriptionLog;
pub use settings::{Settings, SettingsError};
