use crate::contexts::{DescriptionEntry, DescriptionSink};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const DESCRIPTIONS_FILE: &str = "code_change_descriptions.txt";

/// File-backed description logger
///
/// Appends one line per applied correction to the descriptions file,
/// creating the file (and its directory) on first use. Existing entries are
/// never rewritten.
#[derive(Debug, Clone)]
pub struct FileDescriptionLog {
    path: PathBuf,
}

impl FileDescriptionLog {
    /// Creates a new FileDescriptionLog
    ///
    /// # Arguments
    /// * `data_dir` - Directory holding the descriptions file; defaults to "Data"
    pub fn new(data_dir: Option<PathBuf>) -> Self {
        let dir = data_dir.unwrap_or_else(|| PathBuf::from("Data"));
        Self {
            path: dir.join(DESCRIPTIONS_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn format_entry(entry: &DescriptionEntry) -> String {
        format!(
            "[{}] {}:{}:{} {}\n",
            chrono::Utc::now().to_rfc3339(),
            entry.file,
            entry.line_number,
            entry.column_number,
            entry.description
        )
    }
}

impl DescriptionSink for FileDescriptionLog {
    fn record(&mut self, entry: &DescriptionEntry) -> Result<(), std::io::Error> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(Self::format_entry(entry).as_bytes())?;
        Ok(())
    }
}
