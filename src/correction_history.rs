//! Correction history store
//!
//! Persists which corrections have already been applied, keyed by
//! file:line:column signature, so repeated fix loops neither re-apply a
//! patch nor re-log the same linker description.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::data::CorrectionSet;

const DEFAULT_DATA_DIR: &str = "Data";
const HISTORY_FILE: &str = "correction_history.json";

/// One recorded correction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub file: String,
    pub line_number: u32,
    pub column_number: u32,
    pub suggestion: String,
    /// Sha256 of the target file right after the correction was applied.
    /// Empty for entries with no target file (linker records).
    pub file_hash: String,
    /// Timestamp of the recording
    pub timestamp: String,
}

/// JSON-persisted map of applied corrections
#[derive(Debug, Clone)]
pub struct CorrectionHistory {
    entries: HashMap<String, HistoryEntry>,
    path: PathBuf,
}

impl CorrectionHistory {
    /// Load the history from disk, or start empty when no history file
    /// exists yet
    ///
    /// # Arguments
    /// * `data_dir` - Directory holding the history file; defaults to `Data`
    pub fn load(data_dir: Option<PathBuf>) -> Result<Self> {
        let dir = data_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let path = dir.join(HISTORY_FILE);

        if path.exists() {
            let content =
                fs::read_to_string(&path).context("Failed to read correction history")?;
            let entries: HashMap<String, HistoryEntry> =
                serde_json::from_str(&content).context("Failed to parse correction history")?;
            Ok(Self { entries, path })
        } else {
            Ok(Self {
                entries: HashMap::new(),
                path,
            })
        }
    }

    /// Save the history to disk as pretty JSON
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create history directory")?;
        }

        let content = serde_json::to_string_pretty(&self.entries)
            .context("Failed to serialize correction history")?;

        fs::write(&self.path, content).context("Failed to write correction history")?;

        Ok(())
    }

    /// Signature a correction is keyed by
    pub fn signature(file: &str, line_number: u32, column_number: u32) -> String {
        format!("{}:{}:{}", file, line_number, column_number)
    }

    pub fn contains(&self, signature: &str) -> bool {
        self.entries.contains_key(signature)
    }

    /// Record an applied correction, capturing the target file's current
    /// content hash. The hash stays empty when the file does not exist,
    /// which is the case for linker entries.
    pub fn record(
        &mut self,
        file: &str,
        line_number: u32,
        column_number: u32,
        suggestion: &str,
    ) -> Result<()> {
        let target = Path::new(file);
        let file_hash = if target.exists() {
            Self::hash_file(target)?
        } else {
            String::new()
        };

        let signature = Self::signature(file, line_number, column_number);
        self.entries.insert(
            signature,
            HistoryEntry {
                file: file.to_string(),
                line_number,
                column_number,
                suggestion: suggestion.to_string(),
                file_hash,
                timestamp: chrono::Utc::now().to_rfc3339(),
            },
        );

        Ok(())
    }

    /// Drop records whose signature is already present.
    /// Returns the filtered set and the number of suppressed records.
    pub fn filter(&self, mut set: CorrectionSet) -> (CorrectionSet, usize) {
        let before = set.record_count();
        set.retain_records(|file, record| !self.contains(&record.signature(file)));
        let suppressed = before - set.record_count();
        (set, suppressed)
    }

    /// True when the entry's target file has changed since the correction
    /// was recorded, or disappeared entirely. Staleness only informs
    /// display; suppression goes by signature.
    pub fn is_stale(&self, entry: &HistoryEntry) -> bool {
        if entry.file_hash.is_empty() {
            return false;
        }
        match Self::hash_file(Path::new(&entry.file)) {
            Ok(hash) => hash != entry.file_hash,
            Err(_) => true,
        }
    }

    /// Remove every entry. Returns the number removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in file, line, column order for stable display
    pub fn sorted_entries(&self) -> Vec<(&str, &HistoryEntry)> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|(signature, entry)| (signature.as_str(), entry))
            .collect();
        entries.sort_by(|a, b| {
            (a.1.file.as_str(), a.1.line_number, a.1.column_number)
                .cmp(&(b.1.file.as_str(), b.1.line_number, b.1.column_number))
        });
        entries
    }

    /// Compute SHA256 hash of a file
    fn hash_file(path: &Path) -> Result<String> {
        let content =
            fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;

        let mut hasher = Sha256::new();
        hasher.update(&content);
        let result = hasher.finalize();

        Ok(hex::encode(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CorrectionRecord;
    use tempfile::TempDir;

    fn record_at(line: u32) -> CorrectionRecord {
        CorrectionRecord {
            line_number: line,
            column_number: None,
            corrected_code_snippet: Some(vec!["x".to_string()]),
            code_change_description: Some("desc".to_string()),
            error_description: None,
            patch_style: None,
        }
    }

    #[test]
    fn test_missing_history_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let history = CorrectionHistory::load(Some(dir.path().to_path_buf())).unwrap();
        assert!(history.is_empty());
    }

    #[test]
    fn test_record_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("main.cpp");
        fs::write(&target, "int main() {}\n").unwrap();
        let target = target.to_string_lossy().to_string();

        let mut history = CorrectionHistory::load(Some(dir.path().to_path_buf())).unwrap();
        history.record(&target, 1, 5, "renamed variable").unwrap();
        history.save().unwrap();

        let reloaded = CorrectionHistory::load(Some(dir.path().to_path_buf())).unwrap();
        assert_eq!(reloaded.len(), 1);
        let signature = CorrectionHistory::signature(&target, 1, 5);
        assert!(reloaded.contains(&signature));

        let (_, entry) = reloaded.sorted_entries()[0];
        assert_eq!(entry.suggestion, "renamed variable");
        assert!(!entry.file_hash.is_empty());
    }

    #[test]
    fn test_filter_suppresses_recorded_signatures() {
        let dir = TempDir::new().unwrap();
        let mut history = CorrectionHistory::load(Some(dir.path().to_path_buf())).unwrap();
        history.record("main.cpp", 2, 0, "already applied").unwrap();

        let mut set = CorrectionSet::new();
        set.push_record("main.cpp", record_at(2));
        set.push_record("main.cpp", record_at(5));

        let (filtered, suppressed) = history.filter(set);
        assert_eq!(suppressed, 1);
        assert_eq!(filtered.record_count(), 1);
        let remaining = filtered.records_for("main.cpp").unwrap();
        assert_eq!(remaining[0].line_number, 5);
    }

    #[test]
    fn test_stale_when_target_file_changes() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("main.cpp");
        fs::write(&target, "original\n").unwrap();
        let target = target.to_string_lossy().to_string();

        let mut history = CorrectionHistory::load(Some(dir.path().to_path_buf())).unwrap();
        history.record(&target, 1, 0, "fix").unwrap();

        let (_, entry) = history.sorted_entries()[0];
        assert!(!history.is_stale(entry));

        fs::write(&target, "edited since\n").unwrap();
        let (_, entry) = history.sorted_entries()[0];
        assert!(history.is_stale(entry));
    }

    #[test]
    fn test_linker_entries_are_never_stale() {
        let dir = TempDir::new().unwrap();
        let mut history = CorrectionHistory::load(Some(dir.path().to_path_buf())).unwrap();
        history
            .record("Linker Error", 0, 0, "undefined reference to `foo'")
            .unwrap();

        let (_, entry) = history.sorted_entries()[0];
        assert!(entry.file_hash.is_empty());
        assert!(!history.is_stale(entry));
    }

    #[test]
    fn test_clear_returns_removed_count() {
        let dir = TempDir::new().unwrap();
        let mut history = CorrectionHistory::load(Some(dir.path().to_path_buf())).unwrap();
        history.record("a.cpp", 1, 0, "one").unwrap();
        history.record("b.cpp", 2, 3, "two").unwrap();

        assert_eq!(history.clear(), 2);
        assert!(history.is_empty());
    }

    #[test]
    fn test_sorted_entries_order_lines_numerically() {
        let dir = TempDir::new().unwrap();
        let mut history = CorrectionHistory::load(Some(dir.path().to_path_buf())).unwrap();
        history.record("main.cpp", 10, 0, "later").unwrap();
        history.record("main.cpp", 2, 0, "earlier").unwrap();
        history.record("aux.cpp", 7, 0, "other file").unwrap();

        let order: Vec<&str> = history
            .sorted_entries()
            .into_iter()
            .map(|(signature, _)| signature)
            .collect();
        assert_eq!(order, ["aux.cpp:7:0", "main.cpp:2:0", "main.cpp:10:0"]);
    }
}
