use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pseudo file path used by correction producers for errors with no source
/// location (link-stage failures). Its presence in a set short-circuits
/// patching entirely; the records under it are only logged.
pub const LINKER_ERROR_KEY: &str = "Linker Error";

/// Placeholder description for records that arrive without one.
pub const NO_SUGGESTION: &str = "No suggestion available";

/// How a record's snippet maps onto the target file.
///
/// The producer declares the style; it is never inferred from the record's
/// contents. Untagged records are treated as `WholeLine`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PatchStyle {
    /// Replace the single line at `lineNumber` with every line of the snippet.
    WholeLine,
    /// Rewrite only the text before the reported column, keeping the rest of
    /// the line verbatim. Requires a column and a single-line snippet.
    ColumnAware,
    /// The snippet is a replacement window of several lines; `start_line` is
    /// the 1-based line the window begins at.
    #[serde(rename_all = "camelCase")]
    SnippetAnchored { start_line: u32 },
}

/// One proposed edit to one file, as produced by a correction supplier.
///
/// Field names follow the JSON contract the supplier writes
/// (`lineNumber`, `correctedCodeSnippet`, ...). Unknown fields are ignored so
/// a supplier may echo extra context without breaking decoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionRecord {
    /// 1-based line at which the reported error begins. Link-stage records
    /// have no source location and decode as line 0.
    #[serde(default)]
    pub line_number: u32,
    /// 1-based column within that line, when the producer knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_number: Option<u32>,
    /// Replacement lines. Present and empty means "delete the target line";
    /// missing means the record is malformed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrected_code_snippet: Option<Vec<String>>,
    /// Free-text rationale; passed through to the description log.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_change_description: Option<String>,
    /// Original compiler message, echoed back by some producers
    /// (link-stage records carry only this).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_style: Option<PatchStyle>,
}

impl CorrectionRecord {
    /// Identity of this record for history bookkeeping: `file:line:col`,
    /// with a missing column written as 0.
    pub fn signature(&self, file: &str) -> String {
        format!(
            "{}:{}:{}",
            file,
            self.line_number,
            self.column_number.unwrap_or(0)
        )
    }

    /// Text for the description log, falling back to the compiler message
    /// and then to a placeholder.
    pub fn suggestion(&self) -> &str {
        self.code_change_description
            .as_deref()
            .or(self.error_description.as_deref())
            .unwrap_or(NO_SUGGESTION)
    }
}

/// A batch of pending edits for one run, keyed by file path.
///
/// Records for a file keep the order the producer emitted them in; file keys
/// iterate in path order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrectionSet {
    files: BTreeMap<String, Vec<CorrectionRecord>>,
}

impl CorrectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record for a file, creating the entry if needed.
    pub fn push_record(&mut self, path: &str, record: CorrectionRecord) {
        self.files.entry(path.to_string()).or_default().push(record);
    }

    /// Appends every record of `other`, preserving per-file record order.
    pub fn merge(&mut self, other: CorrectionSet) {
        for (path, records) in other.files {
            self.files.entry(path).or_default().extend(records);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn record_count(&self) -> usize {
        self.files.values().map(|r| r.len()).sum()
    }

    pub fn records_for(&self, path: &str) -> Option<&[CorrectionRecord]> {
        self.files.get(path).map(|r| r.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[CorrectionRecord])> {
        self.files.iter().map(|(p, r)| (p.as_str(), r.as_slice()))
    }

    pub fn has_linker_errors(&self) -> bool {
        self.files.contains_key(LINKER_ERROR_KEY)
    }

    /// Records filed under the linker sentinel, if any.
    pub fn linker_records(&self) -> &[CorrectionRecord] {
        self.files
            .get(LINKER_ERROR_KEY)
            .map(|r| r.as_slice())
            .unwrap_or(&[])
    }

    /// Keeps only records for which `keep` returns true; files left with no
    /// records are dropped from the set.
    pub fn retain_records<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str, &CorrectionRecord) -> bool,
    {
        for (path, records) in self.files.iter_mut() {
            records.retain(|r| keep(path, r));
        }
        self.files.retain(|_, records| !records.is_empty());
    }
}
