use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One build diagnostic, as written into the error report handed to a
/// correction supplier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerError {
    /// 1-based line the compiler pointed at (0 for link-stage entries).
    pub line_number: u32,
    /// 1-based column (0 when the compiler reported none).
    pub column_number: u32,
    pub error_description: String,
    /// Source window around the error line, when the file could be read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_snippet: Option<Vec<String>>,
    /// 1-based line the snippet window starts at, so a correction produced
    /// from the window can be anchored back without guessing an offset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet_start_line: Option<u32>,
}

/// Build diagnostics grouped by file path. Link-stage failures are grouped
/// under the linker sentinel key and carry no snippet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorReport {
    files: BTreeMap<String, Vec<CompilerError>>,
}

impl ErrorReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_error(&mut self, path: &str, error: CompilerError) {
        self.files.entry(path.to_string()).or_default().push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn error_count(&self) -> usize {
        self.files.values().map(|e| e.len()).sum()
    }

    pub fn errors_for(&self, path: &str) -> Option<&[CompilerError]> {
        self.files.get(path).map(|e| e.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[CompilerError])> {
        self.files.iter().map(|(p, e)| (p.as_str(), e.as_slice()))
    }
}
