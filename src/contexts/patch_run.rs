use crate::data::{CorrectionRecord, CorrectionSet, PatchStyle, LINKER_ERROR_KEY};
use std::fmt;

/// Errors surfaced by a line store implementation
#[derive(Debug)]
pub enum StoreError {
    /// The file is missing or unreadable.
    Unreadable { path: String, details: String },
    /// The replacement content could not be persisted.
    Unwritable { path: String, details: String },
}

impl StoreError {
    pub fn details(&self) -> &str {
        match self {
            StoreError::Unreadable { details, .. } => details,
            StoreError::Unwritable { details, .. } => details,
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StoreError::Unreadable { path, details } => {
                write!(f, "Cannot read '{}': {}", path, details)
            }
            StoreError::Unwritable { path, details } => {
                write!(f, "Cannot write '{}': {}", path, details)
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Failures collected during a patch run, at per-file or per-record
/// granularity. None of these abort the batch.
#[derive(Debug, Clone)]
pub enum PatchFailure {
    /// The target file is missing or unreadable; none of its records apply.
    FileNotFound { path: String, details: String },
    /// A record is malformed or targets a line the file does not have.
    InvalidRecord {
        path: String,
        line_number: Option<u32>,
        reason: String,
    },
    /// A column-aware record could not be resolved against the original
    /// line; the whole line was replaced instead.
    UnresolvableColumnPatch {
        path: String,
        line_number: u32,
        column_number: u32,
    },
    /// The patched content could not be written. The write is atomic, so
    /// the file keeps its original content.
    WriteFailure { path: String, details: String },
}

impl PatchFailure {
    /// Short tag used in `error[patch:<kind>]` console blocks.
    pub fn kind(&self) -> &'static str {
        match self {
            PatchFailure::FileNotFound { .. } => "file_not_found",
            PatchFailure::InvalidRecord { .. } => "invalid_record",
            PatchFailure::UnresolvableColumnPatch { .. } => "column_fallback",
            PatchFailure::WriteFailure { .. } => "write_failure",
        }
    }
}

impl fmt::Display for PatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PatchFailure::FileNotFound { path, details } => {
                write!(f, "File '{}' could not be read: {}", path, details)
            }
            PatchFailure::InvalidRecord {
                path,
                line_number: Some(line),
                reason,
            } => {
                write!(f, "Invalid record for '{}' line {}: {}", path, line, reason)
            }
            PatchFailure::InvalidRecord {
                path,
                line_number: None,
                reason,
            } => {
                write!(f, "Invalid record for '{}': {}", path, reason)
            }
            PatchFailure::UnresolvableColumnPatch {
                path,
                line_number,
                column_number,
            } => {
                write!(
                    f,
                    "Could not splice '{}':{}:{} at column precision; replaced the whole line",
                    path, line_number, column_number
                )
            }
            PatchFailure::WriteFailure { path, details } => {
                write!(
                    f,
                    "Write to '{}' failed, original content kept: {}",
                    path, details
                )
            }
        }
    }
}

impl std::error::Error for PatchFailure {}

/// Audit entry handed to the description logger for one applied record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptionEntry {
    pub file: String,
    pub line_number: u32,
    /// 0 when the record carried no column.
    pub column_number: u32,
    pub description: String,
}

/// Line separator style detected when a file was read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSeparator {
    Lf,
    CrLf,
}

/// A text file as an ordered sequence of lines, plus the metadata needed to
/// write it back with its original separator and trailing-newline state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLines {
    lines: Vec<String>,
    separator: LineSeparator,
    trailing_newline: bool,
}

impl SourceLines {
    /// Splits file content on line boundaries. The split is the unit of
    /// addressing for every edit.
    pub fn parse(content: &str) -> Self {
        let separator = if content.contains("\r\n") {
            LineSeparator::CrLf
        } else {
            LineSeparator::Lf
        };
        let trailing_newline = content.ends_with('\n');
        let lines = content
            .split_terminator('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l).to_string())
            .collect();
        Self {
            lines,
            separator,
            trailing_newline,
        }
    }

    /// Joins the lines back with the separator the file was read with.
    pub fn render(&self) -> String {
        let sep = match self.separator {
            LineSeparator::Lf => "\n",
            LineSeparator::CrLf => "\r\n",
        };
        let mut out = self.lines.join(sep);
        if self.trailing_newline {
            out.push_str(sep);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(|l| l.as_str())
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Replaces `span` lines starting at `start` (0-based) with
    /// `replacement`. Callers must keep `start + span` within bounds.
    pub fn splice(&mut self, start: usize, span: usize, replacement: &[String]) {
        self.lines
            .splice(start..start + span, replacement.iter().cloned());
    }
}

/// File-access capability the applicator patches through. Exists as a trait
/// so tests can substitute an in-memory store.
pub trait LineStore {
    fn read_lines(&self, path: &str) -> Result<SourceLines, StoreError>;
    fn write_lines(&self, path: &str, lines: &SourceLines) -> Result<(), StoreError>;
}

/// Receives one audit entry per applied record. Implementations append;
/// earlier entries are never overwritten.
pub trait DescriptionSink {
    fn record(&mut self, entry: &DescriptionEntry) -> Result<(), std::io::Error>;
}

/// Per-file outcome of a patch pass
#[derive(Debug, Clone)]
pub struct FileReport {
    pub path: String,
    /// Records whose edit was spliced and persisted.
    pub applied: usize,
    /// Records that were not applied (malformed, or the whole file failed).
    pub skipped: usize,
    pub failures: Vec<PatchFailure>,
}

impl FileReport {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            applied: 0,
            skipped: 0,
            failures: Vec::new(),
        }
    }
}

/// One file's patch result together with the audit entries to flush once
/// the file's write has succeeded
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub report: FileReport,
    pub descriptions: Vec<DescriptionEntry>,
}

/// Aggregate result of applying a correction set
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub reports: Vec<FileReport>,
    pub descriptions_logged: usize,
    /// True when the linker sentinel was present and no file was touched.
    pub linker_short_circuit: bool,
}

impl RunSummary {
    /// Folds one file's outcome in, flushing its audit entries.
    pub fn absorb<D: DescriptionSink>(&mut self, outcome: FileOutcome, sink: &mut D) {
        for entry in &outcome.descriptions {
            flush_entry(self, sink, entry);
        }
        self.reports.push(outcome.report);
    }

    pub fn total_applied(&self) -> usize {
        self.reports.iter().map(|r| r.applied).sum()
    }

    pub fn total_skipped(&self) -> usize {
        self.reports.iter().map(|r| r.skipped).sum()
    }

    pub fn files_patched(&self) -> usize {
        self.reports.iter().filter(|r| r.applied > 0).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &PatchFailure> {
        self.reports.iter().flat_map(|r| r.failures.iter())
    }

    pub fn failure_count(&self) -> usize {
        self.reports.iter().map(|r| r.failures.len()).sum()
    }
}

fn flush_entry<D: DescriptionSink>(
    summary: &mut RunSummary,
    sink: &mut D,
    entry: &DescriptionEntry,
) {
    // Sink failures do not fail the run; the file edits already happened.
    match sink.record(entry) {
        Ok(()) => summary.descriptions_logged += 1,
        Err(e) => eprintln!("Failed to append description entry: {}", e),
    }
}

/// A record resolved into a concrete splice against the original line
/// numbering
struct PlannedEdit {
    /// 0-based first line replaced.
    start: usize,
    /// Lines removed at `start`.
    span: usize,
    replacement: Vec<String>,
    line_number: u32,
    column_number: u32,
    description: String,
    column_fallback: bool,
}

/// Patch application context: splices correction records into files through
/// a line store, collecting per-record failures instead of aborting the
/// batch.
pub struct PatchRun<S: LineStore> {
    store: S,
}

impl<S: LineStore> PatchRun<S> {
    /// Creates a new patch run over the given file-access capability
    ///
    /// # Arguments
    /// * `store` - Where target files are read from and written back to
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Applies a whole correction set and flushes one audit entry per
    /// applied record into `sink`.
    ///
    /// A set carrying the linker sentinel key touches no file at all: its
    /// records only produce audit entries, since a link-stage error has no
    /// source location to patch.
    pub fn apply<D: DescriptionSink>(&self, set: &CorrectionSet, sink: &mut D) -> RunSummary {
        let mut summary = RunSummary::default();

        if set.has_linker_errors() {
            summary.linker_short_circuit = true;
            for record in set.linker_records() {
                let entry = DescriptionEntry {
                    file: LINKER_ERROR_KEY.to_string(),
                    line_number: record.line_number,
                    column_number: record.column_number.unwrap_or(0),
                    description: record.suggestion().to_string(),
                };
                flush_entry(&mut summary, sink, &entry);
            }
            return summary;
        }

        for (path, records) in set.iter() {
            if records.is_empty() {
                continue;
            }
            let outcome = self.apply_file(path, records);
            summary.absorb(outcome, sink);
        }

        summary
    }

    /// Patches one file: read, resolve every record against the original
    /// numbering, splice, write back atomically.
    ///
    /// Safe to call from independent tasks for independent files; each call
    /// owns its file for the duration of the pass.
    pub fn apply_file(&self, path: &str, records: &[CorrectionRecord]) -> FileOutcome {
        let mut report = FileReport::new(path);
        let mut descriptions = Vec::new();

        let mut source = match self.store.read_lines(path) {
            Ok(source) => source,
            Err(err) => {
                report.skipped = records.len();
                report.failures.push(PatchFailure::FileNotFound {
                    path: path.to_string(),
                    details: err.details().to_string(),
                });
                return FileOutcome {
                    report,
                    descriptions,
                };
            }
        };

        let mut planned: Vec<PlannedEdit> = Vec::new();
        for record in records {
            match resolve_edit(path, record, &source) {
                Ok(edit) => planned.push(edit),
                Err(failure) => {
                    report.skipped += 1;
                    report.failures.push(failure);
                }
            }
        }

        // Stable sort, then splice highest-first: an edit that grows or
        // shrinks the file can never shift a still-pending lower target.
        // Edits tied on one line can still shrink the file under a pending
        // sibling, so start and span clamp to the lines that remain.
        planned.sort_by_key(|edit| edit.start);
        for edit in planned.iter().rev() {
            let start = edit.start.min(source.len());
            let span = edit.span.min(source.len() - start);
            source.splice(start, span, &edit.replacement);
        }

        for edit in &planned {
            report.applied += 1;
            if edit.column_fallback {
                report.failures.push(PatchFailure::UnresolvableColumnPatch {
                    path: path.to_string(),
                    line_number: edit.line_number,
                    column_number: edit.column_number,
                });
            }
            descriptions.push(DescriptionEntry {
                file: path.to_string(),
                line_number: edit.line_number,
                column_number: edit.column_number,
                description: edit.description.clone(),
            });
        }

        if report.applied > 0 {
            if let Err(err) = self.store.write_lines(path, &source) {
                report.failures.push(PatchFailure::WriteFailure {
                    path: path.to_string(),
                    details: err.details().to_string(),
                });
                // Nothing was persisted, so none of the records count as
                // applied and their audit entries are discarded.
                report.skipped += report.applied;
                report.applied = 0;
                descriptions.clear();
            }
        }

        FileOutcome {
            report,
            descriptions,
        }
    }
}

fn resolve_edit(
    path: &str,
    record: &CorrectionRecord,
    source: &SourceLines,
) -> Result<PlannedEdit, PatchFailure> {
    let snippet = record.corrected_code_snippet.as_ref().ok_or_else(|| {
        PatchFailure::InvalidRecord {
            path: path.to_string(),
            line_number: Some(record.line_number),
            reason: "missing correctedCodeSnippet".to_string(),
        }
    })?;

    let column = record.column_number.unwrap_or(0);
    let mut edit = PlannedEdit {
        start: 0,
        span: 0,
        replacement: Vec::new(),
        line_number: record.line_number,
        column_number: column,
        description: record.suggestion().to_string(),
        column_fallback: false,
    };

    // The producer declares the style; untagged records get the canonical
    // whole-line replacement.
    match record.patch_style.unwrap_or(PatchStyle::WholeLine) {
        PatchStyle::WholeLine => {
            edit.start = target_index(path, record.line_number, source)?;
            edit.span = 1;
            edit.replacement = snippet.clone();
        }
        PatchStyle::ColumnAware => {
            edit.start = target_index(path, record.line_number, source)?;
            edit.span = 1;
            if column == 0 {
                return Err(PatchFailure::InvalidRecord {
                    path: path.to_string(),
                    line_number: Some(record.line_number),
                    reason: "columnAware record without a usable columnNumber".to_string(),
                });
            }
            let original = source.line(edit.start).unwrap_or("");
            match column_splice(original, column, snippet) {
                Some(line) => edit.replacement = vec![line],
                None => {
                    edit.replacement = snippet.clone();
                    edit.column_fallback = true;
                }
            }
        }
        PatchStyle::SnippetAnchored { start_line } => {
            edit.start = target_index(path, start_line, source)?;
            // The snippet is inserted whole; the replaced span clamps at
            // end of file.
            edit.span = snippet.len().min(source.len() - edit.start);
            edit.replacement = snippet.clone();
        }
    }

    Ok(edit)
}

fn target_index(path: &str, line_number: u32, source: &SourceLines) -> Result<usize, PatchFailure> {
    let len = source.len();
    if line_number == 0 || line_number as usize > len {
        return Err(PatchFailure::InvalidRecord {
            path: path.to_string(),
            line_number: Some(line_number),
            reason: format!("targets line {} outside the file's {} line(s)", line_number, len),
        });
    }
    Ok(line_number as usize - 1)
}

/// Resolves a column-aware correction: the characters from the 1-based
/// column to end of line form a suffix that must survive verbatim, and the
/// corrected line supplies everything before it. Returns None when the
/// record cannot be resolved that way (multi-line snippet, column past the
/// end of the line, or suffix absent from the corrected line).
fn column_splice(original: &str, column: u32, snippet: &[String]) -> Option<String> {
    if snippet.len() != 1 {
        return None;
    }
    let corrected = snippet[0].as_str();

    let split = (column - 1) as usize;
    let byte_idx = original.char_indices().nth(split).map(|(i, _)| i)?;
    let suffix = &original[byte_idx..];

    // Rightmost occurrence keeps the corrected prefix maximal when the
    // suffix text repeats inside the corrected line.
    let match_point = corrected.rfind(suffix)?;
    Some(format!("{}{}", &corrected[..match_point], suffix))
}
