use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

mod error_report;
mod progress;

use progress::ProgressIndicator;

use mend::contexts::{
    DescriptionEntry, DescriptionSink, FileLineStore, FileReport, PatchFailure, PatchRun,
    RunSummary,
};
use mend::correction_history::CorrectionHistory;
use mend::data::{
    CorrectionRecord, CorrectionSet, CorrectionSource, LINKER_ERROR_KEY, PatchStyle,
};
use mend::registries::{FileCorrectionSource, FileDescriptionLog, Settings};

#[derive(Clone, Copy)]
pub struct Config {
    pub verbose: bool,
    pub dry_run: bool,
}

/// Description sink that both forwards entries to the file log and keeps
/// them for history recording after the run
struct RecordingSink<D: DescriptionSink> {
    inner: D,
    entries: Vec<DescriptionEntry>,
}

impl<D: DescriptionSink> RecordingSink<D> {
    fn new(inner: D) -> Self {
        Self {
            inner,
            entries: Vec::new(),
        }
    }
}

impl<D: DescriptionSink> DescriptionSink for RecordingSink<D> {
    fn record(&mut self, entry: &DescriptionEntry) -> Result<(), std::io::Error> {
        self.inner.record(entry)?;
        self.entries.push(entry.clone());
        Ok(())
    }
}

pub async fn run_apply(
    corrections: Option<PathBuf>,
    parallel_override: Option<bool>,
    config: &Config,
) -> Result<()> {
    let settings = Settings::load(None)?;
    let parallel = parallel_override.unwrap_or(settings.parallel);

    let corrections_path = corrections.unwrap_or_else(|| settings.corrections_path());
    let source = FileCorrectionSource::new(Some(corrections_path));
    let supplied = source.load()?;

    // Undecodable records surface as invalid-record failures; the rest of
    // the set still runs.
    let mut summary = RunSummary::default();
    for reject in &supplied.rejected {
        eprintln!("error[records:invalid]:");
        eprintln!("\u{001b}[31m{}\u{001b}[0m", reject.file);
        eprintln!("  {}", reject.detail);

        let mut report = FileReport::new(&reject.file);
        report.skipped = 1;
        report.failures.push(PatchFailure::InvalidRecord {
            path: reject.file.clone(),
            line_number: None,
            reason: reject.detail.clone(),
        });
        summary.reports.push(report);
    }

    if config.verbose {
        println!(
            "Loaded {} correction(s) for {} file(s)",
            supplied.set.record_count(),
            supplied.set.file_count()
        );
    }

    let mut history = CorrectionHistory::load(Some(settings.data_dir.clone()))?;
    let (set, suppressed) = history.filter(supplied.set);
    if suppressed > 0 {
        println!("⊚ Suppressed {} previously applied correction(s)", suppressed);
    }

    if config.dry_run {
        print_dry_run(&set);
        return Ok(());
    }

    let mut sink = RecordingSink::new(FileDescriptionLog::new(Some(settings.data_dir.clone())));

    if set.is_empty() {
        println!("No corrections to apply");
    } else if set.has_linker_errors() {
        println!("⊚ Linker error reported; logging descriptions, no files to patch");
        let linker_summary = PatchRun::new(FileLineStore::new()).apply(&set, &mut sink);
        summary.descriptions_logged += linker_summary.descriptions_logged;
        summary.linker_short_circuit = true;
    } else if parallel && set.file_count() > 1 {
        apply_parallel(&set, &mut summary, &mut sink, config).await?;
    } else {
        apply_sequential(&set, &mut summary, &mut sink, config);
    }

    if !sink.entries.is_empty() {
        for entry in &sink.entries {
            history.record(
                &entry.file,
                entry.line_number,
                entry.column_number,
                &entry.description,
            )?;
        }
        history.save().context("Failed to save correction history")?;
        if config.verbose {
            println!("✓ Recorded {} correction(s) in history", sink.entries.len());
        }
    }

    let failures = summary.failure_count();
    if failures > 0 {
        anyhow::bail!("Patch run completed with {} failure(s).", failures);
    }

    Ok(())
}

fn apply_sequential<D: DescriptionSink>(
    set: &CorrectionSet,
    summary: &mut RunSummary,
    sink: &mut D,
    config: &Config,
) {
    let run = PatchRun::new(FileLineStore::new());
    let mut progress = ProgressIndicator::new(set.file_count());

    for (path, records) in set.iter() {
        progress.start_item(path);
        let outcome = run.apply_file(path, records);
        let ok = outcome.report.failures.is_empty();
        report_file_result(&outcome.report, config);
        summary.absorb(outcome, sink);
        progress.complete_item(path, ok);
    }

    progress.finish(summary);
}

async fn apply_parallel<D: DescriptionSink>(
    set: &CorrectionSet,
    summary: &mut RunSummary,
    sink: &mut D,
    config: &Config,
) -> Result<()> {
    let run = Arc::new(PatchRun::new(FileLineStore::new()));
    let mut progress = ProgressIndicator::new(set.file_count());
    if config.verbose {
        println!("Parallel patching enabled for {} file(s)", set.file_count());
    }

    let mut tasks = Vec::new();
    for (path, records) in set.iter() {
        progress.start_item(path);
        let path = path.to_string();
        let records: Vec<CorrectionRecord> = records.to_vec();
        let run = run.clone();
        tasks.push(tokio::task::spawn(async move {
            let outcome = run.apply_file(&path, &records);
            (path, outcome)
        }));
    }

    for task in tasks {
        let (path, outcome) = task.await?;
        let ok = outcome.report.failures.is_empty();
        report_file_result(&outcome.report, config);
        summary.absorb(outcome, sink);
        progress.complete_item(&path, ok);
    }

    progress.finish(summary);
    Ok(())
}

fn report_file_result(report: &FileReport, config: &Config) {
    if report.failures.is_empty() {
        if config.verbose {
            println!("✓ Applied {} correction(s) to {}", report.applied, report.path);
        }
    } else {
        for failure in &report.failures {
            eprintln!("✗ {}", failure);
        }
    }
}

fn print_dry_run(set: &CorrectionSet) {
    if set.is_empty() {
        println!("[DRY RUN] No corrections to apply");
        return;
    }

    for (path, records) in set.iter() {
        if path == LINKER_ERROR_KEY {
            println!(
                "[DRY RUN] {} ({} record(s), descriptions only)",
                path,
                records.len()
            );
            continue;
        }

        println!("[DRY RUN] {} ({} record(s))", path, records.len());
        for record in records {
            println!("  line {} [{}]", record.line_number, style_name(record));
        }
    }
}

fn style_name(record: &CorrectionRecord) -> String {
    match record.patch_style {
        Some(PatchStyle::ColumnAware) => "column-aware".to_string(),
        Some(PatchStyle::SnippetAnchored { start_line }) => {
            format!("snippet-anchored @ {}", start_line)
        }
        Some(PatchStyle::WholeLine) | None => "whole-line".to_string(),
    }
}

pub async fn run_report(
    command: Option<String>,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    context: Option<u32>,
    config: &Config,
) -> Result<()> {
    let settings = Settings::load(None)?;
    let context_before = context.unwrap_or(settings.context_before);
    let context_after = context.unwrap_or(settings.context_after);
    let output_path = output.unwrap_or_else(|| settings.report_path());

    let raw = match (command, input) {
        (Some(cmd), None) => {
            if config.verbose {
                println!("Running build command: {}", cmd);
            }
            error_report::capture_build_output(&cmd)?
        }
        (None, Some(path)) => fs::read_to_string(&path)
            .with_context(|| format!("Failed to read build output: {}", path.display()))?,
        (Some(_), Some(_)) => anyhow::bail!("Use either --command or --input, not both."),
        (None, None) => anyhow::bail!("One of --command or --input is required."),
    };

    let report = error_report::build_report(&raw, context_before, context_after);

    if report.is_empty() {
        println!("✓ Build output is clean");
        return Ok(());
    }

    eprintln!("error[report]:");
    for (file, errors) in report.iter() {
        eprintln!("\u{001b}[31m{}\u{001b}[0m", file);
        eprintln!("  {} diagnostic(s)", errors.len());
    }

    if config.dry_run {
        println!(
            "[DRY RUN] Would write {} diagnostic(s) to {}",
            report.error_count(),
            output_path.display()
        );
        return Ok(());
    }

    error_report::write_report(&report, &output_path)?;
    println!(
        "✓ Wrote {} diagnostic(s) across {} file(s) to {}",
        report.error_count(),
        report.file_count(),
        output_path.display()
    );

    Ok(())
}

pub async fn run_history_show(config: &Config) -> Result<()> {
    let settings = Settings::load(None)?;
    let history = CorrectionHistory::load(Some(settings.data_dir.clone()))?;

    if history.is_empty() {
        println!("No corrections recorded");
        return Ok(());
    }

    println!("Correction history: {} record(s)", history.len());
    for (signature, entry) in history.sorted_entries() {
        let marker = if history.is_stale(entry) {
            " (stale)"
        } else {
            ""
        };
        println!("  {}{}", signature, marker);
        if config.verbose {
            println!("    {} @ {}", entry.suggestion, entry.timestamp);
        }
    }

    Ok(())
}

pub async fn run_history_clear(all: bool, config: &Config) -> Result<()> {
    let settings = Settings::load(None)?;
    let mut history = CorrectionHistory::load(Some(settings.data_dir.clone()))?;

    if config.dry_run {
        println!(
            "[DRY RUN] Would clear {} history record(s)",
            history.len()
        );
        if all {
            for path in [
                settings.report_path(),
                settings.corrections_path(),
                settings.descriptions_path(),
            ] {
                if path.exists() {
                    println!("[DRY RUN] Would remove {}", path.display());
                }
            }
        }
        return Ok(());
    }

    let removed = history.clear();
    history.save().context("Failed to save correction history")?;
    println!("✓ Cleared {} history record(s)", removed);

    if all {
        for path in [
            settings.report_path(),
            settings.corrections_path(),
            settings.descriptions_path(),
        ] {
            if path.exists() {
                fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
                println!("✓ Removed {}", path.display());
            }
        }
    }

    Ok(())
}
