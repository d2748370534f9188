use anyhow::{Context, Result};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;

use mend::data::{CompilerError, ErrorReport, LINKER_ERROR_KEY};

/// Runs the build command through the shell with stderr folded into stdout,
/// the same capture a developer gets from `cmd 2>&1`.
pub fn capture_build_output(command: &str) -> Result<String> {
    let output = Command::new("sh")
        .arg("-c")
        .arg(format!("{} 2>&1", command))
        .output()
        .with_context(|| format!("Failed to run build command: {}", command))?;

    let mut text = String::from_utf8_lossy(&output.stdout).to_string();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    Ok(text)
}

fn gcc_diag_re() -> &'static Regex {
    // Typical gcc/clang diagnostic line:
    //   main.cpp:12:9: error: use of undeclared identifier 'coun'
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^([^\s:][^:\n]*):(\d+):(\d+):\s+(?:fatal error|error|warning):\s+(.+)$")
            .expect("valid regex")
    })
}

fn rustc_message_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:error(?:\[(E\d+)\])?|warning):\s+(.+)$").expect("valid regex")
    })
}

fn rustc_span_re() -> &'static Regex {
    // Typical rustc span line:
    //   --> src/foo.rs:12:34
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*-->\s+([^\s:][^:\n]*):(\d+):(\d+)\s*$").expect("valid regex")
    })
}

/// Turns raw build output into a path-keyed error report, with a snippet
/// window read from each located source file.
pub fn build_report(output: &str, context_before: u32, context_after: u32) -> ErrorReport {
    let mut report = ErrorReport::new();

    for caps in gcc_diag_re().captures_iter(output) {
        let file = caps[1].to_string();
        let mut error = CompilerError {
            line_number: caps[2].parse().unwrap_or(0),
            column_number: caps[3].parse().unwrap_or(0),
            error_description: caps[4].trim().to_string(),
            code_snippet: None,
            snippet_start_line: None,
        };
        attach_snippet(&mut error, &file, context_before, context_after);
        report.push_error(&file, error);
    }

    // rustc splits a diagnostic across a message line and a span line; the
    // first span after a message locates it, later spans belong to notes.
    let mut current_message: Option<String> = None;
    for line in output.lines() {
        if let Some(caps) = rustc_message_re().captures(line) {
            current_message = Some(match caps.get(1) {
                Some(code) => format!("{}: {}", code.as_str(), &caps[2]),
                None => caps[2].to_string(),
            });
        } else if let Some(caps) = rustc_span_re().captures(line) {
            if let Some(message) = current_message.take() {
                let file = caps[1].to_string();
                let mut error = CompilerError {
                    line_number: caps[2].parse().unwrap_or(0),
                    column_number: caps[3].parse().unwrap_or(0),
                    error_description: message,
                    code_snippet: None,
                    snippet_start_line: None,
                };
                attach_snippet(&mut error, &file, context_before, context_after);
                report.push_error(&file, error);
            }
        }
    }

    if let Some(description) = extract_linker_failure(output) {
        report.push_error(
            LINKER_ERROR_KEY,
            CompilerError {
                line_number: 0,
                column_number: 0,
                error_description: description,
                code_snippet: None,
                snippet_start_line: None,
            },
        );
    }

    report
}

/// Collects link-stage failure lines into one description: Apple ld's
/// "Undefined symbols" block up to its "clang: error:" terminator, and GNU
/// ld's "undefined reference" / collect2 lines.
fn extract_linker_failure(output: &str) -> Option<String> {
    let mut collected: Vec<&str> = Vec::new();
    let mut in_apple_block = false;

    for line in output.lines() {
        if in_apple_block {
            collected.push(line);
            if line.starts_with("clang: error:") {
                in_apple_block = false;
            }
            continue;
        }

        if line.contains("Undefined symbols")
            && (line.starts_with("ld:") || line.contains("for architecture"))
        {
            in_apple_block = true;
            collected.push(line);
        } else if line.contains("undefined reference to") || line.starts_with("collect2: error:") {
            collected.push(line);
        }
    }

    if collected.is_empty() {
        None
    } else {
        Some(collected.join("\n"))
    }
}

/// Reads a window of source lines around the diagnostic. An unreadable file
/// or an out-of-range line leaves the entry without a snippet.
fn attach_snippet(error: &mut CompilerError, path: &str, before: u32, after: u32) {
    let Ok(content) = fs::read_to_string(path) else {
        return;
    };
    let lines: Vec<&str> = content
        .split_terminator('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect();

    if error.line_number == 0 || error.line_number as usize > lines.len() {
        return;
    }
    let idx = error.line_number as usize - 1;
    let start = idx.saturating_sub(before as usize);
    let end = (idx + after as usize + 1).min(lines.len());

    error.code_snippet = Some(lines[start..end].iter().map(|l| l.to_string()).collect());
    error.snippet_start_line = Some(start as u32 + 1);
}

/// Writes the report as pretty JSON, creating the data directory if needed
pub fn write_report(report: &ErrorReport, output_path: &Path) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent).context("Failed to create report directory")?;
    }

    let content =
        serde_json::to_string_pretty(report).context("Failed to serialize error report")?;
    fs::write(output_path, content)
        .with_context(|| format!("Failed to write error report: {}", output_path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parses_gcc_diagnostics_with_columns() {
        let output = "\
main.cpp:12:9: error: use of undeclared identifier 'coun'
main.cpp:30:5: warning: unused variable 'tmp'
util/helper.cpp:4:1: fatal error: 'helper.h' file not found
";

        let report = build_report(output, 2, 2);
        assert_eq!(report.file_count(), 2);
        assert_eq!(report.error_count(), 3);

        let main_errors = report.errors_for("main.cpp").unwrap();
        assert_eq!(main_errors[0].line_number, 12);
        assert_eq!(main_errors[0].column_number, 9);
        assert_eq!(
            main_errors[0].error_description,
            "use of undeclared identifier 'coun'"
        );
        assert_eq!(main_errors[1].line_number, 30);

        let helper_errors = report.errors_for("util/helper.cpp").unwrap();
        assert_eq!(helper_errors[0].error_description, "'helper.h' file not found");
    }

    #[test]
    fn test_parses_rustc_diagnostics() {
        let output = "\
error[E0308]: mismatched types
  --> src/main.rs:7:14
   |
 7 |     let x: u32 = \"seven\";
warning: unused import: `std::fs`
 --> src/lib.rs:1:5
";

        let report = build_report(output, 2, 2);
        assert_eq!(report.error_count(), 2);

        let main_errors = report.errors_for("src/main.rs").unwrap();
        assert_eq!(main_errors[0].line_number, 7);
        assert_eq!(main_errors[0].column_number, 14);
        assert_eq!(main_errors[0].error_description, "E0308: mismatched types");

        let lib_errors = report.errors_for("src/lib.rs").unwrap();
        assert_eq!(lib_errors[0].error_description, "unused import: `std::fs`");
    }

    #[test]
    fn test_collects_gnu_linker_failure_as_sentinel() {
        let output = "\
/usr/bin/ld: /tmp/ccx.o: in function `main':
main.cpp:(.text+0x1a): undefined reference to `helper()'
collect2: error: ld returned 1 exit status
";

        let report = build_report(output, 2, 2);
        let linker = report.errors_for(LINKER_ERROR_KEY).unwrap();
        assert_eq!(linker.len(), 1);
        assert_eq!(linker[0].line_number, 0);
        assert!(linker[0].error_description.contains("undefined reference to `helper()'"));
        assert!(linker[0].error_description.contains("collect2: error:"));
    }

    #[test]
    fn test_collects_apple_linker_block_until_terminator() {
        let output = "\
ld: Undefined symbols:
  _helper, referenced from:
      _main in main.o
clang: error: linker command failed with exit code 1 (use -v to see invocation)
this line is past the block
";

        let description = extract_linker_failure(output).unwrap();
        assert!(description.starts_with("ld: Undefined symbols:"));
        assert!(description.contains("_main in main.o"));
        assert!(description.ends_with("(use -v to see invocation)"));
        assert!(!description.contains("past the block"));
    }

    #[test]
    fn test_snippet_window_clamps_at_file_edges() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("edge.cpp");
        fs::write(&source, "l1\nl2\nl3\nl4\n").unwrap();
        let source = source.to_string_lossy().to_string();

        let output = format!(
            "{src}:1:1: error: top\n{src}:4:1: error: bottom\n",
            src = source
        );
        let report = build_report(&output, 2, 2);
        let errors = report.errors_for(&source).unwrap();

        assert_eq!(errors[0].snippet_start_line, Some(1));
        assert_eq!(
            errors[0].code_snippet.as_deref(),
            Some(&["l1".to_string(), "l2".to_string(), "l3".to_string()][..])
        );

        assert_eq!(errors[1].snippet_start_line, Some(2));
        assert_eq!(
            errors[1].code_snippet.as_deref(),
            Some(&["l2".to_string(), "l3".to_string(), "l4".to_string()][..])
        );
    }

    #[test]
    fn test_unlocatable_file_yields_entry_without_snippet() {
        let output = "ghost.cpp:3:1: error: something\n";
        let report = build_report(output, 2, 2);
        let errors = report.errors_for("ghost.cpp").unwrap();
        assert!(errors[0].code_snippet.is_none());
        assert!(errors[0].snippet_start_line.is_none());
    }

    #[test]
    fn test_clean_output_yields_empty_report() {
        let report = build_report("Compiling mend v0.1.0\nFinished release target\n", 2, 2);
        assert!(report.is_empty());
    }
}
