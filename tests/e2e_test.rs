//! End-to-end test for the mend binary.
//!
//! Verifies the complete fix loop against a scratch project:
//! 1. Build mend
//! 2. Apply supplier corrections to a broken source file
//! 3. Re-run and confirm the history store suppresses the same corrections
//! 4. Build an error report from saved compiler output
//!
//! Run with: cargo test --test e2e_test -- --nocapture --ignored

use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

fn build_mend_binary() -> PathBuf {
    let root_dir = std::env::current_dir().expect("Failed to get current directory");

    let build_status = Command::new("cargo")
        .arg("build")
        .arg("--release")
        .current_dir(&root_dir)
        .status()
        .expect("Failed to build mend");
    assert!(build_status.success(), "Failed to build mend");

    let mend_bin = root_dir.join("target").join("release").join("mend");
    assert!(mend_bin.exists(), "mend binary not found");
    mend_bin
}

#[test]
#[ignore] // Ignore by default - builds the release binary and is slow
fn e2e_apply_and_suppress() {
    println!("\n=== Step 1: Building mend ===");
    let mend_bin = build_mend_binary();
    println!("✓ mend built successfully");

    println!("\n=== Step 2: Setting up scratch project ===");
    let project = TempDir::new().expect("Failed to create scratch project");
    let source = project.path().join("main.cpp");
    fs::write(&source, "int man() {\n    return 1;\n}\n").expect("Failed to write source");

    let data_dir = project.path().join("Data");
    fs::create_dir_all(&data_dir).expect("Failed to create Data directory");
    fs::write(
        data_dir.join("corrected_code.json"),
        r#"{
            "main.cpp": [
                {"lineNumber": 1, "correctedCodeSnippet": ["int main() {"],
                 "codeChangeDescription": "fixed function name"},
                {"lineNumber": 2, "correctedCodeSnippet": ["    return 0;"],
                 "codeChangeDescription": "fixed exit code"}
            ]
        }"#,
    )
    .expect("Failed to write corrections");
    println!("✓ Scratch project ready at {:?}", project.path());

    println!("\n=== Step 3: Applying corrections ===");
    let apply_status = Command::new(&mend_bin)
        .arg("apply")
        .current_dir(project.path())
        .status()
        .expect("Failed to run mend apply");
    assert!(apply_status.success(), "mend apply failed");

    let patched = fs::read_to_string(&source).expect("Failed to read patched source");
    assert_eq!(patched, "int main() {\n    return 0;\n}\n");
    assert!(
        data_dir.join("code_change_descriptions.txt").exists(),
        "description log not written"
    );
    assert!(
        data_dir.join("correction_history.json").exists(),
        "history store not written"
    );
    println!("✓ Corrections applied");

    println!("\n=== Step 4: Re-running against the history store ===");
    let rerun_output = Command::new(&mend_bin)
        .arg("apply")
        .current_dir(project.path())
        .output()
        .expect("Failed to re-run mend apply");
    assert!(rerun_output.status.success(), "second mend apply failed");

    let stdout = String::from_utf8_lossy(&rerun_output.stdout);
    assert!(
        stdout.contains("Suppressed 2 previously applied correction(s)"),
        "history did not suppress the re-proposed corrections:\n{}",
        stdout
    );
    assert_eq!(
        fs::read_to_string(&source).expect("Failed to re-read source"),
        "int main() {\n    return 0;\n}\n"
    );
    println!("✓ History suppressed the re-proposed corrections");

    println!("\n=== Step 5: Inspecting the history ===");
    let show_output = Command::new(&mend_bin)
        .arg("history")
        .arg("show")
        .current_dir(project.path())
        .output()
        .expect("Failed to run mend history show");
    assert!(show_output.status.success(), "mend history show failed");

    let stdout = String::from_utf8_lossy(&show_output.stdout);
    assert!(stdout.contains("main.cpp:1:0"), "history listing missing entry:\n{}", stdout);
    assert!(stdout.contains("main.cpp:2:0"), "history listing missing entry:\n{}", stdout);

    println!("\n=== E2E Test Complete ===");
}

#[test]
#[ignore] // Ignore by default - builds the release binary and is slow
fn e2e_report_from_saved_output() {
    println!("\n=== Step 1: Building mend ===");
    let mend_bin = build_mend_binary();

    println!("\n=== Step 2: Writing saved compiler output ===");
    let project = TempDir::new().expect("Failed to create scratch project");
    fs::write(
        project.path().join("main.cpp"),
        "#include <iostream>\nint main() {\n    coun << 1;\n    return 0;\n}\n",
    )
    .expect("Failed to write source");
    fs::write(
        project.path().join("build.log"),
        "main.cpp:3:5: error: use of undeclared identifier 'coun'\n",
    )
    .expect("Failed to write build log");

    println!("\n=== Step 3: Building the error report ===");
    let report_status = Command::new(&mend_bin)
        .arg("report")
        .arg("--input")
        .arg("build.log")
        .current_dir(project.path())
        .status()
        .expect("Failed to run mend report");
    assert!(report_status.success(), "mend report failed");

    let report_path = project.path().join("Data").join("error_report.json");
    assert!(report_path.exists(), "error report not written");

    let report: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(&report_path).expect("Failed to read error report"),
    )
    .expect("error report is not valid JSON");

    let entry = &report["main.cpp"][0];
    assert_eq!(entry["lineNumber"], 3);
    assert_eq!(entry["columnNumber"], 5);
    assert_eq!(entry["errorDescription"], "use of undeclared identifier 'coun'");
    assert_eq!(entry["snippetStartLine"], 1);
    println!("✓ Error report written with snippet window");

    println!("\n=== E2E Test Complete ===");
}
