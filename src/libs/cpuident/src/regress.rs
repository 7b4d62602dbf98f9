// Copyright (c) 2024 The cpuident developers
//
// SPDX-License-Identifier: Apache-2.0
//

//! Golden-file regression runner.
//!
//! A golden file holds a raw capture followed by the expected report,
//! with [`DELIMITER`] lines separating the capture from the report and
//! the report blocks of distinct CPU types from each other. The runner
//! feeds the capture through an external tool binary and compares its
//! report field by field. Gzip-compressed golden files are handled
//! transparently.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::raw::{read_text_file, write_text_file};
use crate::report::{DELIMITER, FIELDS_ARM, FIELDS_X86};
use crate::{Error, Result};

/// One parsed golden file.
#[derive(Debug, Clone)]
pub struct TestUnit {
    /// Raw capture section, exactly as stored.
    pub input: String,
    /// Expected report lines, flattened across CPU-type blocks.
    pub expected: Vec<String>,
}

impl TestUnit {
    /// Split a golden file into its capture and expected-report parts.
    pub fn load(path: &Path) -> Result<TestUnit> {
        let text = read_text_file(path)?;
        let mut input = String::new();
        let mut expected = Vec::new();
        let mut in_input = true;
        for line in text.lines() {
            if line == DELIMITER {
                in_input = false;
                continue;
            }
            if in_input {
                input.push_str(line);
                input.push('\n');
            } else {
                expected.push(line.to_string());
            }
        }
        if input.is_empty() {
            return Err(Error::Format {
                line: 1,
                reason: format!("no capture section in {}", path.display()),
            });
        }
        Ok(TestUnit { input, expected })
    }
}

/// Driver of the tool binary under test. Abstract so the runner itself
/// can be tested without spawning processes.
pub trait ToolBoundary {
    /// Architecture the tool decodes from a capture file ("x86"/"ARM").
    fn architecture(&self, input: &Path) -> Result<String>;

    /// Full report for a capture file, one value per line with
    /// delimiter lines between CPU-type blocks.
    fn report(&self, input: &Path, fields: &[&str]) -> Result<String>;
}

/// Drives a real `cpuident-ctl` binary via its `report` subcommand.
pub struct CommandBoundary {
    binary: PathBuf,
}

impl CommandBoundary {
    pub fn new(binary: PathBuf) -> CommandBoundary {
        CommandBoundary { binary }
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let output = Command::new(&self.binary).args(args).output()?;
        if !output.status.success() {
            return Err(Error::Tool(format!(
                "{} {} failed: {}",
                self.binary.display(),
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        String::from_utf8(output.stdout)
            .map_err(|e| Error::Tool(format!("non-UTF-8 tool output: {}", e)))
    }
}

impl ToolBoundary for CommandBoundary {
    fn architecture(&self, input: &Path) -> Result<String> {
        let load = input.display().to_string();
        let out = self.run(&["report", "--load", &load, "--architecture"])?;
        Ok(out.trim().to_string())
    }

    fn report(&self, input: &Path, fields: &[&str]) -> Result<String> {
        let load = input.display().to_string();
        let fields = fields.join(",");
        // The report goes through a scratch outfile; stdout stays free
        // for the tool's own diagnostics.
        let outfile = std::env::temp_dir().join(format!("cpuident-out-{}", random_suffix()));
        let out = outfile.display().to_string();
        let status = self.run(&[
            "report", "--load", &load, "--outfile", &out, "--fields", &fields,
        ]);
        let text = status.and_then(|_| read_text_file(&outfile));
        let _ = fs::remove_file(&outfile);
        text
    }
}

/// Result of one golden-file case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseResult {
    Passed,
    /// Mismatched, and the golden file was rewritten in place.
    Fixed,
    /// The report had the wrong number of lines for the field catalog,
    /// or the stored expected section does.
    Cardinality { actual: usize, expected: usize },
    /// Per-field differences: (field name, expected, actual).
    Mismatch(Vec<(String, String, String)>),
    /// The case could not be driven at all: malformed golden file or a
    /// tool-boundary failure.
    Error(String),
}

/// Aggregate counts over a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub fixed: usize,
}

impl Summary {
    fn record(&mut self, result: &CaseResult) {
        self.total += 1;
        match result {
            CaseResult::Passed => self.passed += 1,
            CaseResult::Fixed => self.fixed += 1,
            _ => self.failed += 1,
        }
    }
}

fn random_suffix() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect()
}

fn temp_input_path() -> PathBuf {
    std::env::temp_dir().join(format!("cpuident-raw-{}", random_suffix()))
}

fn fields_for_arch(architecture: &str) -> &'static [&'static str] {
    if architecture == "ARM" {
        FIELDS_ARM
    } else {
        FIELDS_X86
    }
}

/// Rewrite a golden file with a fresh report section, keeping the
/// capture bytes untouched. Compression follows the file extension.
fn rewrite_golden(path: &Path, unit: &TestUnit, report: &str) -> Result<()> {
    let mut text = unit.input.clone();
    text.push_str(DELIMITER);
    text.push('\n');
    text.push_str(report);
    write_text_file(path, &text)
}

/// Run one golden-file case. With `fix`, a failing case rewrites its
/// expected section from the tool's actual output.
pub fn run_case(boundary: &dyn ToolBoundary, path: &Path, fix: bool) -> Result<CaseResult> {
    let unit = TestUnit::load(path)?;

    // The capture goes through a scratch file so the tool reads exactly
    // what the golden file holds, without the expected section.
    let scratch = temp_input_path();
    write_text_file(&scratch, &unit.input)?;
    let outcome = drive_case(boundary, path, &unit, &scratch, fix);
    let _ = fs::remove_file(&scratch);
    outcome
}

fn drive_case(
    boundary: &dyn ToolBoundary,
    path: &Path,
    unit: &TestUnit,
    scratch: &Path,
    fix: bool,
) -> Result<CaseResult> {
    let architecture = boundary.architecture(scratch)?;
    let fields = fields_for_arch(&architecture);
    let report = boundary.report(scratch, fields)?;

    let actual: Vec<&str> = report.lines().filter(|l| *l != DELIMITER).collect();
    let num_cpu_types = report.lines().filter(|l| *l == DELIMITER).count() + 1;

    // Both line counts must line up before any field comparison: the
    // report against the field catalog, and the stored expected section
    // against the report.
    let want = fields.len() * num_cpu_types;
    if actual.len() != want || unit.expected.len() != actual.len() {
        if fix {
            rewrite_golden(path, unit, &report)?;
            return Ok(CaseResult::Fixed);
        }
        let expected = if actual.len() != want {
            want
        } else {
            unit.expected.len()
        };
        return Ok(CaseResult::Cardinality {
            actual: actual.len(),
            expected,
        });
    }

    let mut mismatches = Vec::new();
    for (i, (actual_line, expected_line)) in actual.iter().zip(&unit.expected).enumerate() {
        if *actual_line != expected_line.as_str() {
            mismatches.push((
                fields[i % fields.len()].to_string(),
                expected_line.clone(),
                actual_line.to_string(),
            ));
        }
    }

    if mismatches.is_empty() {
        debug!(sl!(), "golden case passed"; "path" => path.display().to_string());
        return Ok(CaseResult::Passed);
    }
    if fix {
        rewrite_golden(path, unit, &report)?;
        return Ok(CaseResult::Fixed);
    }
    Ok(CaseResult::Mismatch(mismatches))
}

fn collect_cases(root: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(root)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_cases(&path, out)?;
            continue;
        }
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if name.ends_with(".test") || name.ends_with(".test.gz") {
            out.push(path);
        }
    }
    Ok(())
}

/// Run every `*.test` / `*.test.gz` golden file under a directory (or a
/// single file), in sorted order.
pub fn run(
    boundary: &dyn ToolBoundary,
    path: &Path,
    fix: bool,
) -> Result<(Summary, Vec<(PathBuf, CaseResult)>)> {
    let mut cases = Vec::new();
    if path.is_dir() {
        collect_cases(path, &mut cases)?;
        cases.sort();
    } else {
        cases.push(path.to_path_buf());
    }

    let mut summary = Summary::default();
    let mut results = Vec::with_capacity(cases.len());
    for case in cases {
        // One broken case never aborts its siblings.
        let result = match run_case(boundary, &case, fix) {
            Ok(result) => result,
            Err(e) => {
                warn!(
                    sl!(),
                    "golden case errored";
                    "path" => case.display().to_string(),
                    "error" => e.to_string(),
                );
                CaseResult::Error(e.to_string())
            }
        };
        summary.record(&result);
        results.push((case, result));
    }
    info!(
        sl!(),
        "regression run";
        "total" => summary.total,
        "passed" => summary.passed,
        "failed" => summary.failed,
        "fixed" => summary.fixed,
    );
    Ok((summary, results))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Canned boundary: serves a fixed architecture and report, and
    /// records the capture text it was handed.
    struct FakeBoundary {
        architecture: &'static str,
        report: String,
        seen_input: std::cell::RefCell<Option<String>>,
    }

    impl FakeBoundary {
        fn new(architecture: &'static str, report: &str) -> FakeBoundary {
            FakeBoundary {
                architecture,
                report: report.to_string(),
                seen_input: std::cell::RefCell::new(None),
            }
        }
    }

    impl ToolBoundary for FakeBoundary {
        fn architecture(&self, input: &Path) -> Result<String> {
            *self.seen_input.borrow_mut() = Some(read_text_file(input)?);
            Ok(self.architecture.to_string())
        }

        fn report(&self, _input: &Path, _fields: &[&str]) -> Result<String> {
            Ok(self.report.clone())
        }
    }

    fn arm_report(codename: &str) -> String {
        let values = [
            "ARM",
            "ARMv8.0-A",
            "general",
            "0x41",
            "0",
            "0xd08",
            "3",
            "4",
            "4",
            codename,
            "fp asimd",
        ];
        let mut out = values.join("\n");
        out.push('\n');
        out
    }

    fn write_golden(path: &Path, input: &str, report: &str) {
        let mut text = input.to_string();
        text.push_str(DELIMITER);
        text.push('\n');
        text.push_str(report);
        write_text_file(path, &text).unwrap();
    }

    #[test]
    fn test_passing_case() {
        let dir = tempfile::tempdir().unwrap();
        let golden = dir.path().join("a72.test");
        let input = "arm_midr=00000000410fd083\n";
        write_golden(&golden, input, &arm_report("Cortex-A72"));

        let boundary = FakeBoundary::new("ARM", &arm_report("Cortex-A72"));
        let result = run_case(&boundary, &golden, false).unwrap();
        assert_eq!(result, CaseResult::Passed);
        // The tool must have been fed the capture alone.
        assert_eq!(boundary.seen_input.borrow().as_deref(), Some(input));
    }

    #[test]
    fn test_mismatch_names_the_field() {
        let dir = tempfile::tempdir().unwrap();
        let golden = dir.path().join("a72.test");
        write_golden(&golden, "arm_midr=00000000410fd083\n", &arm_report("Cortex-A57"));

        let boundary = FakeBoundary::new("ARM", &arm_report("Cortex-A72"));
        let result = run_case(&boundary, &golden, false).unwrap();
        match result {
            CaseResult::Mismatch(diffs) => {
                assert_eq!(diffs.len(), 1);
                let (field, expected, actual) = &diffs[0];
                assert_eq!(field, "codename");
                assert_eq!(expected, "Cortex-A57");
                assert_eq!(actual, "Cortex-A72");
            }
            other => panic!("wrong result: {:?}", other),
        }
    }

    #[test]
    fn test_cardinality_check() {
        let dir = tempfile::tempdir().unwrap();
        let golden = dir.path().join("short.test");
        write_golden(&golden, "arm_midr=00000000410fd083\n", "ARM\nARMv8.0-A\n");

        let boundary = FakeBoundary::new("ARM", "ARM\nARMv8.0-A\n");
        let result = run_case(&boundary, &golden, false).unwrap();
        assert_eq!(
            result,
            CaseResult::Cardinality {
                actual: 2,
                expected: FIELDS_ARM.len()
            }
        );
    }

    #[test]
    fn test_short_expected_section_is_cardinality() {
        let dir = tempfile::tempdir().unwrap();
        let golden = dir.path().join("short-expected.test");
        // Expected section missing its last line; the report itself is
        // the full catalog.
        let full = arm_report("Cortex-A72");
        let stale: String = full
            .lines()
            .take(FIELDS_ARM.len() - 1)
            .map(|l| format!("{}\n", l))
            .collect();
        write_golden(&golden, "arm_midr=00000000410fd083\n", &stale);

        let boundary = FakeBoundary::new("ARM", &full);
        let result = run_case(&boundary, &golden, false).unwrap();
        assert_eq!(
            result,
            CaseResult::Cardinality {
                actual: FIELDS_ARM.len(),
                expected: FIELDS_ARM.len() - 1
            }
        );
    }

    #[test]
    fn test_fix_mode_rewrites_expected_and_keeps_input() {
        let dir = tempfile::tempdir().unwrap();
        let golden = dir.path().join("stale.test.gz");
        let input = "arm_midr=00000000410fd083\n";
        write_golden(&golden, input, &arm_report("Cortex-A57"));

        let boundary = FakeBoundary::new("ARM", &arm_report("Cortex-A72"));
        let result = run_case(&boundary, &golden, true).unwrap();
        assert_eq!(result, CaseResult::Fixed);

        // Re-load: capture untouched, expected replaced, still gzipped.
        let unit = TestUnit::load(&golden).unwrap();
        assert_eq!(unit.input, input);
        assert!(unit.expected.iter().any(|l| l == "Cortex-A72"));
        let second = run_case(&boundary, &golden, false).unwrap();
        assert_eq!(second, CaseResult::Passed);
    }

    #[test]
    fn test_directory_walk_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("arm");
        fs::create_dir(&sub).unwrap();
        write_golden(
            &dir.path().join("good.test"),
            "arm_midr=00000000410fd083\n",
            &arm_report("Cortex-A72"),
        );
        write_golden(
            &sub.join("stale.test"),
            "arm_midr=00000000410fd083\n",
            &arm_report("Cortex-A57"),
        );
        // Not a golden file; must be ignored.
        fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();

        let boundary = FakeBoundary::new("ARM", &arm_report("Cortex-A72"));
        let (summary, results) = run(&boundary, dir.path(), false).unwrap();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.fixed, 0);
        assert_eq!(results.len(), 2);
    }

    /// Boundary that refuses captures holding a marker register value.
    struct RefusingBoundary {
        inner: FakeBoundary,
    }

    impl ToolBoundary for RefusingBoundary {
        fn architecture(&self, input: &Path) -> Result<String> {
            if read_text_file(input)?.contains("arm_midr=00000000000000ff") {
                return Err(Error::Tool("tool crashed".to_string()));
            }
            self.inner.architecture(input)
        }

        fn report(&self, input: &Path, fields: &[&str]) -> Result<String> {
            self.inner.report(input, fields)
        }
    }

    #[test]
    fn test_case_error_does_not_abort_siblings() {
        let dir = tempfile::tempdir().unwrap();
        write_golden(
            &dir.path().join("a_bad.test"),
            "arm_midr=00000000000000ff\n",
            &arm_report("Mystery"),
        );
        write_golden(
            &dir.path().join("b_good.test"),
            "arm_midr=00000000410fd083\n",
            &arm_report("Cortex-A72"),
        );

        let boundary = RefusingBoundary {
            inner: FakeBoundary::new("ARM", &arm_report("Cortex-A72")),
        };
        let (summary, results) = run(&boundary, dir.path(), false).unwrap();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.passed, 1);
        match &results[0].1 {
            CaseResult::Error(reason) => assert!(reason.contains("tool crashed")),
            other => panic!("wrong result: {:?}", other),
        }
        assert_eq!(results[1].1, CaseResult::Passed);
    }

    #[test]
    fn test_temp_names_are_distinct() {
        let names: HashSet<PathBuf> = (0..32).map(|_| temp_input_path()).collect();
        assert_eq!(names.len(), 32);
    }
}
