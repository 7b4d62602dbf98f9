// Copyright (c) 2024 The cpuident developers
//
// SPDX-License-Identifier: Apache-2.0
//

use anyhow::{anyhow, Result};

use cpuident::consistency::{self, Severity};
use cpuident::regress::{self, CaseResult, CommandBoundary};

use crate::args::{CheckArgument, RegressArgument};

pub fn handle_check(args: CheckArgument) -> Result<()> {
    let report = consistency::run(args.quiet);
    for v in report.violations() {
        let severity = match v.severity {
            Severity::Warning => "warning",
            Severity::Fatal => "fatal",
        };
        println!("{}: {}: {}", severity, v.check, v.message);
    }
    println!(
        "{} items checked, {} violations",
        report.checked,
        report.violations().len()
    );
    if report.is_failure() {
        return Err(anyhow!("consistency check failed"));
    }
    Ok(())
}

pub fn handle_regress(args: RegressArgument) -> Result<()> {
    let binary = match args.binary {
        Some(binary) => binary,
        None => std::env::current_exe()?,
    };
    let boundary = CommandBoundary::new(binary);
    let (summary, results) = regress::run(&boundary, &args.path, args.fix)?;

    for (path, result) in &results {
        match result {
            CaseResult::Passed => {
                if !args.quiet {
                    println!("PASS  {}", path.display());
                }
            }
            CaseResult::Fixed => println!("FIXED {}", path.display()),
            CaseResult::Cardinality { actual, expected } => {
                println!(
                    "FAIL  {}: {} report lines, want {}",
                    path.display(),
                    actual,
                    expected
                );
            }
            CaseResult::Error(reason) => {
                println!("FAIL  {}: {}", path.display(), reason);
            }
            CaseResult::Mismatch(diffs) => {
                println!("FAIL  {}", path.display());
                for (field, expected, actual) in diffs {
                    println!("      {}: expected '{}', got '{}'", field, expected, actual);
                }
            }
        }
    }
    println!(
        "total {}, passed {}, failed {}, fixed {}",
        summary.total, summary.passed, summary.failed, summary.fixed
    );
    if summary.failed > 0 {
        return Err(anyhow!("{} regression case(s) failed", summary.failed));
    }
    Ok(())
}
