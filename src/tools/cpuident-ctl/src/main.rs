// Copyright (c) 2024 The cpuident developers
//
// SPDX-License-Identifier: Apache-2.0
//

mod args;
mod ops;

use anyhow::Result;
use clap::Parser;
use slog::{o, Drain, Logger};
use std::process::exit;

use args::{Commands, CpuidentCli};

use ops::check_ops::{handle_check, handle_regress};
use ops::report_ops::{handle_identify, handle_report};

fn setup_logger(debug: bool) -> slog_scope::GlobalLoggerGuard {
    let level = if debug {
        slog::Level::Debug
    } else {
        slog::Level::Warning
    };
    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::CompactFormat::new(decorator)
        .build()
        .filter_level(level)
        .fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let logger = Logger::root(drain, o!("name" => "cpuident-ctl"));
    slog_scope::set_global_logger(logger)
}

fn real_main() -> Result<()> {
    let args = CpuidentCli::parse();
    let _guard = setup_logger(args.debug);

    match args.command {
        Commands::Identify(args) => handle_identify(args),
        Commands::Report(args) => handle_report(args),
        Commands::Check(args) => handle_check(args),
        Commands::Regress(args) => handle_regress(args),
    }
}

fn main() {
    if let Err(e) = real_main() {
        eprintln!("ERROR: {:#}", e);
        exit(1);
    }
}
