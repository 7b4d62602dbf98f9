// Copyright (c) 2024 The cpuident developers
//
// SPDX-License-Identifier: Apache-2.0
//

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[clap(name = "cpuident-ctl", author, about = "CPU identification control tool")]
pub struct CpuidentCli {
    /// Raise log verbosity to debug
    #[clap(short, long, global = true)]
    pub debug: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Decode a capture file into a human-readable identity
    Identify(IdentifyArgument),

    /// Print report fields of a capture, for scripted consumers
    Report(ReportArgument),

    /// Validate the compiled-in catalogs and match database
    Check(CheckArgument),

    /// Run golden-file regression cases against a tool binary
    Regress(RegressArgument),
}

#[derive(Debug, Args)]
pub struct IdentifyArgument {
    /// Capture file to decode (gzip decided by extension)
    #[clap(long)]
    pub load: PathBuf,

    /// Restrict output to the CPU type with this purpose
    #[clap(long)]
    pub purpose: Option<String>,

    /// Emit the decoded identity as JSON instead of a summary
    #[clap(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ReportArgument {
    /// Capture file to decode (gzip decided by extension)
    #[clap(long)]
    pub load: PathBuf,

    /// Write the report to this file instead of stdout
    #[clap(long)]
    pub outfile: Option<PathBuf>,

    /// Print only the decoded architecture and exit
    #[clap(long)]
    pub architecture: bool,

    /// Comma-separated field names; the full per-architecture catalog
    /// when omitted
    #[clap(long, value_delimiter = ',')]
    pub fields: Vec<String>,
}

#[derive(Debug, Args)]
pub struct CheckArgument {
    /// Suppress warnings, report fatal violations only
    #[clap(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Args)]
pub struct RegressArgument {
    /// Golden file, or directory searched for *.test / *.test.gz
    pub path: PathBuf,

    /// Tool binary to drive; the current executable when omitted
    #[clap(long)]
    pub binary: Option<PathBuf>,

    /// Rewrite stale expected sections from the actual output
    #[clap(long)]
    pub fix: bool,

    /// Print failing cases only
    #[clap(short, long)]
    pub quiet: bool,
}
