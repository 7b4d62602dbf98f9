// Copyright (c) 2024 The cpuident developers
//
// SPDX-License-Identifier: Apache-2.0
//

use crate::decode::Purpose;

/// Error types for the identification library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed capture text.
    #[error("malformed capture text at line {line}: {reason}")]
    Format {
        /// 1-based line number in the input text
        line: usize,
        /// what went wrong on that line
        reason: String,
    },

    /// A purpose-filtered lookup found no matching core record.
    #[error("no core with purpose '{0}' in this system")]
    CoreTypeNotFound(Purpose),

    /// A report was asked for a field name outside the catalogs.
    #[error("unknown report field '{0}'")]
    UnknownField(String),

    /// The external tool boundary could not be driven.
    #[error("tool boundary failure: {0}")]
    Tool(String),

    /// I/O failure while reading or writing capture/golden files.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type for the identification library.
pub type Result<T> = std::result::Result<T, Error>;
