// Copyright (c) 2024 The cpuident developers
//
// SPDX-License-Identifier: Apache-2.0
//

//! Identification of processors from captured hardware descriptors.
//!
//! The crate consumes a text dump of CPUID leaves (x86) or identification
//! registers (ARM) captured elsewhere, decodes it into a structured
//! identity, and resolves a human-readable codename through a
//! priority-ordered match database. It also ships the offline consistency
//! validator for the static catalogs and the golden-file regression
//! harness used to keep the database honest.
//!
//! No hardware access happens here: a descriptor is either parsed from
//! text or handed in already built. Decoding never hard-fails on
//! unrecognized hardware; it degrades to an "unknown" identity instead.

#[macro_use]
extern crate slog;

#[macro_use]
extern crate lazy_static;

/// Convenience macro to obtain the library logger with the crate
/// subsystem field attached.
macro_rules! sl {
    () => {
        slog_scope::logger().new(o!("subsystem" => "cpuident"))
    };
}

pub mod consistency;
pub mod decode;
pub mod features;
pub mod matchdb;
pub mod raw;
pub mod regress;
pub mod report;

mod error;

pub use error::{Error, Result};
