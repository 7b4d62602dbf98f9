// Copyright (c) 2024 The cpuident developers
//
// SPDX-License-Identifier: Apache-2.0
//

//! Static validation of the feature catalogs and the match database.
//!
//! These checks run offline against the compiled-in tables, not against
//! live hardware; `cpuident-ctl check` is their front-end.

use strum::IntoEnumIterator;

use crate::features::{
    derived_display, CpuHint, Feature, FeatureRegistry, SgxFeature, COVERAGE_WHITELIST,
    CPU_FLAGS_MAX, CPU_HINTS_MAX, SGX_FLAGS_MAX, STRING_WHITELIST,
};
use crate::matchdb::{
    cache_token, vendor_tables, MatchEntry, CODENAME_STR_MAX, TECHNOLOGY_STR_MAX,
};

/// Cache sizes (KB) that actually shipped; a codename token outside
/// this set is almost certainly a typo.
pub const COMMON_CACHE_SIZES: &[u32] = &[
    8, 16, 32, 64, 128, 256, 512, 1024, 2048, 3072, 4096, 6144, 8192, 12288, 16384,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Fatal,
}

/// A single failed check.
#[derive(Debug, Clone)]
pub struct Violation {
    pub check: &'static str,
    pub severity: Severity,
    pub message: String,
}

/// Outcome of a validation run.
#[derive(Debug, Default)]
pub struct Report {
    /// Number of individual items examined across all checks.
    pub checked: usize,
    violations: Vec<Violation>,
}

impl Report {
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Warnings alone do not fail a run.
    pub fn is_failure(&self) -> bool {
        self.violations
            .iter()
            .any(|v| v.severity == Severity::Fatal)
    }

    fn fatal(&mut self, check: &'static str, message: String) {
        self.violations.push(Violation {
            check,
            severity: Severity::Fatal,
            message,
        });
    }

    fn warn(&mut self, check: &'static str, message: String) {
        self.violations.push(Violation {
            check,
            severity: Severity::Warning,
            message,
        });
    }

    fn merge(&mut self, other: Report) {
        self.checked += other.checked;
        self.violations.extend(other.violations);
    }
}

/// Every catalog must fit its declared capacity bound.
pub fn check_enum_capacity(registry: &FeatureRegistry) -> Report {
    let mut report = Report::default();
    let counts: &[(&str, usize, usize)] = &[
        ("CPU_FLAGS_MAX", registry.len(), CPU_FLAGS_MAX),
        ("CPU_HINTS_MAX", CpuHint::iter().count(), CPU_HINTS_MAX),
        ("SGX_FLAGS_MAX", SgxFeature::iter().count(), SGX_FLAGS_MAX),
    ];
    for (bound, actual, max) in counts {
        report.checked += 1;
        if actual > max {
            report.fatal(
                "enum-capacity",
                format!("{} exceeded: {} entries, capacity {}", bound, actual, max),
            );
        }
    }
    report
}

/// Display strings must be the lowercased identifier, except for the
/// whitelisted historical names.
pub fn check_feature_strings(registry: &FeatureRegistry) -> Report {
    let mut report = Report::default();
    for (feature, display) in registry.iter() {
        report.checked += 1;
        if STRING_WHITELIST.contains(&feature) {
            continue;
        }
        let derived = derived_display(feature);
        if display != derived {
            report.fatal(
                "feature-strings",
                format!(
                    "display string for {:?} is \"{}\", want \"{}\"",
                    feature, display, derived
                ),
            );
        }
    }
    report
}

/// Every cataloged feature must be set by exactly one decode location.
pub fn check_feature_coverage(registry: &FeatureRegistry) -> Report {
    let mut report = Report::default();
    for feature in Feature::iter() {
        report.checked += 1;
        if COVERAGE_WHITELIST.contains(&feature) {
            continue;
        }
        let owners = registry.owners(feature);
        match owners.len() {
            0 => report.fatal(
                "feature-coverage",
                format!("No detection code for {}", registry.display(feature)),
            ),
            1 => {}
            _ => report.fatal(
                "feature-coverage",
                format!(
                    "Conflicting detection code for {} in {} and {}",
                    registry.display(feature),
                    owners[0],
                    owners[1]
                ),
            ),
        }
    }
    report
}

/// Schema limits on one signature table.
pub fn check_match_entries(label: &str, entries: &[MatchEntry]) -> Report {
    let mut report = Report::default();
    for (i, entry) in entries.iter().enumerate() {
        report.checked += 1;
        if entry.codename.len() > CODENAME_STR_MAX {
            report.fatal(
                "match-schema",
                format!("{}[{}]: Codename too long: {}", label, i, entry.codename),
            );
        }
        if entry.technology.len() > TECHNOLOGY_STR_MAX {
            report.fatal(
                "match-schema",
                format!(
                    "{}[{}]: Technology string too long: {}",
                    label, i, entry.technology
                ),
            );
        }
        if let Some(token) = cache_token(entry.codename) {
            if !COMMON_CACHE_SIZES.contains(&token) {
                report.warn(
                    "match-schema",
                    format!(
                        "{}[{}]: Suspicious cache size in codename: {}",
                        label, i, entry.codename
                    ),
                );
            }
        }
    }
    report
}

/// Run every check against the compiled-in catalogs. With `quiet`,
/// warnings are dropped and only fatal violations remain.
pub fn run(quiet: bool) -> Report {
    let registry = FeatureRegistry::global();
    let mut report = Report::default();
    report.merge(check_enum_capacity(registry));
    report.merge(check_feature_strings(registry));
    report.merge(check_feature_coverage(registry));
    for (label, entries) in vendor_tables() {
        report.merge(check_match_entries(label, entries));
    }
    if quiet {
        report.violations.retain(|v| v.severity == Severity::Fatal);
    }
    info!(
        sl!(),
        "consistency run";
        "checked" => report.checked,
        "violations" => report.violations.len(),
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{DecodeOwner, FEATURE_DISPLAY};
    use crate::matchdb::MatchField::Any;

    #[test]
    fn test_compiled_in_tables_are_clean() {
        let report = run(false);
        assert!(
            !report.is_failure(),
            "violations: {:?}",
            report.violations()
        );
        assert!(report.checked > 0);
    }

    #[test]
    fn test_missing_detection_code_is_fatal() {
        // A registry with no rule for Sse2 must produce the zero-owner
        // violation.
        let rules = vec![(Feature::Fpu, DecodeOwner::CommonX86)];
        let registry = FeatureRegistry::build(FEATURE_DISPLAY, rules);
        let report = check_feature_coverage(&registry);
        assert!(report.is_failure());
        let msg = format!("No detection code for {}", "sse2");
        assert!(
            report.violations().iter().any(|v| v.message == msg),
            "missing violation in {:?}",
            report.violations()
        );
    }

    #[test]
    fn test_conflicting_detection_code_is_fatal() {
        let rules = vec![
            (Feature::Sse2, DecodeOwner::Intel),
            (Feature::Sse2, DecodeOwner::Amd),
        ];
        let registry = FeatureRegistry::build(FEATURE_DISPLAY, rules);
        let report = check_feature_coverage(&registry);
        let msg = "Conflicting detection code for sse2 in x86/intel and x86/amd";
        assert!(
            report.violations().iter().any(|v| v.message == msg),
            "missing violation in {:?}",
            report.violations()
        );
    }

    #[test]
    fn test_whitelisted_features_are_exempt() {
        // Sse5 has no decode rule and Aes has two; neither may fail the
        // compiled-in run.
        let registry = FeatureRegistry::global();
        assert!(registry.owners(Feature::Sse5).is_empty());
        assert_eq!(registry.owners(Feature::Aes).len(), 2);
        assert!(!check_feature_coverage(registry).is_failure());
    }

    #[test]
    fn test_schema_limits() {
        let long_codename = "X".repeat(CODENAME_STR_MAX + 1);
        let long_codename: &'static str = Box::leak(long_codename.into_boxed_str());
        let bad = MatchEntry {
            family: Any,
            model: Any,
            stepping: Any,
            ext_family: Any,
            ext_model: Any,
            ncores: Any,
            l2_cache: Any,
            l3_cache: Any,
            brand: None,
            codename: long_codename,
            technology: "this is way too long",
        };
        let report = check_match_entries("test", &[bad]);
        let fatal = report
            .violations()
            .iter()
            .filter(|v| v.severity == Severity::Fatal)
            .count();
        assert_eq!(fatal, 2);
    }

    #[test]
    fn test_unusual_cache_token_is_warning_only() {
        let odd = MatchEntry {
            family: Any,
            model: Any,
            stepping: Any,
            ext_family: Any,
            ext_model: Any,
            ncores: Any,
            l2_cache: Any,
            l3_cache: Any,
            brand: None,
            codename: "Oddball (777K)",
            technology: "14 nm",
        };
        let report = check_match_entries("test", &[odd]);
        assert!(!report.is_failure());
        assert_eq!(report.violations().len(), 1);
        assert_eq!(report.violations()[0].severity, Severity::Warning);
    }
}
