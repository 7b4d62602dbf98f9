// Copyright (c) 2024 The cpuident developers
//
// SPDX-License-Identifier: Apache-2.0
//

//! Codename match database and matching engine.
//!
//! Entries are grouped per vendor and tested in listed order; the first
//! structurally compatible entry wins. Listed order is the priority
//! order and is never normalized or re-sorted. A cache-size token
//! embedded in a codename ("(12288K)") additionally requires the
//! decoded identity's most specific cache size to equal it exactly.

use regex::Regex;

use crate::decode::Vendor;

mod amd;
mod intel;

/// Maximum codename string length accepted by the schema check.
pub const CODENAME_STR_MAX: usize = 63;
/// Maximum technology string length accepted by the schema check.
pub const TECHNOLOGY_STR_MAX: usize = 15;

/// Predicate over one numeric identity field. `Any` is the wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchField {
    Any,
    Is(i32),
    Range(i32, i32),
    OneOf(&'static [i32]),
}

impl MatchField {
    pub fn accepts(&self, value: i32) -> bool {
        match self {
            MatchField::Any => true,
            MatchField::Is(x) => value == *x,
            MatchField::Range(lo, hi) => value >= *lo && value <= *hi,
            MatchField::OneOf(set) => set.contains(&value),
        }
    }
}

/// One processor signature in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchEntry {
    pub family: MatchField,
    pub model: MatchField,
    pub stepping: MatchField,
    pub ext_family: MatchField,
    pub ext_model: MatchField,
    pub ncores: MatchField,
    pub l2_cache: MatchField,
    pub l3_cache: MatchField,
    /// Substring the brand string must contain, when present.
    pub brand: Option<&'static str>,
    pub codename: &'static str,
    pub technology: &'static str,
}

/// Macro keeping the signature tables readable: positional fields in
/// schema order.
macro_rules! entry {
    ($f:expr, $m:expr, $s:expr, $ef:expr, $em:expr, $nc:expr, $l2:expr, $l3:expr,
     $brand:expr, $codename:expr, $tech:expr) => {
        MatchEntry {
            family: $f,
            model: $m,
            stepping: $s,
            ext_family: $ef,
            ext_model: $em,
            ncores: $nc,
            l2_cache: $l2,
            l3_cache: $l3,
            brand: $brand,
            codename: $codename,
            technology: $tech,
        }
    };
}
pub(crate) use entry;

/// The decoded fields the engine matches against. Cache sizes are in
/// KB with -1 for "undetermined".
#[derive(Debug, Clone)]
pub struct MatchInput<'a> {
    pub vendor: Vendor,
    pub family: i32,
    pub model: i32,
    pub stepping: i32,
    pub ext_family: i32,
    pub ext_model: i32,
    pub ncores: i32,
    pub l2_cache: i32,
    pub l3_cache: i32,
    pub brand: &'a str,
    /// Most specific detected cache size, for codename token checks.
    pub most_specific_cache: Option<u32>,
}

lazy_static! {
    static ref CACHE_TOKEN: Regex = Regex::new(r"[\(/ ]([0-9]+)K").unwrap();
}

/// Extract the cache-size token (KB) embedded in a codename, if any.
pub fn cache_token(codename: &str) -> Option<u32> {
    CACHE_TOKEN
        .captures(codename)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
}

fn entry_matches(entry: &MatchEntry, input: &MatchInput<'_>) -> bool {
    if !(entry.family.accepts(input.family)
        && entry.model.accepts(input.model)
        && entry.stepping.accepts(input.stepping)
        && entry.ext_family.accepts(input.ext_family)
        && entry.ext_model.accepts(input.ext_model)
        && entry.ncores.accepts(input.ncores)
        && entry.l2_cache.accepts(input.l2_cache)
        && entry.l3_cache.accepts(input.l3_cache))
    {
        return false;
    }
    if let Some(pattern) = entry.brand {
        if !input.brand.contains(pattern) {
            return false;
        }
    }
    // Cache-size disambiguation: the embedded token must equal the
    // detected size exactly; no "nearest" fallback.
    if let Some(token) = cache_token(entry.codename) {
        if input.most_specific_cache != Some(token) {
            return false;
        }
    }
    true
}

/// First matching entry in listed order.
pub fn resolve_in<'e>(
    entries: &'e [MatchEntry],
    input: &MatchInput<'_>,
) -> Option<&'e MatchEntry> {
    entries.iter().find(|e| entry_matches(e, input))
}

/// Signature tables per vendor group, with a stable group label used
/// in validator reports.
pub fn vendor_tables() -> &'static [(&'static str, &'static [MatchEntry])] {
    &[
        ("intel", intel::ENTRIES),
        ("amd", amd::ENTRIES),
        ("centaur", CENTAUR_ENTRIES),
    ]
}

fn entries_for(vendor: Vendor) -> &'static [MatchEntry] {
    match vendor {
        Vendor::Intel => intel::ENTRIES,
        Vendor::Amd | Vendor::Hygon => amd::ENTRIES,
        Vendor::Centaur | Vendor::Zhaoxin => CENTAUR_ENTRIES,
        _ => &[],
    }
}

/// Resolve a codename and technology string for a decoded identity.
///
/// Falling through the whole table is not an error; a generic
/// "Unknown <vendor> CPU" codename is produced instead.
pub fn resolve(input: &MatchInput<'_>) -> (String, String) {
    match resolve_in(entries_for(input.vendor), input) {
        Some(entry) => (entry.codename.to_string(), entry.technology.to_string()),
        None => (format!("Unknown {} CPU", input.vendor), "unknown".to_string()),
    }
}

use MatchField::{Any as A, Is};

/// VIA / Zhaoxin signatures.
const CENTAUR_ENTRIES: &[MatchEntry] = &[
    entry!(Is(6), Is(6), A, A, A, A, A, A, Some("VIA Samuel"), "VIA Cyrix III (Samuel)", "180 nm"),
    entry!(Is(6), Is(7), A, A, A, A, A, A, None, "VIA C3 (Samuel 2)", "150 nm"),
    entry!(Is(6), Is(9), A, A, A, A, A, A, None, "VIA C3 (Nehemiah)", "130 nm"),
    entry!(Is(6), Is(0xd), A, A, A, A, A, A, None, "VIA C7 (Esther)", "90 nm"),
    entry!(Is(6), Is(0xf), A, A, A, A, A, A, None, "VIA Nano (Isaiah)", "65 nm"),
    entry!(Is(7), A, A, A, A, A, A, A, None, "Zhaoxin KaiXian", "16 nm"),
];

#[cfg(test)]
mod tests {
    use super::*;
    use MatchField::OneOf;

    fn skylake_input(l3: i32) -> MatchInput<'static> {
        MatchInput {
            vendor: Vendor::Intel,
            family: 6,
            model: 0x5e,
            stepping: 3,
            ext_family: 6,
            ext_model: 0x5e,
            ncores: 4,
            l2_cache: 1024,
            l3_cache: l3,
            brand: "Intel(R) Xeon(R) CPU E3-1275 v5",
            most_specific_cache: if l3 > 0 { Some(l3 as u32) } else { None },
        }
    }

    #[test]
    fn test_cache_token_extraction() {
        #[derive(Debug)]
        struct TestData {
            codename: &'static str,
            expected: Option<u32>,
        }

        let tests = &[
            TestData {
                codename: "Skylake (12288K)",
                expected: Some(12288),
            },
            TestData {
                codename: "Wolfdale (Core 2 Duo) (6144K)",
                expected: Some(6144),
            },
            TestData {
                codename: "Xeon (Skylake / 8192K)",
                expected: Some(8192),
            },
            TestData {
                codename: "Coffee Lake (Core i7)",
                expected: None,
            },
            TestData {
                codename: "K6-2",
                expected: None,
            },
        ];

        for (i, d) in tests.iter().enumerate() {
            let msg = format!("test[{}]: {:?}", i, d);
            assert_eq!(cache_token(d.codename), d.expected, "{}", msg);
        }
    }

    #[test]
    fn test_cache_size_disambiguation() {
        // Two entries identical but for the cache token; the token must
        // match the detected size exactly.
        let entries: &[MatchEntry] = &[
            entry!(
                Is(6), OneOf(&[0x4e, 0x5e]), A, A, A, A, A, A,
                None, "Skylake (12288K)", "14 nm"
            ),
            entry!(
                Is(6), OneOf(&[0x4e, 0x5e]), A, A, A, A, A, A,
                None, "Skylake", "14 nm"
            ),
        ];

        let hit = resolve_in(entries, &skylake_input(12288)).unwrap();
        assert_eq!(hit.codename, "Skylake (12288K)");

        // Detected 8192 KB: the tokened entry must fall through.
        let hit = resolve_in(entries, &skylake_input(8192)).unwrap();
        assert_eq!(hit.codename, "Skylake");
    }

    #[test]
    fn test_first_match_wins_and_order_stability() {
        let matching = entry!(Is(6), Is(0x5e), A, A, A, A, A, A, None, "winner", "14 nm");
        let miss_family = entry!(Is(15), A, A, A, A, A, A, A, None, "miss-family", "90 nm");
        let miss_brand = entry!(
            Is(6), A, A, A, A, A, A, A, Some("Celeron"), "miss-brand", "14 nm"
        );

        let input = skylake_input(8192);
        // Permute the non-matching entries around the matching one; the
        // winner never changes.
        let permutations: &[&[MatchEntry]] = &[
            &[miss_family, miss_brand, matching],
            &[miss_family, matching, miss_brand],
            &[matching, miss_family, miss_brand],
        ];
        for (i, entries) in permutations.iter().enumerate() {
            let hit = resolve_in(entries, &input).unwrap();
            assert_eq!(hit.codename, "winner", "permutation[{}]", i);
        }

        // Two matching entries: listed order decides.
        let also_matching = entry!(Is(6), A, A, A, A, A, A, A, None, "second", "14 nm");
        let entries = [also_matching, matching];
        let hit = resolve_in(&entries, &input).unwrap();
        assert_eq!(hit.codename, "second");
    }

    #[test]
    fn test_fallback_is_not_an_error() {
        let input = MatchInput {
            vendor: Vendor::Rise,
            family: 5,
            model: 0,
            stepping: 0,
            ext_family: 5,
            ext_model: 0,
            ncores: 1,
            l2_cache: -1,
            l3_cache: -1,
            brand: "",
            most_specific_cache: None,
        };
        let (codename, technology) = resolve(&input);
        assert_eq!(codename, "Unknown Rise CPU");
        assert_eq!(technology, "unknown");
    }

    #[test]
    fn test_range_and_ncores_predicates() {
        let quad = entry!(
            Is(6), Is(0xf), A, A, A, Is(4), A, A, None, "Kentsfield (Core 2 Quad)", "65 nm"
        );
        let duo = entry!(
            Is(6), Is(0xf), A, A, A, MatchField::Range(1, 2), A, A, None,
            "Conroe (Core 2 Duo)", "65 nm"
        );
        let entries = &[quad, duo];

        let mut input = skylake_input(-1);
        input.model = 0xf;
        input.ncores = 4;
        assert_eq!(resolve_in(entries, &input).unwrap().codename, "Kentsfield (Core 2 Quad)");
        input.ncores = 2;
        assert_eq!(resolve_in(entries, &input).unwrap().codename, "Conroe (Core 2 Duo)");
    }

    #[test]
    fn test_vendor_tables_reachable() {
        for (label, entries) in vendor_tables() {
            assert!(!entries.is_empty(), "empty table: {}", label);
        }
    }
}
