// Copyright (c) 2024 The cpuident developers
//
// SPDX-License-Identifier: Apache-2.0
//

//! Canonical catalogs of CPU features, hints and secure-enclave
//! capabilities, with their capacity bounds and decode ownership.
//!
//! The registry is a statically-defined table built once at first use;
//! nothing is discovered by runtime reflection. Decode ownership is
//! aggregated from the decoder rule tables so the registry and the
//! decoder can never drift apart silently.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use strum_macros::EnumIter;

/// Capacity bound of the feature catalog.
pub const CPU_FLAGS_MAX: usize = 128;
/// Capacity bound of the hint catalog.
pub const CPU_HINTS_MAX: usize = 16;
/// Capacity bound of the secure-enclave feature catalog.
pub const SGX_FLAGS_MAX: usize = 14;

/// CPU feature identifiers, spanning both supported architectures.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter, Serialize,
)]
#[allow(missing_docs)]
pub enum Feature {
    // leaf 1 EDX
    Fpu,
    Vme,
    De,
    Pse,
    Tsc,
    Msr,
    Pae,
    Mce,
    Cx8,
    Apic,
    Sep,
    Mtrr,
    Pge,
    Mca,
    Cmov,
    Pat,
    Pse36,
    Pn,
    Clflush,
    Dts,
    Acpi,
    Mmx,
    Fxsr,
    Sse,
    Sse2,
    Ss,
    Ht,
    Tm,
    Ia64,
    Pbe,
    // leaf 1 ECX
    Pni,
    Pclmul,
    Dts64,
    Monitor,
    DsCpl,
    Vmx,
    Smx,
    Est,
    Tm2,
    Ssse3,
    Cid,
    Cx16,
    Xtpr,
    Pdcm,
    Sse4_1,
    Sse4_2,
    X2apic,
    Movbe,
    Popcnt,
    Aes,
    Xsave,
    Osxsave,
    Avx,
    F16c,
    Rdrand,
    Hypervisor,
    // leaf 7 EBX
    Fsgsbase,
    Sgx,
    Bmi1,
    Avx2,
    Smep,
    Bmi2,
    Avx512f,
    Avx512dq,
    Rdseed,
    Adx,
    Smap,
    Avx512cd,
    ShaNi,
    Avx512bw,
    Avx512vl,
    // ext leaf 1 EDX
    Syscall,
    Nx,
    Mmxext,
    FxsrOpt,
    Rdtscp,
    Lm,
    ThreeDNowExt,
    ThreeDNow,
    // ext leaf 1 ECX
    LahfLm,
    Svm,
    Abm,
    Sse4a,
    // deprecated, never shipped in silicon; kept for catalog stability
    Sse5,
    // ARM
    Fp,
    Asimd,
    Pmull,
    Sha1,
    Sha2,
    Crc32,
    Atomics,
    Rdm,
    Dotprod,
    Fhm,
    Sve,
    Sve2,
    Bf16,
    I8mm,
}

impl Feature {
    /// Canonical display string, e.g. `sse4_1`.
    pub fn name(&self) -> &'static str {
        FeatureRegistry::global().display(*self)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Runtime behavior hints recognized during decode.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter, Serialize,
)]
pub enum CpuHint {
    /// The reported SSE unit width came from an authoritative
    /// vendor-specific source rather than a guess.
    SseSizeAuth,
}

impl CpuHint {
    pub fn name(&self) -> &'static str {
        match self {
            CpuHint::SseSizeAuth => "sse_size_auth",
        }
    }
}

/// Secure-enclave capability bits.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter, Serialize,
)]
pub enum SgxFeature {
    Sgx1,
    Sgx2,
}

impl SgxFeature {
    pub fn name(&self) -> &'static str {
        match self {
            SgxFeature::Sgx1 => "sgx1",
            SgxFeature::Sgx2 => "sgx2",
        }
    }
}

/// Where the decode logic for a feature lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum DecodeOwner {
    CommonX86,
    Intel,
    Amd,
    Arm,
}

impl fmt::Display for DecodeOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DecodeOwner::CommonX86 => "x86/common",
            DecodeOwner::Intel => "x86/intel",
            DecodeOwner::Amd => "x86/amd",
            DecodeOwner::Arm => "arm",
        };
        f.write_str(s)
    }
}

/// Features allowed to diverge from the derived display string. A Rust
/// identifier cannot begin with a digit, so the 3DNow! pair keeps its
/// historical names by exception.
pub const STRING_WHITELIST: &[Feature] = &[Feature::ThreeDNow, Feature::ThreeDNowExt];

/// Features exempt from the single-owner coverage rule: SSE5 was
/// withdrawn before silicon shipped and has no decode logic; AES is
/// legitimately decoded on both architectures.
pub const COVERAGE_WHITELIST: &[Feature] = &[Feature::Sse5, Feature::Aes];

/// The full display-string table. Every [`Feature`] variant must appear
/// exactly once; the consistency validator enforces the naming rule.
pub const FEATURE_DISPLAY: &[(Feature, &str)] = &[
    (Feature::Fpu, "fpu"),
    (Feature::Vme, "vme"),
    (Feature::De, "de"),
    (Feature::Pse, "pse"),
    (Feature::Tsc, "tsc"),
    (Feature::Msr, "msr"),
    (Feature::Pae, "pae"),
    (Feature::Mce, "mce"),
    (Feature::Cx8, "cx8"),
    (Feature::Apic, "apic"),
    (Feature::Sep, "sep"),
    (Feature::Mtrr, "mtrr"),
    (Feature::Pge, "pge"),
    (Feature::Mca, "mca"),
    (Feature::Cmov, "cmov"),
    (Feature::Pat, "pat"),
    (Feature::Pse36, "pse36"),
    (Feature::Pn, "pn"),
    (Feature::Clflush, "clflush"),
    (Feature::Dts, "dts"),
    (Feature::Acpi, "acpi"),
    (Feature::Mmx, "mmx"),
    (Feature::Fxsr, "fxsr"),
    (Feature::Sse, "sse"),
    (Feature::Sse2, "sse2"),
    (Feature::Ss, "ss"),
    (Feature::Ht, "ht"),
    (Feature::Tm, "tm"),
    (Feature::Ia64, "ia64"),
    (Feature::Pbe, "pbe"),
    (Feature::Pni, "pni"),
    (Feature::Pclmul, "pclmul"),
    (Feature::Dts64, "dts64"),
    (Feature::Monitor, "monitor"),
    (Feature::DsCpl, "ds_cpl"),
    (Feature::Vmx, "vmx"),
    (Feature::Smx, "smx"),
    (Feature::Est, "est"),
    (Feature::Tm2, "tm2"),
    (Feature::Ssse3, "ssse3"),
    (Feature::Cid, "cid"),
    (Feature::Cx16, "cx16"),
    (Feature::Xtpr, "xtpr"),
    (Feature::Pdcm, "pdcm"),
    (Feature::Sse4_1, "sse4_1"),
    (Feature::Sse4_2, "sse4_2"),
    (Feature::X2apic, "x2apic"),
    (Feature::Movbe, "movbe"),
    (Feature::Popcnt, "popcnt"),
    (Feature::Aes, "aes"),
    (Feature::Xsave, "xsave"),
    (Feature::Osxsave, "osxsave"),
    (Feature::Avx, "avx"),
    (Feature::F16c, "f16c"),
    (Feature::Rdrand, "rdrand"),
    (Feature::Hypervisor, "hypervisor"),
    (Feature::Fsgsbase, "fsgsbase"),
    (Feature::Sgx, "sgx"),
    (Feature::Bmi1, "bmi1"),
    (Feature::Avx2, "avx2"),
    (Feature::Smep, "smep"),
    (Feature::Bmi2, "bmi2"),
    (Feature::Avx512f, "avx512f"),
    (Feature::Avx512dq, "avx512dq"),
    (Feature::Rdseed, "rdseed"),
    (Feature::Adx, "adx"),
    (Feature::Smap, "smap"),
    (Feature::Avx512cd, "avx512cd"),
    (Feature::ShaNi, "sha_ni"),
    (Feature::Avx512bw, "avx512bw"),
    (Feature::Avx512vl, "avx512vl"),
    (Feature::Syscall, "syscall"),
    (Feature::Nx, "nx"),
    (Feature::Mmxext, "mmxext"),
    (Feature::FxsrOpt, "fxsr_opt"),
    (Feature::Rdtscp, "rdtscp"),
    (Feature::Lm, "lm"),
    (Feature::ThreeDNowExt, "3dnowext"),
    (Feature::ThreeDNow, "3dnow"),
    (Feature::LahfLm, "lahf_lm"),
    (Feature::Svm, "svm"),
    (Feature::Abm, "abm"),
    (Feature::Sse4a, "sse4a"),
    (Feature::Sse5, "sse5"),
    (Feature::Fp, "fp"),
    (Feature::Asimd, "asimd"),
    (Feature::Pmull, "pmull"),
    (Feature::Sha1, "sha1"),
    (Feature::Sha2, "sha2"),
    (Feature::Crc32, "crc32"),
    (Feature::Atomics, "atomics"),
    (Feature::Rdm, "rdm"),
    (Feature::Dotprod, "dotprod"),
    (Feature::Fhm, "fhm"),
    (Feature::Sve, "sve"),
    (Feature::Sve2, "sve2"),
    (Feature::Bf16, "bf16"),
    (Feature::I8mm, "i8mm"),
];

/// The canonical display string a feature is expected to carry: the
/// variant identifier converted to snake case.
pub fn derived_display(feature: Feature) -> String {
    let ident = format!("{:?}", feature);
    let mut out = String::with_capacity(ident.len() + 2);
    let mut prev_breaks = false;
    for c in ident.chars() {
        if c.is_ascii_uppercase() {
            if prev_breaks {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
            prev_breaks = false;
        } else {
            out.push(c);
            prev_breaks = c.is_ascii_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

/// The process-wide feature catalog.
pub struct FeatureRegistry {
    display: BTreeMap<Feature, &'static str>,
    owners: BTreeMap<Feature, Vec<DecodeOwner>>,
}

lazy_static! {
    static ref REGISTRY: FeatureRegistry =
        FeatureRegistry::build(FEATURE_DISPLAY, crate::decode::decode_rules());
}

impl FeatureRegistry {
    /// The registry instance, built on first use and read-only after.
    pub fn global() -> &'static FeatureRegistry {
        &REGISTRY
    }

    /// Build a registry from a display table and a set of decode rules.
    /// Split out from [`FeatureRegistry::global`] so the consistency
    /// checks can be exercised against synthetic catalogs.
    pub fn build(
        display: &[(Feature, &'static str)],
        rules: impl IntoIterator<Item = (Feature, DecodeOwner)>,
    ) -> FeatureRegistry {
        let display = display.iter().copied().collect();
        let mut owners: BTreeMap<Feature, Vec<DecodeOwner>> = BTreeMap::new();
        for (feature, owner) in rules {
            owners.entry(feature).or_default().push(owner);
        }
        for list in owners.values_mut() {
            list.sort_unstable();
            list.dedup();
        }
        FeatureRegistry { display, owners }
    }

    /// Number of catalog members.
    pub fn len(&self) -> usize {
        self.display.len()
    }

    pub fn is_empty(&self) -> bool {
        self.display.is_empty()
    }

    /// Canonical display string for a feature.
    pub fn display(&self, feature: Feature) -> &'static str {
        // Every variant is present in FEATURE_DISPLAY; the validator
        // test suite guards this.
        self.display.get(&feature).copied().unwrap_or("?")
    }

    /// Decode owners of a feature (empty when no decode logic exists).
    pub fn owners(&self, feature: Feature) -> &[DecodeOwner] {
        self.owners.get(&feature).map(|v| &v[..]).unwrap_or(&[])
    }

    /// Iterate over (feature, display) pairs in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (Feature, &'static str)> + '_ {
        self.display.iter().map(|(f, s)| (*f, *s))
    }
}
