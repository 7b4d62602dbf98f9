// Copyright (c) 2024 The cpuident developers
//
// SPDX-License-Identifier: Apache-2.0
//

//! Raw descriptor decoding into structured identities.
//!
//! Dispatch looks at the vendor-signature leaves: nonzero basic leaf 0
//! selects the x86 path, a nonzero MIDR selects the ARM path, anything
//! else produces a degraded "unknown" identity. Decoding is pure and
//! never hard-fails; partial identification always beats none.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::features::{CpuHint, DecodeOwner, Feature, SgxFeature};
use crate::raw::{ArmRegister, LeafClass, RawDescriptor, RawDescriptorSet};
use crate::{Error, Result};

pub(crate) mod arm;
pub(crate) mod x86;

/// Extract a bit range (inclusive bounds, like hardware manuals write
/// them) from a register value.
pub(crate) fn extract_bits(value: u64, hi: u8, lo: u8) -> u64 {
    (value >> lo) & ((1u64 << (hi - lo + 1)) - 1)
}

pub(crate) fn extract_bit(value: u64, bit: u8) -> bool {
    (value >> bit) & 1 == 1
}

/// Processor architecture family of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Architecture {
    X86,
    Arm,
    Unknown,
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Architecture::X86 => "x86",
            Architecture::Arm => "ARM",
            Architecture::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// CPU vendor, guessed from the vendor string (x86) or the MIDR
/// implementer field (ARM).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[allow(missing_docs)]
pub enum Vendor {
    Intel,
    Amd,
    Hygon,
    Centaur,
    Zhaoxin,
    Cyrix,
    NexGen,
    Transmeta,
    Umc,
    Rise,
    Sis,
    Nsc,
    Vortex,
    Arm,
    Broadcom,
    Cavium,
    Dec,
    Fujitsu,
    HiSilicon,
    Infineon,
    Freescale,
    Nvidia,
    Apm,
    Qualcomm,
    Samsung,
    Marvell,
    Apple,
    Faraday,
    Microsoft,
    Phytium,
    Ampere,
    Unknown,
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Vendor::Intel => "Intel",
            Vendor::Amd => "AMD",
            Vendor::Hygon => "Hygon",
            Vendor::Centaur => "Centaur",
            Vendor::Zhaoxin => "Zhaoxin",
            Vendor::Cyrix => "Cyrix",
            Vendor::NexGen => "NexGen",
            Vendor::Transmeta => "Transmeta",
            Vendor::Umc => "UMC",
            Vendor::Rise => "Rise",
            Vendor::Sis => "SiS",
            Vendor::Nsc => "NSC",
            Vendor::Vortex => "Vortex86",
            Vendor::Arm => "ARM",
            Vendor::Broadcom => "Broadcom",
            Vendor::Cavium => "Cavium",
            Vendor::Dec => "DEC",
            Vendor::Fujitsu => "Fujitsu",
            Vendor::HiSilicon => "HiSilicon",
            Vendor::Infineon => "Infineon",
            Vendor::Freescale => "Motorola/Freescale",
            Vendor::Nvidia => "NVIDIA",
            Vendor::Apm => "APM",
            Vendor::Qualcomm => "Qualcomm",
            Vendor::Samsung => "Samsung",
            Vendor::Marvell => "Marvell",
            Vendor::Apple => "Apple",
            Vendor::Faraday => "Faraday",
            Vendor::Microsoft => "Microsoft",
            Vendor::Phytium => "Phytium",
            Vendor::Ampere => "Ampere",
            Vendor::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Role of a core in a (possibly heterogeneous) system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Purpose {
    General,
    Performance,
    Efficiency,
    LpEfficiency,
    UPerformance,
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Purpose::General => "general",
            Purpose::Performance => "performance",
            Purpose::Efficiency => "efficiency",
            Purpose::LpEfficiency => "low-power efficiency",
            Purpose::UPerformance => "ultimate performance",
        };
        f.write_str(s)
    }
}

impl FromStr for Purpose {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "general" => Ok(Purpose::General),
            "performance" => Ok(Purpose::Performance),
            "efficiency" => Ok(Purpose::Efficiency),
            "low-power efficiency" | "lp-efficiency" => Ok(Purpose::LpEfficiency),
            "ultimate performance" | "u-performance" => Ok(Purpose::UPerformance),
            _ => Err(format!("unknown purpose '{}'", s)),
        }
    }
}

/// Hypervisor vendors recognizable from the hypervisor leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HypervisorVendor {
    Bhyve,
    HyperV,
    Kvm,
    Parallels,
    Qemu,
    VirtualBox,
    VMware,
    Xen,
}

impl fmt::Display for HypervisorVendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HypervisorVendor::Bhyve => "bhyve",
            HypervisorVendor::HyperV => "Hyper-V",
            HypervisorVendor::Kvm => "KVM",
            HypervisorVendor::Parallels => "Parallels",
            HypervisorVendor::Qemu => "QEMU",
            HypervisorVendor::VirtualBox => "VirtualBox",
            HypervisorVendor::VMware => "VMware",
            HypervisorVendor::Xen => "Xen",
        };
        f.write_str(s)
    }
}

const HYPERVISOR_VENDORS: &[(&str, HypervisorVendor)] = &[
    ("bhyve bhyve", HypervisorVendor::Bhyve),
    ("Microsoft Hv", HypervisorVendor::HyperV),
    ("KVMKVMKVM", HypervisorVendor::Kvm),
    ("prl hyperv", HypervisorVendor::Parallels),
    ("TCGTCGTCGTCG", HypervisorVendor::Qemu),
    ("VBoxVBoxVBox", HypervisorVendor::VirtualBox),
    ("VMwareVMware", HypervisorVendor::VMware),
    ("XenVMMXenVMM", HypervisorVendor::Xen),
];

/// Coarse ISA/microarchitecture tier derived from the flag set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[allow(missing_docs)]
pub enum FeatureLevel {
    Unknown,
    X64V1,
    X64V2,
    X64V3,
    X64V4,
    ArmV8_0A,
    ArmV8_1A,
    ArmV8_2A,
    ArmV8_4A,
    ArmV8_6A,
    ArmV9_0A,
}

impl fmt::Display for FeatureLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FeatureLevel::Unknown => "unknown",
            FeatureLevel::X64V1 => "x86-64-v1",
            FeatureLevel::X64V2 => "x86-64-v2",
            FeatureLevel::X64V3 => "x86-64-v3",
            FeatureLevel::X64V4 => "x86-64-v4",
            FeatureLevel::ArmV8_0A => "ARMv8.0-A",
            FeatureLevel::ArmV8_1A => "ARMv8.1-A",
            FeatureLevel::ArmV8_2A => "ARMv8.2-A",
            FeatureLevel::ArmV8_4A => "ARMv8.4-A",
            FeatureLevel::ArmV8_6A => "ARMv8.6-A",
            FeatureLevel::ArmV9_0A => "ARMv9.0-A",
        };
        f.write_str(s)
    }
}

/// One cache level. `None` means "could not be determined", which is
/// distinct from a genuine zero (no such cache).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheLevel {
    /// Size in KB.
    pub size: Option<u32>,
    /// Associativity (ways).
    pub assoc: Option<u32>,
    /// Line size in bytes.
    pub line_size: Option<u32>,
    /// Number of cache instances of this level in the package.
    pub instances: Option<u32>,
}

/// Identifies one of the five modeled cache levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CacheLevelKind {
    L1d,
    L1i,
    L2,
    L3,
    L4,
}

/// All modeled cache levels of one CPU type.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheTopology {
    pub l1d: CacheLevel,
    pub l1i: CacheLevel,
    pub l2: CacheLevel,
    pub l3: CacheLevel,
    pub l4: CacheLevel,
}

impl CacheTopology {
    pub fn level(&self, kind: CacheLevelKind) -> &CacheLevel {
        match kind {
            CacheLevelKind::L1d => &self.l1d,
            CacheLevelKind::L1i => &self.l1i,
            CacheLevelKind::L2 => &self.l2,
            CacheLevelKind::L3 => &self.l3,
            CacheLevelKind::L4 => &self.l4,
        }
    }

    pub(crate) fn level_mut(&mut self, kind: CacheLevelKind) -> &mut CacheLevel {
        match kind {
            CacheLevelKind::L1d => &mut self.l1d,
            CacheLevelKind::L1i => &mut self.l1i,
            CacheLevelKind::L2 => &mut self.l2,
            CacheLevelKind::L3 => &mut self.l3,
            CacheLevelKind::L4 => &mut self.l4,
        }
    }

    /// Size of the most specific detected level: the highest level with
    /// a known nonzero size. Used by the match engine to check
    /// cache-size tokens embedded in codenames.
    pub fn most_specific_size(&self) -> Option<u32> {
        for level in [&self.l4, &self.l3, &self.l2, &self.l1d].iter() {
            if let Some(size) = level.size {
                if size > 0 {
                    return Some(size);
                }
            }
        }
        None
    }
}

/// Secure-enclave capability summary (x86 only).
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SgxInfo {
    /// log2 of the maximum enclave size in 32-bit mode.
    pub max_enclave_32bit: u32,
    /// log2 of the maximum enclave size in 64-bit mode.
    pub max_enclave_64bit: u32,
    pub features: BTreeSet<SgxFeature>,
}

/// x86-specific identity fields.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct X86Payload {
    pub family: i32,
    pub model: i32,
    pub stepping: i32,
    pub ext_family: i32,
    pub ext_model: i32,
    /// SSE execution unit width in bits; `None` when undetermined.
    pub sse_size: Option<u32>,
    pub sgx: Option<SgxInfo>,
}

/// ARM-specific identity fields, straight from the MIDR.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ArmPayload {
    pub implementer: u8,
    pub variant: u8,
    pub part_num: u16,
    pub revision: u8,
}

/// Architecture-specific part of a decoded identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ArchPayload {
    X86(X86Payload),
    Arm(ArmPayload),
    Unknown,
}

/// The structured identity of one CPU type, produced by [`decode`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedIdentity {
    pub architecture: Architecture,
    pub vendor: Vendor,
    /// Raw vendor string ("GenuineIntel") or implementer name ("ARM").
    pub vendor_str: String,
    pub brand_str: String,
    pub flags: BTreeSet<Feature>,
    pub feature_level: FeatureLevel,
    pub purpose: Purpose,
    pub num_cores: u32,
    pub num_logical_cpus: u32,
    pub cache: CacheTopology,
    pub codename: String,
    pub technology: String,
    pub hints: BTreeSet<CpuHint>,
    pub hypervisor: Option<HypervisorVendor>,
    pub payload: ArchPayload,
}

impl DecodedIdentity {
    pub(crate) fn degraded() -> DecodedIdentity {
        DecodedIdentity {
            architecture: Architecture::Unknown,
            vendor: Vendor::Unknown,
            vendor_str: String::new(),
            brand_str: String::new(),
            flags: BTreeSet::new(),
            feature_level: FeatureLevel::Unknown,
            purpose: Purpose::General,
            num_cores: 1,
            num_logical_cpus: 1,
            cache: CacheTopology::default(),
            codename: "Unknown CPU".to_string(),
            technology: "unknown".to_string(),
            hints: BTreeSet::new(),
            hypervisor: None,
            payload: ArchPayload::Unknown,
        }
    }

    pub fn has_feature(&self, feature: Feature) -> bool {
        self.flags.contains(&feature)
    }
}

/// Cache-instance totals aggregated across all CPU types of a system.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheInstanceTotals {
    pub l1d: Option<u32>,
    pub l1i: Option<u32>,
    pub l2: Option<u32>,
    pub l3: Option<u32>,
    pub l4: Option<u32>,
}

/// Identity of a whole system: one entry per detected CPU purpose,
/// ordered by first occurrence in the capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemIdentity {
    cpu_types: Vec<DecodedIdentity>,
    pub totals: CacheInstanceTotals,
}

impl SystemIdentity {
    pub fn len(&self) -> usize {
        self.cpu_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cpu_types.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DecodedIdentity> {
        self.cpu_types.iter()
    }

    pub fn get(&self, index: usize) -> Option<&DecodedIdentity> {
        self.cpu_types.get(index)
    }

    /// The CPU type with the requested purpose.
    pub fn core_type(&self, purpose: Purpose) -> Result<&DecodedIdentity> {
        self.cpu_types
            .iter()
            .find(|t| t.purpose == purpose)
            .ok_or(Error::CoreTypeNotFound(purpose))
    }
}

/// Determine the architecture of a descriptor without decoding it.
pub fn architecture_of(raw: &RawDescriptor) -> Architecture {
    if raw.has_x86_data() {
        Architecture::X86
    } else if raw.has_arm_data() {
        Architecture::Arm
    } else {
        Architecture::Unknown
    }
}

/// Decode one descriptor into a structured identity.
///
/// Never fails: unrecognized hardware yields a degraded identity with
/// `Architecture::Unknown`.
pub fn decode(raw: &RawDescriptor) -> DecodedIdentity {
    match architecture_of(raw) {
        Architecture::X86 => x86::decode(raw),
        Architecture::Arm => arm::decode(raw),
        Architecture::Unknown => {
            debug!(sl!(), "no recognizable vendor leaf, degraded identity");
            DecodedIdentity::degraded()
        }
    }
}

/// Decode a whole capture, grouping logical CPUs by purpose.
///
/// A single-CPU capture keeps the counts decoded from its leaves; a
/// multi-CPU capture derives per-purpose counts from the grouping
/// itself (one captured descriptor per logical CPU).
pub fn decode_all(set: &RawDescriptorSet) -> SystemIdentity {
    let mut cpu_types: Vec<DecodedIdentity> = Vec::new();

    if set.len() == 1 {
        if let Some(raw) = set.get(0) {
            cpu_types.push(decode(raw));
        }
    } else {
        for raw in set.iter() {
            let id = decode(raw);
            match cpu_types.iter_mut().find(|t| t.purpose == id.purpose) {
                Some(group) => {
                    group.num_logical_cpus += 1;
                    group.num_cores += 1;
                }
                None => {
                    let mut id = id;
                    id.num_logical_cpus = 1;
                    id.num_cores = 1;
                    cpu_types.push(id);
                }
            }
        }
    }

    let totals = aggregate_totals(&cpu_types);
    SystemIdentity { cpu_types, totals }
}

fn aggregate_totals(cpu_types: &[DecodedIdentity]) -> CacheInstanceTotals {
    let mut totals = CacheInstanceTotals::default();
    let kinds = [
        CacheLevelKind::L1d,
        CacheLevelKind::L1i,
        CacheLevelKind::L2,
        CacheLevelKind::L3,
        CacheLevelKind::L4,
    ];
    for kind in kinds.iter() {
        let mut sum = None;
        for t in cpu_types {
            if let Some(n) = t.cache.level(*kind).instances {
                sum = Some(sum.unwrap_or(0) + n);
            }
        }
        match kind {
            CacheLevelKind::L1d => totals.l1d = sum,
            CacheLevelKind::L1i => totals.l1i = sum,
            CacheLevelKind::L2 => totals.l2 = sum,
            CacheLevelKind::L3 => totals.l3 = sum,
            CacheLevelKind::L4 => totals.l4 = sum,
        }
    }
    totals
}

/// All feature decode rules with their owning decode location; the
/// feature registry derives ownership from this.
pub(crate) fn decode_rules() -> Vec<(Feature, DecodeOwner)> {
    let mut rules = x86::rules();
    rules.extend(arm::rules());
    rules
}

/// Resolve the hypervisor vendor from the hypervisor-present flag and
/// the vendor-identification leaf.
pub(crate) fn detect_hypervisor(
    raw: &RawDescriptor,
    flags: &BTreeSet<Feature>,
) -> Option<HypervisorVendor> {
    if !flags.contains(&Feature::Hypervisor) {
        return None;
    }
    let leaf = raw.leaf(LeafClass::Hypervisor, 0)?;
    let mut bytes = Vec::with_capacity(12);
    for reg in [leaf.ebx(), leaf.ecx(), leaf.edx()].iter() {
        bytes.extend_from_slice(&reg.to_le_bytes());
    }
    let vendor: String = bytes
        .iter()
        .take_while(|b| **b != 0)
        .map(|b| *b as char)
        .collect();
    let vendor = vendor.trim_end();
    HYPERVISOR_VENDORS
        .iter()
        .find(|(prefix, _)| vendor.starts_with(prefix))
        .map(|(_, hv)| *hv)
}

/// MIDR is the ARM architecture signal; kept here so dispatch and the
/// ARM decoder agree on the source register.
pub(crate) fn arm_midr(raw: &RawDescriptor) -> u64 {
    raw.arm_reg(ArmRegister::Midr, 0).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::RawDescriptorBuilder;

    #[test]
    fn test_architecture_dispatch() {
        let x86 = RawDescriptorBuilder::new()
            .leaf(LeafClass::Basic, 0, [1, 0x756e_6547, 0x6c65_746e, 0x4965_6e69])
            .build();
        assert_eq!(architecture_of(&x86), Architecture::X86);

        let arm = RawDescriptorBuilder::new()
            .arm_reg(ArmRegister::Midr, 0, 0x410f_d083)
            .build();
        assert_eq!(architecture_of(&arm), Architecture::Arm);

        let empty = RawDescriptorBuilder::new().build();
        assert_eq!(architecture_of(&empty), Architecture::Unknown);
    }

    #[test]
    fn test_degraded_identity_never_fails() {
        let empty = RawDescriptorBuilder::new().build();
        let id = decode(&empty);
        assert_eq!(id.architecture, Architecture::Unknown);
        assert_eq!(id.vendor, Vendor::Unknown);
        assert_eq!(id.codename, "Unknown CPU");
        assert!(id.flags.is_empty());
        // Determinism: same input, same output.
        assert_eq!(decode(&empty), id);
    }

    #[test]
    fn test_most_specific_cache_size() {
        let mut cache = CacheTopology::default();
        assert_eq!(cache.most_specific_size(), None);
        cache.l1d.size = Some(32);
        assert_eq!(cache.most_specific_size(), Some(32));
        cache.l2.size = Some(256);
        cache.l3.size = Some(12288);
        assert_eq!(cache.most_specific_size(), Some(12288));
        // A known-absent L4 does not mask L3.
        cache.l4.size = Some(0);
        assert_eq!(cache.most_specific_size(), Some(12288));
    }

    #[test]
    fn test_hybrid_capture_groups_by_purpose() {
        use crate::raw::RawDescriptorSet;

        let core = |type_byte: u32| {
            RawDescriptorBuilder::new()
                .leaf(LeafClass::Basic, 0, [0x20, 0x756e_6547, 0x6c65_746e, 0x4965_6e69])
                .leaf(LeafClass::Basic, 1, [0x0009_06a4, 0, 0, 0x1000_0000])
                .leaf(LeafClass::Basic, 0x1a, [type_byte << 24, 0, 0, 0])
                .build()
        };
        // Six performance cores then two efficiency cores, one
        // descriptor per logical CPU.
        let mut cpus = vec![core(0x40); 6];
        cpus.extend(vec![core(0x20); 2]);
        let system = decode_all(&RawDescriptorSet::from(cpus));

        assert_eq!(system.len(), 2);
        let perf = system.get(0).unwrap();
        assert_eq!(perf.purpose, Purpose::Performance);
        assert_eq!(perf.num_logical_cpus, 6);
        let eff = system.core_type(Purpose::Efficiency).unwrap();
        assert_eq!(eff.num_logical_cpus, 2);
        assert_eq!(eff.num_cores, 2);

        // Asking for a purpose that is not there is a real error.
        assert!(system.core_type(Purpose::LpEfficiency).is_err());
    }

    #[test]
    fn test_purpose_parsing() {
        assert_eq!("efficiency".parse::<Purpose>().unwrap(), Purpose::Efficiency);
        assert_eq!(
            "ultimate performance".parse::<Purpose>().unwrap(),
            Purpose::UPerformance
        );
        assert!("turbo".parse::<Purpose>().is_err());
    }
}
