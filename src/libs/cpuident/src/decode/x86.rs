// Copyright (c) 2024 The cpuident developers
//
// SPDX-License-Identifier: Apache-2.0
//

//! x86 descriptor decoding: vendor string, family/model/stepping,
//! feature bit maps, cache topology, core counts, SGX, hybrid purpose
//! and the x86-64 feature level.

use std::collections::BTreeSet;

use crate::decode::{
    detect_hypervisor, extract_bits, ArchPayload, Architecture, CacheLevelKind, CacheTopology,
    DecodedIdentity, FeatureLevel, Purpose, SgxInfo, Vendor, X86Payload,
};
use crate::features::{CpuHint, DecodeOwner, Feature, SgxFeature};
use crate::matchdb::{self, MatchInput};
use crate::raw::{LeafClass, RawDescriptor};

const VENDOR_STRINGS: &[(&str, Vendor)] = &[
    ("GenuineIntel", Vendor::Intel),
    ("AuthenticAMD", Vendor::Amd),
    ("HygonGenuine", Vendor::Hygon),
    ("CentaurHauls", Vendor::Centaur),
    ("  Shanghai  ", Vendor::Zhaoxin),
    ("CyrixInstead", Vendor::Cyrix),
    ("NexGenDriven", Vendor::NexGen),
    ("GenuineTMx86", Vendor::Transmeta),
    ("UMC UMC UMC ", Vendor::Umc),
    ("RiseRiseRise", Vendor::Rise),
    ("SiS SiS SiS ", Vendor::Sis),
    ("Geode by NSC", Vendor::Nsc),
    ("Vortex86 SoC", Vendor::Vortex),
];

// Feature bit maps: (bit position, feature). One owning map per
// feature; the consistency validator cross-checks this against the
// registry catalog.

const EDX1_FEATURES: &[(u8, Feature)] = &[
    (0, Feature::Fpu),
    (1, Feature::Vme),
    (2, Feature::De),
    (3, Feature::Pse),
    (4, Feature::Tsc),
    (5, Feature::Msr),
    (6, Feature::Pae),
    (7, Feature::Mce),
    (8, Feature::Cx8),
    (9, Feature::Apic),
    (11, Feature::Sep),
    (12, Feature::Mtrr),
    (13, Feature::Pge),
    (14, Feature::Mca),
    (15, Feature::Cmov),
    (16, Feature::Pat),
    (17, Feature::Pse36),
    (18, Feature::Pn),
    (19, Feature::Clflush),
    (21, Feature::Dts),
    (22, Feature::Acpi),
    (23, Feature::Mmx),
    (24, Feature::Fxsr),
    (25, Feature::Sse),
    (26, Feature::Sse2),
    (27, Feature::Ss),
    (28, Feature::Ht),
    (29, Feature::Tm),
    (30, Feature::Ia64),
    (31, Feature::Pbe),
];

const ECX1_FEATURES: &[(u8, Feature)] = &[
    (0, Feature::Pni),
    (1, Feature::Pclmul),
    (2, Feature::Dts64),
    (3, Feature::Monitor),
    (4, Feature::DsCpl),
    (5, Feature::Vmx),
    (6, Feature::Smx),
    (7, Feature::Est),
    (8, Feature::Tm2),
    (9, Feature::Ssse3),
    (10, Feature::Cid),
    (13, Feature::Cx16),
    (14, Feature::Xtpr),
    (15, Feature::Pdcm),
    (19, Feature::Sse4_1),
    (20, Feature::Sse4_2),
    (21, Feature::X2apic),
    (22, Feature::Movbe),
    (23, Feature::Popcnt),
    (25, Feature::Aes),
    (26, Feature::Xsave),
    (27, Feature::Osxsave),
    (28, Feature::Avx),
    (29, Feature::F16c),
    (30, Feature::Rdrand),
    (31, Feature::Hypervisor),
];

const EBX7_FEATURES: &[(u8, Feature)] = &[
    (0, Feature::Fsgsbase),
    (3, Feature::Bmi1),
    (5, Feature::Avx2),
    (7, Feature::Smep),
    (8, Feature::Bmi2),
    (16, Feature::Avx512f),
    (17, Feature::Avx512dq),
    (18, Feature::Rdseed),
    (19, Feature::Adx),
    (20, Feature::Smap),
    (28, Feature::Avx512cd),
    (29, Feature::ShaNi),
    (30, Feature::Avx512bw),
    (31, Feature::Avx512vl),
];

const EXT_EDX1_FEATURES: &[(u8, Feature)] = &[
    (11, Feature::Syscall),
    (20, Feature::Nx),
    (27, Feature::Rdtscp),
    (29, Feature::Lm),
];

const EXT_ECX1_FEATURES: &[(u8, Feature)] = &[(0, Feature::LahfLm)];

const INTEL_EBX7_FEATURES: &[(u8, Feature)] = &[(2, Feature::Sgx)];

const AMD_EXT_EDX1_FEATURES: &[(u8, Feature)] = &[
    (22, Feature::Mmxext),
    (25, Feature::FxsrOpt),
    (30, Feature::ThreeDNowExt),
    (31, Feature::ThreeDNow),
];

const AMD_EXT_ECX1_FEATURES: &[(u8, Feature)] = &[
    (2, Feature::Svm),
    (5, Feature::Abm),
    (6, Feature::Sse4a),
];

/// x86-64 microarchitecture levels: each tier requires everything the
/// previous tiers require plus its own flag set.
const X64_LEVELS: &[(FeatureLevel, &[Feature])] = &[
    (
        FeatureLevel::X64V1,
        &[
            Feature::Cmov,
            Feature::Cx8,
            Feature::Fpu,
            Feature::Fxsr,
            Feature::Mmx,
            Feature::Sse,
            Feature::Sse2,
            Feature::Lm,
        ],
    ),
    (
        FeatureLevel::X64V2,
        &[
            Feature::Cx16,
            Feature::LahfLm,
            Feature::Popcnt,
            Feature::Sse4_1,
            Feature::Sse4_2,
            Feature::Ssse3,
        ],
    ),
    (
        FeatureLevel::X64V3,
        &[
            Feature::Avx,
            Feature::Avx2,
            Feature::Bmi1,
            Feature::Bmi2,
            Feature::F16c,
            Feature::Movbe,
            Feature::Osxsave,
            Feature::Xsave,
        ],
    ),
    (
        FeatureLevel::X64V4,
        &[
            Feature::Avx512f,
            Feature::Avx512bw,
            Feature::Avx512cd,
            Feature::Avx512dq,
            Feature::Avx512vl,
        ],
    ),
];

/// AMD legacy cache associativity encoding (ext leaf 6).
const AMD_ASSOC_TABLE: &[u32; 16] = &[0, 1, 2, 0, 4, 0, 8, 0, 16, 0, 32, 48, 64, 96, 128, 255];

pub(crate) fn rules() -> Vec<(Feature, DecodeOwner)> {
    let mut rules = Vec::new();
    let common: &[&[(u8, Feature)]] = &[
        EDX1_FEATURES,
        ECX1_FEATURES,
        EBX7_FEATURES,
        EXT_EDX1_FEATURES,
        EXT_ECX1_FEATURES,
    ];
    for table in common {
        rules.extend(table.iter().map(|(_, f)| (*f, DecodeOwner::CommonX86)));
    }
    rules.extend(
        INTEL_EBX7_FEATURES
            .iter()
            .map(|(_, f)| (*f, DecodeOwner::Intel)),
    );
    for table in &[AMD_EXT_EDX1_FEATURES, AMD_EXT_ECX1_FEATURES] {
        rules.extend(table.iter().map(|(_, f)| (*f, DecodeOwner::Amd)));
    }
    rules
}

pub(crate) fn decode(raw: &RawDescriptor) -> DecodedIdentity {
    let mut id = DecodedIdentity::degraded();
    id.architecture = Architecture::X86;

    let leaf0 = raw.leaf(LeafClass::Basic, 0).unwrap_or_default();
    id.vendor_str = register_string(&[leaf0.ebx(), leaf0.edx(), leaf0.ecx()]);
    id.vendor = VENDOR_STRINGS
        .iter()
        .find(|(s, _)| *s == id.vendor_str)
        .map(|(_, v)| *v)
        .unwrap_or(Vendor::Unknown);
    id.brand_str = brand_string(raw);

    let payload = basic_info(raw);
    id.flags = load_features(raw, id.vendor);
    id.feature_level = feature_level(&id.flags);
    id.hypervisor = detect_hypervisor(raw, &id.flags);
    let (cores, logical) = core_counts(raw, id.vendor, &id.flags);
    id.num_cores = cores;
    id.num_logical_cpus = logical;
    id.cache = decode_cache(raw, id.vendor, logical);
    id.purpose = hybrid_purpose(raw, id.vendor);

    let mut payload = payload;
    payload.sse_size = sse_size(&id.flags);
    if payload.sse_size.is_some() && matches!(id.vendor, Vendor::Intel | Vendor::Amd) {
        id.hints.insert(CpuHint::SseSizeAuth);
    }
    payload.sgx = sgx_info(raw, &id.flags);

    let input = MatchInput {
        vendor: id.vendor,
        family: payload.family,
        model: payload.model,
        stepping: payload.stepping,
        ext_family: payload.ext_family,
        ext_model: payload.ext_model,
        ncores: id.num_cores as i32,
        l2_cache: id.cache.l2.size.map(|s| s as i32).unwrap_or(-1),
        l3_cache: id.cache.l3.size.map(|s| s as i32).unwrap_or(-1),
        brand: &id.brand_str,
        most_specific_cache: id.cache.most_specific_size(),
    };
    let (codename, technology) = matchdb::resolve(&input);
    id.codename = codename;
    id.technology = technology;

    id.payload = ArchPayload::X86(payload);
    id
}

fn register_string(regs: &[u32]) -> String {
    let mut s = String::with_capacity(regs.len() * 4);
    for reg in regs {
        for b in reg.to_le_bytes().iter() {
            if *b == 0 {
                return s;
            }
            s.push(*b as char);
        }
    }
    s
}

fn brand_string(raw: &RawDescriptor) -> String {
    let max_ext = raw.leaf(LeafClass::Ext, 0).map(|l| l.eax()).unwrap_or(0);
    if max_ext < 0x8000_0004 {
        return String::new();
    }
    let mut regs = Vec::with_capacity(12);
    for i in 2..=4 {
        let leaf = raw.leaf(LeafClass::Ext, i).unwrap_or_default();
        regs.extend_from_slice(&leaf.0);
    }
    register_string(&regs).trim().to_string()
}

fn basic_info(raw: &RawDescriptor) -> X86Payload {
    let mut payload = X86Payload::default();
    let leaf1 = match raw.leaf(LeafClass::Basic, 1) {
        Some(l) if raw.leaf(LeafClass::Basic, 0).map(|l0| l0.eax()).unwrap_or(0) >= 1 => l,
        _ => return payload,
    };
    let eax = leaf1.eax() as u64;
    payload.family = extract_bits(eax, 11, 8) as i32;
    payload.model = extract_bits(eax, 7, 4) as i32;
    payload.stepping = extract_bits(eax, 3, 0) as i32;
    payload.ext_family = if payload.family == 0xf {
        payload.family + extract_bits(eax, 27, 20) as i32
    } else {
        payload.family
    };
    payload.ext_model = if payload.family == 0xf || payload.family == 0x6 {
        payload.model + ((extract_bits(eax, 19, 16) as i32) << 4)
    } else {
        payload.model
    };
    payload
}

fn load_features(raw: &RawDescriptor, vendor: Vendor) -> BTreeSet<Feature> {
    let mut flags = BTreeSet::new();
    let leaf1 = raw.leaf(LeafClass::Basic, 1).unwrap_or_default();
    let leaf7 = raw.leaf(LeafClass::Basic, 7).unwrap_or_default();
    let ext1 = raw.leaf(LeafClass::Ext, 1).unwrap_or_default();

    apply_map(&mut flags, leaf1.edx(), EDX1_FEATURES);
    apply_map(&mut flags, leaf1.ecx(), ECX1_FEATURES);
    apply_map(&mut flags, leaf7.ebx(), EBX7_FEATURES);
    apply_map(&mut flags, ext1.edx(), EXT_EDX1_FEATURES);
    apply_map(&mut flags, ext1.ecx(), EXT_ECX1_FEATURES);

    match vendor {
        Vendor::Intel => apply_map(&mut flags, leaf7.ebx(), INTEL_EBX7_FEATURES),
        Vendor::Amd | Vendor::Hygon => {
            apply_map(&mut flags, ext1.edx(), AMD_EXT_EDX1_FEATURES);
            apply_map(&mut flags, ext1.ecx(), AMD_EXT_ECX1_FEATURES);
        }
        _ => (),
    }
    flags
}

fn apply_map(flags: &mut BTreeSet<Feature>, reg: u32, map: &[(u8, Feature)]) {
    for (bit, feature) in map {
        if (reg >> bit) & 1 == 1 {
            flags.insert(*feature);
        }
    }
}

fn feature_level(flags: &BTreeSet<Feature>) -> FeatureLevel {
    let mut level = FeatureLevel::Unknown;
    for (tier, required) in X64_LEVELS {
        if required.iter().all(|f| flags.contains(f)) {
            level = *tier;
        } else {
            break;
        }
    }
    level
}

fn core_counts(raw: &RawDescriptor, vendor: Vendor, flags: &BTreeSet<Feature>) -> (u32, u32) {
    let leaf1 = raw.leaf(LeafClass::Basic, 1).unwrap_or_default();
    let mut logical = if flags.contains(&Feature::Ht) {
        extract_bits(leaf1.ebx() as u64, 23, 16) as u32
    } else {
        1
    };
    let mut cores = 1;
    match vendor {
        Vendor::Intel => {
            let fn4 = raw.leaf(LeafClass::IntelFn4, 0).unwrap_or_default();
            if fn4.eax() & 0x1f != 0 {
                cores = extract_bits(fn4.eax() as u64, 31, 26) as u32 + 1;
            }
        }
        Vendor::Amd | Vendor::Hygon => {
            let max_ext = raw.leaf(LeafClass::Ext, 0).map(|l| l.eax()).unwrap_or(0);
            if max_ext >= 0x8000_0008 {
                let ext8 = raw.leaf(LeafClass::Ext, 8).unwrap_or_default();
                cores = extract_bits(ext8.ecx() as u64, 7, 0) as u32 + 1;
            }
        }
        _ => (),
    }
    if logical < cores {
        logical = cores;
    }
    if logical == 0 {
        logical = 1;
    }
    (cores, logical)
}

/// Deterministic cache decode shared by Intel (leaf 4) and AMD
/// (leaf 0x8000001D): identical register layout.
fn deterministic_cache(
    raw: &RawDescriptor,
    class: LeafClass,
    logical: u32,
    cache: &mut CacheTopology,
) -> bool {
    let mut found = false;
    let mut index = 0;
    while let Some(leaf) = raw.leaf(class, index) {
        let cache_type = leaf.eax() & 0x1f;
        if cache_type == 0 {
            break;
        }
        let level = extract_bits(leaf.eax() as u64, 7, 5) as u32;
        let kind = match (level, cache_type) {
            (1, 1) => Some(CacheLevelKind::L1d),
            (1, 2) => Some(CacheLevelKind::L1i),
            (1, 3) => Some(CacheLevelKind::L1d),
            (2, _) => Some(CacheLevelKind::L2),
            (3, _) => Some(CacheLevelKind::L3),
            (4, _) => Some(CacheLevelKind::L4),
            _ => None,
        };
        if let Some(kind) = kind {
            let ebx = leaf.ebx() as u64;
            let ways = extract_bits(ebx, 31, 22) as u32 + 1;
            let partitions = extract_bits(ebx, 21, 12) as u32 + 1;
            let line = extract_bits(ebx, 11, 0) as u32 + 1;
            let sets = leaf.ecx() + 1;
            let size = (ways as u64 * partitions as u64 * line as u64 * sets as u64 / 1024) as u32;
            let sharing = extract_bits(leaf.eax() as u64, 25, 14) as u32 + 1;
            let slot = cache.level_mut(kind);
            slot.size = Some(size);
            slot.assoc = Some(ways);
            slot.line_size = Some(line);
            if logical > 0 {
                slot.instances = Some(std::cmp::max(1, logical / sharing));
            }
            found = true;
        }
        index += 1;
    }
    found
}

fn amd_legacy_cache(raw: &RawDescriptor, cache: &mut CacheTopology) {
    let max_ext = raw.leaf(LeafClass::Ext, 0).map(|l| l.eax()).unwrap_or(0);
    if max_ext >= 0x8000_0005 {
        let ext5 = raw.leaf(LeafClass::Ext, 5).unwrap_or_default();
        let ecx = ext5.ecx() as u64;
        cache.l1d.size = Some(extract_bits(ecx, 31, 24) as u32);
        cache.l1d.assoc = Some(extract_bits(ecx, 23, 16) as u32);
        cache.l1d.line_size = Some(extract_bits(ecx, 7, 0) as u32);
        let edx = ext5.edx() as u64;
        cache.l1i.size = Some(extract_bits(edx, 31, 24) as u32);
        cache.l1i.assoc = Some(extract_bits(edx, 23, 16) as u32);
        cache.l1i.line_size = Some(extract_bits(edx, 7, 0) as u32);
    }
    if max_ext >= 0x8000_0006 {
        let ext6 = raw.leaf(LeafClass::Ext, 6).unwrap_or_default();
        let ecx = ext6.ecx() as u64;
        cache.l2.size = Some(extract_bits(ecx, 31, 16) as u32);
        cache.l2.assoc = amd_assoc(extract_bits(ecx, 15, 12) as usize);
        cache.l2.line_size = Some(extract_bits(ecx, 7, 0) as u32);
        let edx = ext6.edx() as u64;
        let l3_size = extract_bits(edx, 31, 18) as u32 * 512;
        cache.l3.size = Some(l3_size);
        if l3_size > 0 {
            cache.l3.assoc = amd_assoc(extract_bits(edx, 15, 12) as usize);
            cache.l3.line_size = Some(extract_bits(edx, 7, 0) as u32);
        }
    }
}

fn amd_assoc(code: usize) -> Option<u32> {
    match AMD_ASSOC_TABLE.get(code) {
        Some(0) | None => None,
        Some(ways) => Some(*ways),
    }
}

fn decode_cache(raw: &RawDescriptor, vendor: Vendor, logical: u32) -> CacheTopology {
    let mut cache = CacheTopology::default();
    match vendor {
        Vendor::Amd | Vendor::Hygon => {
            if !deterministic_cache(raw, LeafClass::AmdFn8000001dh, logical, &mut cache) {
                amd_legacy_cache(raw, &mut cache);
            }
        }
        _ => {
            deterministic_cache(raw, LeafClass::IntelFn4, logical, &mut cache);
        }
    }
    cache
}

fn sse_size(flags: &BTreeSet<Feature>) -> Option<u32> {
    if flags.contains(&Feature::Sse) {
        Some(128)
    } else {
        None
    }
}

fn sgx_info(raw: &RawDescriptor, flags: &BTreeSet<Feature>) -> Option<SgxInfo> {
    if !flags.contains(&Feature::Sgx) {
        return None;
    }
    let fn12h = raw.leaf(LeafClass::IntelFn12h, 0).unwrap_or_default();
    let mut info = SgxInfo {
        max_enclave_32bit: extract_bits(fn12h.edx() as u64, 7, 0) as u32,
        max_enclave_64bit: extract_bits(fn12h.edx() as u64, 15, 8) as u32,
        features: BTreeSet::new(),
    };
    if fn12h.eax() & 1 == 1 {
        info.features.insert(SgxFeature::Sgx1);
    }
    if (fn12h.eax() >> 1) & 1 == 1 {
        info.features.insert(SgxFeature::Sgx2);
    }
    Some(info)
}

/// Hybrid core type from leaf 0x1A (Intel only): 0x20 is an efficiency
/// (Atom) core, 0x40 a performance (Core) core.
fn hybrid_purpose(raw: &RawDescriptor, vendor: Vendor) -> Purpose {
    if vendor != Vendor::Intel {
        return Purpose::General;
    }
    let max_basic = raw.leaf(LeafClass::Basic, 0).map(|l| l.eax()).unwrap_or(0);
    if max_basic < 0x1a {
        return Purpose::General;
    }
    let leaf1a = raw.leaf(LeafClass::Basic, 0x1a).unwrap_or_default();
    match extract_bits(leaf1a.eax() as u64, 31, 24) {
        0x20 => Purpose::Efficiency,
        0x40 => Purpose::Performance,
        _ => Purpose::General,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode as decode_any;
    use crate::raw::{ArmRegister, RawDescriptorBuilder};

    fn kaby_lake() -> RawDescriptor {
        RawDescriptorBuilder::new()
            .leaf(LeafClass::Basic, 0, [0x16, 0x756e_6547, 0x6c65_746e, 0x4965_6e69])
            .leaf(
                LeafClass::Basic,
                1,
                [0x0008_06ea, 0x0810_0800, 0x7ffa_fbbf, 0xbfeb_fbff],
            )
            .leaf(LeafClass::Ext, 0, [0x8000_0008, 0, 0, 0])
            .leaf(LeafClass::Ext, 1, [0, 0, 0x0000_0001, 0x2810_0800])
            .build()
    }

    #[test]
    fn test_intel_basic_identification() {
        let id = decode(&kaby_lake());
        assert_eq!(id.vendor, Vendor::Intel);
        assert_eq!(id.vendor_str, "GenuineIntel");
        let payload = match &id.payload {
            ArchPayload::X86(p) => p,
            other => panic!("wrong payload: {:?}", other),
        };
        assert_eq!(payload.family, 6);
        assert_eq!(payload.model, 0xe);
        assert_eq!(payload.stepping, 0xa);
        assert_eq!(payload.ext_family, 6);
        assert_eq!(payload.ext_model, 0x8e);
        // Flag-driven tier: SSE4.2/POPCNT/CX16 era without AVX2.
        assert_eq!(id.feature_level, FeatureLevel::X64V2);
        assert!(id.has_feature(Feature::Sse2));
        assert!(id.has_feature(Feature::Lm));
        assert!(!id.has_feature(Feature::Avx2));
    }

    #[test]
    fn test_amd_ext_family_folding() {
        // Family 0xF: extended family/model are folded in.
        let raw = RawDescriptorBuilder::new()
            .leaf(LeafClass::Basic, 0, [1, 0x6874_7541, 0x444d_4163, 0x6974_6e65])
            .leaf(LeafClass::Basic, 1, [0x0061_0f12, 0, 0, 0x0000_0001])
            .build();
        let id = decode(&raw);
        assert_eq!(id.vendor, Vendor::Amd);
        let payload = match &id.payload {
            ArchPayload::X86(p) => p,
            other => panic!("wrong payload: {:?}", other),
        };
        assert_eq!(payload.family, 0xf);
        assert_eq!(payload.ext_family, 0xf + 0x6);
        assert_eq!(payload.ext_model, 0x1 + 0x10);
    }

    #[test]
    fn test_deterministic_cache_decode() {
        let raw = RawDescriptorBuilder::new()
            .leaf(LeafClass::Basic, 0, [0x16, 0x756e_6547, 0x6c65_746e, 0x4965_6e69])
            .leaf(LeafClass::Basic, 1, [0x0008_06ea, 0x0010_0800, 0, 0x1000_0000])
            .leaf(LeafClass::IntelFn4, 0, [0x1c00_4121, 0x01c0_003f, 0x0000_003f, 0])
            .leaf(LeafClass::IntelFn4, 1, [0x1c00_4122, 0x01c0_003f, 0x0000_003f, 0])
            .leaf(LeafClass::IntelFn4, 2, [0x1c00_4143, 0x00c0_003f, 0x0000_03ff, 0])
            .leaf(LeafClass::IntelFn4, 3, [0x1c03_c163, 0x03c0_003f, 0x0000_2fff, 0])
            .build();
        let id = decode(&raw);
        assert_eq!(id.cache.l1d.size, Some(32));
        assert_eq!(id.cache.l1d.assoc, Some(8));
        assert_eq!(id.cache.l1d.line_size, Some(64));
        assert_eq!(id.cache.l1i.size, Some(32));
        assert_eq!(id.cache.l2.size, Some(256));
        assert_eq!(id.cache.l2.assoc, Some(4));
        assert_eq!(id.cache.l3.size, Some(12288));
        assert_eq!(id.cache.l3.assoc, Some(16));
        // No L4 leaf: undetermined, not zero.
        assert_eq!(id.cache.l4.size, None);
        assert_eq!(id.cache.most_specific_size(), Some(12288));
    }

    #[test]
    fn test_amd_legacy_cache_decode() {
        let raw = RawDescriptorBuilder::new()
            .leaf(LeafClass::Basic, 0, [1, 0x6874_7541, 0x444d_4163, 0x6974_6e65])
            .leaf(LeafClass::Basic, 1, [0x0010_0f42, 0, 0, 0x0000_0001])
            .leaf(LeafClass::Ext, 0, [0x8000_0008, 0, 0, 0])
            .leaf(LeafClass::Ext, 5, [0, 0, 0x4002_0140, 0x4002_0140])
            .leaf(LeafClass::Ext, 6, [0, 0, 0x0200_6140, 0x0060_6140])
            .build();
        let id = decode(&raw);
        assert_eq!(id.cache.l1d.size, Some(64));
        assert_eq!(id.cache.l1d.assoc, Some(2));
        assert_eq!(id.cache.l1d.line_size, Some(64));
        assert_eq!(id.cache.l1i.size, Some(64));
        assert_eq!(id.cache.l2.size, Some(512));
        assert_eq!(id.cache.l2.assoc, Some(8));
        assert_eq!(id.cache.l2.line_size, Some(64));
        assert_eq!(id.cache.l3.size, Some(12288));
        assert_eq!(id.cache.l3.assoc, Some(8));
    }

    #[test]
    fn test_hypervisor_detection() {
        // ECX bit 31 plus the KVM vendor leaf.
        let raw = RawDescriptorBuilder::new()
            .leaf(LeafClass::Basic, 0, [0x16, 0x756e_6547, 0x6c65_746e, 0x4965_6e69])
            .leaf(LeafClass::Basic, 1, [0x0008_06ea, 0, 0x8000_0000, 0x1000_0000])
            .leaf(
                LeafClass::Hypervisor,
                0,
                [0x4000_0001, 0x4b4d_564b, 0x564b_4d56, 0x0000_004d],
            )
            .build();
        let id = decode(&raw);
        assert!(id.has_feature(Feature::Hypervisor));
        assert_eq!(id.hypervisor, Some(crate::decode::HypervisorVendor::Kvm));

        // Flag without a vendor leaf: present but anonymous.
        let raw = RawDescriptorBuilder::new()
            .leaf(LeafClass::Basic, 0, [0x16, 0x756e_6547, 0x6c65_746e, 0x4965_6e69])
            .leaf(LeafClass::Basic, 1, [0x0008_06ea, 0, 0x8000_0000, 0x1000_0000])
            .build();
        assert_eq!(decode(&raw).hypervisor, None);
    }

    #[test]
    fn test_hybrid_purpose_leaf() {
        let mut builder = RawDescriptorBuilder::new()
            .leaf(LeafClass::Basic, 0, [0x20, 0x756e_6547, 0x6c65_746e, 0x4965_6e69])
            .leaf(LeafClass::Basic, 1, [0x0009_06a4, 0, 0, 0x1000_0000]);
        builder = builder.leaf(LeafClass::Basic, 0x1a, [0x4000_0001, 0, 0, 0]);
        let id = decode(&builder.build());
        assert_eq!(id.purpose, Purpose::Performance);

        let raw = RawDescriptorBuilder::new()
            .leaf(LeafClass::Basic, 0, [0x20, 0x756e_6547, 0x6c65_746e, 0x4965_6e69])
            .leaf(LeafClass::Basic, 1, [0x0009_06a4, 0, 0, 0x1000_0000])
            .leaf(LeafClass::Basic, 0x1a, [0x2000_0001, 0, 0, 0])
            .build();
        assert_eq!(decode(&raw).purpose, Purpose::Efficiency);
    }

    #[test]
    fn test_sgx_payload() {
        let raw = RawDescriptorBuilder::new()
            .leaf(LeafClass::Basic, 0, [0x16, 0x756e_6547, 0x6c65_746e, 0x4965_6e69])
            .leaf(LeafClass::Basic, 1, [0x0008_06ea, 0, 0, 0x1000_0000])
            .leaf(LeafClass::Basic, 7, [0, 0x0000_0004, 0, 0])
            .leaf(LeafClass::IntelFn12h, 0, [0x0000_0003, 0, 0, 0x0000_241f])
            .build();
        let id = decode(&raw);
        assert!(id.has_feature(Feature::Sgx));
        let payload = match &id.payload {
            ArchPayload::X86(p) => p,
            other => panic!("wrong payload: {:?}", other),
        };
        let sgx = payload.sgx.as_ref().unwrap();
        assert_eq!(sgx.max_enclave_32bit, 0x1f);
        assert_eq!(sgx.max_enclave_64bit, 0x24);
        assert!(sgx.features.contains(&SgxFeature::Sgx1));
        assert!(sgx.features.contains(&SgxFeature::Sgx2));
    }

    #[test]
    fn test_dispatch_prefers_x86_leaves() {
        // A descriptor with both x86 and ARM data (corrupt capture)
        // still decodes down exactly one path.
        let raw = RawDescriptorBuilder::new()
            .leaf(LeafClass::Basic, 0, [1, 0x756e_6547, 0x6c65_746e, 0x4965_6e69])
            .arm_reg(ArmRegister::Midr, 0, 0x410f_d083)
            .build();
        let id = decode_any(&raw);
        assert_eq!(id.architecture, Architecture::X86);
    }
}
