// Copyright (c) 2024 The cpuident developers
//
// SPDX-License-Identifier: Apache-2.0
//

//! ARM descriptor decoding: MIDR fields, implementer/part tables,
//! AA64 identification-register feature rules and the ARMv8/v9
//! feature level.

use std::collections::BTreeSet;

use crate::decode::{
    arm_midr, extract_bits, ArchPayload, Architecture, ArmPayload, DecodedIdentity, FeatureLevel,
    Purpose, Vendor,
};
use crate::features::{DecodeOwner, Feature};
use crate::raw::{ArmRegister, RawDescriptor};

/// Core role classes used to map a part number to a purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CoreClass {
    Ultimate,
    Performance,
    Efficiency,
    General,
}

struct ArmPart {
    part_num: u16,
    name: &'static str,
    class: CoreClass,
}

macro_rules! part {
    ($num:expr, $name:expr, $class:ident) => {
        ArmPart {
            part_num: $num,
            name: $name,
            class: CoreClass::$class,
        }
    };
}

const ARM_PARTS: &[ArmPart] = &[
    part!(0xd03, "Cortex-A53", Efficiency),
    part!(0xd04, "Cortex-A35", Efficiency),
    part!(0xd05, "Cortex-A55", Efficiency),
    part!(0xd07, "Cortex-A57", Performance),
    part!(0xd08, "Cortex-A72", Performance),
    part!(0xd09, "Cortex-A73", Performance),
    part!(0xd0a, "Cortex-A75", Performance),
    part!(0xd0b, "Cortex-A76", Performance),
    part!(0xd0c, "Neoverse-N1", Performance),
    part!(0xd0d, "Cortex-A77", Performance),
    part!(0xd40, "Neoverse-V1", Performance),
    part!(0xd41, "Cortex-A78", Performance),
    part!(0xd44, "Cortex-X1", Ultimate),
    part!(0xd46, "Cortex-A510", Efficiency),
    part!(0xd47, "Cortex-A710", Performance),
    part!(0xd48, "Cortex-X2", Ultimate),
    part!(0xd49, "Neoverse-N2", Performance),
    part!(0xd4b, "Cortex-A78C", Performance),
    part!(0xd4d, "Cortex-A715", Performance),
    part!(0xd4e, "Cortex-X3", Ultimate),
    part!(0xd80, "Cortex-A520", Efficiency),
    part!(0xd81, "Cortex-A720", Performance),
    part!(0xd82, "Cortex-X4", Ultimate),
];

const APPLE_PARTS: &[ArmPart] = &[
    part!(0x022, "Icestorm", Efficiency),
    part!(0x023, "Firestorm", Performance),
    part!(0x028, "Blizzard", Efficiency),
    part!(0x029, "Avalanche", Performance),
];

struct Implementer {
    id: u8,
    name: &'static str,
    vendor: Vendor,
    parts: &'static [ArmPart],
}

const IMPLEMENTERS: &[Implementer] = &[
    Implementer {
        id: 0x41,
        name: "ARM",
        vendor: Vendor::Arm,
        parts: ARM_PARTS,
    },
    Implementer {
        id: 0x42,
        name: "Broadcom",
        vendor: Vendor::Broadcom,
        parts: &[],
    },
    Implementer {
        id: 0x43,
        name: "Cavium",
        vendor: Vendor::Cavium,
        parts: &[],
    },
    Implementer {
        id: 0x44,
        name: "DEC",
        vendor: Vendor::Dec,
        parts: &[],
    },
    Implementer {
        id: 0x46,
        name: "FUJITSU",
        vendor: Vendor::Fujitsu,
        parts: &[],
    },
    Implementer {
        id: 0x48,
        name: "HiSilicon",
        vendor: Vendor::HiSilicon,
        parts: &[],
    },
    Implementer {
        id: 0x49,
        name: "Infineon",
        vendor: Vendor::Infineon,
        parts: &[],
    },
    Implementer {
        id: 0x4d,
        name: "Motorola/Freescale",
        vendor: Vendor::Freescale,
        parts: &[],
    },
    Implementer {
        id: 0x4e,
        name: "NVIDIA",
        vendor: Vendor::Nvidia,
        parts: &[],
    },
    Implementer {
        id: 0x50,
        name: "APM",
        vendor: Vendor::Apm,
        parts: &[],
    },
    Implementer {
        id: 0x51,
        name: "Qualcomm",
        vendor: Vendor::Qualcomm,
        parts: &[],
    },
    Implementer {
        id: 0x53,
        name: "Samsung",
        vendor: Vendor::Samsung,
        parts: &[],
    },
    Implementer {
        id: 0x56,
        name: "Marvell",
        vendor: Vendor::Marvell,
        parts: &[],
    },
    Implementer {
        id: 0x61,
        name: "Apple",
        vendor: Vendor::Apple,
        parts: APPLE_PARTS,
    },
    Implementer {
        id: 0x66,
        name: "Faraday",
        vendor: Vendor::Faraday,
        parts: &[],
    },
    Implementer {
        id: 0x69,
        name: "Intel",
        vendor: Vendor::Intel,
        parts: &[],
    },
    Implementer {
        id: 0x6d,
        name: "Microsoft",
        vendor: Vendor::Microsoft,
        parts: &[],
    },
    Implementer {
        id: 0x70,
        name: "Phytium",
        vendor: Vendor::Phytium,
        parts: &[],
    },
    Implementer {
        id: 0xc0,
        name: "Ampere",
        vendor: Vendor::Ampere,
        parts: &[],
    },
];

/// How a register field encodes feature presence.
#[derive(Debug, Clone, Copy)]
enum FieldTest {
    /// Field value must be at least this.
    AtLeast(u64),
    /// Field value must differ from this (0xf marks "not implemented"
    /// in several PFR fields).
    Not(u64),
}

struct ArmFieldRule {
    reg: ArmRegister,
    index: usize,
    hi: u8,
    lo: u8,
    test: FieldTest,
    feature: Feature,
}

macro_rules! field_rule {
    ($reg:ident, $index:expr, $hi:expr, $lo:expr, $test:expr, $feature:ident) => {
        ArmFieldRule {
            reg: ArmRegister::$reg,
            index: $index,
            hi: $hi,
            lo: $lo,
            test: $test,
            feature: Feature::$feature,
        }
    };
}

const FIELD_RULES: &[ArmFieldRule] = &[
    field_rule!(Aa64Isar, 0, 7, 4, FieldTest::AtLeast(1), Aes),
    field_rule!(Aa64Isar, 0, 7, 4, FieldTest::AtLeast(2), Pmull),
    field_rule!(Aa64Isar, 0, 11, 8, FieldTest::AtLeast(1), Sha1),
    field_rule!(Aa64Isar, 0, 15, 12, FieldTest::AtLeast(1), Sha2),
    field_rule!(Aa64Isar, 0, 19, 16, FieldTest::AtLeast(1), Crc32),
    field_rule!(Aa64Isar, 0, 23, 20, FieldTest::AtLeast(2), Atomics),
    field_rule!(Aa64Isar, 0, 31, 28, FieldTest::AtLeast(1), Rdm),
    field_rule!(Aa64Isar, 0, 47, 44, FieldTest::AtLeast(1), Dotprod),
    field_rule!(Aa64Isar, 0, 51, 48, FieldTest::AtLeast(1), Fhm),
    field_rule!(Aa64Isar, 1, 47, 44, FieldTest::AtLeast(1), Bf16),
    field_rule!(Aa64Isar, 1, 55, 52, FieldTest::AtLeast(1), I8mm),
    field_rule!(Aa64Pfr, 0, 19, 16, FieldTest::Not(0xf), Fp),
    field_rule!(Aa64Pfr, 0, 23, 20, FieldTest::Not(0xf), Asimd),
    field_rule!(Aa64Pfr, 0, 35, 32, FieldTest::AtLeast(1), Sve),
    field_rule!(Aa64Zfr, 0, 3, 0, FieldTest::AtLeast(1), Sve2),
];

/// Architecture versions ordered by tier; a tier is reached when its
/// mandatory features (and those of every lower tier) are all present.
const ARM_LEVELS: &[(FeatureLevel, &[Feature])] = &[
    (FeatureLevel::ArmV8_0A, &[Feature::Fp, Feature::Asimd]),
    (
        FeatureLevel::ArmV8_1A,
        &[Feature::Atomics, Feature::Crc32, Feature::Rdm],
    ),
    (FeatureLevel::ArmV8_2A, &[]),
    (FeatureLevel::ArmV8_4A, &[Feature::Dotprod]),
    (FeatureLevel::ArmV8_6A, &[Feature::Bf16, Feature::I8mm]),
    (FeatureLevel::ArmV9_0A, &[Feature::Sve2]),
];

pub(crate) fn rules() -> Vec<(Feature, DecodeOwner)> {
    FIELD_RULES
        .iter()
        .map(|r| (r.feature, DecodeOwner::Arm))
        .collect()
}

pub(crate) fn decode(raw: &RawDescriptor) -> DecodedIdentity {
    let mut id = DecodedIdentity::degraded();
    id.architecture = Architecture::Arm;

    let midr = arm_midr(raw);
    let payload = ArmPayload {
        implementer: extract_bits(midr, 31, 24) as u8,
        variant: extract_bits(midr, 23, 20) as u8,
        part_num: extract_bits(midr, 15, 4) as u16,
        revision: extract_bits(midr, 3, 0) as u8,
    };

    let implementer = IMPLEMENTERS.iter().find(|i| i.id == payload.implementer);
    let part = implementer.and_then(|i| i.parts.iter().find(|p| p.part_num == payload.part_num));

    if let Some(imp) = implementer {
        id.vendor = imp.vendor;
        id.vendor_str = imp.name.to_string();
    }
    match part {
        Some(part) => {
            id.codename = part.name.to_string();
            id.purpose = match part.class {
                CoreClass::Ultimate => Purpose::UPerformance,
                CoreClass::Performance => Purpose::Performance,
                CoreClass::Efficiency => Purpose::Efficiency,
                CoreClass::General => Purpose::General,
            };
        }
        None => {
            id.codename = format!("Unknown {} CPU", id.vendor);
        }
    }

    id.flags = load_features(raw);
    id.feature_level = feature_level(midr, &id.flags);
    id.payload = ArchPayload::Arm(payload);
    id
}

fn load_features(raw: &RawDescriptor) -> BTreeSet<Feature> {
    let mut flags = BTreeSet::new();
    for rule in FIELD_RULES {
        let reg = match raw.arm_reg(rule.reg, rule.index) {
            Some(v) => v,
            None => continue,
        };
        let field = extract_bits(reg, rule.hi, rule.lo);
        let present = match rule.test {
            FieldTest::AtLeast(min) => field >= min,
            FieldTest::Not(val) => field != val,
        };
        if present {
            flags.insert(rule.feature);
        }
    }
    flags
}

fn feature_level(midr: u64, flags: &BTreeSet<Feature>) -> FeatureLevel {
    // MIDR architecture field 0xf means "see the feature registers";
    // anything older is out of scope for the AA64 rules.
    if extract_bits(midr, 19, 16) != 0xf {
        return FeatureLevel::Unknown;
    }
    let mut level = FeatureLevel::Unknown;
    for (tier, required) in ARM_LEVELS {
        if required.iter().all(|f| flags.contains(f)) {
            level = *tier;
        } else {
            break;
        }
    }
    level
}
