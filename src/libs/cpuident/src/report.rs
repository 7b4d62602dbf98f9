// Copyright (c) 2024 The cpuident developers
//
// SPDX-License-Identifier: Apache-2.0
//

//! Field-oriented report rendering.
//!
//! A report is one value per requested field per CPU type, with blocks
//! for distinct CPU types separated by a delimiter line. The golden
//! files consumed by the regression runner use exactly this format.

use crate::decode::{ArchPayload, CacheLevelKind, DecodedIdentity, SystemIdentity};
use crate::{Error, Result};

/// Separator between per-CPU-type report blocks.
pub const DELIMITER: &str =
    "--------------------------------------------------------------------------------";

/// Report fields for x86 CPU types, in canonical order.
pub const FIELDS_X86: &[&str] = &[
    "architecture",
    "feature-level",
    "purpose",
    "family",
    "model",
    "stepping",
    "extfamily",
    "extmodel",
    "cores",
    "logical",
    "l1d-cache",
    "l1i-cache",
    "l2-cache",
    "l3-cache",
    "l4-cache",
    "l1d-assoc",
    "l1i-assoc",
    "l2-assoc",
    "l3-assoc",
    "l4-assoc",
    "l1d-cacheline",
    "l1i-cacheline",
    "l2-cacheline",
    "l3-cacheline",
    "l4-cacheline",
    "l1d-instances",
    "l1i-instances",
    "l2-instances",
    "l3-instances",
    "l4-instances",
    "sse-size",
    "codename",
    "flags",
];

/// Report fields for ARM CPU types, in canonical order.
pub const FIELDS_ARM: &[&str] = &[
    "architecture",
    "feature-level",
    "purpose",
    "implementer",
    "variant",
    "part-num",
    "revision",
    "cores",
    "logical",
    "codename",
    "flags",
];

fn opt_i64(v: Option<u32>) -> String {
    match v {
        Some(v) => v.to_string(),
        None => "-1".to_string(),
    }
}

fn cache_field(id: &DecodedIdentity, kind: CacheLevelKind, attr: &str) -> String {
    let level = id.cache.level(kind);
    match attr {
        "cache" => opt_i64(level.size),
        "assoc" => opt_i64(level.assoc),
        "cacheline" => opt_i64(level.line_size),
        _ => opt_i64(level.instances),
    }
}

fn x86_payload_field(id: &DecodedIdentity, field: &str) -> String {
    let payload = match &id.payload {
        ArchPayload::X86(p) => p,
        _ => return "-1".to_string(),
    };
    match field {
        "family" => payload.family.to_string(),
        "model" => payload.model.to_string(),
        "stepping" => payload.stepping.to_string(),
        "extfamily" => payload.ext_family.to_string(),
        "extmodel" => payload.ext_model.to_string(),
        // sse-size
        _ => match payload.sse_size {
            Some(bits) => bits.to_string(),
            None => "N/A".to_string(),
        },
    }
}

fn arm_payload_field(id: &DecodedIdentity, field: &str) -> String {
    let payload = match &id.payload {
        ArchPayload::Arm(p) => p,
        _ => return "-1".to_string(),
    };
    match field {
        "implementer" => format!("0x{:02x}", payload.implementer),
        "part-num" => format!("0x{:03x}", payload.part_num),
        "variant" => payload.variant.to_string(),
        // revision
        _ => payload.revision.to_string(),
    }
}

fn flags_field(id: &DecodedIdentity) -> String {
    // BTreeSet keeps catalog order; render as a single space-joined line.
    id.flags
        .iter()
        .map(|f| f.name())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render one report field of a decoded identity.
pub fn field_value(id: &DecodedIdentity, field: &str) -> Result<String> {
    let value = match field {
        "architecture" => id.architecture.to_string(),
        "feature-level" => id.feature_level.to_string(),
        "purpose" => id.purpose.to_string(),
        "family" | "model" | "stepping" | "extfamily" | "extmodel" | "sse-size" => {
            x86_payload_field(id, field)
        }
        "implementer" | "variant" | "part-num" | "revision" => arm_payload_field(id, field),
        "cores" => id.num_cores.to_string(),
        "logical" => id.num_logical_cpus.to_string(),
        "l1d-cache" | "l1d-assoc" | "l1d-cacheline" | "l1d-instances" => {
            cache_field(id, CacheLevelKind::L1d, &field["l1d-".len()..])
        }
        "l1i-cache" | "l1i-assoc" | "l1i-cacheline" | "l1i-instances" => {
            cache_field(id, CacheLevelKind::L1i, &field["l1i-".len()..])
        }
        "l2-cache" | "l2-assoc" | "l2-cacheline" | "l2-instances" => {
            cache_field(id, CacheLevelKind::L2, &field["l2-".len()..])
        }
        "l3-cache" | "l3-assoc" | "l3-cacheline" | "l3-instances" => {
            cache_field(id, CacheLevelKind::L3, &field["l3-".len()..])
        }
        "l4-cache" | "l4-assoc" | "l4-cacheline" | "l4-instances" => {
            cache_field(id, CacheLevelKind::L4, &field["l4-".len()..])
        }
        "codename" => id.codename.clone(),
        "flags" => flags_field(id),
        other => return Err(Error::UnknownField(other.to_string())),
    };
    Ok(value)
}

/// The field catalog matching a decoded identity's architecture.
pub fn fields_for(id: &DecodedIdentity) -> &'static [&'static str] {
    match id.payload {
        ArchPayload::Arm(_) => FIELDS_ARM,
        _ => FIELDS_X86,
    }
}

/// Render a full report: one value per line, CPU-type blocks separated
/// by [`DELIMITER`]. With `fields` empty, each block uses the catalog
/// matching its architecture.
pub fn render(system: &SystemIdentity, fields: &[&str]) -> Result<String> {
    let mut blocks = Vec::with_capacity(system.len());
    for id in system.iter() {
        let fields = if fields.is_empty() {
            fields_for(id)
        } else {
            fields
        };
        let mut lines = Vec::with_capacity(fields.len());
        for field in fields {
            lines.push(field_value(id, field)?);
        }
        blocks.push(lines.join("\n"));
    }
    let mut out = blocks.join(&format!("\n{}\n", DELIMITER));
    out.push('\n');
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{decode_all, Architecture};
    use crate::raw::{LeafClass, RawDescriptorBuilder, RawDescriptorSet};

    fn intel_capture() -> RawDescriptorSet {
        let desc = RawDescriptorBuilder::new()
            .leaf(
                LeafClass::Basic,
                0,
                [0xd, 0x756e_6547, 0x6c65_746e, 0x4965_6e69],
            )
            .leaf(LeafClass::Basic, 1, [0x0008_06ea, 0x0010_0800, 0x0000_0201, 0x0000_0089])
            .build();
        RawDescriptorSet::from(vec![desc])
    }

    #[test]
    fn test_delimiter_is_eighty_dashes() {
        assert_eq!(DELIMITER.len(), 80);
        assert!(DELIMITER.chars().all(|c| c == '-'));
    }

    #[test]
    fn test_field_catalog_sizes() {
        assert_eq!(FIELDS_X86.len(), 33);
        assert_eq!(FIELDS_ARM.len(), 11);
    }

    #[test]
    fn test_report_line_cardinality() {
        let system = decode_all(&intel_capture());
        let text = render(&system, FIELDS_X86).unwrap();
        let lines: Vec<&str> = text
            .lines()
            .filter(|l| *l != DELIMITER)
            .collect();
        assert_eq!(lines.len(), FIELDS_X86.len() * system.len());
    }

    #[test]
    fn test_basic_x86_field_values() {
        let system = decode_all(&intel_capture());
        let id = system.get(0).unwrap();
        assert_eq!(id.architecture, Architecture::X86);
        assert_eq!(field_value(id, "architecture").unwrap(), "x86");
        assert_eq!(field_value(id, "family").unwrap(), "6");
        assert_eq!(field_value(id, "purpose").unwrap(), "general");
        // Undetermined caches render as -1, never 0.
        assert_eq!(field_value(id, "l3-cache").unwrap(), "-1");
        assert_eq!(field_value(id, "l4-instances").unwrap(), "-1");
        // No SSE bit set in this minimal capture.
        assert_eq!(field_value(id, "sse-size").unwrap(), "N/A");
        let flags = field_value(id, "flags").unwrap();
        assert!(flags.contains("fpu"), "flags: {}", flags);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let system = decode_all(&intel_capture());
        let id = system.get(0).unwrap();
        let err = field_value(id, "l5-cache").unwrap_err();
        assert!(matches!(err, Error::UnknownField(_)), "{:?}", err);
    }

    #[test]
    fn test_arm_field_rendering() {
        use crate::decode::ArmPayload;

        let mut id = crate::decode::DecodedIdentity::degraded();
        id.payload = ArchPayload::Arm(ArmPayload {
            implementer: 0x41,
            variant: 2,
            part_num: 0xd08,
            revision: 3,
        });
        assert_eq!(field_value(&id, "implementer").unwrap(), "0x41");
        assert_eq!(field_value(&id, "part-num").unwrap(), "0xd08");
        assert_eq!(field_value(&id, "variant").unwrap(), "2");
        assert_eq!(field_value(&id, "revision").unwrap(), "3");
        assert_eq!(fields_for(&id), FIELDS_ARM);
    }
}
